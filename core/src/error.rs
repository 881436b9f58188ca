//! Error types for action invocation.
//!
//! # Design
//! Errors are layered the way a call flows. `TransportError` is what a
//! `Transport` can report, `ConfigError` covers misuse detected before any
//! I/O, and `ActionError` is the full taxonomy seen by a caller of
//! `ActionClient`. `InvokeError` pairs an `ActionError` with the action name
//! so both are always available to the caller.

use std::time::Duration;

use thiserror::Error;

/// A boxed error from a collaborator (network stack, credential, etc.).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error an interceptor returns to reject a request.
pub type InterceptError = BoxError;

/// Errors returned by `Transport::send`.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request did not complete within the effective timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The response body exceeded the configured size limit.
    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: u64 },

    /// Connection refused, DNS failure, broken pipe and other I/O problems.
    #[error("network error: {0}")]
    Network(#[source] BoxError),

    /// A mock interceptor explicitly rejected the request.
    #[error("interceptor rejected request: {0}")]
    Intercepted(#[source] InterceptError),

    /// The mock transport found no interceptor and is configured to fail.
    #[error("no mock registered for action `{action}`")]
    NoMatch { action: String },

    /// The mock transport could not decode or encode a payload.
    #[error("mock payload codec error: {0}")]
    Codec(String),
}

impl TransportError {
    /// Whether re-sending the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Timeout(_) | TransportError::Network(_))
    }
}

/// Misconfiguration detected before any I/O is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no transport configured")]
    MissingTransport,

    /// Interceptors were registered on a mock that was already sealed.
    #[error("mock transport is sealed, no more interceptors can be registered")]
    MockSealed,
}

/// Everything that can go wrong while invoking an action.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request object could not be serialized into a JSON object.
    #[error("failed to encode request: {0}")]
    Encode(String),

    /// The credential collaborator failed to sign the request.
    #[error("failed to sign request: {0}")]
    Sign(#[source] BoxError),

    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body is malformed or does not fit the response type.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The backend reported a non-zero `RetCode`.
    #[error("server error {ret_code}: {message}")]
    Server { ret_code: i64, message: String },
}

/// Error returned by `ActionClient::invoke_action`.
#[derive(Error, Debug)]
#[error("action `{action}` failed: {source}")]
pub struct InvokeError {
    action: String,
    #[source]
    source: ActionError,
}

impl InvokeError {
    pub fn new(action: &str, source: impl Into<ActionError>) -> Self {
        Self {
            action: action.to_string(),
            source: source.into(),
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn kind(&self) -> &ActionError {
        &self.source
    }

    /// The exact error an interceptor rejected the request with, if this
    /// failure came from one and it has type `E`.
    pub fn downcast_intercepted<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match &self.source {
            ActionError::Transport(TransportError::Intercepted(err)) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}
