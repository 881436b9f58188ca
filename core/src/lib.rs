//! Client for invoking named actions against a backend over HTTP.
//!
//! # Overview
//! `ActionClient::invoke_action` turns an action name and a serializable
//! request into a raw `HttpRequest`, hands it to a `Transport`, and decodes
//! the raw `HttpResponse` into the caller's response type.
//!
//! # Design
//! - `Transport` is the I/O seam. `HttpTransport` does real network calls;
//!   `MockTransport` fabricates responses so tests never touch the network.
//! - `MockTransport` intercepts at two levels: raw (`mock_http`) for tests
//!   that care about the wire, and decoded data (`mock_data`) for tests that
//!   only care about fields.
//! - `Retry` wraps any transport; `ActionClient::new` installs it when
//!   `Config::max_retries` is non-zero. The client itself never retries.
//! - Each action's events are filtered by `Config::action_level`.

pub mod client;
pub mod config;
pub mod credential;
pub mod data;
pub mod error;
pub mod http;
pub mod mock;
pub mod retry;
pub mod transport;
pub mod types;

pub use client::{parse_response, ActionClient};
pub use config::{Config, LogLevel};
pub use credential::{Anonymous, Credential};
pub use data::DataMap;
pub use error::{ActionError, BoxError, ConfigError, InterceptError, InvokeError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use mock::{Interceptor, MockFallback, MockTransport};
pub use retry::Retry;
pub use transport::{HttpTransport, Transport};
pub use types::{CommonRequest, CommonResponse};
