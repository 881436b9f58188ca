//! Deterministic stand-in for `HttpTransport`.
//!
//! # Design
//! Interceptors come in two kinds. Raw interceptors see the wire-level
//! `HttpRequest`/`HttpResponse`; data interceptors see the decoded
//! `DataMap` pair and never deal with encoding. The two kinds are kept in
//! separate chains so the decode/encode step sits explicitly between them.
//!
//! Both chains follow the same rules: interceptors run in registration order,
//! the first error aborts the call, and the first interceptor to populate a
//! response wins. Later interceptors still run, but each gets a fresh
//! response to write into, so they cannot overwrite the winner.
//!
//! A raw response counts as populated once it differs from
//! `HttpResponse::empty()`: a body, a header or a status other than 200 is
//! enough. A data response is populated once it has a field.
//!
//! Registration takes `&mut self` and `send` takes `&self`. Register every
//! interceptor during setup, before the mock is shared between threads; the
//! chains are only read while dispatching.

use std::fmt;

use tracing::{debug, trace};

use crate::data::{self, DataMap};
use crate::error::{ConfigError, InterceptError, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

pub type RawInterceptorFn =
    dyn Fn(&mut HttpRequest, &mut HttpResponse) -> Result<(), InterceptError> + Send + Sync;

pub type DataInterceptorFn =
    dyn Fn(&mut DataMap, &mut DataMap) -> Result<(), InterceptError> + Send + Sync;

/// A test-time hook that may fabricate or reject a response.
pub enum Interceptor {
    Raw(Box<RawInterceptorFn>),
    Data(Box<DataInterceptorFn>),
}

impl Interceptor {
    pub fn raw<F>(f: F) -> Self
    where
        F: Fn(&mut HttpRequest, &mut HttpResponse) -> Result<(), InterceptError>
            + Send
            + Sync
            + 'static,
    {
        Interceptor::Raw(Box::new(f))
    }

    pub fn data<F>(f: F) -> Self
    where
        F: Fn(&mut DataMap, &mut DataMap) -> Result<(), InterceptError> + Send + Sync + 'static,
    {
        Interceptor::Data(Box::new(f))
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interceptor::Raw(_) => f.write_str("Interceptor::Raw(..)"),
            Interceptor::Data(_) => f.write_str("Interceptor::Data(..)"),
        }
    }
}

/// What `MockTransport` answers when no interceptor populated a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MockFallback {
    /// An empty, successful response.
    #[default]
    Empty,
    /// A successful response with this body.
    Body(Vec<u8>),
    /// Fail with `TransportError::NoMatch`.
    NoMatch,
}

/// A programmable transport for tests.
#[derive(Default)]
pub struct MockTransport {
    raw: Vec<Box<RawInterceptorFn>>,
    data: Vec<Box<DataInterceptorFn>>,
    fallback: MockFallback,
    sealed: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(mut self, fallback: MockFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn set_fallback(&mut self, fallback: MockFallback) {
        self.fallback = fallback;
    }

    /// Append a raw-level interceptor.
    pub fn mock_http<F>(&mut self, f: F) -> Result<(), ConfigError>
    where
        F: Fn(&mut HttpRequest, &mut HttpResponse) -> Result<(), InterceptError>
            + Send
            + Sync
            + 'static,
    {
        self.register(Interceptor::raw(f))
    }

    /// Append a data-level interceptor.
    pub fn mock_data<F>(&mut self, f: F) -> Result<(), ConfigError>
    where
        F: Fn(&mut DataMap, &mut DataMap) -> Result<(), InterceptError> + Send + Sync + 'static,
    {
        self.register(Interceptor::data(f))
    }

    pub fn register(&mut self, interceptor: Interceptor) -> Result<(), ConfigError> {
        if self.sealed {
            return Err(ConfigError::MockSealed);
        }
        match interceptor {
            Interceptor::Raw(f) => self.raw.push(f),
            Interceptor::Data(f) => self.data.push(f),
        }
        Ok(())
    }

    /// Finalize the mock; further registration fails.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }

    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.data.is_empty()
    }

    fn run_raw(&self, request: &mut HttpRequest) -> Result<Option<HttpResponse>, TransportError> {
        let untouched = HttpResponse::empty();
        let mut winner = None;
        for (index, interceptor) in self.raw.iter().enumerate() {
            let mut candidate = HttpResponse::empty();
            interceptor(request, &mut candidate).map_err(TransportError::Intercepted)?;
            if winner.is_none() && candidate != untouched {
                trace!(index, "raw interceptor populated the response");
                winner = Some(candidate);
            }
        }
        Ok(winner)
    }

    fn run_data(&self, request: &HttpRequest) -> Result<Option<HttpResponse>, TransportError> {
        if self.data.is_empty() {
            return Ok(None);
        }
        let mut decoded = data::decode_request(request).map_err(TransportError::Codec)?;
        let mut winner = None;
        for (index, interceptor) in self.data.iter().enumerate() {
            let mut candidate = DataMap::new();
            interceptor(&mut decoded, &mut candidate).map_err(TransportError::Intercepted)?;
            if winner.is_none() && !candidate.is_empty() {
                trace!(index, "data interceptor populated the response");
                winner = Some(candidate);
            }
        }
        winner
            .map(|fields| {
                let mut response = HttpResponse::empty();
                data::encode_response(&fields, &mut response).map_err(TransportError::Codec)?;
                Ok(response)
            })
            .transpose()
    }

    fn fallback(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        match &self.fallback {
            MockFallback::Empty => Ok(HttpResponse::empty()),
            MockFallback::Body(body) => {
                let mut response = HttpResponse::empty();
                response.set_body(body.clone());
                Ok(response)
            }
            MockFallback::NoMatch => Err(TransportError::NoMatch {
                action: data::request_action(request),
            }),
        }
    }
}

impl Transport for MockTransport {
    fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if let Some(response) = self.run_raw(&mut request)? {
            return Ok(response);
        }
        if let Some(response) = self.run_data(&request)? {
            return Ok(response);
        }
        debug!(
            action = %data::request_action(&request),
            fallback = ?self.fallback,
            "no interceptor matched"
        );
        self.fallback(&request)
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("raw", &self.raw.len())
            .field("data", &self.data.len())
            .field("fallback", &self.fallback)
            .field("sealed", &self.sealed)
            .finish()
    }
}
