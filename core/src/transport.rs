//! The transport seam and its network implementation.
//!
//! # Design
//! `Transport` is the only thing `ActionClient` knows about I/O. It is
//! object-safe and takes `&self`, so one instance can serve concurrent
//! invocations and be swapped at runtime for a `MockTransport`.
//! `HttpTransport` is a byte-level relay over a blocking `ureq` agent: it
//! never looks at the action name or the payload. Response bodies are read
//! up to `Config::max_body_size`; anything larger is `BodyTooLarge`.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::config::Config;
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Turns a raw request into a raw response.
pub trait Transport: Send + Sync + Debug {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

/// Sends requests over the network.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
    user_agent: String,
    timeout: Duration,
    max_body_size: u64,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Self {
        // Non-2xx responses are data for the client to interpret, not
        // transport failures.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .build()
            .new_agent();
        Self {
            agent,
            user_agent: config.full_user_agent(),
            timeout: config.timeout,
            max_body_size: config.max_body_size,
        }
    }

    fn prepare<B>(
        &self,
        builder: ureq::RequestBuilder<B>,
        request: &HttpRequest,
        timeout: Duration,
    ) -> ureq::RequestBuilder<B> {
        let mut builder = builder.config().timeout_global(Some(timeout)).build();
        for (key, value) in &request.query {
            builder = builder.query(key, value);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.get_header("User-Agent").is_none() {
            builder = builder.header("User-Agent", self.user_agent.as_str());
        }
        builder
    }

    fn map_error(&self, err: ureq::Error, timeout: Duration) -> TransportError {
        match err {
            ureq::Error::Timeout(_) => TransportError::Timeout(timeout),
            ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                TransportError::Timeout(timeout)
            }
            ureq::Error::BodyExceedsLimit(_) => TransportError::BodyTooLarge {
                limit: self.max_body_size,
            },
            other => TransportError::Network(Box::new(other)),
        }
    }

    /// The timeout applied to `request`: the configured one, shortened by the
    /// request's own deadline.
    fn effective_timeout(&self, request: &HttpRequest) -> Duration {
        request
            .timeout
            .map_or(self.timeout, |deadline| deadline.min(self.timeout))
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let timeout = self.effective_timeout(&request);
        trace!(url = %request.url, ?timeout, "sending request");

        let result = match request.method {
            HttpMethod::Get => self.prepare(self.agent.get(&request.url), &request, timeout).call(),
            HttpMethod::Post => self
                .prepare(self.agent.post(&request.url), &request, timeout)
                .send(request.body.as_slice()),
        };
        let mut response = result.map_err(|e| self.map_error(e, timeout))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_body_size)
            .read_to_vec()
            .map_err(|e| self.map_error(e, timeout))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn transport(timeout: Duration) -> HttpTransport {
        HttpTransport::new(&Config::new().with_timeout(timeout))
    }

    #[test]
    fn request_deadline_shortens_timeout() {
        let t = transport(Duration::from_secs(30));
        let mut req = HttpRequest::new(HttpMethod::Post, "http://localhost");
        assert_eq!(t.effective_timeout(&req), Duration::from_secs(30));

        req.timeout = Some(Duration::from_secs(2));
        assert_eq!(t.effective_timeout(&req), Duration::from_secs(2));
    }

    #[test]
    fn request_deadline_never_extends_timeout() {
        let t = transport(Duration::from_secs(5));
        let mut req = HttpRequest::new(HttpMethod::Post, "http://localhost");
        req.timeout = Some(Duration::from_secs(60));
        assert_eq!(t.effective_timeout(&req), Duration::from_secs(5));
    }

    #[test]
    fn body_limit_comes_from_config() {
        let t = HttpTransport::new(&Config::new().with_max_body_size(512));
        assert_eq!(t.max_body_size, 512);
        let err = t.map_error(ureq::Error::BodyExceedsLimit(512), Duration::from_secs(1));
        assert!(matches!(err, TransportError::BodyTooLarge { limit: 512 }));
    }

    #[test]
    fn user_agent_comes_from_config() {
        let t = HttpTransport::new(&Config::new().with_user_agent("Tool/1.0"));
        assert!(t.user_agent.ends_with(" Tool/1.0"));
    }

    #[test]
    fn connection_refused_is_a_network_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let t = transport(Duration::from_secs(2));
        let req = HttpRequest::new(HttpMethod::Post, "http://127.0.0.1:9/");
        match t.send(req) {
            Err(TransportError::Network(_)) | Err(TransportError::Timeout(_)) => {}
            other => panic!("expected a transport failure, got {other:?}"),
        }
    }
}
