//! Retrying wrapper around any `Transport`.
//!
//! Only failures where the request may never have reached the backend
//! (timeouts, network errors) are retried. The request is cloned for each
//! attempt, so the wrapped transport always receives a fresh value.
//!
//! A request's `timeout` is the budget for all attempts together. Each
//! attempt gets what is left of it, and no retry starts if its backoff would
//! run past the budget.

use std::time::{Duration, Instant};

use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use tracing::warn;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

const INITIAL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct Retry<T> {
    inner: T,
    max_retries: u32,
    initial_interval: Duration,
}

impl<T: Transport> Retry<T> {
    pub fn new(inner: T, max_retries: u32) -> Self {
        Self {
            inner,
            max_retries,
            initial_interval: INITIAL_INTERVAL,
        }
    }

    /// Start backing off from `interval` instead of the default 100ms.
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_interval(MAX_INTERVAL)
            .with_max_elapsed_time(None)
            .build()
    }
}

impl<T: Transport> Transport for Retry<T> {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let started = Instant::now();
        let budget = request.timeout;
        let mut backoff = self.backoff();
        let mut attempt = 0;
        loop {
            let mut attempt_request = request.clone();
            if let Some(budget) = budget {
                let remaining = budget.saturating_sub(started.elapsed());
                if remaining.is_zero() {
                    return Err(TransportError::Timeout(budget));
                }
                attempt_request.timeout = Some(remaining);
            }
            match self.inner.send(attempt_request) {
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let wait = backoff.next_backoff().unwrap_or(MAX_INTERVAL);
                    if let Some(budget) = budget {
                        if started.elapsed() + wait >= budget {
                            warn!(url = %request.url, attempt, error = %err, "deadline reached, not retrying");
                            return Err(TransportError::Timeout(budget));
                        }
                    }
                    warn!(
                        url = %request.url,
                        attempt,
                        max_retries = self.max_retries,
                        error = %err,
                        "retrying request in {wait:?}"
                    );
                    std::thread::sleep(wait);
                }
                result => return result,
            }
        }
    }
}
