//! Hook for attaching authentication material to outgoing requests.

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::BoxError;
use crate::http::HttpRequest;

/// Signs a raw request before it is handed to the transport.
pub trait Credential: Send + Sync + Debug {
    fn sign(&self, request: &mut HttpRequest) -> Result<(), BoxError>;
}

impl<C: Credential + ?Sized> Credential for Arc<C> {
    fn sign(&self, request: &mut HttpRequest) -> Result<(), BoxError> {
        (**self).sign(request)
    }
}

/// Sends requests unsigned.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl Credential for Anonymous {
    fn sign(&self, _request: &mut HttpRequest) -> Result<(), BoxError> {
        Ok(())
    }
}
