//! Raw, wire-level request and response types.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The action
//! client builds an `HttpRequest`, a `Transport` turns it into an
//! `HttpResponse`, and the client decodes that. Mock transports fabricate
//! responses from the same types, so nothing above the transport can tell a
//! real round-trip from a simulated one.
//!
//! All fields use owned types so a value can be handed to another thread or
//! cloned for a retry without lifetime concerns.

use std::collections::BTreeMap;
use std::time::Duration;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// An HTTP request described as plain data.
///
/// Created fresh for every invocation and consumed by `Transport::send`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: BTreeMap<String, String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Caller-supplied deadline for this request. Transports that perform
    /// I/O must not block longer than this.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: &str) -> Self {
        Self {
            method,
            url: url.to_string(),
            query: BTreeMap::new(),
            headers: Vec::new(),
            body: Vec::new(),
            timeout: None,
        }
    }

    pub fn get_query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Set a query parameter, replacing any previous value for `key`.
    pub fn set_query(&mut self, key: &str, value: &str) {
        self.query.insert(key.to_string(), value.to_string());
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Set a header, replacing any previous value. Names compare
    /// case-insensitively.
    pub fn set_header(&mut self, name: &str, value: &str) {
        replace_header(&mut self.headers, name, value);
    }

    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A successful response with no headers and no body.
    pub fn empty() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        replace_header(&mut self.headers, name, value);
    }

    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::empty()
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn replace_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_query_replaces_existing_key() {
        let mut req = HttpRequest::new(HttpMethod::Post, "http://localhost");
        req.set_query("Action", "First");
        req.set_query("Action", "Second");
        assert_eq!(req.query.len(), 1);
        assert_eq!(req.get_query("Action"), Some("Second"));
        assert_eq!(req.get_query("Missing"), None);
    }

    #[test]
    fn headers_are_case_insensitive() {
        let mut req = HttpRequest::new(HttpMethod::Get, "http://localhost");
        req.set_header("Content-Type", "text/plain");
        req.set_header("content-type", "application/json");
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.get_header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn empty_response_is_successful() {
        let resp = HttpResponse::empty();
        assert!(resp.is_success());
        assert!(resp.body.is_empty());
        assert_eq!(resp, HttpResponse::default());
    }

    #[test]
    fn non_2xx_is_not_success() {
        let resp = HttpResponse {
            status: 503,
            headers: Vec::new(),
            body: b"unavailable".to_vec(),
        };
        assert!(!resp.is_success());
        assert_eq!(resp.body_text(), "unavailable");
    }
}
