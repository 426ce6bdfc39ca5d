//! Transport boundary between the dispatcher and its HTTP host.
//!
//! An [`Exchange`] pairs the inbound request head with a write-once response
//! sink. Middleware sees the exchange and may write its own status and body
//! (for example a bare 401) before aborting. Once something has been written,
//! the dispatcher's own envelope write is skipped.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::request::Parts;
use http::{HeaderMap, Response, StatusCode};

/// Content type of every envelope response.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Request head plus a write-once response sink.
#[derive(Debug)]
pub struct Exchange {
    request: Parts,
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Bytes,
}

impl Exchange {
    pub fn new(request: Parts) -> Self {
        Self {
            request,
            status: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// The inbound request head (method, URI, headers).
    pub fn request(&self) -> &Parts {
        &self.request
    }

    /// Response headers. Headers set here are sent whoever writes the body.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Whether a status has already been written.
    pub fn status_written(&self) -> bool {
        self.status.is_some()
    }

    /// Write `status` with an empty body and stop further writes.
    pub fn abort_with_status(&mut self, status: StatusCode) {
        self.write(status, None, Bytes::new());
    }

    /// Write `status` and `body` with the given content type, then stop
    /// further writes.
    pub fn abort_with_body(&mut self, status: StatusCode, content_type: &str, body: impl Into<Bytes>) {
        self.write(status, Some(content_type), body.into());
    }

    /// Write a complete response. Returns `false` (and writes nothing) if a
    /// response was already written.
    pub fn write(&mut self, status: StatusCode, content_type: Option<&str>, body: Bytes) -> bool {
        if self.status_written() {
            return false;
        }
        if let Some(ct) = content_type.and_then(|ct| HeaderValue::from_str(ct).ok()) {
            self.headers.insert(CONTENT_TYPE, ct);
        }
        self.status = Some(status);
        self.body = body;
        true
    }

    /// Finish the exchange. An exchange nobody wrote to answers 200 with an
    /// empty body.
    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}
