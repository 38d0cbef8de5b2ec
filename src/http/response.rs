//! HTTP response entity and its wire serialization.

use crate::http::types::{Headers, StatusCode};
use std::io::Write;

/// HTTP response under construction.
///
/// One `Response` exists per request cycle. It starts as
/// `HTTP/1.1 204 No Content` with no headers and is mutated by the endpoint
/// and by hooks, then serialized once with [`build`](Response::build).
///
/// Setters return `&mut Self`, so calls can be chained:
///
/// ```
/// use spindle::{Response, StatusCode};
///
/// let mut resp = Response::new();
/// resp.set_status(201)
///     .set_header("Content-Type", "text/plain")
///     .set_body("created");
///
/// assert_eq!(resp.status(), StatusCode::Created);
/// assert_eq!(resp.header("content-length"), Some("7"));
/// ```
///
/// # Invariants
///
/// - A `204` response never has a body or a `Content-Length` header.
/// - Setting a non-empty body while the status is `204` promotes it to `200`.
/// - A non-empty body always has `Content-Length` equal to its length;
///   clearing the body removes `Content-Length`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    version: &'static str,
    status: StatusCode,
    headers: Headers,
    body: Option<Vec<u8>>,
    keep_open: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    #[inline(always)]
    pub fn new() -> Self {
        Self {
            version: "HTTP/1.1",
            status: StatusCode::NoContent,
            headers: Headers::new(),
            body: None,
            keep_open: false,
        }
    }

    /// Creates a response with `status` and no body.
    #[inline]
    pub(crate) fn with_status(status: StatusCode) -> Self {
        let mut resp = Self::new();
        resp.set_status_code(status);
        resp
    }
}

impl Response {
    /// Sets the status code.
    ///
    /// Codes missing from the [`StatusCode`] table become
    /// [`501 Not Implemented`](StatusCode::NotImplemented); the original
    /// number is not kept. Setting `204` drops the body.
    ///
    /// ```
    /// use spindle::{Response, StatusCode};
    ///
    /// let mut resp = Response::new();
    /// resp.set_status(418);
    /// assert_eq!(resp.status(), StatusCode::NotImplemented);
    ///
    /// resp.set_status(404);
    /// assert_eq!(resp.status(), StatusCode::NotFound);
    /// ```
    #[inline]
    pub fn set_status(&mut self, code: u16) -> &mut Self {
        self.set_status_code(StatusCode::from_u16(code).unwrap_or(StatusCode::NotImplemented))
    }

    /// Same as [`set_status`](Self::set_status) for a code known to be in
    /// the table.
    #[inline]
    pub fn set_status_code(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;

        if status == StatusCode::NoContent {
            self.clear_body();
        }
        self
    }

    #[inline(always)]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets a header, replacing an existing one with the same
    /// (case-insensitive) name in place.
    #[inline]
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    #[inline]
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(name)
    }

    #[inline(always)]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Replaces the body and sets `Content-Length`.
    ///
    /// An empty body is the same as [`clear_body`](Self::clear_body).
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        let body = body.into();

        if body.is_empty() {
            return self.clear_body();
        }

        if self.status == StatusCode::NoContent {
            self.status = StatusCode::Ok;
        }

        self.headers.insert("Content-Length", body.len().to_string());
        self.body = Some(body);
        self
    }

    /// Drops the body and the `Content-Length` header.
    #[inline]
    pub fn clear_body(&mut self) -> &mut Self {
        self.body = None;
        self.headers.remove("Content-Length");
        self
    }

    #[inline(always)]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Whether the connection stays open after this response is sent.
    ///
    /// Only set for a WebSocket handshake.
    #[inline(always)]
    pub const fn is_keep_open(&self) -> bool {
        self.keep_open
    }

    #[inline(always)]
    pub(crate) fn keep_open(&mut self) -> &mut Self {
        self.keep_open = true;
        self
    }
}

// Serialization
impl Response {
    /// Serializes the response:
    ///
    /// ```text
    /// HTTP/1.1 SP [CODE] SP [REASON] CRLF
    /// ([NAME]: SP [VALUE] CRLF)*      // insertion order
    /// CRLF
    /// [BODY]
    /// ```
    pub fn build(&self) -> Vec<u8> {
        let body_len = self.body.as_ref().map_or(0, Vec::len);
        let mut buffer = Vec::with_capacity(64 + self.headers.len() * 32 + body_len);

        self.write_to(&mut buffer);
        buffer
    }

    #[inline]
    fn write_to(&self, buffer: &mut Vec<u8>) {
        // Writing into a Vec cannot fail
        let _ = write!(buffer, "{} {}\r\n", self.version, self.status.status_line());

        for (name, value) in self.headers.iter() {
            let _ = write!(buffer, "{name}: {value}\r\n");
        }
        buffer.extend_from_slice(b"\r\n");

        if let Some(body) = &self.body {
            buffer.extend_from_slice(body);
        }
    }
}
