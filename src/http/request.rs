use crate::{
    errors::ErrorKind,
    http::types::{self, Headers},
    limits::ReqLimits,
    query::Query,
    Method,
};
use memchr::memchr_iter;
use std::{io, mem, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    time::sleep,
};

/// Parsed HTTP request.
///
/// A `Request` is produced once per request cycle and is immutable
/// afterwards; handlers and hooks only ever see `&Request`.
///
/// # Input data requirements
///
/// #### Character encoding
///
/// The request line and the headers must be `UTF-8`, otherwise the request
/// is answered with `400 Bad Request`. The body is arbitrary bytes.
///
/// #### General designations
/// - `SP`: ASCII space (0x20)
/// - `EOL`: `"\r\n"` or a bare `"\n"`
///
/// ## First line
///
/// ```text
/// [METHOD] SP [TARGET] SP [VERSION] EOL
/// ```
///
/// Exactly three parts separated by single spaces. `[METHOD]` must be one of
/// [`Method`]. `[TARGET]` is split on the first `?` into
/// [path](Request::path) and [query](Request::query). `[VERSION]` is kept
/// verbatim.
///
/// ## Header
///
/// ```text
/// [NAME]: SP [VALUE] EOL
/// ```
///
/// Split on the first `": "`. Names are case-insensitive and a repeated
/// name overwrites the earlier value. An empty line ends the headers.
///
/// ## Body
///
/// Read only when `Content-Length` is present, and then exactly that many
/// bytes. Any bytes after the body (or after the headers, without
/// `Content-Length`) stay unread by the request; they are handed to the
/// WebSocket session if the connection is upgraded.
///
/// **Not supported**: `Transfer-Encoding: chunked`, implicit-length bodies,
/// `Expect: 100-continue`.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    path: String,
    query: String,
    version: String,

    headers: Headers,
    content_length: Option<usize>,

    pub(crate) body: Option<Vec<u8>>,
}

// Public API
impl Request {
    #[inline(always)]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request target up to (not including) the first `?`.
    #[inline(always)]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Everything after the first `?`, or `""`.
    #[inline(always)]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns the first query parameter named `name`, undecoded.
    #[inline]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        Query::new(&self.query).get(name)
    }

    /// Protocol version exactly as sent, e.g. `"HTTP/1.1"`.
    #[inline(always)]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[inline(always)]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the header value with case-insensitive name matching
    /// (per [RFC 9110](https://datatracker.ietf.org/doc/html/rfc9110#section-5.1)).
    /// Uses linear search.
    #[inline(always)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Returns the value of the `Content-Length` header if present.
    #[inline(always)]
    pub const fn content_length(&self) -> Option<usize> {
        self.content_length
    }

    /// Returns the request body; present exactly when `Content-Length` was sent.
    #[inline(always)]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

// Parse head
impl Request {
    /// Parses the request line and headers. `head` ends with the empty line.
    pub(crate) fn parse_head(head: &[u8], limits: &ReqLimits) -> Result<Self, ErrorKind> {
        let head = simdutf8::basic::from_utf8(head).map_err(|_| ErrorKind::InvalidEncoding)?;
        let mut lines = head
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line));

        let mut request = lines
            .next()
            .ok_or(ErrorKind::InvalidRequestLine)
            .and_then(Self::parse_first_line)?;

        let mut count = 0;
        for line in lines {
            if line.is_empty() {
                break;
            }

            count += 1;
            if count > limits.header_count {
                return Err(ErrorKind::TooManyHeaders);
            }

            request.parse_header(line, limits)?;
        }

        Ok(request)
    }

    #[inline]
    fn parse_first_line(line: &str) -> Result<Self, ErrorKind> {
        let mut parts = line.split(' ');

        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ErrorKind::InvalidRequestLine);
        };

        if [method, target, version].iter().any(|part| part.is_empty()) {
            return Err(ErrorKind::InvalidRequestLine);
        }

        let method = method
            .parse::<Method>()
            .map_err(|_| ErrorKind::UnsupportedMethod)?;
        let (path, query) = target.split_once('?').unwrap_or((target, ""));

        Ok(Request {
            method,
            path: path.to_string(),
            query: query.to_string(),
            version: version.to_string(),

            headers: Headers::new(),
            content_length: None,

            body: None,
        })
    }

    #[inline]
    fn parse_header(&mut self, line: &str, limits: &ReqLimits) -> Result<(), ErrorKind> {
        let (name, value) = line
            .split_once(": ")
            .filter(|(name, _)| !name.is_empty())
            .ok_or(ErrorKind::InvalidHeader)?;

        if name.eq_ignore_ascii_case("content-length") {
            let len = types::slice_to_usize(value.trim().as_bytes())
                .ok_or(ErrorKind::InvalidContentLength)?;

            if len > limits.body_size {
                return Err(ErrorKind::BodyTooLarge);
            }
            self.content_length = Some(len);
        }

        self.headers.insert(name, value);
        Ok(())
    }
}

//

/// Per-connection read buffer.
///
/// Holds bytes read from the socket that have not been consumed by a
/// request yet.
#[derive(Debug, Default)]
pub(crate) struct Parser {
    buffer: Vec<u8>,
}

impl Parser {
    const READ_CHUNK: usize = 4096;

    #[inline(always)]
    pub(crate) fn new(limits: &ReqLimits) -> Self {
        Parser {
            buffer: Vec::with_capacity(limits.head_size.min(Self::READ_CHUNK)),
        }
    }

    /// Reads one request from `stream`.
    ///
    /// Returns `Ok(None)` when the peer closes the connection before sending
    /// a single byte.
    pub(crate) async fn read_request<S: AsyncRead + Unpin>(
        &mut self,
        stream: &mut S,
        limits: &ReqLimits,
        timeout: Duration,
    ) -> Result<Option<Request>, ErrorKind> {
        let head_end = loop {
            if let Some(end) = Self::find_head_end(&self.buffer) {
                if end > limits.head_size {
                    return Err(ErrorKind::HeadTooLarge);
                }
                break end;
            }

            if self.buffer.len() >= limits.head_size {
                return Err(ErrorKind::HeadTooLarge);
            }

            if self.fill_buffer(stream, timeout).await? == 0 {
                return match self.buffer.is_empty() {
                    true => Ok(None),
                    false => Err(ErrorKind::UnexpectedEof),
                };
            }
        };

        let mut request = Request::parse_head(&self.buffer[..head_end], limits)?;
        self.buffer.drain(..head_end);

        if let Some(len) = request.content_length {
            while self.buffer.len() < len {
                if self.fill_buffer(stream, timeout).await? == 0 {
                    return Err(ErrorKind::UnexpectedEof);
                }
            }

            request.body = Some(self.buffer.drain(..len).collect());
        }

        Ok(Some(request))
    }

    /// Bytes received after the last request.
    #[inline]
    pub(crate) fn take_leftover(&mut self) -> Vec<u8> {
        mem::take(&mut self.buffer)
    }

    #[inline]
    async fn fill_buffer<S: AsyncRead + Unpin>(
        &mut self,
        stream: &mut S,
        time: Duration,
    ) -> Result<usize, io::Error> {
        let mut chunk = [0; Self::READ_CHUNK];

        let n = tokio::select! {
            biased;

            read_result = stream.read(&mut chunk) => read_result?,
            _ = sleep(time) => {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "read timeout"));
            },
        };

        self.buffer.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    /// Index just past the empty line ending the head (`\n\n` or `\n\r\n`).
    #[inline]
    fn find_head_end(buffer: &[u8]) -> Option<usize> {
        memchr_iter(b'\n', buffer).find_map(|i| match &buffer[..i] {
            [.., b'\n'] | [.., b'\n', b'\r'] => Some(i + 1),
            _ => None,
        })
    }
}
