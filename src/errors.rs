use crate::StatusCode;
use std::{error, fmt, io};

/// Reasons a request could not be turned into a [`Request`](crate::Request).
///
/// Every variant except [`Io`](ErrorKind::Io) is answered with a
/// well-formed response (see [`ErrorKind::status`]); the connection is
/// never dropped silently because of a malformed request.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The request line is not `METHOD SP target SP version`.
    InvalidRequestLine,
    /// The method is not in the [`Method`](crate::Method) whitelist.
    UnsupportedMethod,
    /// A header line has no `": "` separator or an empty name.
    InvalidHeader,
    /// `Content-Length` is not a decimal number.
    InvalidContentLength,
    /// The request head is not valid UTF-8.
    InvalidEncoding,
    /// The peer closed the connection in the middle of a request.
    UnexpectedEof,

    /// The request head does not fit in [`ReqLimits::head_size`](crate::limits::ReqLimits::head_size).
    HeadTooLarge,
    /// More headers than [`ReqLimits::header_count`](crate::limits::ReqLimits::header_count).
    TooManyHeaders,
    /// Declared body larger than [`ReqLimits::body_size`](crate::limits::ReqLimits::body_size).
    BodyTooLarge,

    Io(IoError),
}

impl ErrorKind {
    /// Status code used to answer a request that failed with this error.
    #[inline]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequestLine
            | Self::UnsupportedMethod
            | Self::InvalidHeader
            | Self::InvalidContentLength
            | Self::InvalidEncoding
            | Self::UnexpectedEof => StatusCode::BadRequest,
            Self::HeadTooLarge | Self::TooManyHeaders => StatusCode::RequestHeaderFieldsTooLarge,
            Self::BodyTooLarge => StatusCode::RequestEntityTooLarge,
            Self::Io(_) => StatusCode::InternalServerError,
        }
    }
}

impl error::Error for ErrorKind {}
impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequestLine => f.write_str("malformed request line"),
            Self::UnsupportedMethod => f.write_str("unsupported method"),
            Self::InvalidHeader => f.write_str("malformed header line"),
            Self::InvalidContentLength => f.write_str("invalid Content-Length"),
            Self::InvalidEncoding => f.write_str("request head is not UTF-8"),
            Self::UnexpectedEof => f.write_str("connection closed mid-request"),
            Self::HeadTooLarge => f.write_str("request head too large"),
            Self::TooManyHeaders => f.write_str("too many headers"),
            Self::BodyTooLarge => f.write_str("request body too large"),
            Self::Io(e) => write!(f, "io: {}", e.0),
        }
    }
}

impl From<io::Error> for ErrorKind {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => ErrorKind::UnexpectedEof,
            _ => ErrorKind::Io(IoError(err)),
        }
    }
}

#[derive(Debug)]
pub struct IoError(pub(crate) io::Error);

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

//

/// Rejected route registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Every route URI must start with `/`.
    MissingLeadingSlash(String),
}

impl error::Error for RouteError {}
impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLeadingSlash(uri) => {
                write!(f, "API endpoint should start with '/', '{uri}' was given")
            }
        }
    }
}

//

/// Failures of an upgraded WebSocket connection.
///
/// All of them end the read loop; the socket is closed afterwards.
#[derive(Debug)]
pub enum WsError {
    /// The peer sent an opcode other than continuation, text or close.
    UnsupportedOpcode(u8),
    /// A client frame carrying payload was not masked.
    NotMasked,
    /// The assembled message exceeds [`WsLimits::max_message_size`](crate::limits::WsLimits::max_message_size).
    MessageTooLarge(u64),
    Io(io::Error),
}

impl error::Error for WsError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedOpcode(opcode) => write!(f, "opcode {opcode} not supported"),
            Self::NotMasked => f.write_str("client frame is not masked"),
            Self::MessageTooLarge(len) => write!(f, "message of {len} bytes exceeds the limit"),
            Self::Io(e) => write!(f, "io: {e}"),
        }
    }
}

impl From<io::Error> for WsError {
    fn from(err: io::Error) -> Self {
        WsError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        #[rustfmt::skip]
        let cases = [
            (ErrorKind::InvalidRequestLine,   400),
            (ErrorKind::UnsupportedMethod,    400),
            (ErrorKind::InvalidHeader,        400),
            (ErrorKind::InvalidContentLength, 400),
            (ErrorKind::InvalidEncoding,      400),
            (ErrorKind::UnexpectedEof,        400),
            (ErrorKind::HeadTooLarge,         431),
            (ErrorKind::TooManyHeaders,       431),
            (ErrorKind::BodyTooLarge,         413),
        ];

        for (kind, code) in cases {
            assert_eq!(kind.status().as_u16(), code, "{kind}");
        }
    }

    #[test]
    fn eof_is_a_parse_error() {
        let err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert_eq!(ErrorKind::from(err), ErrorKind::UnexpectedEof);

        let err = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(ErrorKind::from(err), ErrorKind::Io(_)));
    }

    #[test]
    fn route_error_message() {
        let err = RouteError::MissingLeadingSlash("users".into());
        assert_eq!(
            err.to_string(),
            "API endpoint should start with '/', 'users' was given"
        );
    }
}
