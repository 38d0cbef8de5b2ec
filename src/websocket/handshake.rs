//! Server side of the RFC 6455 opening handshake.

use crate::{Request, Response, StatusCode};
use base64::prelude::*;
use sha1::{Digest, Sha1};

const GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Derives the `Sec-WebSocket-Accept` value for a `Sec-WebSocket-Key`.
///
/// ```
/// assert_eq!(
///     spindle::accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
///     "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=",
/// );
/// ```
pub fn accept_key(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(GUID);

    BASE64_STANDARD.encode(&sha1.finalize()[..])
}

/// Turns `resp` into the `101 Switching Protocols` answer to `req`.
///
/// Returns `false` and answers `400 Bad Request` when the request has no
/// `Sec-WebSocket-Key`; the connection is then not upgraded.
pub(crate) fn prepare(req: &Request, resp: &mut Response) -> bool {
    let Some(key) = req.header("Sec-WebSocket-Key").map(str::trim) else {
        resp.set_status_code(StatusCode::BadRequest)
            .set_body("Missing Sec-WebSocket-Key header");
        return false;
    };

    resp.set_status_code(StatusCode::SwitchingProtocols)
        .clear_body()
        .set_header("Upgrade", "websocket")
        .set_header("Connection", "Upgrade")
        .set_header("Sec-WebSocket-Accept", accept_key(key))
        .keep_open();

    true
}
