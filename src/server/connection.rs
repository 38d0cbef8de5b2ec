use crate::{
    errors::ErrorKind,
    http::{
        request::{Parser, Request},
        response::Response,
    },
    limits::{ConnLimits, ReqLimits, WsLimits},
    routing::router::Router,
    server::server_impl::AllLimits,
    websocket::socket::{Liveness, WebSocket},
    StatusCode,
};
use std::{io, net::SocketAddr, sync::Arc};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Serves accepted connections one at a time.
///
/// Every connection gets exactly one request/response cycle. The
/// connection is then closed, unless the response completed a WebSocket
/// handshake, in which case the same task runs the WebSocket session.
pub(crate) struct HttpConnection {
    router: Arc<Router>,
    parser: Parser,

    conn_limits: ConnLimits,
    req_limits: ReqLimits,
    ws_limits: WsLimits,
}

impl HttpConnection {
    #[inline]
    pub(crate) fn new(router: Arc<Router>, limits: AllLimits) -> Self {
        let (_, conn_limits, req_limits, ws_limits) = limits;

        Self {
            router,
            parser: Parser::new(&req_limits),

            conn_limits,
            req_limits,
            ws_limits,
        }
    }

    pub(crate) async fn run<S>(&mut self, stream: &mut S, peer: SocketAddr) -> Result<(), io::Error>
    where
        S: AsyncRead + AsyncWrite + Liveness + Unpin,
    {
        self.parser = Parser::new(&self.req_limits);

        let parsed = self
            .parser
            .read_request(stream, &self.req_limits, self.conn_limits.socket_read_timeout)
            .await;

        let (request, mut response) = match parsed {
            Ok(Some(request)) => (Some(request), Response::new()),
            Ok(None) => return Ok(()),
            Err(ErrorKind::Io(err)) => return Err(err.0),
            Err(err) => {
                debug!(%peer, error = %err, "request rejected");
                (None, Response::with_status(err.status()))
            }
        };

        let upgrade = match &request {
            Some(request) => self.router.handle(request, &mut response),
            None => None,
        };

        access_log(peer, request.as_ref(), &response);

        let hooks = self.router.hooks();
        hooks.before_send(request.as_ref(), &mut response);
        write_bytes(stream, &response.build(), &self.conn_limits).await?;
        hooks.after_send(request.as_ref(), &response);

        let upgrade = upgrade
            .filter(|_| response.status() == StatusCode::SwitchingProtocols && response.is_keep_open());

        match upgrade {
            Some(factory) => {
                debug!(%peer, "connection upgraded to WebSocket");

                let mut handler = factory();
                let mut ws = WebSocket::new(
                    stream,
                    self.parser.take_leftover(),
                    &self.ws_limits,
                    self.conn_limits.socket_write_timeout,
                );

                let _ = ws.run(handler.as_mut()).await;
                debug!(%peer, peer_closed = ws.peer_closed(), "WebSocket session ended");
                Ok(())
            }
            None => stream.shutdown().await,
        }
    }
}

#[inline]
fn access_log(peer: SocketAddr, request: Option<&Request>, response: &Response) {
    let status = response.status().as_u16();

    match request {
        Some(req) => info!("{peer} - {}: {} {status}", req.method(), req.path()),
        None => info!("{peer} - {status}"),
    }
}

#[inline]
pub(crate) async fn write_bytes<S>(stream: &mut S, bytes: &[u8], limits: &ConnLimits) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let write = async {
        stream.write_all(bytes).await?;
        stream.flush().await
    };

    tokio::time::timeout(limits.socket_write_timeout, write).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Flow, Outbox, WebSocketHandler};
    use std::{sync::Mutex, time::Duration};
    use tokio::io::{duplex, AsyncReadExt};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Shout;

    impl WebSocketHandler for Shout {
        fn received_message(&mut self, ws: &mut Outbox, message: Vec<u8>) {
            ws.send_text(String::from_utf8_lossy(&message).to_uppercase());
        }
    }

    fn router(log: &Log) -> Arc<Router> {
        let mut builder = Router::builder();
        builder
            .get("/hello/:name", |_: &Request, resp: &mut Response, args: &[&str]| {
                resp.set_body(format!("hello {}", args[0]));
            })
            .unwrap()
            .get_ws("/shout", |_: &Request, _: &mut Response, _: &[&str]| {}, || Shout)
            .unwrap();

        let before = Arc::clone(log);
        builder.before_sending_response(move |req: Option<&Request>, resp: &mut Response| {
            resp.set_header("Server", "spindle");
            before.lock().unwrap().push(format!("before {}", req.is_some()));
        });

        let after = Arc::clone(log);
        builder.after_sending_response(move |_: Option<&Request>, resp: &Response| {
            after.lock().unwrap().push(format!("after {}", resp.status().as_u16()));
        });

        builder.after_parsing_request(|req: &Request, resp: &mut Response| {
            match req.header("X-Block") {
                Some(_) => {
                    resp.set_status(403);
                    Flow::Stop
                }
                None => Flow::Continue,
            }
        });

        Arc::new(builder.build())
    }

    fn connection(router: Arc<Router>) -> HttpConnection {
        let limits = (
            Default::default(),
            ConnLimits {
                socket_read_timeout: Duration::from_millis(200),
                ..ConnLimits::default()
            },
            Default::default(),
            Default::default(),
        );

        HttpConnection::new(router, limits)
    }

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 4000))
    }

    /// Sends `input`, ends the client's write side and collects the answer.
    async fn exchange(router: Arc<Router>, input: &[u8]) -> (Result<(), io::Error>, Vec<u8>) {
        let (mut server, mut client) = duplex(1 << 16);
        client.write_all(input).await.unwrap();
        client.shutdown().await.unwrap();

        let result = connection(router).run(&mut server, peer()).await;
        drop(server);

        let mut output = Vec::new();
        client.read_to_end(&mut output).await.unwrap();

        (result, output)
    }

    fn text(output: &[u8]) -> &str {
        std::str::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn one_request_per_connection() {
        let log = Log::default();
        let (result, output) = exchange(
            router(&log),
            b"GET /api/hello/world HTTP/1.1\r\nHost: x\r\n\r\nGET /api/hello/again HTTP/1.1\r\n\r\n",
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(
            text(&output),
            "HTTP/1.1 200 OK\r\n\
             Content-Length: 11\r\n\
             Server: spindle\r\n\
             \r\n\
             hello world"
        );
        assert_eq!(*log.lock().unwrap(), ["before true", "after 200"]);
    }

    #[tokio::test]
    async fn parse_errors_are_answered() {
        #[rustfmt::skip]
        let cases: [(&[u8], &str); 4] = [
            (b"GET /api/hello/x\r\n\r\n",                             "400 Bad Request"),
            (b"BREW /api/hello/x HTTP/1.1\r\n\r\n",                   "400 Bad Request"),
            (b"GET / HTTP/1.1\r\nBroken\r\n\r\n",                     "400 Bad Request"),
            (b"POST / HTTP/1.1\r\nContent-Length: 99999999\r\n\r\n",  "413 Request Entity Too Large"),
        ];

        for (input, status) in cases {
            let log = Log::default();
            let (result, output) = exchange(router(&log), input).await;
            let output = text(&output);

            assert!(result.is_ok());
            assert!(output.starts_with(&format!("HTTP/1.1 {status}\r\n")), "{output:?}");
            assert!(output.contains("Server: spindle\r\n"));
            assert_eq!(
                *log.lock().unwrap(),
                ["before false".to_string(), format!("after {}", &status[..3])]
            );
        }
    }

    #[tokio::test]
    async fn closed_before_request() {
        let log = Log::default();
        let (result, output) = exchange(router(&log), b"").await;

        assert!(result.is_ok());
        assert!(output.is_empty());
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stalled_request_times_out() {
        let log = Log::default();
        let (mut server, mut client) = duplex(1 << 16);
        client.write_all(b"GET /api/hello/x HTTP/1.1\r\n").await.unwrap();

        let result = connection(router(&log)).run(&mut server, peer()).await;

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::TimedOut);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stopped_request_still_sent() {
        let log = Log::default();
        let (_, output) = exchange(
            router(&log),
            b"GET /api/hello/x HTTP/1.1\r\nX-Block: 1\r\n\r\n",
        )
        .await;

        assert!(text(&output).starts_with("HTTP/1.1 403 Forbidden\r\n"));
        assert_eq!(*log.lock().unwrap(), ["before true", "after 403"]);
    }

    #[tokio::test]
    async fn upgrade_hands_over_leftover() {
        let log = Log::default();

        let mut input = b"GET /api/shout HTTP/1.1\r\n\
            Upgrade: websocket\r\n\
            Connection: Upgrade\r\n\
            Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n"
            .to_vec();
        // Masked "hi" sent together with the handshake, then a close frame
        input.extend_from_slice(&[0x81, 0x82, 1, 2, 3, 4, b'h' ^ 1, b'i' ^ 2]);
        input.extend_from_slice(&[0x88, 0x80, 1, 2, 3, 4]);

        let (result, output) = exchange(router(&log), &input).await;
        assert!(result.is_ok());

        let head_end = output.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        let head = text(&output[..head_end]);

        assert!(head.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(head.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
        assert_eq!(output[head_end..], [0x81, 2, b'H', b'I']);
        assert_eq!(*log.lock().unwrap(), ["before true", "after 101"]);
    }
}
