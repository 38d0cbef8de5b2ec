//! Upgraded connections.
//!
//! After the `101` response is written, the connection is driven by
//! [`WebSocket::run`] until one side closes it:
//!
//! ```text
//! setup ──> flush ──> [ probe ──> read message ──> received_message ──> flush ]* ──> close
//! ```
//!
//! Frames queued in the [`Outbox`] are written after every callback. The
//! loop ends on a close frame, an end of stream, a protocol violation, a
//! failed write or a close requested by the handler.

use crate::{
    errors::WsError,
    limits::WsLimits,
    websocket::frame::{self, FrameHeader, MessageKind, Opcode, CLOSE_FRAME},
};
use socket2::SockRef;
use std::{
    future::poll_fn,
    io, mem,
    task::{Context, Poll},
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tracing::{debug, warn};

const READ_CHUNK: usize = 4096;

/// Application side of an upgraded connection.
///
/// A new handler is created by the route's factory for every upgraded
/// connection, so per-connection state can live in `self`.
///
/// # Examples
/// ```
/// use spindle::{Outbox, WebSocketHandler};
///
/// struct Echo;
///
/// impl WebSocketHandler for Echo {
///     fn setup(&mut self, ws: &mut Outbox) {
///         ws.send_text("connected");
///     }
///
///     fn received_message(&mut self, ws: &mut Outbox, message: Vec<u8>) {
///         if message == b"bye" {
///             ws.close();
///         } else {
///             ws.send_binary(message);
///         }
///     }
/// }
/// ```
pub trait WebSocketHandler: Send {
    /// Called once, after the handshake response has been sent.
    fn setup(&mut self, _ws: &mut Outbox) {}

    /// Called with every complete message received from the peer.
    fn received_message(&mut self, ws: &mut Outbox, message: Vec<u8>);
}

/// Messages queued by a [`WebSocketHandler`] callback.
#[derive(Debug)]
pub struct Outbox {
    pending: Vec<u8>,
    max_chunk_size: usize,
    closing: bool,
}

impl Outbox {
    #[inline]
    pub(crate) fn new(limits: &WsLimits) -> Self {
        Outbox {
            pending: Vec::new(),
            max_chunk_size: limits.max_chunk_size,
            closing: false,
        }
    }

    /// Queues a text message.
    #[inline]
    pub fn send_text(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.push(MessageKind::Text, text.as_ref().as_bytes())
    }

    /// Queues a binary message.
    #[inline]
    pub fn send_binary(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        self.push(MessageKind::Binary, data.as_ref())
    }

    /// Closes the connection once the messages queued so far are written.
    /// Later messages are dropped.
    #[inline]
    pub fn close(&mut self) {
        self.closing = true;
    }

    #[inline(always)]
    pub fn is_closing(&self) -> bool {
        self.closing
    }

    fn push(&mut self, kind: MessageKind, payload: &[u8]) -> &mut Self {
        if !self.closing {
            frame::encode_message(kind, payload, self.max_chunk_size, &mut self.pending);
        }
        self
    }

    #[inline]
    fn take(&mut self) -> Vec<u8> {
        mem::take(&mut self.pending)
    }
}

/// Non-blocking check that the peer can still be written to.
///
/// `Poll::Pending` and errors both mean the connection is dead.
pub trait Liveness {
    fn poll_probe(&self, cx: &mut Context<'_>) -> Poll<io::Result<()>>;
}

impl Liveness for TcpStream {
    fn poll_probe(&self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match SockRef::from(self).take_error() {
            Ok(None) => self.poll_write_ready(cx),
            Ok(Some(err)) | Err(err) => Poll::Ready(Err(err)),
        }
    }
}

pub(crate) struct WebSocket<'s, S> {
    stream: &'s mut S,
    buffer: Vec<u8>,
    limits: WsLimits,
    write_timeout: Option<Duration>,
    peer_closed: bool,
}

impl<'s, S> WebSocket<'s, S>
where
    S: AsyncRead + AsyncWrite + Liveness + Unpin + 's,
{
    /// `leftover` holds bytes read past the handshake request; they are
    /// consumed before the stream is read again.
    pub(crate) fn new(
        stream: &'s mut S,
        leftover: Vec<u8>,
        limits: &WsLimits,
        write_timeout: Duration,
    ) -> Self {
        WebSocket {
            stream,
            buffer: leftover,
            limits: limits.clone(),
            write_timeout: Some(write_timeout),
            peer_closed: false,
        }
    }

    /// Whether the peer sent a close frame.
    #[inline(always)]
    pub(crate) fn peer_closed(&self) -> bool {
        self.peer_closed
    }

    /// Drives `handler` until the connection ends, then closes the socket.
    pub(crate) async fn run(&mut self, handler: &mut dyn WebSocketHandler) -> Result<(), WsError> {
        let mut outbox = Outbox::new(&self.limits);
        let result = self.serve(handler, &mut outbox).await;

        if let Err(err) = &result {
            warn!(error = %err, "WebSocket session failed");
        }

        self.close().await;
        result
    }

    async fn serve(
        &mut self,
        handler: &mut dyn WebSocketHandler,
        outbox: &mut Outbox,
    ) -> Result<(), WsError> {
        handler.setup(outbox);
        self.flush(outbox).await?;

        while !outbox.is_closing() {
            if !self.probe().await {
                debug!("WebSocket peer is unreachable");
                return Ok(());
            }

            let Some(message) = self.read_message().await? else {
                return Ok(());
            };

            handler.received_message(outbox, message);
            self.flush(outbox).await?;
        }

        Ok(())
    }

    /// Sends a close frame, unless the peer already did, and shuts the
    /// socket down. Failures are ignored.
    pub(crate) async fn close(&mut self) {
        self.write_timeout = None;

        if !self.peer_closed {
            let _ = Self::write_bytes(self.stream, &CLOSE_FRAME, self.write_timeout).await;
        }

        let _ = self.stream.shutdown().await;
    }

    async fn probe(&self) -> bool {
        poll_fn(|cx| match self.stream.poll_probe(cx) {
            Poll::Ready(Ok(())) => Poll::Ready(true),
            Poll::Ready(Err(err)) => {
                debug!(error = %err, "WebSocket probe failed");
                Poll::Ready(false)
            }
            Poll::Pending => Poll::Ready(false),
        })
        .await
    }

    /// Reads frames until one has `FIN` set and returns their joined payload.
    ///
    /// `Ok(None)` means the peer sent a close frame or ended the stream
    /// between messages.
    async fn read_message(&mut self) -> Result<Option<Vec<u8>>, WsError> {
        let mut message = Vec::new();

        loop {
            let header = loop {
                if let Some(header) = FrameHeader::decode(&self.buffer) {
                    break header;
                }

                if self.fill_buffer().await? == 0 {
                    return match self.buffer.is_empty() && message.is_empty() {
                        true => Ok(None),
                        false => Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
                    };
                }
            };

            match Opcode::from_u8(header.opcode) {
                Some(Opcode::Continuation | Opcode::Text) => {}
                Some(Opcode::Close) => {
                    debug!("WebSocket close frame received");
                    self.buffer.clear();
                    self.peer_closed = true;
                    return Ok(None);
                }
                _ => return Err(WsError::UnsupportedOpcode(header.opcode)),
            }

            if header.mask.is_none() && header.payload_len > 0 {
                return Err(WsError::NotMasked);
            }

            let size = (message.len() as u64).saturating_add(header.payload_len);
            if size > self.limits.max_message_size {
                return Err(WsError::MessageTooLarge(size));
            }

            let frame_len = usize::try_from(header.payload_len)
                .ok()
                .and_then(|len| len.checked_add(header.header_len))
                .ok_or(WsError::MessageTooLarge(size))?;
            while self.buffer.len() < frame_len {
                if self.fill_buffer().await? == 0 {
                    return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
                }
            }

            let start = message.len();
            message.extend_from_slice(&self.buffer[header.header_len..frame_len]);
            self.buffer.drain(..frame_len);

            if let Some(key) = header.mask {
                frame::unmask(&mut message[start..], key);
            }

            if header.fin {
                return Ok(Some(message));
            }
        }
    }

    #[inline]
    async fn fill_buffer(&mut self) -> io::Result<usize> {
        let mut chunk = [0; READ_CHUNK];
        let n = self.stream.read(&mut chunk).await?;

        self.buffer.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    async fn flush(&mut self, outbox: &mut Outbox) -> Result<(), WsError> {
        let pending = outbox.take();

        if !pending.is_empty() {
            Self::write_bytes(self.stream, &pending, self.write_timeout).await?;
        }
        Ok(())
    }

    async fn write_bytes(stream: &mut S, bytes: &[u8], time: Option<Duration>) -> io::Result<()> {
        let write = async {
            stream.write_all(bytes).await?;
            stream.flush().await
        };

        match time {
            Some(time) => timeout(time, write).await?,
            None => write.await,
        }
    }
}

#[cfg(test)]
impl Liveness for tokio::io::DuplexStream {
    fn poll_probe(&self, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
