//! Server, connection, request and WebSocket limits
//!
//! # Security-First Defaults
//!
//! Default limits are intentionally conservative to prevent:
//! - Resource exhaustion attacks
//! - Slowloris attacks
//! - Header flooding
//! - Unbounded WebSocket message assembly
//!
//! # Examples
//!
//! ```no_run
//! use spindle::{Router, Server, limits::{ConnLimits, ReqLimits, ServerLimits}};
//! use tokio::net::TcpListener;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::builder().build();
//!
//!     Server::builder()
//!         .listener(TcpListener::bind("127.0.0.1:8080").await.unwrap())
//!         .router(router)
//!         .server_limits(ServerLimits {
//!             max_connections: 500,
//!             ..ServerLimits::default()
//!         })
//!         .connection_limits(ConnLimits {
//!             socket_read_timeout: Duration::from_secs(5),
//!             ..ConnLimits::default()
//!         })
//!         .request_limits(ReqLimits {
//!             header_count: 48,
//!             body_size: 256 * 1024,
//!             ..ReqLimits::default()
//!         })
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```

use std::time::Duration;

/// Controls server-level concurrency and queueing.
///
/// # Connection management
/// ```text
///                            [------------]
///                            [ Tcp accept ]
///                            [------------]
///                                  ||
///                                  || TCP_STREAM
///                                  \/
/// [--------------]   Yes   /----------------\   No   [-------------]
/// [ Add to queue ] <====== | Is there room? | =====> [ Sending 503 ]
/// [--------------]         \----------------/        [-------------]
///        ||
///        \==================\\          //====================\
///                            V          V                    ||
/// [--------]   Yes   /-------------------------\   No   [------]
/// [ Worker ] <====== | Is there a free worker? | =====> [ Wait ]
/// [--------]         \-------------------------/        [------]
/// ```
///
/// Workers are long-running tasks spawned once at launch. Each one takes a
/// connection from the queue and runs its request cycle (and, after an
/// upgrade, its WebSocket session) to completion before taking the next.
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Number of worker tasks, i.e. connections served at once (default: `100`).
    ///
    /// An upgraded WebSocket keeps its worker for the whole session.
    pub max_connections: usize,

    /// Maximum number of accepted connections waiting for a worker (default: `250`).
    ///
    /// When the queue is full, new connections receive an immediate
    /// `503 Service Unavailable`.
    pub max_pending_connections: usize,

    /// How idle workers wait for the queue (default: `Sleep(50µs)`).
    pub wait_strategy: WaitStrategy,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            max_connections: 100,
            max_pending_connections: 250,
            wait_strategy: WaitStrategy::Sleep(Duration::from_micros(50)),

            _priv: (),
        }
    }
}

/// Strategy for worker task waiting when no connections are available
#[derive(Debug, Clone)]
pub enum WaitStrategy {
    /// While waiting, uses [`tokio::task::yield_now()`]
    ///
    /// Keeps latency minimal at the cost of a busy CPU.
    Yield,

    /// While waiting, uses [`tokio::time::sleep()`]
    Sleep(Duration),
}

/// Connection-level timeouts
///
/// Both timeouts apply to the HTTP part of a connection. Once a connection is
/// upgraded to a WebSocket, reads wait indefinitely for the next frame and
/// only [`socket_write_timeout`](Self::socket_write_timeout) keeps bounding
/// outgoing frames until the socket is closed.
#[derive(Debug, Clone)]
pub struct ConnLimits {
    /// Maximum duration to wait for request bytes (default: `2 seconds`)
    ///
    /// A stalled request is dropped without a response.
    pub socket_read_timeout: Duration,

    /// Maximum duration of a single write (default: `3 seconds`)
    pub socket_write_timeout: Duration,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ConnLimits {
    #[inline(always)]
    fn default() -> Self {
        Self {
            socket_read_timeout: Duration::from_secs(2),
            socket_write_timeout: Duration::from_secs(3),

            _priv: (),
        }
    }
}

/// HTTP request parsing limits
///
/// 🔧 **You MAY need to increase these if you see:**
/// - `413 Request Entity Too Large` for legitimate requests
/// - `431 Request Header Fields Too Large`
#[derive(Debug, Clone)]
pub struct ReqLimits {
    /// Maximum size of the request line plus all header lines, including the
    /// terminating empty line (default: `8 KB`)
    pub head_size: usize,

    /// Maximum number of header lines per request (default: `32`)
    ///
    /// Duplicate names count once per line, even though only the last value
    /// is kept.
    pub header_count: usize,

    /// Maximum value accepted in `Content-Length` (default: `64 KB`)
    pub body_size: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ReqLimits {
    fn default() -> Self {
        Self {
            head_size: 8 * 1024,
            header_count: 32,
            body_size: 64 * 1024,

            _priv: (),
        }
    }
}

/// WebSocket framing limits
#[derive(Debug, Clone)]
pub struct WsLimits {
    /// Largest payload put in a single outgoing frame (default: `1 MB`)
    ///
    /// Longer messages are fragmented into continuation frames.
    pub max_chunk_size: usize,

    /// Largest message assembled from incoming frames (default: `16 MB`)
    ///
    /// A peer announcing more is treated as a protocol violation and the
    /// socket is closed.
    pub max_message_size: u64,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for WsLimits {
    fn default() -> Self {
        Self {
            max_chunk_size: 1024 * 1024,
            max_message_size: 16 * 1024 * 1024,

            _priv: (),
        }
    }
}
