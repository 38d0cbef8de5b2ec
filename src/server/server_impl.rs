use crate::{
    limits::{ConnLimits, ReqLimits, ServerLimits, WaitStrategy, WsLimits},
    routing::router::Router,
    server::connection::{write_bytes, HttpConnection},
    Response, StatusCode,
};
use crossbeam::queue::SegQueue;
use socket2::SockRef;
use std::{net::SocketAddr, sync::Arc};
use tokio::{
    net::{TcpListener, TcpStream},
    task::yield_now,
    time::sleep as tokio_sleep,
};
use tracing::{debug, info, warn};

/// An HTTP server answering one request per connection with a [`Router`].
///
/// Accepted connections are queued and served by a fixed pool of worker
/// tasks (see [`ServerLimits`]). Connections that do not fit in the queue
/// receive `503 Service Unavailable`.
///
/// # Examples
///
/// ```no_run
/// use spindle::{Request, Response, Router, Server};
/// use tokio::net::TcpListener;
///
/// #[tokio::main]
/// async fn main() {
///     let mut router = Router::builder();
///     router
///         .get("/hello/:name", |_: &Request, resp: &mut Response, args: &[&str]| {
///             resp.set_body(format!("Hello, {}!", args[0]));
///         })
///         .unwrap();
///
///     Server::builder()
///         .listener(TcpListener::bind("127.0.0.1:8080").await.unwrap())
///         .router(router.build())
///         .build()
///         .launch()
///         .await
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    stream_queue: TcpQueue,
    error_queue: TcpQueue,
    server_limits: ServerLimits,
}

impl Server {
    /// Creates a new builder for configuring the server instance.
    #[inline]
    pub fn builder() -> ServerBuilder {
        ServerBuilder {
            listener: None,
            router: None,

            server_limits: None,
            connection_limits: None,
            request_limits: None,
            ws_limits: None,
        }
    }

    /// Address the server accepts connections on.
    #[inline]
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever.
    ///
    /// Failed accepts are logged and skipped.
    #[inline]
    pub async fn launch(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, workers = self.server_limits.max_connections, "server started");
        }

        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(value) => value,
                Err(err) => {
                    warn!(error = %err, "accept failed");
                    continue;
                }
            };

            if let Err(err) = SockRef::from(&stream).set_tcp_nodelay(true) {
                debug!(%addr, error = %err, "TCP_NODELAY not set");
            }

            match self.stream_queue.len() < self.server_limits.max_pending_connections {
                true => self.stream_queue.push((stream, addr)),
                false => self.error_queue.push((stream, addr)),
            }
        }
    }

    #[inline]
    async fn get_stream(queue: &TcpQueue, wait: &WaitStrategy) -> (TcpStream, SocketAddr) {
        loop {
            if let Some(value) = queue.pop() {
                return value;
            }

            match wait {
                WaitStrategy::Yield => yield_now().await,
                WaitStrategy::Sleep(time) => tokio_sleep(*time).await,
            }
        }
    }
}

//

/// Builder for configuring and creating [`Server`] instances.
pub struct ServerBuilder {
    listener: Option<TcpListener>,
    router: Option<Arc<Router>>,

    server_limits: Option<ServerLimits>,
    connection_limits: Option<ConnLimits>,
    request_limits: Option<ReqLimits>,
    ws_limits: Option<WsLimits>,
}

impl ServerBuilder {
    /// Sets the TCP listener that the server will use to accept connections.
    ///
    /// **This is a required component.**
    #[inline(always)]
    pub fn listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Sets the router answering every request.
    ///
    /// **This is a required component.**
    #[inline(always)]
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(Arc::new(router));
        self
    }

    /// Configures the worker pool and the pending-connection queue.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # #[tokio::main]
    /// # async fn main() {
    /// use spindle::{Router, Server, limits::ServerLimits};
    /// use tokio::net::TcpListener;
    ///
    /// let server = Server::builder()
    ///     .listener(TcpListener::bind("127.0.0.1:8080").await.unwrap())
    ///     .router(Router::builder().build())
    ///     .server_limits(ServerLimits {
    ///         max_connections: 2500,
    ///         max_pending_connections: 10000,
    ///         ..ServerLimits::default()
    ///     })
    ///     .build();
    /// # }
    /// ```
    #[inline(always)]
    pub fn server_limits(mut self, limits: ServerLimits) -> Self {
        self.server_limits = Some(limits);
        self
    }

    /// Configures socket read and write timeouts.
    #[inline(always)]
    pub fn connection_limits(mut self, limits: ConnLimits) -> Self {
        self.connection_limits = Some(limits);
        self
    }

    /// Configures request head and body limits.
    #[inline(always)]
    pub fn request_limits(mut self, limits: ReqLimits) -> Self {
        self.request_limits = Some(limits);
        self
    }

    /// Configures WebSocket frame and message limits.
    #[inline(always)]
    pub fn ws_limits(mut self, limits: WsLimits) -> Self {
        self.ws_limits = Some(limits);
        self
    }

    /// Finalizes the builder, spawns the worker tasks and constructs a
    /// [`Server`] instance.
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when:
    /// - The `listener` method was not called.
    /// - The `router` method was not called.
    #[inline]
    #[track_caller]
    pub fn build(self) -> Server {
        let (listener, router, limits) = self.get_all_parts();

        let stream_queue = Arc::new(SegQueue::new());
        let error_queue = Arc::new(SegQueue::new());

        for _ in 0..limits.0.max_connections {
            Self::spawn_worker(&stream_queue, &limits, &router);
        }
        Self::spawn_alarmist(&error_queue, &limits);

        Server {
            listener,
            stream_queue,
            error_queue,
            server_limits: limits.0,
        }
    }

    #[inline]
    fn spawn_worker(queue: &TcpQueue, limits: &AllLimits, router: &Arc<Router>) {
        let queue = queue.clone();
        let wait = limits.0.wait_strategy.clone();
        let mut conn = HttpConnection::new(router.clone(), limits.clone());

        tokio::spawn(async move {
            loop {
                let (mut stream, addr) = Server::get_stream(&queue, &wait).await;

                if let Err(err) = conn.run(&mut stream, addr).await {
                    debug!(%addr, error = %err, "connection dropped");
                }
            }
        });
    }

    #[inline]
    fn spawn_alarmist(queue: &TcpQueue, limits: &AllLimits) {
        let queue = queue.clone();
        let (server_limits, conn_limits, ..) = limits.clone();
        let busy = Response::with_status(StatusCode::ServiceUnavailable).build();

        tokio::spawn(async move {
            loop {
                let (mut stream, addr) =
                    Server::get_stream(&queue, &server_limits.wait_strategy).await;

                warn!(%addr, "pending queue full, answering 503");
                let _ = write_bytes(&mut stream, &busy, &conn_limits).await;
            }
        });
    }

    #[inline]
    #[track_caller]
    fn get_all_parts(self) -> (TcpListener, Arc<Router>, AllLimits) {
        (
            self.listener
                .expect("The `listener` method must be called to create"),
            self.router
                .expect("The `router` method must be called to create"),
            (
                self.server_limits.unwrap_or_default(),
                self.connection_limits.unwrap_or_default(),
                self.request_limits.unwrap_or_default(),
                self.ws_limits.unwrap_or_default(),
            ),
        )
    }
}

type TcpQueue = Arc<SegQueue<(TcpStream, SocketAddr)>>;
pub(crate) type AllLimits = (ServerLimits, ConnLimits, ReqLimits, WsLimits);
