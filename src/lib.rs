//! spindle - minimal HTTP/1.1 engine with a hook-driven router and
//! RFC 6455 WebSocket framing
//!
//! Each accepted connection carries exactly one request/response cycle:
//!
//! ```text
//! bytes ──> Parser ──> Request ──> Router (hooks around dispatch) ──> Response ──> bytes
//!                                     │
//!                                     └── upgrade route ──> 101 ──> WebSocket read loop
//! ```
//!
//! # Features
//!
//! - **Request parsing** - request line, headers (case-insensitive, last
//!   write wins) and a `Content-Length` body, with size and time limits
//! - **Responses** - reason-phrase table, insertion-ordered headers,
//!   automatic `Content-Length`, `204`/`200` body rules
//! - **Routing** - static routes, `:name` variables, `405` with `Allow`,
//!   files served outside the API prefix
//! - **Hooks** - after parsing (may stop dispatch), before and after sending
//! - **WebSocket** - handshake, masked frame decoding, fragmented sending,
//!   liveness probe before every read
//!
//! # Examples
//!
//! ```no_run
//! use spindle::{Flow, Outbox, Request, Response, Router, Server, WebSocketHandler};
//! use tokio::net::TcpListener;
//!
//! struct Echo;
//!
//! impl WebSocketHandler for Echo {
//!     fn received_message(&mut self, ws: &mut Outbox, message: Vec<u8>) {
//!         ws.send_binary(message);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut router = Router::builder();
//!     router
//!         .get("/users/:id", |_: &Request, resp: &mut Response, args: &[&str]| {
//!             resp.set_header("Content-Type", "text/plain")
//!                 .set_body(format!("user #{}", args[0]));
//!         })
//!         .unwrap()
//!         .get_ws("/echo", |_: &Request, _: &mut Response, _: &[&str]| {}, || Echo)
//!         .unwrap()
//!         .after_parsing_request(|req: &Request, resp: &mut Response| {
//!             if req.path().contains("..") {
//!                 resp.set_status(400);
//!                 return Flow::Stop;
//!             }
//!             Flow::Continue
//!         });
//!
//!     Server::builder()
//!         .listener(TcpListener::bind("127.0.0.1:8080").await.unwrap())
//!         .router(router.build())
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```
//!
//! Loading the API prefix and the app folder from a file:
//! ```no_run
//! use spindle::{config::Config, Router};
//!
//! let config = Config::load("spindle.toml").unwrap();
//!
//! let mut router = Router::builder();
//! router.config(config).unwrap();
//! let router = router.build();
//! ```
//!
//! # Logging
//!
//! Events are emitted through [`tracing`]: one `INFO` line per answered
//! request (`peer - METHOD: path status`), `DEBUG` for upgrades and
//! rejected requests, `WARN` for WebSocket protocol violations. No
//! subscriber is installed by the crate.

pub(crate) mod http {
    pub mod query;
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod routing {
    pub(crate) mod hooks;
    pub(crate) mod pattern;
    pub(crate) mod router;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod server_impl;
}
pub(crate) mod websocket {
    pub(crate) mod frame;
    pub(crate) mod handshake;
    pub(crate) mod socket;
}
pub mod config;
pub(crate) mod errors;
pub mod files;
pub mod limits;

pub use crate::{
    config::ConfigError,
    errors::{ErrorKind, RouteError, WsError},
    http::{
        query,
        request::Request,
        response::Response,
        types::{Headers, Method, StatusCode},
    },
    routing::{
        hooks::Flow,
        router::{Router, RouterBuilder, Upgrade},
    },
    server::server_impl::{Server, ServerBuilder},
    websocket::{
        handshake::accept_key,
        socket::{Liveness, Outbox, WebSocketHandler},
    },
};
