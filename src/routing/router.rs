//! Endpoint registry and request dispatch.
//!
//! A [`Router`] is assembled once with a [`RouterBuilder`] and is read-only
//! afterwards; every connection shares it through an `Arc`.
//!
//! # Dispatch
//!
//! ```text
//!                          [ after-parse hooks ] ── Flow::Stop ──> (send as is)
//!                                    ||
//!                 path under the API prefix?
//!                 /                          \
//!               yes                           no
//!                ||                           ||
//!   [ static exact match ]           [ GET / HEAD only ]
//!   [ dynamic, in order  ]           [ file lookup     ]
//!     |       |        |               |           |
//!    hit   no method  miss           found       missing
//!     |      405      404          200 + body      404
//!   endpoint (+ upgrade)
//! ```

use crate::{
    config::{Config, ConfigError},
    errors::RouteError,
    files::{AppFolder, FileLookup},
    http::types::Method,
    routing::{
        hooks::{Flow, Hooks},
        pattern::Pattern,
    },
    websocket::{handshake, socket::WebSocketHandler},
    Request, Response, StatusCode,
};
use std::{collections::HashMap, fmt, mem, sync::Arc};
use tracing::debug;

pub(crate) type Endpoint = Arc<dyn Fn(&Request, &mut Response, &[&str]) + Send + Sync>;

/// Creates the [`WebSocketHandler`] of an upgraded connection.
pub type Upgrade = Arc<dyn Fn() -> Box<dyn WebSocketHandler> + Send + Sync>;

struct MethodEntry {
    method: Method,
    endpoint: Endpoint,
    upgrade: Option<Upgrade>,
}

struct Resource {
    pattern: Pattern,
    methods: Vec<MethodEntry>,
}

impl Resource {
    #[inline]
    fn get(&self, method: Method) -> Option<&MethodEntry> {
        self.methods.iter().find(|entry| entry.method == method)
    }

    /// Value of the `Allow` header, in registration order.
    fn allow(&self) -> String {
        let methods: Vec<&str> = self.methods.iter().map(|e| e.method.as_str()).collect();
        methods.join(", ")
    }
}

/// Route table, hooks and file source shared by all connections.
///
/// # Examples
/// ```
/// use spindle::{Flow, Method, Request, Response, Router};
///
/// let mut builder = Router::builder();
/// builder
///     .get("/users/:id", |_: &Request, resp: &mut Response, args: &[&str]| {
///         resp.set_body(format!("user {}", args[0]));
///     })
///     .unwrap()
///     .register(Method::Post, "/users", |_: &Request, resp: &mut Response, _: &[&str]| {
///         resp.set_status(201);
///     }, None)
///     .unwrap()
///     .after_parsing_request(|req: &Request, resp: &mut Response| {
///         match req.header("Authorization") {
///             Some(_) => Flow::Continue,
///             None => {
///                 resp.set_status(401);
///                 Flow::Stop
///             }
///         }
///     });
///
/// let router = builder.build();
/// assert_eq!(router.api_uri(), "/api");
/// ```
pub struct Router {
    api_uri: String,
    statics: HashMap<String, Resource>,
    dynamics: Vec<Resource>,
    hooks: Hooks,
    files: Box<dyn FileLookup>,
}

impl Router {
    #[inline]
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Prefix separating API requests from file requests.
    #[inline(always)]
    pub fn api_uri(&self) -> &str {
        &self.api_uri
    }

    #[inline(always)]
    pub(crate) fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Runs the after-parse hooks and dispatches `req`.
    ///
    /// Returns the handler factory when the response is a completed
    /// WebSocket handshake.
    pub(crate) fn handle(&self, req: &Request, resp: &mut Response) -> Option<Upgrade> {
        if self.hooks.after_parse(req, resp) == Flow::Stop {
            debug!("request handling stopped by a hook");
            return None;
        }

        match self.api_path(req.path()) {
            Some(path) => self.handle_api(req, path, resp),
            None => {
                self.handle_file(req, resp);
                None
            }
        }
    }

    #[inline]
    fn api_path<'p>(&self, path: &'p str) -> Option<&'p str> {
        path.strip_prefix(self.api_uri.as_str())
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    fn handle_api(&self, req: &Request, path: &str, resp: &mut Response) -> Option<Upgrade> {
        let (resource, args) = match self.statics.get(path) {
            Some(resource) => (resource, Vec::new()),
            None => {
                let found = self
                    .dynamics
                    .iter()
                    .find_map(|r| r.pattern.matches(path).map(|args| (r, args)));

                match found {
                    Some(found) => found,
                    None => {
                        resp.set_status_code(StatusCode::NotFound);
                        return None;
                    }
                }
            }
        };

        let Some(entry) = resource.get(req.method()) else {
            resp.set_status_code(StatusCode::MethodNotAllowed)
                .set_header("Allow", resource.allow());
            return None;
        };

        (entry.endpoint)(req, resp, &args);

        let upgrade = entry.upgrade.as_ref()?;
        match handshake::prepare(req, resp) {
            true => Some(Arc::clone(upgrade)),
            false => None,
        }
    }

    fn handle_file(&self, req: &Request, resp: &mut Response) {
        if !matches!(req.method(), Method::Get | Method::Head) {
            resp.set_status_code(StatusCode::MethodNotAllowed)
                .set_header("Allow", "GET, HEAD");
            return;
        }

        let path = req.path().strip_prefix('/').unwrap_or(req.path());

        match self.files.lookup(path) {
            Ok(file) => {
                resp.set_body(file.contents)
                    .set_header("Content-Type", file.mime_type);
            }
            Err(err) => {
                debug!("file {path:?} not served: {err}");
                resp.set_status_code(StatusCode::NotFound);
            }
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut routes: Vec<&str> = self.statics.keys().map(String::as_str).collect();
        routes.sort_unstable();
        routes.extend(self.dynamics.iter().map(|r| r.pattern.as_str()));

        f.debug_struct("Router")
            .field("api_uri", &self.api_uri)
            .field("routes", &routes)
            .field("hooks", &self.hooks)
            .finish()
    }
}

//

macro_rules! method_helpers {
    ($($name:ident, $ws_name:ident => $method:expr;)*) => {$(
        #[doc = concat!("Registers a `", stringify!($name), "` endpoint; see [`register`](Self::register).")]
        #[inline]
        pub fn $name<E>(&mut self, uri: &str, endpoint: E) -> Result<&mut Self, RouteError>
        where
            E: Fn(&Request, &mut Response, &[&str]) + Send + Sync + 'static,
        {
            self.register($method, uri, endpoint, None)
        }

        #[doc = concat!(
            "Registers a `", stringify!($name), "` endpoint that upgrades the connection ",
            "to a WebSocket served by a handler from `factory`."
        )]
        #[inline]
        pub fn $ws_name<E, F, H>(&mut self, uri: &str, endpoint: E, factory: F) -> Result<&mut Self, RouteError>
        where
            E: Fn(&Request, &mut Response, &[&str]) + Send + Sync + 'static,
            F: Fn() -> H + Send + Sync + 'static,
            H: WebSocketHandler + 'static,
        {
            let upgrade: Upgrade = Arc::new(move || Box::new(factory()) as Box<dyn WebSocketHandler>);
            self.register($method, uri, endpoint, Some(upgrade))
        }
    )*};
}

/// Collects routes, hooks and the file source of a [`Router`].
///
/// A route URI must start with `/` and is relative to the API prefix.
/// Segments starting with `:` are variables; their values are passed to the
/// endpoint in pattern order.
pub struct RouterBuilder {
    api_uri: String,
    routes: Vec<Resource>,
    hooks: Hooks,
    files: Box<dyn FileLookup>,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        let config = Config::default();

        RouterBuilder {
            files: Box::new(AppFolder::new(config.app_folder, config.file_mappings)),
            api_uri: config.api_uri,
            routes: Vec::new(),
            hooks: Hooks::default(),
        }
    }
}

impl RouterBuilder {
    /// Registers `endpoint` for `method` on `uri`.
    ///
    /// Registering a method again on the same URI replaces the previous
    /// endpoint. With an `upgrade` factory, a successful call of the
    /// endpoint is followed by a WebSocket handshake.
    ///
    /// # Errors
    ///
    /// [`RouteError::MissingLeadingSlash`] when `uri` does not start with `/`.
    pub fn register<E>(
        &mut self,
        method: Method,
        uri: &str,
        endpoint: E,
        upgrade: Option<Upgrade>,
    ) -> Result<&mut Self, RouteError>
    where
        E: Fn(&Request, &mut Response, &[&str]) + Send + Sync + 'static,
    {
        if !uri.starts_with('/') {
            return Err(RouteError::MissingLeadingSlash(uri.to_string()));
        }

        let entry = MethodEntry {
            method,
            endpoint: Arc::new(endpoint),
            upgrade,
        };

        let index = match self.routes.iter().position(|r| r.pattern.as_str() == uri) {
            Some(index) => index,
            None => {
                let pattern = Pattern::compile(uri);
                let params: Vec<&str> = pattern.param_names().collect();
                debug!(uri, ?params, "route added");

                self.routes.push(Resource {
                    pattern,
                    methods: Vec::new(),
                });
                self.routes.len() - 1
            }
        };

        let methods = &mut self.routes[index].methods;
        match methods.iter_mut().find(|e| e.method == method) {
            Some(existing) => *existing = entry,
            None => methods.push(entry),
        }

        Ok(self)
    }

    method_helpers! {
        get, get_ws => Method::Get;
        post, post_ws => Method::Post;
        head, head_ws => Method::Head;
        put, put_ws => Method::Put;
        delete, delete_ws => Method::Delete;
        trace, trace_ws => Method::Trace;
        options, options_ws => Method::Options;
        connect, connect_ws => Method::Connect;
        patch, patch_ws => Method::Patch;
    }

    /// Adds a hook run after a request is parsed, before dispatch.
    ///
    /// Returning [`Flow::Stop`] skips the remaining after-parse hooks and
    /// the dispatch; the response is still sent.
    pub fn after_parsing_request<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> Flow + Send + Sync + 'static,
    {
        self.hooks.after_parse.push(Box::new(hook));
        self
    }

    /// Adds a hook run just before a response is serialized.
    ///
    /// The request is `None` when it could not be parsed.
    pub fn before_sending_response<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Option<&Request>, &mut Response) + Send + Sync + 'static,
    {
        self.hooks.before_send.push(Box::new(hook));
        self
    }

    /// Adds a hook run after a response is written.
    pub fn after_sending_response<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Option<&Request>, &Response) + Send + Sync + 'static,
    {
        self.hooks.after_send.push(Box::new(hook));
        self
    }

    /// Applies a validated [`Config`]: API prefix, app folder and file
    /// mappings.
    pub fn config(&mut self, config: Config) -> Result<&mut Self, ConfigError> {
        config.validate()?;

        self.api_uri = config.api_uri;
        self.files = Box::new(AppFolder::new(config.app_folder, config.file_mappings));
        Ok(self)
    }

    /// Replaces the source of files served outside the API prefix.
    pub fn files(&mut self, files: impl FileLookup) -> &mut Self {
        self.files = Box::new(files);
        self
    }

    /// Freezes the registered routes and hooks into a [`Router`].
    ///
    /// The builder is left empty with the default configuration.
    pub fn build(&mut self) -> Router {
        let RouterBuilder {
            api_uri,
            routes,
            hooks,
            files,
        } = mem::take(self);

        let mut statics = HashMap::new();
        let mut dynamics = Vec::new();

        for resource in routes {
            match resource.pattern.is_static() {
                true => {
                    statics.insert(resource.pattern.as_str().to_string(), resource);
                }
                false => dynamics.push(resource),
            }
        }

        Router {
            api_uri,
            statics,
            dynamics,
            hooks,
            files,
        }
    }
}
