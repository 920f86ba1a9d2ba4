//! The router: route table, groups and the dispatch entry point.
//!
//! A [`Router`] is built mutably at startup and then frozen behind an `Arc`
//! by the server. Serving a request only reads it, so any number of requests
//! can be dispatched at once without locks.
//!
//! Every router starts with a root group whose prefix is empty. Calls on the
//! router itself (`middleware`, `get`, …) act on that root group; calls on a
//! [`RouterGroup`] act on the group and see its prefix prepended.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use tracing::debug;

use crate::context::Context;
use crate::error::RouteError;
use crate::group::{GroupId, GroupRegistry};
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::static_files::{FILEPATH, FileServer};
use crate::table::RouteTable;
use crate::template::HtmlRenderer;
use crate::trie::{RouteMatch, normalize_path};

/// Generates the per-method shortcuts on top of an `on` method.
macro_rules! method_shortcuts {
    ($($name:ident => $method:ident, $wire:literal;)*) => {
        $(
            #[doc = concat!("Registers a `", $wire, "` route. Shorthand for [`on`](Self::on).")]
            pub fn $name(
                &mut self,
                pattern: &str,
                handler: impl Handler,
            ) -> Result<&mut Self, RouteError> {
                self.on(Method::$method, pattern, handler)
            }
        )*
    };
}

/// The application router.
///
/// ```rust
/// use weft::{Context, Router, StatusCode, middleware};
///
/// # fn main() -> Result<(), weft::RouteError> {
/// let mut app = Router::new();
/// app.middleware(middleware::recovery());
/// app.get("/user/:name", hello)?;
///
/// let mut api = app.group("/api");
/// api.middleware(|ctx: &mut Context| {
///     if ctx.header("authorization").is_none() {
///         ctx.abort(StatusCode::UNAUTHORIZED, "missing credentials");
///     }
/// });
/// api.get("/items/:id", hello)?;
/// # Ok(())
/// # }
///
/// fn hello(ctx: &mut Context) {
///     let name = ctx.param("name").unwrap_or("world").to_owned();
///     ctx.string(StatusCode::OK, format_args!("hello {name}\n"));
/// }
/// ```
pub struct Router {
    table: RouteTable,
    groups: GroupRegistry,
    root: GroupId,
    not_found: BoxedHandler,
    renderer: Option<Arc<dyn HtmlRenderer>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            table: RouteTable::default(),
            groups: GroupRegistry::new(),
            root: GroupId::ROOT,
            not_found: not_found.into_boxed_handler(),
            renderer: None,
        }
    }

    /// Handle to the root group.
    pub fn root(&mut self) -> RouterGroup<'_> {
        let id = self.root;
        RouterGroup { router: self, id }
    }

    /// Creates a child of the root group with the given prefix.
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        let id = self.groups.new_group(self.root, prefix);
        RouterGroup { router: self, id }
    }

    /// Handle to a group created earlier, by id. `None` if this router has
    /// no such group.
    pub fn group_at(&mut self, id: GroupId) -> Option<RouterGroup<'_>> {
        if !self.groups.contains(id) {
            return None;
        }
        Some(RouterGroup { router: self, id })
    }

    /// Absolute prefix of a group.
    pub fn prefix(&self, id: GroupId) -> &str {
        self.groups.prefix(id)
    }

    /// The group `id` was created from. `None` for the root.
    pub fn parent(&self, id: GroupId) -> Option<GroupId> {
        self.groups.parent(id)
    }

    /// Adds middleware to the root group, so it runs for every request,
    /// matched or not.
    pub fn middleware(&mut self, handler: impl Handler) -> &mut Self {
        self.groups.use_middleware(self.root, [handler.into_boxed_handler()]);
        self
    }

    /// Registers `handler` for `method` and `pattern`.
    ///
    /// `:name` captures one segment; a final `*name` captures the rest of the
    /// path. Runs of `/` in the pattern are collapsed. Registering the same
    /// method and pattern again replaces the earlier handler.
    pub fn on(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl Handler,
    ) -> Result<&mut Self, RouteError> {
        self.add_route(self.root, method, pattern, handler.into_boxed_handler())?;
        Ok(self)
    }

    method_shortcuts! {
        get     => Get,     "GET";
        post    => Post,    "POST";
        put     => Put,     "PUT";
        delete  => Delete,  "DELETE";
        patch   => Patch,   "PATCH";
        head    => Head,    "HEAD";
        options => Options, "OPTIONS";
    }

    /// Serves files below `root` at `GET relative/*filepath`.
    pub fn static_files(
        &mut self,
        relative: &str,
        root: impl Into<PathBuf>,
    ) -> Result<&mut Self, RouteError> {
        self.add_static(self.root, relative, root.into())?;
        Ok(self)
    }

    /// Sets the renderer used by [`Context::html`].
    pub fn html_renderer(&mut self, renderer: impl HtmlRenderer) -> &mut Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    /// Looks up the route a request would reach, without running anything.
    pub fn resolve(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        self.table.resolve(method, path)
    }

    /// Dispatches one request and returns the response the chain wrote.
    ///
    /// The chain is every matching group's middleware followed by the route
    /// handler, or by a `404` handler when no route matches. A method outside
    /// RFC 9110 has no routes, so it is an ordinary miss.
    pub fn handle(&self, req: http::Request<Bytes>) -> Response {
        let (parts, body) = req.into_parts();
        let path = normalize_path(parts.uri.path()).into_owned();
        let mut handlers = self.groups.middlewares_for(&path);
        let matched = Method::try_from(&parts.method)
            .ok()
            .and_then(|method| self.table.resolve(method, &path));
        let (pattern, params) = match matched {
            Some(matched) => {
                let (pattern, handler, params) = matched.into_parts();
                handlers.push(Arc::clone(handler));
                (Some(pattern.to_owned()), params)
            }
            None => {
                debug!(method = %parts.method, %path, "no route");
                handlers.push(Arc::clone(&self.not_found));
                (None, HashMap::new())
            }
        };

        let request = Request::new(parts.method, parts.uri, parts.headers, body);
        let mut ctx = Context::new(request, path, pattern, params, handlers, self.renderer.clone());
        ctx.next();
        ctx.into_response()
    }

    fn add_route(
        &mut self,
        group: GroupId,
        method: Method,
        pattern: &str,
        handler: BoxedHandler,
    ) -> Result<(), RouteError> {
        let full = format!("{}{pattern}", self.groups.prefix(group));
        self.table.add_route(method, &full, handler)
    }

    fn add_static(&mut self, group: GroupId, relative: &str, root: PathBuf) -> Result<(), RouteError> {
        let files = FileServer::new(root);
        let pattern = format!("{relative}/*{FILEPATH}");
        self.add_route(group, Method::Get, &pattern, (move |ctx: &mut Context| files.serve(ctx)).into_boxed_handler())
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

fn not_found(ctx: &mut Context) {
    let path = ctx.path().to_owned();
    ctx.string(StatusCode::NOT_FOUND, format_args!("404 NOT FOUND: {path}\n"));
}

/// A group being configured. Borrowed from its [`Router`].
///
/// Routes registered here are prefixed with the group's prefix; middleware
/// added here runs for every request whose path starts with that prefix.
pub struct RouterGroup<'r> {
    router: &'r mut Router,
    id: GroupId,
}

impl RouterGroup<'_> {
    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn prefix(&self) -> &str {
        self.router.groups.prefix(self.id)
    }

    /// Creates a nested group with prefix `self.prefix() + suffix`.
    pub fn group(&mut self, suffix: &str) -> RouterGroup<'_> {
        let id = self.router.groups.new_group(self.id, suffix);
        RouterGroup { router: &mut *self.router, id }
    }

    /// Appends middleware to this group. Order of calls is kept.
    pub fn middleware(&mut self, handler: impl Handler) -> &mut Self {
        self.router.groups.use_middleware(self.id, [handler.into_boxed_handler()]);
        self
    }

    /// Registers `handler` for `method` at `self.prefix() + pattern`.
    pub fn on(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl Handler,
    ) -> Result<&mut Self, RouteError> {
        self.router.add_route(self.id, method, pattern, handler.into_boxed_handler())?;
        Ok(self)
    }

    method_shortcuts! {
        get     => Get,     "GET";
        post    => Post,    "POST";
        put     => Put,     "PUT";
        delete  => Delete,  "DELETE";
        patch   => Patch,   "PATCH";
        head    => Head,    "HEAD";
        options => Options, "OPTIONS";
    }

    /// Serves files below `root` at `GET self.prefix() + relative/*filepath`.
    pub fn static_files(
        &mut self,
        relative: &str,
        root: impl Into<PathBuf>,
    ) -> Result<&mut Self, RouteError> {
        self.router.add_static(self.id, relative, root.into())?;
        Ok(self)
    }
}
