//! # weft
//!
//! A request router with grouped middleware and a cooperative handler chain.
//!
//! ## The model
//!
//! - **Routes** live in one segment trie per HTTP method. Patterns use
//!   `:name` for a single segment and a trailing `*name` for the rest of the
//!   path. Static segments win over parameters, parameters over wildcards.
//! - **Groups** are path prefixes with their own middleware. A request runs
//!   the middleware of every group whose prefix starts its path, outermost
//!   group first, then the route handler.
//! - **Handlers** are plain `fn(&mut Context)`. Middleware wraps the rest of
//!   the chain by calling [`Context::next`] and stops it with
//!   [`Context::abort`].
//!
//! Everything is registered up front. Once the router is handed to the
//! [`Server`] it is shared read-only across all requests.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use weft::{Context, Router, Server, StatusCode, middleware};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), weft::Error> {
//!     let mut app = Router::new();
//!     app.middleware(middleware::logger())
//!         .middleware(middleware::recovery());
//!     app.get("/user/:name", greet)?
//!         .static_files("/assets", "./public")?;
//!
//!     let mut v1 = app.group("/v1");
//!     v1.middleware(require_token);
//!     v1.post("/items", create_item)?;
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! fn greet(ctx: &mut Context) {
//!     let name = ctx.param("name").unwrap_or_default().to_owned();
//!     ctx.string(StatusCode::OK, format_args!("hello {name}\n"));
//! }
//!
//! fn require_token(ctx: &mut Context) {
//!     if ctx.header("authorization").is_none() {
//!         ctx.abort(StatusCode::UNAUTHORIZED, "missing token");
//!     }
//! }
//!
//! fn create_item(ctx: &mut Context) {
//!     ctx.json(StatusCode::CREATED, &serde_json::json!({ "ok": true }));
//! }
//! ```

mod context;
mod error;
mod group;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod static_files;
mod table;
mod template;
mod trie;

pub mod middleware;

pub use context::Context;
pub use error::{Error, RouteError, TemplateError};
pub use group::GroupId;
pub use handler::Handler;
pub use method::{Method, UnknownMethod};
pub use request::Request;
pub use response::{ContentType, Response};
pub use router::{Router, RouterGroup};
pub use server::Server;
pub use template::HtmlRenderer;
pub use trie::{RouteMatch, normalize_path};

pub use http::StatusCode;
