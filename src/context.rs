//! Per-request context and the cooperative handler chain.
//!
//! A [`Context`] is created for every request, owns that request's chain of
//! handlers (group middleware followed by the route handler), and is consumed
//! into a [`Response`] once the chain has run.
//!
//! # Chain execution
//!
//! The chain runs on one thread, one handler at a time. A handler gives
//! control to the rest of the chain by calling [`Context::next`]; when that
//! call returns, every downstream handler has finished and the caller can do
//! its post-processing:
//!
//! ```rust
//! use std::time::Instant;
//! use weft::Context;
//!
//! fn timing(ctx: &mut Context) {
//!     let started = Instant::now();
//!     ctx.next();
//!     let elapsed = started.elapsed();
//!     ctx.set_header("x-elapsed-us", &elapsed.as_micros().to_string());
//! }
//! ```
//!
//! A handler that does not call `next` is still followed by the rest of the
//! chain: the driving loop picks up where it left off. [`Context::abort`] is
//! the only way to stop downstream handlers from running.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::error::TemplateError;
use crate::handler::BoxedHandler;
use crate::request::Request;
use crate::response::{ContentType, Response};
use crate::template::HtmlRenderer;

/// State for one request: input, matched route, chain cursor and the
/// response being written.
pub struct Context {
    request: Request,
    path: String,
    pattern: Option<String>,
    params: HashMap<String, String>,
    handlers: Vec<BoxedHandler>,
    // index of the next handler to run; only ever grows
    index: usize,
    aborted: bool,
    response: Response,
    renderer: Option<Arc<dyn HtmlRenderer>>,
}

impl Context {
    pub(crate) fn new(
        request: Request,
        path: String,
        pattern: Option<String>,
        params: HashMap<String, String>,
        handlers: Vec<BoxedHandler>,
        renderer: Option<Arc<dyn HtmlRenderer>>,
    ) -> Self {
        Self {
            request,
            path,
            pattern,
            params,
            handlers,
            index: 0,
            aborted: false,
            response: Response::default(),
            renderer,
        }
    }

    // ── Input ────────────────────────────────────────────────────────────────

    pub fn method(&self) -> &http::Method {
        self.request.method()
    }

    /// The request path after `/` runs were collapsed.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The pattern of the matched route, `None` when nothing matched.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// A captured path parameter. For `/user/:name` on `/user/alice`,
    /// `param("name")` is `Some("alice")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn query(&self, key: &str) -> Option<String> {
        self.request.query(key)
    }

    pub fn post_form(&self, key: &str) -> Option<String> {
        self.request.post_form(key)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    pub fn body(&self) -> &[u8] {
        self.request.body()
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    // ── Chain control ───────────────────────────────────────────────────────

    /// Runs the remaining handlers in order.
    ///
    /// Each handler may call `next` itself; the nested call runs everything
    /// downstream, so when it returns the handler resumes with the chain
    /// already finished. Handlers are never run twice.
    pub fn next(&mut self) {
        while self.index < self.handlers.len() {
            let handler = Arc::clone(&self.handlers[self.index]);
            self.index += 1;
            handler.call(self);
        }
    }

    /// Stops the chain and writes `{"message": message}` with `status`.
    ///
    /// No handler after the current one runs. Handlers further up the stack
    /// still get to finish whatever follows their own `next` call.
    pub fn abort(&mut self, status: StatusCode, message: &str) {
        self.index = self.handlers.len();
        self.aborted = true;
        self.json(status, &json!({ "message": message }));
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    // ── Output ──────────────────────────────────────────────────────────────

    /// Writes the status line. Only the first status written takes effect.
    pub fn status(&mut self, status: StatusCode) {
        self.response.write_status(status);
    }

    /// The status the response will carry.
    pub fn status_code(&self) -> StatusCode {
        self.response.status()
    }

    /// Sets a response header, replacing any previous value.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.response.set_header(name, value);
    }

    /// Adds a response header, keeping previous values.
    pub fn append_header(&mut self, name: &str, value: &str) {
        self.response.add_header(name, value);
    }

    /// Plain-text body. Pass `format_args!` to avoid an intermediate string.
    pub fn string(&mut self, status: StatusCode, body: impl fmt::Display) {
        self.response.set_header("content-type", ContentType::Text.as_str());
        self.response.write_status(status);
        self.response.write(body.to_string().as_bytes());
    }

    /// Serializes `value` as one line of JSON.
    ///
    /// If serialization fails nothing is written and the request is aborted
    /// with `500`.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) {
        let mut line = match serde_json::to_vec(value) {
            Ok(line) => line,
            Err(err) => {
                error!(path = %self.path, %err, "json serialization failed");
                self.abort(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
                return;
            }
        };
        line.push(b'\n');
        self.response.set_header("content-type", ContentType::Json.as_str());
        self.response.write_status(status);
        self.response.write(&line);
    }

    /// Raw bytes. Content type is whatever the handler set, if anything.
    pub fn data(&mut self, status: StatusCode, bytes: &[u8]) {
        self.response.write_status(status);
        self.response.write(bytes);
    }

    /// Renders template `name` with `data` through the router's
    /// [`HtmlRenderer`]. A render failure aborts with `500`.
    pub fn html<T: Serialize + ?Sized>(&mut self, status: StatusCode, name: &str, data: &T) {
        match self.render(name, data) {
            Ok(page) => {
                self.response.set_header("content-type", ContentType::Html.as_str());
                self.response.write_status(status);
                self.response.write(page.as_bytes());
            }
            Err(err) => {
                error!(template = name, %err, "html render failed");
                self.abort(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
            }
        }
    }

    fn render<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<String, TemplateError> {
        let renderer = self.renderer.as_ref().ok_or(TemplateError::NoRenderer)?;
        let value = serde_json::to_value(data)?;
        renderer.render(name, &value)
    }

    /// What has been written so far.
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Discards everything written so far, status included.
    pub fn reset_response(&mut self) {
        self.response.reset();
    }

    pub(crate) fn into_response(self) -> Response {
        self.response
    }
}
