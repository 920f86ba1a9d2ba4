//! HTML rendering seam.
//!
//! weft does not ship a template engine. [`Context::html`](crate::Context::html)
//! serializes the handler's data to a `serde_json::Value` and hands it, with
//! the template name, to whatever renderer the router was configured with.
//! Any engine that can render from JSON-shaped data plugs in here.

use serde_json::Value;

use crate::error::TemplateError;

/// Renders a named template to a string.
pub trait HtmlRenderer: Send + Sync + 'static {
    fn render(&self, name: &str, data: &Value) -> Result<String, TemplateError>;
}

/// Plain functions and closures are renderers.
impl<F> HtmlRenderer for F
where
    F: Fn(&str, &Value) -> Result<String, TemplateError> + Send + Sync + 'static,
{
    fn render(&self, name: &str, data: &Value) -> Result<String, TemplateError> {
        self(name, data)
    }
}
