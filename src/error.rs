//! Error types.
//!
//! Application-level failures (404, 422, etc.) are expressed through
//! [`Context::abort`](crate::Context::abort), not as `Error`s. The types here
//! cover the two places where something can go wrong outside a handler:
//! building the routing table, and running the listener.

use std::net::AddrParseError;

use thiserror::Error;

/// Infrastructure failure: binding a port, accepting a connection, or a
/// registration error propagated out of setup code.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    #[error(transparent)]
    Route(#[from] RouteError),
}

/// A pattern that cannot be registered.
///
/// Returned from every registration call. These are startup errors: a router
/// that failed to register a route should not be served.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("pattern `{pattern}` must start with `/`")]
    MissingLeadingSlash { pattern: String },

    #[error("wildcard `{segment}` must be the last segment of `{pattern}`")]
    WildcardNotLast { pattern: String, segment: String },

    #[error("empty capture name in segment `{segment}` of `{pattern}`")]
    EmptyName { pattern: String, segment: String },

    #[error("capture `{name}` appears more than once in `{pattern}`")]
    DuplicateName { pattern: String, name: String },

    #[error("`:{new}` in `{pattern}` conflicts with existing parameter `:{existing}`")]
    ParamConflict {
        pattern: String,
        existing: String,
        new: String,
    },

    #[error("`*{new}` in `{pattern}` conflicts with existing wildcard `*{existing}`")]
    WildcardConflict {
        pattern: String,
        existing: String,
        new: String,
    },
}

/// Failure reported by an [`HtmlRenderer`](crate::HtmlRenderer).
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("no html renderer configured")]
    NoRenderer,

    #[error("template `{0}` not found")]
    NotFound(String),

    #[error("render `{name}`: {reason}")]
    Render { name: String, reason: String },

    #[error("template data: {0}")]
    Data(#[from] serde_json::Error),
}
