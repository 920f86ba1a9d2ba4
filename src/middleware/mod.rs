//! Built-in middleware.
//!
//! Middleware is an ordinary [`Handler`](crate::Handler) attached to a group
//! with `middleware(..)`. It runs before the route handler for every path
//! under the group's prefix, and wraps the handler when it calls
//! [`Context::next`](crate::Context::next).
//!
//! - [`recovery`]: turns a panic anywhere downstream into a `500`
//! - [`logger`]: one log line per request with status and latency

mod logger;
pub(crate) mod recovery;

pub use logger::logger;
pub use recovery::recovery;
