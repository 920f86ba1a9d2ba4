//! Route table: one [`PathTrie`] per HTTP method.
//!
//! Built once at startup, then only read. Lookups never fall back across
//! methods: a path registered under `GET` is a miss for `POST`.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::error::RouteError;
use crate::handler::BoxedHandler;
use crate::method::Method;
use crate::trie::{PathTrie, RouteMatch, normalize_path};

#[derive(Default)]
pub(crate) struct RouteTable {
    tries: HashMap<Method, PathTrie>,
}

impl RouteTable {
    /// Normalizes `pattern` and inserts it into the trie for `method`,
    /// creating that trie on first use.
    ///
    /// Registering the same method and pattern twice keeps the later handler.
    pub(crate) fn add_route(
        &mut self,
        method: Method,
        pattern: &str,
        handler: BoxedHandler,
    ) -> Result<(), RouteError> {
        let pattern = normalize_path(pattern);
        if !pattern.starts_with('/') {
            return Err(RouteError::MissingLeadingSlash { pattern: pattern.into_owned() });
        }

        let replaced = self.tries.entry(method).or_default().insert(&pattern, handler)?;
        match replaced {
            Some(previous) => warn!(%method, pattern = %previous, "route registered twice, keeping the later handler"),
            None => info!("route {method:>7} {pattern}"),
        }
        Ok(())
    }

    pub(crate) fn resolve(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        let trie = self.tries.get(&method)?;
        trie.search(&normalize_path(path))
    }
}
