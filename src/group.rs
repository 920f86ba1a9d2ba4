//! Route groups and prefix-scoped middleware.
//!
//! Every group stores its absolute prefix, computed once when the group is
//! created. Matching a request never walks parent links: a group applies to
//! a request when its prefix is a literal string prefix of the path.
//!
//! That rule is deliberately loose. A group `/api` also matches
//! `/apikey/rotate`, so sibling groups with overlapping prefixes can both
//! contribute middleware to one request.

use std::sync::Arc;

use crate::handler::BoxedHandler;

/// Stable handle to a group inside a [`GroupRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

impl GroupId {
    /// The root group, whose prefix is empty and therefore matches every path.
    pub const ROOT: GroupId = GroupId(0);
}

pub(crate) struct Group {
    prefix: String,
    middlewares: Vec<BoxedHandler>,
    // informational only; matching uses `prefix`
    parent: Option<GroupId>,
}

pub(crate) struct GroupRegistry {
    groups: Vec<Group>,
}

impl GroupRegistry {
    /// A registry holding only the root group.
    pub(crate) fn new() -> Self {
        let root = Group { prefix: String::new(), middlewares: Vec::new(), parent: None };
        Self { groups: vec![root] }
    }

    /// Creates a child of `parent` with prefix `parent.prefix + suffix`.
    ///
    /// No normalization happens here; patterns are normalized when routes are
    /// registered.
    pub(crate) fn new_group(&mut self, parent: GroupId, suffix: &str) -> GroupId {
        let prefix = format!("{}{suffix}", self.prefix(parent));
        self.groups.push(Group { prefix, middlewares: Vec::new(), parent: Some(parent) });
        GroupId(self.groups.len() - 1)
    }

    /// Appends middleware to `group`, keeping call order.
    pub(crate) fn use_middleware(
        &mut self,
        group: GroupId,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) {
        self.groups[group.0].middlewares.extend(handlers);
    }

    pub(crate) fn contains(&self, group: GroupId) -> bool {
        group.0 < self.groups.len()
    }

    pub(crate) fn prefix(&self, group: GroupId) -> &str {
        &self.groups[group.0].prefix
    }

    pub(crate) fn parent(&self, group: GroupId) -> Option<GroupId> {
        self.groups[group.0].parent
    }

    /// Middleware for a request path: every group whose prefix starts the
    /// path contributes its list, groups visited in registration order.
    pub(crate) fn middlewares_for(&self, path: &str) -> Vec<BoxedHandler> {
        self.groups
            .iter()
            .filter(|g| path.starts_with(g.prefix.as_str()))
            .flat_map(|g| g.middlewares.iter().map(Arc::clone))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::handler::Handler;

    fn noop() -> BoxedHandler {
        (|_: &mut Context| {}).into_boxed_handler()
    }

    fn same(a: &[BoxedHandler], b: &[&BoxedHandler]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, y))
    }

    #[test]
    fn prefixes_concatenate_once() {
        let mut reg = GroupRegistry::new();
        let api = reg.new_group(GroupId::ROOT, "/api");
        let v1 = reg.new_group(api, "/v1");

        assert_eq!(reg.prefix(GroupId::ROOT), "");
        assert_eq!(reg.prefix(v1), "/api/v1");
        assert_eq!(reg.parent(v1), Some(api));
        assert_eq!(reg.parent(GroupId::ROOT), None);
    }

    #[test]
    fn nested_groups_accumulate_in_registration_order() {
        let mut reg = GroupRegistry::new();
        let (root_mw, a, b) = (noop(), noop(), noop());
        let api = reg.new_group(GroupId::ROOT, "/api");
        let v1 = reg.new_group(api, "/v1");
        reg.use_middleware(v1, [Arc::clone(&b)]);
        reg.use_middleware(api, [Arc::clone(&a)]);
        reg.use_middleware(GroupId::ROOT, [Arc::clone(&root_mw)]);

        assert!(same(&reg.middlewares_for("/api/v1/x"), &[&root_mw, &a, &b]));
        assert!(same(&reg.middlewares_for("/api/v2"), &[&root_mw, &a]));
        assert!(same(&reg.middlewares_for("/other"), &[&root_mw]));
    }

    #[test]
    fn use_appends_without_dedup() {
        let mut reg = GroupRegistry::new();
        let m = noop();
        reg.use_middleware(GroupId::ROOT, [Arc::clone(&m), Arc::clone(&m)]);
        reg.use_middleware(GroupId::ROOT, [Arc::clone(&m)]);
        assert_eq!(reg.middlewares_for("/").len(), 3);
    }

    #[test]
    fn overlapping_sibling_prefixes_both_apply() {
        let mut reg = GroupRegistry::new();
        let (api_mw, key_mw) = (noop(), noop());
        let api = reg.new_group(GroupId::ROOT, "/api");
        let apikey = reg.new_group(GroupId::ROOT, "/apikey");
        reg.use_middleware(api, [Arc::clone(&api_mw)]);
        reg.use_middleware(apikey, [Arc::clone(&key_mw)]);

        assert!(same(&reg.middlewares_for("/apikey/rotate"), &[&api_mw, &key_mw]));
        assert!(same(&reg.middlewares_for("/api/users"), &[&api_mw]));
    }
}
