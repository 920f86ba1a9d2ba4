//! Segment trie for a single HTTP method.
//!
//! Patterns are split on `/` and each segment becomes one edge:
//!
//! - `users`: static, matched byte-for-byte
//! - `:id`: parameter, captures exactly one path segment
//! - `*rest`: wildcard, captures every remaining segment; must be last
//!
//! Lookup prefers static over parameter over wildcard at every level and
//! backtracks when a preferred branch dead-ends deeper down, so `/user/new`
//! beats `/user/:id` but `/user/new/edit` can still fall back to
//! `/user/:id/edit`.
//!
//! Matching runs on the raw, still percent-encoded segments, so an encoded
//! `%2F` never splits a segment. Captured values are decoded afterwards.

use std::borrow::Cow;
use std::collections::HashMap;

use percent_encoding::percent_decode_str;

use crate::error::RouteError;
use crate::handler::BoxedHandler;

/// Collapses every run of `/` into a single `/`.
///
/// Borrows when the input is already normalized, which is the common case
/// for request paths.
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if !path.contains("//") {
        return Cow::Borrowed(path);
    }
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        let slash = c == '/';
        if !(slash && prev_slash) {
            out.push(c);
        }
        prev_slash = slash;
    }
    Cow::Owned(out)
}

/// A registered route terminus: the pattern as registered plus its handler.
pub(crate) struct Route {
    pub(crate) pattern: String,
    pub(crate) handler: BoxedHandler,
}

/// Result of a successful lookup.
pub struct RouteMatch<'a> {
    pattern: &'a str,
    pub(crate) handler: &'a BoxedHandler,
    params: HashMap<String, String>,
}

impl<'a> RouteMatch<'a> {
    /// The normalized pattern that matched, e.g. `/user/:id`.
    pub fn pattern(&self) -> &'a str {
        self.pattern
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub(crate) fn into_parts(self) -> (&'a str, &'a BoxedHandler, HashMap<String, String>) {
        (self.pattern, self.handler, self.params)
    }
}

#[derive(Default)]
pub(crate) struct PathTrie {
    root: Node,
}

#[derive(Default)]
struct Node {
    statics: HashMap<String, Node>,
    param: Option<(String, Box<Node>)>,
    wildcard: Option<Wildcard>,
    route: Option<Route>,
}

/// Terminal edge. Holds its route directly since nothing can follow it.
struct Wildcard {
    name: String,
    route: Route,
}

#[derive(Clone, Copy)]
enum Segment<'p> {
    Static(&'p str),
    Param(&'p str),
    Wildcard(&'p str),
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn parse_pattern(pattern: &str) -> Result<Vec<Segment<'_>>, RouteError> {
    let parts: Vec<&str> = segments(pattern).collect();
    let mut parsed = Vec::with_capacity(parts.len());
    let mut names: Vec<&str> = Vec::new();

    for (i, part) in parts.iter().copied().enumerate() {
        let segment = if let Some(name) = part.strip_prefix(':') {
            Segment::Param(name)
        } else if let Some(name) = part.strip_prefix('*') {
            if i + 1 != parts.len() {
                return Err(RouteError::WildcardNotLast {
                    pattern: pattern.to_owned(),
                    segment: part.to_owned(),
                });
            }
            Segment::Wildcard(name)
        } else {
            Segment::Static(part)
        };

        if let Segment::Param(name) | Segment::Wildcard(name) = segment {
            if name.is_empty() {
                return Err(RouteError::EmptyName {
                    pattern: pattern.to_owned(),
                    segment: part.to_owned(),
                });
            }
            if names.contains(&name) {
                return Err(RouteError::DuplicateName {
                    pattern: pattern.to_owned(),
                    name: name.to_owned(),
                });
            }
            names.push(name);
        }
        parsed.push(segment);
    }
    Ok(parsed)
}

impl PathTrie {
    /// Registers `pattern`. The pattern must already be normalized.
    ///
    /// Returns the pattern previously bound to the same terminus, if any; the
    /// new handler replaces it.
    pub(crate) fn insert(
        &mut self,
        pattern: &str,
        handler: BoxedHandler,
    ) -> Result<Option<String>, RouteError> {
        let parsed = parse_pattern(pattern)?;
        let route = Route { pattern: pattern.to_owned(), handler };
        let mut node = &mut self.root;

        for segment in parsed {
            match segment {
                Segment::Static(text) => {
                    node = node.statics.entry(text.to_owned()).or_default();
                }
                Segment::Param(name) => {
                    let (existing, child) = node
                        .param
                        .get_or_insert_with(|| (name.to_owned(), Box::default()));
                    if existing.as_str() != name {
                        return Err(RouteError::ParamConflict {
                            pattern: pattern.to_owned(),
                            existing: existing.clone(),
                            new: name.to_owned(),
                        });
                    }
                    node = child.as_mut();
                }
                Segment::Wildcard(name) => {
                    if let Some(existing) = &node.wildcard {
                        if existing.name != name {
                            return Err(RouteError::WildcardConflict {
                                pattern: pattern.to_owned(),
                                existing: existing.name.clone(),
                                new: name.to_owned(),
                            });
                        }
                    }
                    let previous = node.wildcard.replace(Wildcard { name: name.to_owned(), route });
                    return Ok(previous.map(|w| w.route.pattern));
                }
            }
        }

        Ok(node.route.replace(route).map(|r| r.pattern))
    }

    /// Finds the route for a normalized request path.
    pub(crate) fn search(&self, path: &str) -> Option<RouteMatch<'_>> {
        let parts: Vec<&str> = segments(path).collect();
        let mut captures = Vec::new();
        let route = self.root.find(&parts, &mut captures)?;
        Some(RouteMatch {
            pattern: &route.pattern,
            handler: &route.handler,
            params: captures
                .into_iter()
                .map(|(name, value)| (name.to_owned(), decode(&value)))
                .collect(),
        })
    }
}

// Invalid UTF-8 after decoding is replaced rather than rejected.
fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

impl Node {
    fn find<'t>(&'t self, parts: &[&str], captures: &mut Vec<(&'t str, String)>) -> Option<&'t Route> {
        let Some((head, rest)) = parts.split_first() else {
            return self.route.as_ref();
        };

        if let Some(child) = self.statics.get(*head) {
            if let Some(route) = child.find(rest, captures) {
                return Some(route);
            }
        }

        if let Some((name, child)) = &self.param {
            captures.push((name.as_str(), (*head).to_owned()));
            if let Some(route) = child.find(rest, captures) {
                return Some(route);
            }
            captures.pop();
        }

        let wildcard = self.wildcard.as_ref()?;
        captures.push((wildcard.name.as_str(), parts.join("/")));
        Some(&wildcard.route)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::Context;
    use crate::handler::Handler;

    fn noop() -> BoxedHandler {
        (|_: &mut Context| {}).into_boxed_handler()
    }

    fn trie(patterns: &[&str]) -> PathTrie {
        let mut t = PathTrie::default();
        for p in patterns {
            t.insert(p, noop()).unwrap();
        }
        t
    }

    fn lookup(t: &PathTrie, path: &str) -> Option<(String, HashMap<String, String>)> {
        t.search(path).map(|m| (m.pattern().to_owned(), m.params().clone()))
    }

    #[test]
    fn normalize_collapses_runs() {
        assert_eq!(normalize_path("//a///b"), "/a/b");
        assert_eq!(normalize_path("/a/b"), "/a/b");
        assert!(matches!(normalize_path("/a/b"), Cow::Borrowed(_)));
        assert_eq!(normalize_path("////"), "/");
    }

    #[test]
    fn static_match_has_no_params() {
        let t = trie(&["/", "/ping", "/a/b/c"]);
        let (pattern, params) = lookup(&t, "/a/b/c").unwrap();
        assert_eq!(pattern, "/a/b/c");
        assert!(params.is_empty());
        assert_eq!(lookup(&t, "/").unwrap().0, "/");
        assert!(lookup(&t, "/a/b").is_none());
        assert!(lookup(&t, "/a/b/c/d").is_none());
    }

    #[test]
    fn param_captures_one_segment() {
        let t = trie(&["/user/:name"]);
        let (_, params) = lookup(&t, "/user/alice").unwrap();
        assert_eq!(params.get("name").map(String::as_str), Some("alice"));
        assert!(lookup(&t, "/user").is_none());
        assert!(lookup(&t, "/user/alice/extra").is_none());
    }

    #[test]
    fn wildcard_captures_remainder() {
        let t = trie(&["/assets/*filepath"]);
        let (pattern, params) = lookup(&t, "/assets/css/a.css").unwrap();
        assert_eq!(pattern, "/assets/*filepath");
        assert_eq!(params.get("filepath").map(String::as_str), Some("css/a.css"));
        // at least one segment is required
        assert!(lookup(&t, "/assets").is_none());
    }

    #[test]
    fn captures_are_percent_decoded() {
        let t = trie(&["/user/:name", "/files/*path"]);
        let (_, params) = lookup(&t, "/user/al%20ice").unwrap();
        assert_eq!(params.get("name").map(String::as_str), Some("al ice"));

        // an encoded slash stays inside its segment
        let (pattern, params) = lookup(&t, "/user/a%2Fb").unwrap();
        assert_eq!(pattern, "/user/:name");
        assert_eq!(params.get("name").map(String::as_str), Some("a/b"));

        let (_, params) = lookup(&t, "/files/docs/my%20file.txt").unwrap();
        assert_eq!(params.get("path").map(String::as_str), Some("docs/my file.txt"));
    }

    #[test]
    fn static_beats_param() {
        let t = trie(&["/user/:id", "/user/new"]);
        let (pattern, params) = lookup(&t, "/user/new").unwrap();
        assert_eq!(pattern, "/user/new");
        assert!(params.is_empty());
        assert_eq!(lookup(&t, "/user/42").unwrap().0, "/user/:id");
    }

    #[test]
    fn backtracks_from_static_into_param() {
        let t = trie(&["/user/new", "/user/:id/edit"]);
        let (pattern, params) = lookup(&t, "/user/new/edit").unwrap();
        assert_eq!(pattern, "/user/:id/edit");
        assert_eq!(params.get("id").map(String::as_str), Some("new"));
    }

    #[test]
    fn wildcard_is_last_resort() {
        let t = trie(&["/files/:name", "/files/*path", "/files/raw/:id"]);
        assert_eq!(lookup(&t, "/files/a").unwrap().0, "/files/:name");
        assert_eq!(lookup(&t, "/files/raw/7").unwrap().0, "/files/raw/:id");

        let (pattern, params) = lookup(&t, "/files/a/b/c").unwrap();
        assert_eq!(pattern, "/files/*path");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("path").map(String::as_str), Some("a/b/c"));
    }

    #[test]
    fn failed_param_branch_leaves_no_captures() {
        let t = trie(&["/a/:x/b", "/a/*rest"]);
        let (_, params) = lookup(&t, "/a/1/c").unwrap();
        assert_eq!(params.get("rest").map(String::as_str), Some("1/c"));
        assert!(!params.contains_key("x"));
    }

    #[test]
    fn rejects_wildcard_not_last() {
        let mut t = PathTrie::default();
        let err = t.insert("/a/*rest/b", noop()).unwrap_err();
        assert!(matches!(err, RouteError::WildcardNotLast { .. }));
    }

    #[test]
    fn rejects_sibling_params_with_different_names() {
        let mut t = trie(&["/user/:id"]);
        let err = t.insert("/user/:name/posts", noop()).unwrap_err();
        assert_eq!(
            err,
            RouteError::ParamConflict {
                pattern: "/user/:name/posts".to_owned(),
                existing: "id".to_owned(),
                new: "name".to_owned(),
            }
        );
        // same name is fine
        t.insert("/user/:id/posts", noop()).unwrap();
    }

    #[test]
    fn rejects_conflicting_wildcards_and_bad_names() {
        let mut t = trie(&["/s/*path"]);
        assert!(matches!(
            t.insert("/s/*other", noop()),
            Err(RouteError::WildcardConflict { .. })
        ));
        assert!(matches!(t.insert("/x/:", noop()), Err(RouteError::EmptyName { .. })));
        assert!(matches!(
            t.insert("/x/:a/:a", noop()),
            Err(RouteError::DuplicateName { .. })
        ));
    }

    #[test]
    fn reinsert_replaces_and_reports_previous() {
        let mut t = trie(&["/a", "/b/:id"]);
        let replaced = t.insert("/a", noop()).unwrap();
        assert_eq!(replaced.as_deref(), Some("/a"));
        assert_eq!(lookup(&t, "/b/1").unwrap().0, "/b/:id");
        assert_eq!(lookup(&t, "/a").unwrap().0, "/a");
    }

    #[test]
    fn handler_identity_is_preserved() {
        let mut t = PathTrie::default();
        let h = noop();
        t.insert("/x", Arc::clone(&h)).unwrap();
        let m = t.search("/x").unwrap();
        assert!(Arc::ptr_eq(m.handler, &h));
    }
}
