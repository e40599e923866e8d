//! First-match route table.
//!
//! Routes are checked in registration order and the first template that
//! matches both verb and path wins. Templates are compiled when inserted, so
//! lookups only compare segments.

use http::Method;

use crate::params::Params;
use crate::template::RouteTemplate;

/// A registered route.
#[derive(Debug, Clone)]
pub struct Route<T> {
    method: Method,
    template: RouteTemplate,
    target: T,
}

impl<T> Route<T> {
    /// Returns the route's verb.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the route's template.
    #[must_use]
    pub const fn template(&self) -> &RouteTemplate {
        &self.template
    }

    /// Returns the value the route resolves to.
    #[must_use]
    pub const fn target(&self) -> &T {
        &self.target
    }
}

/// A successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a, T> {
    target: &'a T,
    template: &'a RouteTemplate,
    params: Params,
}

impl<'a, T> RouteMatch<'a, T> {
    /// Returns the matched route's value.
    #[must_use]
    pub const fn target(&self) -> &'a T {
        self.target
    }

    /// Returns the matched template.
    #[must_use]
    pub const fn template(&self) -> &'a RouteTemplate {
        self.template
    }

    /// Returns the captured values.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Consumes the match, returning the captured values.
    #[must_use]
    pub fn into_params(self) -> Params {
        self.params
    }
}

/// Result of [`RouteTable::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteLookup<'a, T> {
    /// A route matched verb and path.
    Matched(RouteMatch<'a, T>),
    /// The path matched, but only under other verbs.
    MethodNotAllowed(Vec<Method>),
    /// Nothing matched the path.
    NotFound,
}

/// Ordered set of routes.
///
/// # Example
///
/// ```rust
/// use hermes_router::{RouteLookup, RouteTable, RouteTemplate};
/// use http::Method;
///
/// let mut table = RouteTable::new();
/// table.insert(Method::GET, RouteTemplate::parse("/users/{id}").unwrap(), "get_user");
/// table.insert(Method::POST, RouteTemplate::parse("/users").unwrap(), "create_user");
///
/// match table.lookup(&Method::GET, "/users/42") {
///     RouteLookup::Matched(m) => {
///         assert_eq!(*m.target(), "get_user");
///         assert_eq!(m.params().get("id"), Some("42"));
///     }
///     _ => unreachable!(),
/// }
///
/// assert!(matches!(
///     table.lookup(&Method::DELETE, "/users"),
///     RouteLookup::MethodNotAllowed(_)
/// ));
/// assert!(matches!(table.lookup(&Method::GET, "/orders"), RouteLookup::NotFound));
/// ```
#[derive(Debug, Clone)]
pub struct RouteTable<T> {
    routes: Vec<Route<T>>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<T> RouteTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route.
    ///
    /// A template overlapping an earlier route with the same verb is still
    /// registered, but it can only be reached by paths the earlier route does
    /// not match. The overlap is logged.
    pub fn insert(&mut self, method: Method, template: RouteTemplate, target: T) {
        if let Some(existing) = self.find_overlap(&method, &template) {
            tracing::warn!(
                http.method = %method,
                route = %template,
                shadowed_by = %existing.template,
                "route overlaps an earlier registration; first registration wins"
            );
        }
        self.routes.push(Route {
            method,
            template,
            target,
        });
    }

    /// Returns the first registered route with the same verb whose template
    /// overlaps `template`.
    #[must_use]
    pub fn find_overlap(&self, method: &Method, template: &RouteTemplate) -> Option<&Route<T>> {
        self.routes
            .iter()
            .find(|r| same_method(&r.method, method) && r.template.overlaps(template))
    }

    /// Resolves a request.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> RouteLookup<'_, T> {
        let mut allowed = Vec::new();
        for route in &self.routes {
            let Some(params) = route.template.match_path(path) else {
                continue;
            };
            if same_method(&route.method, method) {
                return RouteLookup::Matched(RouteMatch {
                    target: &route.target,
                    template: &route.template,
                    params,
                });
            }
            if !allowed.contains(&route.method) {
                allowed.push(route.method.clone());
            }
        }

        if allowed.is_empty() {
            RouteLookup::NotFound
        } else {
            RouteLookup::MethodNotAllowed(allowed)
        }
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Returns the routes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Route<T>> {
        self.routes.iter()
    }
}

fn same_method(a: &Method, b: &Method) -> bool {
    a.as_str().eq_ignore_ascii_case(b.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(text: &str) -> RouteTemplate {
        RouteTemplate::parse(text).unwrap()
    }

    fn matched<'a, T>(lookup: RouteLookup<'a, T>) -> RouteMatch<'a, T> {
        match lookup {
            RouteLookup::Matched(m) => m,
            other => panic!("expected a match, got {}", describe(&other)),
        }
    }

    fn describe<T>(lookup: &RouteLookup<'_, T>) -> &'static str {
        match lookup {
            RouteLookup::Matched(_) => "match",
            RouteLookup::MethodNotAllowed(_) => "method not allowed",
            RouteLookup::NotFound => "not found",
        }
    }

    #[test]
    fn test_empty_table() {
        let table: RouteTable<&str> = RouteTable::new();
        assert!(table.is_empty());
        assert!(matches!(table.lookup(&Method::GET, "/"), RouteLookup::NotFound));
    }

    #[test]
    fn test_first_match_wins() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, template("/users/{id}"), "by_id");
        table.insert(Method::GET, template("/users/me"), "me");

        let m = matched(table.lookup(&Method::GET, "/users/me"));
        assert_eq!(*m.target(), "by_id");
        assert_eq!(m.params().get("id"), Some("me"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_verb_is_case_insensitive() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, template("/health"), "health");

        let lowercase = Method::from_bytes(b"get").unwrap();
        assert_eq!(*matched(table.lookup(&lowercase, "/health")).target(), "health");
    }

    #[test]
    fn test_method_not_allowed_lists_verbs() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, template("/users/{id}"), "get");
        table.insert(Method::PUT, template("/users/{id}"), "put");
        table.insert(Method::GET, template("/users/{userId}"), "shadowed");

        match table.lookup(&Method::DELETE, "/users/1") {
            RouteLookup::MethodNotAllowed(allowed) => {
                assert_eq!(allowed, vec![Method::GET, Method::PUT]);
            }
            other => panic!("unexpected {}", describe(&other)),
        }
    }

    #[test]
    fn test_find_overlap_respects_verb() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, template("/users/{id}"), 1);

        assert!(table
            .find_overlap(&Method::GET, &template("/users/admin"))
            .is_some());
        assert!(table
            .find_overlap(&Method::POST, &template("/users/admin"))
            .is_none());
    }

    #[test]
    fn test_trailing_and_double_slashes() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, template("/a/b"), ());
        assert!(matches!(
            table.lookup(&Method::GET, "//a///b/"),
            RouteLookup::Matched(_)
        ));
    }

    #[test]
    fn test_repeated_lookups_are_stable() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, template("/a/{x}"), "a");
        let first = matched(table.lookup(&Method::GET, "/a/1"));
        let second = matched(table.lookup(&Method::GET, "/a/1"));
        assert_eq!(first, second);
    }

    proptest::proptest! {
        #[test]
        fn prop_capture_round_trips_any_segment(value in "[^/]{1,24}") {
            let t = template("/items/{value}");
            let path = t.render(|_| Some(value.clone())).unwrap();
            let params = t.match_path(&path).unwrap();
            proptest::prop_assert_eq!(params.get("value"), Some(value.as_str()));
        }
    }
}
