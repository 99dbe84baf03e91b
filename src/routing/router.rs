//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the matching route for a method and path
//! - Distinguish "no such path" from "path exists, wrong method"
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - First match wins, in insertion order

use axum::http::Method;

use crate::routing::matcher::{MethodMatcher, PathPattern};

#[derive(Debug)]
struct Route<T> {
    pattern: PathPattern,
    methods: MethodMatcher,
    target: T,
}

/// Result of a route lookup.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution<'a, T> {
    Matched {
        target: &'a T,
        params: Vec<(String, String)>,
    },
    MethodNotAllowed,
    NotFound,
}

#[derive(Debug)]
pub struct RouteTable<T> {
    routes: Vec<Route<T>>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<T> RouteTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route. Builder style, so tables read top to bottom.
    pub fn route(mut self, pattern: &str, methods: MethodMatcher, target: T) -> Self {
        self.routes.push(Route {
            pattern: PathPattern::new(pattern),
            methods,
            target,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_, T> {
        let mut path_known = false;
        for route in &self.routes {
            if let Some(params) = route.pattern.matches(path) {
                if route.methods.matches(method) {
                    return Resolution::Matched {
                        target: &route.target,
                        params,
                    };
                }
                path_known = true;
            }
        }
        if path_known {
            Resolution::MethodNotAllowed
        } else {
            Resolution::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable<&'static str> {
        RouteTable::new()
            .route("/orders", MethodMatcher::one_of(&[Method::GET, Method::POST]), "orders")
            .route("/documents", MethodMatcher::one_of(&[Method::POST]), "create_doc")
            .route(
                "/documents/{id}",
                MethodMatcher::one_of(&[Method::GET, Method::PUT, Method::DELETE]),
                "doc",
            )
    }

    #[test]
    fn resolves_by_method_and_path() {
        let t = table();
        assert_eq!(
            t.resolve(&Method::GET, "/orders"),
            Resolution::Matched { target: &"orders", params: vec![] }
        );
        match t.resolve(&Method::PUT, "/documents/42") {
            Resolution::Matched { target, params } => {
                assert_eq!(*target, "doc");
                assert_eq!(params, vec![("id".to_string(), "42".to_string())]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn distinguishes_wrong_method_from_unknown_path() {
        let t = table();
        assert_eq!(t.resolve(&Method::DELETE, "/orders"), Resolution::MethodNotAllowed);
        assert_eq!(t.resolve(&Method::GET, "/documents"), Resolution::MethodNotAllowed);
        assert_eq!(t.resolve(&Method::GET, "/nope"), Resolution::NotFound);
    }
}
