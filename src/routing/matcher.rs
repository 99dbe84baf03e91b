//! Route matching logic.
//!
//! # Responsibilities
//! - Match request paths against patterns such as `/documents/{id}`
//! - Catch-all tails (`/{*path}`) for whole-surface forwarding
//! - Match request methods against a route's method set
//!
//! # Design Decisions
//! - Path matching is segment-wise and case-sensitive
//! - A trailing slash is insignificant (`/orders/` matches `/orders`)
//! - No regex to guarantee O(n) matching

use std::fmt;

use axum::http::Method;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    CatchAll(String),
}

/// Compiled path pattern.
#[derive(Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathPattern({})", self.raw)
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl PathPattern {
    pub fn new(pattern: &str) -> Self {
        let segments = split(pattern)
            .map(|seg| match seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => match name.strip_prefix('*') {
                    Some(tail) => Segment::CatchAll(tail.to_string()),
                    None => Segment::Param(name.to_string()),
                },
                None => Segment::Literal(seg.to_string()),
            })
            .collect();
        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match `path`, returning captured parameters on success.
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let parts: Vec<&str> = split(path).collect();
        let mut params = Vec::new();
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::CatchAll(name) => {
                    let rest = parts.get(i..).unwrap_or_default().join("/");
                    params.push((name.clone(), rest));
                    return Some(params);
                }
                Segment::Literal(lit) if parts.get(i) == Some(&lit.as_str()) => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => params.push((name.clone(), parts.get(i)?.to_string())),
            }
        }
        (parts.len() == self.segments.len()).then_some(params)
    }
}

/// Methods a route accepts.
#[derive(Debug, Clone)]
pub enum MethodMatcher {
    Any,
    OneOf(Vec<Method>),
}

impl MethodMatcher {
    pub fn one_of(methods: &[Method]) -> Self {
        MethodMatcher::OneOf(methods.to_vec())
    }

    pub fn matches(&self, method: &Method) -> bool {
        match self {
            MethodMatcher::Any => true,
            MethodMatcher::OneOf(methods) => methods.contains(method),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pattern() {
        let pattern = PathPattern::new("/orders");
        assert_eq!(pattern.matches("/orders"), Some(vec![]));
        assert_eq!(pattern.matches("/orders/"), Some(vec![]));
        assert_eq!(pattern.matches("/Orders"), None);
        assert_eq!(pattern.matches("/orders/1"), None);
    }

    #[test]
    fn test_param_pattern() {
        let pattern = PathPattern::new("/documents/{id}");
        assert_eq!(
            pattern.matches("/documents/65f0c2"),
            Some(vec![("id".to_string(), "65f0c2".to_string())])
        );
        assert_eq!(pattern.matches("/documents"), None);
    }

    #[test]
    fn test_root_pattern() {
        let pattern = PathPattern::new("/");
        assert_eq!(pattern.matches("/"), Some(vec![]));
        assert_eq!(pattern.matches("/login"), None);
    }

    #[test]
    fn test_catch_all_pattern() {
        let pattern = PathPattern::new("/{*path}");
        assert_eq!(pattern.matches("/"), Some(vec![("path".to_string(), String::new())]));
        assert_eq!(
            pattern.matches("/documents/42"),
            Some(vec![("path".to_string(), "documents/42".to_string())])
        );
    }

    #[test]
    fn test_method_matcher() {
        let m = MethodMatcher::one_of(&[Method::GET, Method::POST]);
        assert!(m.matches(&Method::GET));
        assert!(!m.matches(&Method::DELETE));
        assert!(MethodMatcher::Any.matches(&Method::PATCH));
    }
}
