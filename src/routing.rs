//! Sub-route tables for routable pages.
//!
//! A routable page serves several views below its own URL, e.g. a product
//! page answering both `/en/products/` and `/en/products/<sku>/`. When the
//! language switcher maps a visitor to another locale it resolves the
//! current sub-path against the page's table and reverses the same route
//! name on the translated page.
//!
//! Patterns use `<converter:name>` segments: `str`, `int`, `slug`, `path`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

/// Routing failures. The switcher recovers from all of them locally.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("no route matches sub-path '{0}'")]
    NoMatch(String),

    #[error("route '{0}' is not defined")]
    UnknownRoute(String),

    #[error("route '{route}' requires parameter '{param}'")]
    MissingParam { route: String, param: String },

    #[error("value '{value}' is not a valid {converter} for parameter '{param}'")]
    InvalidParam {
        param: String,
        converter: String,
        value: String,
    },

    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// A named sub-route. The pattern is compiled once, on first use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub name: String,
    pub pattern: String,
    #[serde(skip)]
    compiled: OnceLock<Regex>,
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.pattern == other.pattern
    }
}

impl Eq for Route {}

impl Route {
    fn regex(&self) -> Result<&Regex, RoutingError> {
        if let Some(regex) = self.compiled.get() {
            return Ok(regex);
        }
        let regex = compile(&self.pattern)?;
        Ok(self.compiled.get_or_init(|| regex))
    }
}

/// The result of resolving a sub-path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub name: String,
    pub kwargs: BTreeMap<String, String>,
}

/// Ordered routes; the first matching route wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable {
    routes: Vec<Route>,
}

/// One parsed pattern segment.
enum Segment<'a> {
    Literal(&'a str),
    Param { converter: &'a str, name: &'a str },
}

fn converter_regex(converter: &str) -> Option<&'static str> {
    match converter {
        "str" => Some("[^/]+"),
        "int" => Some("[0-9]+"),
        "slug" => Some("[-a-zA-Z0-9_]+"),
        "path" => Some(".+"),
        _ => None,
    }
}

fn parse_pattern(pattern: &str) -> Result<Vec<Segment<'_>>, RoutingError> {
    let invalid = |reason: &str| RoutingError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    let mut segments = Vec::new();
    let mut rest = pattern;

    while let Some(open) = rest.find('<') {
        if open > 0 {
            segments.push(Segment::Literal(&rest[..open]));
        }
        let after = &rest[open + 1..];
        let close = after.find('>').ok_or_else(|| invalid("unclosed '<'"))?;
        let param = &after[..close];
        let (converter, name) = param.split_once(':').unwrap_or(("str", param));
        if name.is_empty() {
            return Err(invalid("empty parameter name"));
        }
        if converter_regex(converter).is_none() {
            return Err(invalid(&format!("unknown converter '{}'", converter)));
        }
        segments.push(Segment::Param { converter, name });
        rest = &after[close + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }

    Ok(segments)
}

fn compile(pattern: &str) -> Result<Regex, RoutingError> {
    let mut source = String::from("^");
    for segment in parse_pattern(pattern)? {
        match segment {
            Segment::Literal(text) => source.push_str(&regex::escape(text)),
            Segment::Param { converter, name } => {
                // converter was validated by parse_pattern
                let body = converter_regex(converter).unwrap_or("[^/]+");
                source.push_str(&format!("(?P<{}>{})", name, body));
            }
        }
    }
    source.push('$');

    Regex::new(&source).map_err(|e| RoutingError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route, validating its pattern.
    pub fn with_route(
        mut self,
        name: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Result<Self, RoutingError> {
        let pattern = pattern.into();
        let compiled = OnceLock::new();
        let _ = compiled.set(compile(&pattern)?);
        self.routes.push(Route {
            name: name.into(),
            pattern,
            compiled,
        });
        Ok(self)
    }

    /// Resolve a sub-path (leading `/` optional) to a route name and its
    /// captured parameters.
    pub fn resolve(&self, subpath: &str) -> Result<RouteMatch, RoutingError> {
        let path = subpath.trim_start_matches('/');

        for route in &self.routes {
            let regex = route.regex()?;
            if let Some(captures) = regex.captures(path) {
                let kwargs = regex
                    .capture_names()
                    .flatten()
                    .filter_map(|name| {
                        captures
                            .name(name)
                            .map(|m| (name.to_string(), m.as_str().to_string()))
                    })
                    .collect();
                return Ok(RouteMatch {
                    name: route.name.clone(),
                    kwargs,
                });
            }
        }

        Err(RoutingError::NoMatch(subpath.to_string()))
    }

    /// Build the sub-path for a named route (no leading `/`).
    pub fn reverse(
        &self,
        name: &str,
        kwargs: &BTreeMap<String, String>,
    ) -> Result<String, RoutingError> {
        let route = self
            .routes
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| RoutingError::UnknownRoute(name.to_string()))?;

        let mut out = String::new();
        for segment in parse_pattern(&route.pattern)? {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Param {
                    converter,
                    name: param,
                } => {
                    let value = kwargs.get(param).ok_or_else(|| RoutingError::MissingParam {
                        route: route.name.clone(),
                        param: param.to_string(),
                    })?;
                    let body = converter_regex(converter).unwrap_or("[^/]+");
                    let check = Regex::new(&format!("^{}$", body)).map_err(|e| {
                        RoutingError::InvalidPattern {
                            pattern: route.pattern.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                    if !check.is_match(value) {
                        return Err(RoutingError::InvalidParam {
                            param: param.to_string(),
                            converter: converter.to_string(),
                            value: value.clone(),
                        });
                    }
                    out.push_str(value);
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_routes() -> RouteTable {
        RouteTable::new()
            .with_route("product_list", "")
            .unwrap()
            .with_route("product_detail", "<str:sku>/")
            .unwrap()
    }

    fn kwargs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // ==================== resolve Tests ====================

    #[test]
    fn test_resolve_root() {
        let m = product_routes().resolve("/").unwrap();
        assert_eq!(m.name, "product_list");
        assert!(m.kwargs.is_empty());
    }

    #[test]
    fn test_resolve_with_param() {
        let m = product_routes().resolve("/ABC-123/").unwrap();
        assert_eq!(m.name, "product_detail");
        assert_eq!(m.kwargs.get("sku").map(String::as_str), Some("ABC-123"));
    }

    #[test]
    fn test_resolve_no_match() {
        let result = product_routes().resolve("/a/b/c/");
        assert_eq!(result, Err(RoutingError::NoMatch("/a/b/c/".to_string())));
    }

    #[test]
    fn test_resolve_int_and_slug() {
        let table = RouteTable::new()
            .with_route("archive", "<int:year>/<slug:slug>/")
            .unwrap();
        let m = table.resolve("2024/hello-world/").unwrap();
        assert_eq!(m.kwargs.get("year").map(String::as_str), Some("2024"));
        assert!(table.resolve("twenty/hello/").is_err());
    }

    // ==================== reverse Tests ====================

    #[test]
    fn test_reverse_with_param() {
        let path = product_routes()
            .reverse("product_detail", &kwargs(&[("sku", "ABC")]))
            .unwrap();
        assert_eq!(path, "ABC/");
    }

    #[test]
    fn test_reverse_root() {
        let path = product_routes()
            .reverse("product_list", &BTreeMap::new())
            .unwrap();
        assert_eq!(path, "");
    }

    #[test]
    fn test_reverse_unknown_route() {
        let result = product_routes().reverse("missing", &BTreeMap::new());
        assert_eq!(result, Err(RoutingError::UnknownRoute("missing".to_string())));
    }

    #[test]
    fn test_reverse_missing_param() {
        let result = product_routes().reverse("product_detail", &BTreeMap::new());
        assert!(matches!(result, Err(RoutingError::MissingParam { .. })));
    }

    #[test]
    fn test_reverse_invalid_param() {
        let table = RouteTable::new().with_route("page", "<int:n>/").unwrap();
        let result = table.reverse("page", &kwargs(&[("n", "abc")]));
        assert!(matches!(result, Err(RoutingError::InvalidParam { .. })));
    }

    #[test]
    fn test_resolve_then_reverse_on_other_table() {
        let source = product_routes();
        let target = RouteTable::new()
            .with_route("product_list", "")
            .unwrap()
            .with_route("product_detail", "item/<str:sku>/")
            .unwrap();
        let m = source.resolve("/XYZ/").unwrap();
        assert_eq!(target.reverse(&m.name, &m.kwargs).unwrap(), "item/XYZ/");
    }

    // ==================== Pattern Validation Tests ====================

    #[test]
    fn test_invalid_patterns_rejected() {
        assert!(RouteTable::new().with_route("a", "<str:sku/").is_err());
        assert!(RouteTable::new().with_route("a", "<uuid:id>/").is_err());
        assert!(RouteTable::new().with_route("a", "<str:>/").is_err());
    }

    #[test]
    fn test_literal_characters_are_escaped() {
        let table = RouteTable::new().with_route("feed", "feed.xml").unwrap();
        assert!(table.resolve("feed.xml").is_ok());
        assert!(table.resolve("feedxxml").is_err());
    }

    #[test]
    fn test_serde_roundtrip_is_transparent() {
        let json = serde_json::to_string(&product_routes()).unwrap();
        assert!(json.starts_with('['));
        let restored: RouteTable = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, product_routes());
    }

    // ==================== Compiled Pattern Tests ====================

    #[test]
    fn test_with_route_keeps_compiled_pattern() {
        let table = product_routes();
        assert!(table.routes.iter().all(|r| r.compiled.get().is_some()));
    }

    #[test]
    fn test_deserialized_table_compiles_once_on_resolve() {
        let json = r#"[{"name":"list","pattern":""},{"name":"detail","pattern":"<str:sku>/"}]"#;
        let table: RouteTable = serde_json::from_str(json).unwrap();
        assert!(table.routes.iter().all(|r| r.compiled.get().is_none()));

        assert_eq!(table.resolve("/ABC/").unwrap().name, "detail");
        let first = table.routes[1].compiled.get().unwrap() as *const Regex;

        assert_eq!(table.resolve("/DEF/").unwrap().name, "detail");
        let second = table.routes[1].compiled.get().unwrap() as *const Regex;
        assert_eq!(first, second);
    }
}
