//! Semantic equality between configured and server-returned values.
//!
//! Each helper answers one question: is the server's value equivalent to
//! what the user wrote? Read paths use the answer to keep the user's exact
//! spelling when nothing meaningful changed, so plans stay quiet.

use serde_json::Value as Json;
use std::collections::{BTreeMap, BTreeSet};

/// Deep JSON equality of two condition blobs.
///
/// Empty on both sides is equal; empty or unparseable on one side is not.
pub fn condition_equal(server: &str, user: &str) -> bool {
    match parse_pair(server, user) {
        Pair::BothEmpty => true,
        Pair::Parsed(a, b) => a == b,
        Pair::Mismatch => false,
    }
}

/// Equality of member blocks: JSON objects whose values are sets of
/// primitives, compared key by key without regard to element order.
///
/// Non-object documents fall back to [`condition_equal`] semantics, except
/// that top-level arrays compare as [`array_of_maps_equal`] does.
pub fn members_equal(server: &str, user: &str) -> bool {
    match parse_pair(server, user) {
        Pair::BothEmpty => true,
        Pair::Mismatch => false,
        Pair::Parsed(Json::Object(a), Json::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, value)| b.get(key).is_some_and(|other| set_equal(value, other)))
        }
        Pair::Parsed(Json::Array(a), Json::Array(b)) => multiset(&a) == multiset(&b),
        Pair::Parsed(a, b) => a == b,
    }
}

/// Order-insensitive equality of two JSON arrays of objects.
pub fn array_of_maps_equal(server: &str, user: &str) -> bool {
    match parse_pair(server, user) {
        Pair::BothEmpty => true,
        Pair::Parsed(Json::Array(a), Json::Array(b)) => multiset(&a) == multiset(&b),
        Pair::Parsed(..) | Pair::Mismatch => false,
    }
}

/// Equality of resource-label maps whose values are comma-separated lists.
pub fn resource_labels_map_equal(
    server: &BTreeMap<String, String>,
    user: &BTreeMap<String, String>,
) -> bool {
    server.len() == user.len()
        && server.iter().all(|(key, value)| {
            user.get(key)
                .is_some_and(|other| split_label_values(value) == split_label_values(other))
        })
}

/// Split, trim and sort a comma-separated label value list.
pub fn split_label_values(values: &str) -> Vec<String> {
    let mut parts: Vec<String> = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    parts.sort();
    parts
}

/// Case-insensitive set membership.
pub fn case_insensitive_one_of(candidate: &str, allowed: &[&str]) -> bool {
    let candidate = candidate.to_lowercase();
    allowed.iter().any(|a| a.to_lowercase() == candidate)
}

/// Case-insensitive equality of two string sets.
pub fn case_insensitive_set_equal(a: &[String], b: &[String]) -> bool {
    let lower = |items: &[String]| -> BTreeSet<String> {
        items.iter().map(|s| s.to_lowercase()).collect()
    };
    lower(a) == lower(b)
}

/// Whether a plain constraint name is present among the server's names.
pub fn constraint_equal(name: &str, server_names: &[String]) -> bool {
    server_names.iter().any(|n| n == name)
}

/// The three fields of a condition constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionParts<'a> {
    pub title: &'a str,
    pub expression: &'a str,
    pub description: Option<&'a str>,
}

/// Whether every field of `user` appears verbatim somewhere in the
/// server's list. A missing field makes the whole comparison false.
pub fn condition_constraint_equal(user: &ConditionParts<'_>, server: &[ConditionParts<'_>]) -> bool {
    let has_title = server.iter().any(|s| s.title == user.title);
    let has_expression = server.iter().any(|s| s.expression == user.expression);
    let has_description = match user.description {
        Some(description) => server.iter().any(|s| s.description == Some(description)),
        None => true,
    };
    has_title && has_expression && has_description
}

/// Keep the configured spelling when it is equivalent to the server's,
/// otherwise adopt the server's value.
pub fn keep_configured(
    field: &str,
    configured: Option<&str>,
    server: &str,
    equal: impl Fn(&str, &str) -> bool,
) -> String {
    match configured {
        Some(configured) if equal(server, configured) => {
            log::debug!("{field}: kept configured form");
            configured.to_string()
        }
        _ => {
            log::debug!("{field}: adopted server form");
            server.to_string()
        }
    }
}

enum Pair {
    BothEmpty,
    Parsed(Json, Json),
    Mismatch,
}

fn parse_pair(server: &str, user: &str) -> Pair {
    let (server, user) = (server.trim(), user.trim());
    if server.is_empty() || user.is_empty() {
        return if server.is_empty() && user.is_empty() {
            Pair::BothEmpty
        } else {
            Pair::Mismatch
        };
    }
    match (
        serde_json::from_str::<Json>(server),
        serde_json::from_str::<Json>(user),
    ) {
        (Ok(a), Ok(b)) => Pair::Parsed(a, b),
        _ => Pair::Mismatch,
    }
}

fn set_equal(a: &Json, b: &Json) -> bool {
    match (a, b) {
        (Json::Array(x), Json::Array(y)) => {
            let x: BTreeSet<String> = x.iter().map(canonical).collect();
            let y: BTreeSet<String> = y.iter().map(canonical).collect();
            x == y
        }
        _ => a == b,
    }
}

fn multiset(items: &[Json]) -> Vec<String> {
    let mut out: Vec<String> = items.iter().map(canonical).collect();
    out.sort();
    out
}

// serde_json maps are key-ordered, so serialising gives a canonical form.
fn canonical(value: &Json) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_equal() {
        assert!(condition_equal(r#"{"a":1,"b":[1,2]}"#, r#"{ "b": [1, 2], "a": 1 }"#));
        assert!(!condition_equal(r#"{"b":[2,1]}"#, r#"{"b":[1,2]}"#));
        assert!(condition_equal("", "  "));
        assert!(!condition_equal("", "{}"));
        assert!(!condition_equal("{}", "not json"));
        assert!(!condition_equal("nope", "nope"));
    }

    #[test]
    fn test_members_equal_order_insensitive() {
        let server = r#"{"users":["b","a"],"groups":["g1"]}"#;
        let user = r#"{"groups":["g1"],"users":["a","b"]}"#;
        assert!(members_equal(server, user));
        assert!(members_equal(user, server));
        assert!(!members_equal(server, r#"{"users":["a"],"groups":["g1"]}"#));
        assert!(!members_equal(server, r#"{"users":["a","b"]}"#));
    }

    #[test]
    fn test_members_agrees_with_condition_on_identical_input() {
        let a = r#"{"users": ["x", "y"], "type": "static"}"#;
        let b = r#"{"users":["x","y"],"type":"static"}"#;
        assert_eq!(members_equal(a, b), condition_equal(a, b));
        assert!(members_equal(a, a));
    }

    #[test]
    fn test_members_top_level_array() {
        let server = r#"[{"id":"u2","type":"user"},{"id":"u1","type":"user"}]"#;
        let user = r#"[{"type":"user","id":"u1"},{"id":"u2","type":"user"}]"#;
        assert!(members_equal(server, user));
    }

    #[test]
    fn test_array_of_maps_equal() {
        let c = r#"[{"name":"x","values":["1"]},{"name":"y"}]"#;
        assert!(array_of_maps_equal(c, c));
        assert!(array_of_maps_equal(c, r#"[{"name":"y"},{"values":["1"],"name":"x"}]"#));
        assert!(!array_of_maps_equal(c, r#"[{"name":"y"}]"#));
        assert!(!array_of_maps_equal(c, r#"{"name":"y"}"#));
        assert!(!array_of_maps_equal(
            r#"[{"a":1},{"a":1}]"#,
            r#"[{"a":1}]"#
        ));
    }

    #[test]
    fn test_resource_labels_map_equal() {
        let mut server = BTreeMap::new();
        server.insert("env".to_string(), "prod, dev".to_string());
        let mut user = BTreeMap::new();
        user.insert("env".to_string(), "dev,prod".to_string());
        assert!(resource_labels_map_equal(&server, &user));

        user.insert("team".to_string(), "ops".to_string());
        assert!(!resource_labels_map_equal(&server, &user));
    }

    #[test]
    fn test_case_insensitive_helpers() {
        assert!(case_insensitive_one_of("Role", &["role", "action"]));
        assert!(!case_insensitive_one_of("group", &["role", "action"]));
        assert!(case_insensitive_set_equal(
            &["A".to_string(), "b".to_string()],
            &["B".to_string(), "a".to_string()]
        ));
    }

    #[test]
    fn test_constraint_equal() {
        let names = vec!["prod".to_string(), "dev".to_string()];
        assert!(constraint_equal("dev", &names));
        assert!(!constraint_equal("qa", &names));
    }

    #[test]
    fn test_condition_constraint_equal() {
        let server = [ConditionParts {
            title: "hours",
            expression: "time > 9",
            description: Some("office hours"),
        }];
        let same = ConditionParts {
            title: "hours",
            expression: "time > 9",
            description: Some("office hours"),
        };
        assert!(condition_constraint_equal(&same, &server));

        let no_description = ConditionParts {
            description: None,
            ..same
        };
        assert!(condition_constraint_equal(&no_description, &server));

        let changed = ConditionParts {
            expression: "time > 8",
            ..same
        };
        assert!(!condition_constraint_equal(&changed, &server));
        assert!(!condition_constraint_equal(&same, &[]));
    }

    #[test]
    fn test_keep_configured() {
        let kept = keep_configured("condition", Some(r#"{ "a": 1 }"#), r#"{"a":1}"#, condition_equal);
        assert_eq!(kept, r#"{ "a": 1 }"#);

        let adopted = keep_configured("condition", Some(r#"{"a":2}"#), r#"{"a":1}"#, condition_equal);
        assert_eq!(adopted, r#"{"a":1}"#);

        let imported = keep_configured("condition", None, r#"{"a":1}"#, condition_equal);
        assert_eq!(imported, r#"{"a":1}"#);
    }
}
