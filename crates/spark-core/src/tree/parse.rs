//! YAML and JSON authoring for value trees and style trees.
//!
//! Both formats are read into a `serde_yaml::Value` first and then walked by
//! hand. Walking the generic value keeps integer keys (breakpoints such as
//! `396`) usable and lets every error name the path it happened at.
//!
//! # Style tree layout
//!
//! ```yaml
//! display: flex              # scalar value: declaration on this node
//! "&:hover":                 # selector key: nested rule
//!   opacity: 0.8
//! "& > $(avatar)": "margin: 0 4px"   # nested rule written as CSS text
//! avatar:                    # mapping value: child node
//!   borderRadius: 50%
//! ```
//!
//! A key is a selector template when it starts with one of `& : > + ~ [ . *`
//! or contains `&` or `$(`. Booleans, nulls and sequences are rejected.

use serde_yaml::Value as Yaml;

use super::style_tree::StyleNode;
use super::value::{Declarations, Value};
use super::value_tree::{ValueNode, ValueTree};
use crate::css::parse_declarations;
use crate::error::{Result, SparkError};
use crate::path::KeyPath;
use crate::selector::Selector;

pub(crate) fn parse_yaml(text: &str) -> Result<Yaml> {
    serde_yaml::from_str(text).map_err(|e| SparkError::parse(e.to_string()))
}

pub(crate) fn parse_json(text: &str) -> Result<Yaml> {
    serde_json::from_str(text).map_err(|e| SparkError::parse(e.to_string()))
}

fn location(at: &KeyPath) -> String {
    if at.is_root() {
        "at the root".to_string()
    } else {
        format!("at '{}'", at)
    }
}

fn kind_name(value: &Yaml) -> &'static str {
    match value {
        Yaml::Null => "null",
        Yaml::Bool(_) => "boolean",
        Yaml::Number(_) => "number",
        Yaml::String(_) => "string",
        Yaml::Sequence(_) => "sequence",
        Yaml::Mapping(_) => "mapping",
        Yaml::Tagged(_) => "tagged value",
    }
}

/// Reads a mapping key. Numeric keys are stringified.
pub(crate) fn key_text(key: &Yaml, at: &KeyPath) -> Result<String> {
    match key {
        Yaml::String(s) => Ok(s.clone()),
        Yaml::Number(n) => Ok(n.to_string()),
        other => Err(SparkError::parse(format!(
            "{}: keys must be strings or numbers, found {}",
            location(at),
            kind_name(other)
        ))),
    }
}

/// Reads a scalar leaf value.
pub(crate) fn scalar(value: &Yaml, at: &KeyPath) -> Result<Value> {
    match value {
        Yaml::String(s) => Ok(Value::Text(s.clone())),
        Yaml::Number(n) => n.as_f64().map(Value::Number).ok_or_else(|| {
            SparkError::parse(format!("{}: number {} is out of range", location(at), n))
        }),
        other => Err(SparkError::parse(format!(
            "{}: expected a string or number, found {}",
            location(at),
            kind_name(other)
        ))),
    }
}

fn mapping<'a>(value: &'a Yaml, at: &KeyPath) -> Result<&'a serde_yaml::Mapping> {
    value.as_mapping().ok_or_else(|| {
        SparkError::parse(format!(
            "{}: expected a mapping, found {}",
            location(at),
            kind_name(value)
        ))
    })
}

/// Builds a [`ValueTree`]: mappings become subtrees, scalars become leaves.
pub(crate) fn value_tree(value: &Yaml, at: &KeyPath) -> Result<ValueTree> {
    let mut tree = ValueTree::new();
    for (key, entry) in mapping(value, at)? {
        let key = key_text(key, at)?;
        let path = at.join(key.as_str());
        let node = match entry {
            Yaml::Mapping(_) => ValueNode::Tree(value_tree(entry, &path)?),
            other => ValueNode::Leaf(scalar(other, &path)?),
        };
        tree.insert(key, node);
    }
    Ok(tree)
}

/// True when a style-tree key is a selector template rather than a child
/// name or property.
pub(crate) fn is_selector_key(key: &str) -> bool {
    let key = key.trim_start();
    key.starts_with(['&', ':', '>', '+', '~', '[', '.', '*']) || key.contains('&') || key.contains("$(")
}

/// Builds a [`StyleNode`] from a mapping.
pub(crate) fn style_node(value: &Yaml, at: &KeyPath) -> Result<StyleNode> {
    let mut node = StyleNode::new();
    for (key, entry) in mapping(value, at)? {
        let key = key_text(key, at)?;
        if is_selector_key(&key) {
            let selector = Selector::parse(&key)?;
            let decls = declarations(entry, &at.join(key.as_str()))?;
            node.insert_rule(selector, decls);
            continue;
        }
        let path = at.join(key.as_str());
        match entry {
            Yaml::Mapping(_) => {
                let child = style_node(entry, &path)?;
                node.insert_child(key, child);
            }
            other => {
                let value = scalar(other, &path)?;
                node.declarations_mut().set(&key, value);
            }
        }
    }
    Ok(node)
}

/// Reads a declaration block: a flat mapping or a string of CSS text.
pub(crate) fn declarations(value: &Yaml, at: &KeyPath) -> Result<Declarations> {
    match value {
        Yaml::String(css) => parse_declarations(css).map_err(|err| match err {
            SparkError::Parse { path, message } => SparkError::Parse {
                path,
                message: format!("{}: {}", location(at), message),
            },
            other => other,
        }),
        Yaml::Mapping(map) => {
            let mut decls = Declarations::new();
            for (key, entry) in map {
                let property = key_text(key, at)?;
                let path = at.join(property.as_str());
                if entry.is_mapping() {
                    return Err(SparkError::parse(format!(
                        "{}: declaration blocks cannot nest",
                        location(&path)
                    )));
                }
                decls.set(&property, scalar(entry, &path)?);
            }
            Ok(decls)
        }
        other => Err(SparkError::parse(format!(
            "{}: expected declarations, found {}",
            location(at),
            kind_name(other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Yaml {
        parse_yaml(text).unwrap()
    }

    #[test]
    fn test_value_tree_integer_keys() {
        let tree = value_tree(&yaml("396: 24px\n1024:\n  gap: 8\n"), &KeyPath::root()).unwrap();
        assert_eq!(tree.leaf_at(&KeyPath::parse("396")), Some(&Value::from("24px")));
        assert_eq!(tree.leaf_at(&KeyPath::parse("1024.gap")), Some(&Value::from(8)));
    }

    #[test]
    fn test_value_tree_rejects_bool() {
        let err = value_tree(&yaml("a:\n  b: true\n"), &KeyPath::root()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'a.b'"), "{msg}");
        assert!(msg.contains("boolean"), "{msg}");
    }

    #[test]
    fn test_value_tree_rejects_sequence() {
        assert!(value_tree(&yaml("a: [1, 2]"), &KeyPath::root()).is_err());
    }

    #[test]
    fn test_value_tree_requires_mapping() {
        assert!(value_tree(&yaml("just text"), &KeyPath::root()).is_err());
    }

    #[test]
    fn test_is_selector_key() {
        assert!(is_selector_key("&:hover"));
        assert!(is_selector_key(":focus-visible"));
        assert!(is_selector_key("> span"));
        assert!(is_selector_key("$(avatar) &"));
        assert!(is_selector_key("[data-open]"));
        assert!(is_selector_key(".is-open &"));
        assert!(!is_selector_key("avatar"));
        assert!(!is_selector_key("backgroundColor"));
        assert!(!is_selector_key("396"));
    }

    #[test]
    fn test_style_node_layout() {
        let node = style_node(
            &yaml(
                r#"
display: flex
"&:hover":
  opacity: 0.8
"& > $(avatar)": "margin: 0 4px"
avatar:
  borderRadius: 50%
"#,
            ),
            &KeyPath::root(),
        )
        .unwrap();
        assert_eq!(node.declarations().get("display"), Some(&Value::from("flex")));
        assert_eq!(node.rules().count(), 2);
        let (_, inline) = node.rules().nth(1).unwrap();
        assert_eq!(inline.get("margin"), Some(&Value::from("0 4px")));
        let avatar = node.get_child("avatar").unwrap();
        assert!(avatar.declarations().contains("border-radius"));
    }

    #[test]
    fn test_style_node_bad_selector_key() {
        let err = style_node(&yaml("\"& > > a\": { color: red }"), &KeyPath::root()).unwrap_err();
        assert!(matches!(err, SparkError::InvalidSelector { .. }));
    }

    #[test]
    fn test_declarations_cannot_nest() {
        let err = declarations(&yaml("color:\n  inner: red\n"), &KeyPath::parse("x")).unwrap_err();
        assert!(err.to_string().contains("cannot nest"));
    }

    #[test]
    fn test_declarations_css_text_error_names_location() {
        let err = declarations(&yaml("\"color: ;\""), &KeyPath::parse("&:hover")).unwrap_err();
        assert!(err.to_string().contains("'&:hover'"));
    }

    #[test]
    fn test_parse_json_into_yaml_value() {
        let value = parse_json(r#"{"a": {"b": "1px"}}"#).unwrap();
        let tree = value_tree(&value, &KeyPath::root()).unwrap();
        assert_eq!(tree.leaf_at(&KeyPath::parse("a.b")), Some(&Value::from("1px")));
    }
}
