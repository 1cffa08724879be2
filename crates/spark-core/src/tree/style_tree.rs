//! Style trees: nested nodes carrying declarations and nested rules.
//!
//! A [`StyleNode`] is the authoring form of a component. Each node may have:
//!
//! - its own declarations, emitted as `.{class} { … }`
//! - nested rules keyed by a [`Selector`] template (`&:hover`, `&.$(active)`)
//! - child nodes, each of which gets its own generated class
//!
//! ```rust
//! use spark_core::{Selector, StyleNode};
//!
//! let card = StyleNode::new()
//!     .decl("display", "flex")
//!     .rule(Selector::parent().pseudo(":hover"), [("boxShadow", "0 1px 2px #0003")])
//!     .child("avatar", StyleNode::new().decl("borderRadius", "50%"))
//!     .child("checked", StyleNode::new());
//!
//! assert_eq!(card.children().count(), 2);
//! ```

use indexmap::IndexMap;
use serde::Deserialize;

use super::parse;
use super::value::{Declarations, Value};
use crate::css::normalize_property;
use crate::error::{Result, SparkError};
use crate::path::{check_siblings, KeyPath};
use crate::selector::Selector;

/// One node of a style tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleNode {
    declarations: Declarations,
    rules: IndexMap<Selector, Declarations>,
    children: IndexMap<String, StyleNode>,
}

/// The root node of an authored component.
pub type StyleTree = StyleNode;

impl StyleNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one declaration to this node.
    pub fn decl(mut self, property: &str, value: impl Into<Value>) -> Self {
        self.declarations.set(property, value);
        self
    }

    /// Merges a declaration map into this node's own declarations.
    pub fn declarations_from(mut self, decls: impl IntoIterator<Item = (impl AsRef<str>, impl Into<Value>)>) -> Self {
        for (property, value) in decls {
            self.declarations.set(property.as_ref(), value);
        }
        self
    }

    /// Adds a nested rule. Repeating a selector merges into the existing rule.
    pub fn rule<K, V>(mut self, selector: Selector, decls: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let incoming: Declarations = decls.into_iter().collect();
        let entry = self.rules.entry(selector).or_default();
        *entry = entry.merge(&incoming);
        self
    }

    /// Adds a child node, replacing any previous child under the same key.
    pub fn child(mut self, key: impl Into<String>, node: StyleNode) -> Self {
        self.children.insert(key.into(), node);
        self
    }

    pub(crate) fn declarations_mut(&mut self) -> &mut Declarations {
        &mut self.declarations
    }

    pub(crate) fn insert_rule(&mut self, selector: Selector, decls: Declarations) {
        let entry = self.rules.entry(selector).or_default();
        *entry = entry.merge(&decls);
    }

    pub(crate) fn insert_child(&mut self, key: String, node: StyleNode) {
        self.children.insert(key, node);
    }

    pub fn declarations(&self) -> &Declarations {
        &self.declarations
    }

    pub fn rules(&self) -> impl Iterator<Item = (&Selector, &Declarations)> {
        self.rules.iter()
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &StyleNode)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_child(&self, key: &str) -> Option<&StyleNode> {
        self.children.get(key)
    }

    /// Looks up the node at `path`; the root path is this node.
    pub fn get(&self, path: &KeyPath) -> Option<&StyleNode> {
        let mut node = self;
        for key in path.segments() {
            node = node.children.get(key)?;
        }
        Some(node)
    }

    /// True when the node has no declarations, rules or children.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty() && self.rules.is_empty() && self.children.is_empty()
    }

    /// All node paths, depth-first pre-order, starting with the root.
    pub fn node_paths(&self) -> Vec<KeyPath> {
        let mut out = Vec::new();
        collect_paths(self, KeyPath::root(), &mut out);
        out
    }

    /// Checks every level for empty or colliding child keys.
    pub fn validate(&self) -> Result<()> {
        validate_at(self, &KeyPath::root())
    }

    /// Deep-merges `patch` over a copy of this node.
    ///
    /// Declarations and same-selector rules merge shallowly (patch wins),
    /// children present on one side only are kept, children present on both
    /// sides merge recursively. A key that is a declaration on one side and a
    /// child node on the other is a [`SparkError::StructuralConflict`].
    pub fn merge(&self, patch: &StyleNode) -> Result<StyleNode> {
        merge_at(self, patch, &KeyPath::root())
    }

    /// Parses a style tree from YAML text.
    ///
    /// ```rust
    /// use spark_core::StyleNode;
    ///
    /// let tree = StyleNode::from_yaml(r#"
    /// display: flex
    /// "&:hover": { opacity: 0.8 }
    /// avatar:
    ///   borderRadius: 50%
    /// "#).unwrap();
    /// assert!(tree.get_child("avatar").is_some());
    /// assert_eq!(tree.rules().count(), 1);
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let root = parse::parse_yaml(yaml)?;
        parse::style_node(&root, &KeyPath::root())
    }

    /// Parses a style tree from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let root = parse::parse_json(json)?;
        parse::style_node(&root, &KeyPath::root())
    }
}

fn collect_paths(node: &StyleNode, at: KeyPath, out: &mut Vec<KeyPath>) {
    out.push(at.clone());
    for (key, child) in &node.children {
        collect_paths(child, at.join(key.as_str()), out);
    }
}

fn validate_at(node: &StyleNode, at: &KeyPath) -> Result<()> {
    check_siblings(at, node.children.keys().map(String::as_str))?;
    for (key, child) in &node.children {
        if node.declarations.contains(key) {
            return Err(SparkError::StructuralConflict {
                path: at.join(key.as_str()),
                existing: "declaration",
                incoming: "node",
            });
        }
        validate_at(child, &at.join(key.as_str()))?;
    }
    Ok(())
}

fn merge_at(base: &StyleNode, patch: &StyleNode, at: &KeyPath) -> Result<StyleNode> {
    for property in patch.declarations.properties() {
        if base
            .children
            .keys()
            .any(|key| normalize_property(key) == property)
        {
            return Err(SparkError::StructuralConflict {
                path: at.join(property),
                existing: "node",
                incoming: "declaration",
            });
        }
    }

    let mut merged = base.clone();
    merged.declarations = base.declarations.merge(&patch.declarations);
    for (selector, decls) in &patch.rules {
        merged.insert_rule(selector.clone(), decls.clone());
    }

    for (key, incoming) in &patch.children {
        let path = at.join(key.as_str());
        if base.declarations.contains(key) {
            return Err(SparkError::StructuralConflict {
                path,
                existing: "declaration",
                incoming: "node",
            });
        }
        let next = match base.children.get(key) {
            Some(existing) => merge_at(existing, incoming, &path)?,
            None => incoming.clone(),
        };
        merged.children.insert(key.clone(), next);
    }
    Ok(merged)
}

impl<'de> Deserialize<'de> for StyleNode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = serde_yaml::Value::deserialize(deserializer)?;
        parse::style_node(&raw, &KeyPath::root()).map_err(serde::de::Error::custom)
    }
}
