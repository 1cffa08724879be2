//! Nested value trees for design tokens.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::parse;
use super::value::Value;
use crate::error::{Result, SparkError};
use crate::path::{check_siblings, KeyPath};

/// One entry of a [`ValueTree`]: a primitive leaf or a nested tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ValueNode {
    Leaf(Value),
    Tree(ValueTree),
}

impl ValueNode {
    fn kind(&self) -> &'static str {
        match self {
            ValueNode::Leaf(_) => "leaf",
            ValueNode::Tree(_) => "subtree",
        }
    }
}

impl From<Value> for ValueNode {
    fn from(value: Value) -> Self {
        ValueNode::Leaf(value)
    }
}

impl From<ValueTree> for ValueNode {
    fn from(tree: ValueTree) -> Self {
        ValueNode::Tree(tree)
    }
}

/// An ordered tree of token values (colors, sizes, durations).
///
/// ```rust
/// use spark_core::ValueTree;
///
/// let tree = ValueTree::new()
///     .leaf("radius", "4px")
///     .tree("color", ValueTree::new().leaf("bg", "#fff").leaf("fg", "#111"));
///
/// let paths: Vec<String> = tree.leaves().map(|(p, _)| p.to_string()).collect();
/// assert_eq!(paths, ["radius", "color.bg", "color.fg"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValueTree(IndexMap<String, ValueNode>);

impl ValueTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a leaf, returning `self` for chaining.
    pub fn leaf(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), ValueNode::Leaf(value.into()));
        self
    }

    /// Adds a nested tree, returning `self` for chaining.
    pub fn tree(mut self, key: impl Into<String>, tree: ValueTree) -> Self {
        self.0.insert(key.into(), ValueNode::Tree(tree));
        self
    }

    /// Inserts an entry, replacing any previous one under the same key.
    pub fn insert(&mut self, key: impl Into<String>, node: impl Into<ValueNode>) {
        self.0.insert(key.into(), node.into());
    }

    pub fn get(&self, key: &str) -> Option<&ValueNode> {
        self.0.get(key)
    }

    /// Looks up the node at `path`. The root path has no node.
    pub fn get_path(&self, path: &KeyPath) -> Option<&ValueNode> {
        let (last, parents) = path.segments().split_last()?;
        let mut tree = self;
        for key in parents {
            match tree.0.get(key)? {
                ValueNode::Tree(inner) => tree = inner,
                ValueNode::Leaf(_) => return None,
            }
        }
        tree.0.get(last)
    }

    /// Looks up the leaf value at `path`.
    pub fn leaf_at(&self, path: &KeyPath) -> Option<&Value> {
        match self.get_path(path)? {
            ValueNode::Leaf(value) => Some(value),
            ValueNode::Tree(_) => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValueNode)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates all leaves depth-first, in authoring order.
    pub fn leaves(&self) -> impl Iterator<Item = (KeyPath, &Value)> {
        let mut out = Vec::new();
        collect_leaves(self, &KeyPath::root(), &mut out);
        out.into_iter()
    }

    /// Checks every level for empty or colliding keys.
    pub fn validate(&self) -> Result<()> {
        validate_at(self, &KeyPath::root())
    }

    /// Deep-merges `patch` over a copy of this tree.
    ///
    /// Leaves in `patch` replace leaves at the same path and new paths are
    /// added. A leaf meeting a subtree (either way round) is a
    /// [`SparkError::StructuralConflict`]; `self` is never modified.
    pub fn merge(&self, patch: &ValueTree) -> Result<ValueTree> {
        merge_at(self, patch, &KeyPath::root())
    }

    /// Parses a tree from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let root = parse::parse_yaml(yaml)?;
        parse::value_tree(&root, &KeyPath::root())
    }

    /// Parses a tree from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let root = parse::parse_json(json)?;
        parse::value_tree(&root, &KeyPath::root())
    }
}

fn collect_leaves<'a>(tree: &'a ValueTree, at: &KeyPath, out: &mut Vec<(KeyPath, &'a Value)>) {
    for (key, node) in &tree.0 {
        let path = at.join(key.as_str());
        match node {
            ValueNode::Leaf(value) => out.push((path, value)),
            ValueNode::Tree(inner) => collect_leaves(inner, &path, out),
        }
    }
}

fn validate_at(tree: &ValueTree, at: &KeyPath) -> Result<()> {
    check_siblings(at, tree.0.keys().map(String::as_str))?;
    for (key, node) in &tree.0 {
        if let ValueNode::Tree(inner) = node {
            validate_at(inner, &at.join(key.as_str()))?;
        }
    }
    Ok(())
}

fn merge_at(base: &ValueTree, patch: &ValueTree, at: &KeyPath) -> Result<ValueTree> {
    let mut merged = base.clone();
    for (key, incoming) in &patch.0 {
        let path = at.join(key.as_str());
        let next = match (merged.0.get(key), incoming) {
            (None, node) => node.clone(),
            (Some(ValueNode::Leaf(_)), ValueNode::Leaf(value)) => ValueNode::Leaf(value.clone()),
            (Some(ValueNode::Tree(existing)), ValueNode::Tree(inner)) => {
                ValueNode::Tree(merge_at(existing, inner, &path)?)
            }
            (Some(existing), node) => {
                return Err(SparkError::StructuralConflict {
                    path,
                    existing: existing.kind(),
                    incoming: node.kind(),
                });
            }
        };
        merged.0.insert(key.clone(), next);
    }
    Ok(merged)
}

impl<'de> Deserialize<'de> for ValueTree {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = serde_yaml::Value::deserialize(deserializer)?;
        parse::value_tree(&raw, &KeyPath::root()).map_err(serde::de::Error::custom)
    }
}
