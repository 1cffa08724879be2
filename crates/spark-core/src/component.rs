//! Components: style trees compiled into classes and rules.
//!
//! Building a component runs in two passes:
//!
//! 1. every node of the tree gets its class (`$`), resolved from the class name
//!    and the node's path
//! 2. declarations and nested rules are rendered, with `$(path)` references
//!    looked up in the finished table, and emitted depth-first
//!
//! Forking reuses the parent's whole class table. Only paths the parent does
//! not have get new classes, and only the patch's rules are emitted, after the
//! parent's.
//!
//! ```rust
//! use spark_core::{ComponentOptions, StyleNode, StyleRegistry};
//!
//! let mut registry = StyleRegistry::new();
//! let tree = StyleNode::new()
//!     .child("base", StyleNode::new())
//!     .child("checked", StyleNode::new());
//! let card = registry.component(&tree, ComponentOptions::new("card")).unwrap();
//!
//! assert_eq!(card.classes().class(), "card");
//! assert_eq!(card.classes()["checked"].class(), "card-checked");
//!
//! let red = card
//!     .fork(&mut registry, &StyleNode::new().child("checked", StyleNode::new().decl("color", "red")))
//!     .unwrap();
//! assert_eq!(red.class("checked").unwrap(), "card-checked");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::css::class_selector;
use crate::error::{Result, SparkError};
use crate::path::{resolve_path, KeyPath};
use crate::registry::{ComponentId, ForkOptions, RegistryId, StyleRegistry};
use crate::selector::{interpolate_classes, ClassRef};
use crate::sheet::Rule;
use crate::tree::{Declarations, StyleNode, Value};

/// Options for [`StyleRegistry::component`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentOptions {
    /// The root class; every node class starts with it.
    pub class_name: String,
}

impl ComponentOptions {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
        }
    }
}

/// The generated classes of a component, shaped like its style tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTree {
    class: String,
    children: IndexMap<String, ClassTree>,
}

impl ClassTree {
    /// The class of this node (the `$` accessor).
    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn child(&self, key: &str) -> Option<&ClassTree> {
        self.children.get(key)
    }

    pub fn get(&self, path: &KeyPath) -> Option<&ClassTree> {
        let mut node = self;
        for key in path.segments() {
            node = node.children.get(key)?;
        }
        Some(node)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &ClassTree)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every `(path, class)` pair, depth-first pre-order.
    pub fn flatten(&self) -> Vec<(KeyPath, &str)> {
        let mut out = Vec::new();
        collect_classes(self, KeyPath::root(), &mut out);
        out
    }
}

fn collect_classes<'a>(tree: &'a ClassTree, at: KeyPath, out: &mut Vec<(KeyPath, &'a str)>) {
    out.push((at.clone(), tree.class.as_str()));
    for (key, child) in &tree.children {
        collect_classes(child, at.join(key.as_str()), out);
    }
}

impl Index<&str> for ClassTree {
    type Output = ClassTree;

    fn index(&self, key: &str) -> &ClassTree {
        match self.children.get(key) {
            Some(child) => child,
            None => panic!("no node '{}' under class '{}'", key, self.class),
        }
    }
}

impl fmt::Display for ClassTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.class)
    }
}

impl Serialize for ClassTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.children.len() + 1))?;
        map.serialize_entry("$", &self.class)?;
        for (key, child) in &self.children {
            map.serialize_entry(key, child)?;
        }
        map.end()
    }
}

impl From<&ClassTree> for ClassRef {
    fn from(tree: &ClassTree) -> Self {
        ClassRef::Resolved(tree.class.clone())
    }
}

/// Builds the class tree for `shape` from a complete identifier table.
pub(crate) fn class_tree(shape: &StyleNode, table: &IndexMap<KeyPath, String>) -> ClassTree {
    build_class_tree(shape, &KeyPath::root(), table)
}

fn build_class_tree(node: &StyleNode, at: &KeyPath, table: &IndexMap<KeyPath, String>) -> ClassTree {
    let children = node
        .children()
        .map(|(key, child)| (key.to_string(), build_class_tree(child, &at.join(key), table)))
        .collect();
    ClassTree {
        class: table.get(at).cloned().unwrap_or_default(),
        children,
    }
}

/// Handle to a registered component.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub(crate) registry: RegistryId,
    pub(crate) id: ComponentId,
    pub(crate) class_name: String,
    pub(crate) scope: Option<String>,
    pub(crate) tree: StyleNode,
    pub(crate) classes: ClassTree,
}

impl Component {
    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Ancestor selector the component's rules are emitted under, if any.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// The merged style tree, with every fork in the chain applied.
    pub fn tree(&self) -> &StyleNode {
        &self.tree
    }

    pub fn classes(&self) -> &ClassTree {
        &self.classes
    }

    /// The class of the node at `path`.
    pub fn class(&self, path: impl Into<KeyPath>) -> Result<&str> {
        let path = path.into();
        match self.classes.get(&path) {
            Some(node) => Ok(node.class()),
            None => Err(SparkError::UnknownPath {
                path,
                owner: self.class_name.clone(),
            }),
        }
    }

    /// Forks this component; see [`StyleRegistry::fork`].
    pub fn fork(&self, registry: &mut StyleRegistry, patch: &StyleNode) -> Result<Component> {
        registry.fork(self, patch)
    }

    /// Forks this component with explicit options.
    pub fn fork_with(
        &self,
        registry: &mut StyleRegistry,
        patch: &StyleNode,
        options: ForkOptions,
    ) -> Result<Component> {
        registry.fork_with(self, patch, options)
    }
}

/// Stored form of a component registration: a delta over its parent.
#[derive(Debug, Clone)]
pub(crate) struct ComponentRecord {
    pub(crate) parent: Option<ComponentId>,
    pub(crate) lineage: ComponentId,
    pub(crate) class_name: String,
    pub(crate) scope: Option<String>,
    pub(crate) tree: StyleNode,
    /// Classes first assigned by this registration.
    pub(crate) added: IndexMap<KeyPath, String>,
    /// Rules this registration emits.
    pub(crate) rules: Vec<Rule>,
}

#[derive(Debug)]
pub(crate) struct Compiled {
    pub(crate) added: IndexMap<KeyPath, String>,
    pub(crate) table: IndexMap<KeyPath, String>,
    pub(crate) rules: Vec<Rule>,
}

/// Compiles one registration.
///
/// `shape` is the full merged tree and decides which nodes need classes;
/// `emit` is the part whose rules this registration writes (the whole tree for
/// a base component, the patch for a fork). `inherited` is the parent's table.
pub(crate) fn compile(
    class_name: &str,
    inherited: &IndexMap<KeyPath, String>,
    shape: &StyleNode,
    emit: &StyleNode,
    scope: Option<&str>,
) -> Result<Compiled> {
    shape.validate()?;

    let mut table = inherited.clone();
    let mut added = IndexMap::new();
    let mut owners: HashMap<String, KeyPath> =
        table.iter().map(|(path, class)| (class.clone(), path.clone())).collect();

    for path in shape.node_paths() {
        if table.contains_key(&path) {
            continue;
        }
        let class = resolve_path(class_name, &path);
        if let Some(first) = owners.get(&class) {
            return Err(SparkError::DuplicateIdentifier {
                identifier: class,
                first: first.clone(),
                second: path,
            });
        }
        owners.insert(class.clone(), path.clone());
        table.insert(path.clone(), class.clone());
        added.insert(path, class);
    }

    let mut rules = Vec::new();
    emit_node(emit, &KeyPath::root(), &table, scope, &mut rules)
        .map_err(|err| in_component(err, class_name))?;

    Ok(Compiled {
        added,
        table,
        rules,
    })
}

fn emit_node(
    node: &StyleNode,
    at: &KeyPath,
    table: &IndexMap<KeyPath, String>,
    scope: Option<&str>,
    out: &mut Vec<Rule>,
) -> Result<()> {
    let class = table.get(at).ok_or_else(|| SparkError::UnknownSelector {
        reference: at.clone(),
        context: "component tree".to_string(),
    })?;
    let lookup = |path: &KeyPath| table.get(path).cloned();
    let scope = scope.map(str::to_string);

    if !node.declarations().is_empty() {
        let decls = interpolate(node.declarations(), &lookup)?;
        out.push(Rule::new(class_selector(class), decls).scoped(scope.clone()));
    }
    for (selector, decls) in node.rules() {
        if decls.is_empty() {
            continue;
        }
        let text = selector.render(class, lookup)?;
        let decls = interpolate(decls, &lookup)?;
        out.push(Rule::new(text, decls).scoped(scope.clone()));
    }
    for (key, child) in node.children() {
        emit_node(child, &at.join(key), table, scope.as_deref(), out)?;
    }
    Ok(())
}

fn interpolate<F>(decls: &Declarations, lookup: &F) -> Result<Declarations>
where
    F: Fn(&KeyPath) -> Option<String>,
{
    let mut out = Declarations::new();
    for (property, value) in decls.iter() {
        let value = match value {
            Value::Text(text) if text.contains("$(") => Value::Text(interpolate_classes(text, lookup)?),
            other => other.clone(),
        };
        out.set(property, value);
    }
    Ok(out)
}

fn in_component(err: SparkError, class_name: &str) -> SparkError {
    match err {
        SparkError::UnknownSelector { reference, context } => SparkError::UnknownSelector {
            reference,
            context: format!("{} of component '{}'", context, class_name),
        },
        other => other,
    }
}
