//! Property-based tests for forking and identifier resolution.

use std::collections::BTreeMap;

use proptest::prelude::*;
use spark_core::{ComponentOptions, KeyPath, StyleNode, StyleRegistry, TokenOptions, Value, ValueTree};

// ============================================================================
// Strategies
// ============================================================================

const PROPERTIES: [&str; 4] = ["color", "margin", "padding", "opacity"];

fn build(decls: BTreeMap<&'static str, String>, children: BTreeMap<String, StyleNode>) -> StyleNode {
    let mut node = StyleNode::new();
    for (property, value) in decls {
        node = node.decl(property, value);
    }
    for (key, child) in children {
        node = node.child(key, child);
    }
    node
}

fn decls_strategy() -> impl Strategy<Value = BTreeMap<&'static str, String>> {
    prop::collection::btree_map(prop::sample::select(PROPERTIES.to_vec()), "[a-z]{1,6}", 0..3)
}

// Child keys start with `n`, property names never do, so a node's
// declarations and children cannot collide.
fn node_strategy() -> impl Strategy<Value = StyleNode> {
    let leaf = decls_strategy().prop_map(|decls| build(decls, BTreeMap::new()));
    leaf.prop_recursive(3, 24, 3, |inner| {
        (
            decls_strategy(),
            prop::collection::btree_map("n[a-z]{1,3}", inner, 0..3),
        )
            .prop_map(|(decls, children)| build(decls, children))
    })
}

fn segments_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,5}", 1..4)
}

fn nested_value(segments: &[String], value: &str) -> ValueTree {
    let (last, parents) = segments.split_last().expect("non-empty path");
    parents
        .iter()
        .rev()
        .fold(ValueTree::new().leaf(last.clone(), value), |tree, key| {
            ValueTree::new().tree(key.clone(), tree)
        })
}

fn nested_node(segments: &[String]) -> StyleNode {
    segments
        .iter()
        .rev()
        .fold(StyleNode::new(), |node, key| StyleNode::new().child(key.clone(), node))
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// Every path of a component keeps its class in any fork.
    #[test]
    fn fork_preserves_identifiers(base in node_strategy(), patch in node_strategy()) {
        let mut registry = StyleRegistry::new();
        let card = registry.component(&base, ComponentOptions::new("card")).unwrap();
        let fork = registry.fork(&card, &patch).unwrap();

        let before = registry.identifiers(&card).unwrap();
        let after = registry.identifiers(&fork).unwrap();
        for (path, class) in &before {
            prop_assert_eq!(after.get(path), Some(class));
        }
    }

    /// Two forks over disjoint branches equal one fork with both patches.
    #[test]
    fn sequential_forks_equal_merged_fork(
        base in node_strategy(),
        left in node_strategy(),
        right in node_strategy(),
    ) {
        let base = base.child("left", StyleNode::new()).child("right", StyleNode::new());
        let a = StyleNode::new().child("left", left);
        let b = StyleNode::new().child("right", right);

        let mut chained = StyleRegistry::new();
        let card = chained.component(&base, ComponentOptions::new("card")).unwrap();
        let first = chained.fork(&card, &a).unwrap();
        let second = chained.fork(&first, &b).unwrap();

        let mut single = StyleRegistry::new();
        let card = single.component(&base, ComponentOptions::new("card")).unwrap();
        let merged = single.fork(&card, &a.merge(&b).unwrap()).unwrap();

        prop_assert_eq!(
            chained.identifiers(&second).unwrap(),
            single.identifiers(&merged).unwrap()
        );
        prop_assert_eq!(
            chained.computed(&second).unwrap(),
            single.computed(&merged).unwrap()
        );
    }

    /// A fork's declaration wins over the base's for the same selector.
    #[test]
    fn fork_declaration_overrides_base(
        base in node_strategy(),
        original in "[a-z]{1,6}",
        replacement in "[a-z]{1,6}",
    ) {
        let base = base.decl("color", original);
        let mut registry = StyleRegistry::new();
        let card = registry.component(&base, ComponentOptions::new("card")).unwrap();
        let fork = registry
            .fork(&card, &StyleNode::new().decl("color", replacement.clone()))
            .unwrap();

        let computed = registry.computed(&fork).unwrap();
        prop_assert_eq!(computed[".card"].get("color"), Some(&Value::from(replacement)));
    }

    /// A token property and a component class at the same path share a name.
    #[test]
    fn resolution_is_deterministic(segments in segments_strategy()) {
        let mut registry = StyleRegistry::new();
        let token = registry
            .token(&nested_value(&segments, "1px"), TokenOptions::new("spark"))
            .unwrap();
        let component = registry
            .component(&nested_node(&segments), ComponentOptions::new("spark"))
            .unwrap();

        let path = KeyPath::from(segments.clone());
        let class = component.class(path.clone()).unwrap();
        prop_assert_eq!(token.name(path).unwrap(), format!("--{}", class));
    }

    /// The dark side of a mode map keeps every light identifier.
    #[test]
    fn dark_mode_keeps_light_identifiers(light in node_strategy(), dark in node_strategy()) {
        let mut registry = StyleRegistry::new();
        let card = registry.component(&light, ComponentOptions::new("card")).unwrap();
        let modes = registry.build_modes(&card, &dark).unwrap();

        let light_ids = registry.identifiers(&modes.light).unwrap();
        let dark_ids = registry.identifiers(&modes.dark).unwrap();
        for (path, class) in &light_ids {
            prop_assert_eq!(dark_ids.get(path), Some(class));
        }
    }

    /// Compiling the same trees twice gives the same CSS.
    #[test]
    fn compilation_is_repeatable(base in node_strategy(), patch in node_strategy()) {
        let compile = || {
            let mut registry = StyleRegistry::new();
            let card = registry.component(&base, ComponentOptions::new("card")).unwrap();
            registry.fork(&card, &patch).unwrap();
            registry.to_css()
        };
        prop_assert_eq!(compile(), compile());
    }
}
