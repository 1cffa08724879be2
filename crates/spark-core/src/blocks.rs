//! Conditional and global style blocks.
//!
//! Media queries, keyframes and `@supports` blocks sit outside the class
//! generation path: their conditions and selectors are written by the caller
//! (usually with classes already taken from [`ClassTree`](crate::ClassTree)s)
//! and pass through uninterpreted.
//!
//! ```rust
//! use indexmap::IndexMap;
//! use spark_core::{blocks::BlockMap, Declarations, StyleRegistry};
//!
//! let mut rules = IndexMap::new();
//! rules.insert(".spark-drawer".to_string(), Declarations::new().with("width", "100%"));
//! let mut media = BlockMap::new();
//! media.insert("@media (max-width: 396px)".to_string(), rules);
//!
//! let mut registry = StyleRegistry::new();
//! let block = registry.media(media);
//! assert_eq!(block.conditions(), ["@media (max-width: 396px)"]);
//! ```

use indexmap::IndexMap;

use crate::registry::{BlockId, RegistryId};
use crate::sheet::Rule;
use crate::tree::Declarations;

/// Selector (or keyframe step) → declarations.
pub type RuleMap = IndexMap<String, Declarations>;

/// Condition → rules.
pub type BlockMap = IndexMap<String, RuleMap>;

/// The kind of a registered block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Media,
    Keyframes,
    Supports,
    Global,
}

impl BlockKind {
    fn at_keyword(&self) -> Option<&'static str> {
        match self {
            BlockKind::Media => Some("media"),
            BlockKind::Keyframes => Some("keyframes"),
            BlockKind::Supports => Some("supports"),
            BlockKind::Global => None,
        }
    }
}

/// An at-rule wrapping a list of rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBlock {
    pub at_rule: String,
    pub rules: Vec<Rule>,
}

/// Compiled content of a registered block.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BlockContent {
    Conditional(Vec<ConditionalBlock>),
    Global(Vec<Rule>),
}

impl BlockContent {
    pub(crate) fn is_empty(&self) -> bool {
        match self {
            BlockContent::Conditional(blocks) => blocks.iter().all(|b| b.rules.is_empty()),
            BlockContent::Global(rules) => rules.is_empty(),
        }
    }

    pub(crate) fn conditions(&self) -> Vec<String> {
        match self {
            BlockContent::Conditional(blocks) => blocks.iter().map(|b| b.at_rule.clone()).collect(),
            BlockContent::Global(_) => Vec::new(),
        }
    }
}

/// Completes a condition into an at-rule prelude.
///
/// Text already starting with `@` is kept verbatim; a bare condition gets the
/// block's keyword (`fade` → `@keyframes fade`).
pub(crate) fn at_rule(kind: BlockKind, condition: &str) -> String {
    let condition = condition.trim();
    match kind.at_keyword() {
        Some(keyword) if !condition.starts_with('@') => format!("@{} {}", keyword, condition),
        _ => condition.to_string(),
    }
}

pub(crate) fn compile_conditional(kind: BlockKind, blocks: BlockMap) -> BlockContent {
    let compiled = blocks
        .into_iter()
        .map(|(condition, rules)| ConditionalBlock {
            at_rule: at_rule(kind, &condition),
            rules: compile_rules(rules),
        })
        .collect();
    BlockContent::Conditional(compiled)
}

pub(crate) fn compile_global(rules: RuleMap) -> BlockContent {
    BlockContent::Global(compile_rules(rules))
}

fn compile_rules(rules: RuleMap) -> Vec<Rule> {
    rules
        .into_iter()
        .map(|(selector, decls)| Rule::new(selector.trim(), decls))
        .collect()
}

/// Handle to a registered block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub(crate) registry: RegistryId,
    pub(crate) id: BlockId,
    pub(crate) kind: BlockKind,
    pub(crate) conditions: Vec<String>,
}

impl Block {
    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// The at-rule preludes of this block, in authoring order.
    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }
}
