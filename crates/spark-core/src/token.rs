//! Design tokens: value trees compiled into CSS custom properties.
//!
//! Every leaf of a token's [`ValueTree`] becomes one custom property named
//! `--{prefix}-{kebab(path)}`. Forking a token merges a patch over its tree
//! and registers only the patched leaves, under the same names, so the later
//! registration overrides the earlier one in the cascade.
//!
//! ```rust
//! use spark_core::{StyleRegistry, TokenOptions, ValueTree};
//!
//! let mut registry = StyleRegistry::new();
//! let tree = ValueTree::new().tree("a", ValueTree::new().leaf("b", "1px"));
//! let token = registry.token(&tree, TokenOptions::new("x")).unwrap();
//!
//! assert_eq!(token.name("a.b").unwrap(), "--x-a-b");
//! assert_eq!(token.var("a.b").unwrap(), "var(--x-a-b)");
//! assert!(registry.to_css().contains("--x-a-b: 1px;"));
//! ```

use indexmap::IndexMap;

use crate::error::{Result, SparkError};
use crate::path::{custom_property, KeyPath};
use crate::registry::{ForkOptions, RegistryId, StyleRegistry, TokenId};
use crate::tree::{Value, ValueTree};

/// Options for [`StyleRegistry::token`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOptions {
    pub prefix: String,
}

impl TokenOptions {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

/// Handle to a registered token.
///
/// The handle carries the merged tree, so lookups need no registry access.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub(crate) registry: RegistryId,
    pub(crate) id: TokenId,
    pub(crate) prefix: String,
    pub(crate) scope: String,
    pub(crate) tree: ValueTree,
}

impl Token {
    pub fn id(&self) -> TokenId {
        self.id
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The selector the custom properties are declared under.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The full value tree, with every fork in the chain applied.
    pub fn tree(&self) -> &ValueTree {
        &self.tree
    }

    /// The value of the leaf at `path`.
    pub fn value(&self, path: impl Into<KeyPath>) -> Result<&Value> {
        let path = path.into();
        match self.tree.leaf_at(&path) {
            Some(value) => Ok(value),
            None => Err(SparkError::UnknownPath {
                path,
                owner: self.prefix.clone(),
            }),
        }
    }

    /// The custom property name of the leaf at `path`.
    pub fn name(&self, path: impl Into<KeyPath>) -> Result<String> {
        let path = path.into();
        self.value(path.clone())?;
        Ok(custom_property(&self.prefix, path.segments()))
    }

    /// `var(--…)` for the leaf at `path`.
    pub fn var(&self, path: impl Into<KeyPath>) -> Result<String> {
        Ok(format!("var({})", self.name(path)?))
    }

    /// Forks this token; see [`StyleRegistry::fork_token`].
    pub fn fork(&self, registry: &mut StyleRegistry, patch: &ValueTree) -> Result<Token> {
        registry.fork_token(self, patch)
    }

    /// Forks this token with explicit options.
    pub fn fork_with(
        &self,
        registry: &mut StyleRegistry,
        patch: &ValueTree,
        options: ForkOptions,
    ) -> Result<Token> {
        registry.fork_token_with(self, patch, options)
    }
}

/// Stored form of a token registration: a delta over its parent.
#[derive(Debug, Clone)]
pub(crate) struct TokenRecord {
    pub(crate) parent: Option<TokenId>,
    pub(crate) lineage: TokenId,
    pub(crate) prefix: String,
    pub(crate) scope: String,
    pub(crate) tree: ValueTree,
    /// Custom properties this registration declares.
    pub(crate) entries: IndexMap<String, Value>,
}

/// Flattens a tree into `{custom property → value}`.
///
/// Two leaves that resolve to the same property name are rejected.
pub(crate) fn flatten(prefix: &str, tree: &ValueTree) -> Result<IndexMap<String, Value>> {
    let mut entries = IndexMap::new();
    let mut paths: IndexMap<String, KeyPath> = IndexMap::new();
    for (path, value) in tree.leaves() {
        let property = custom_property(prefix, path.segments());
        if let Some(first) = paths.get(&property) {
            return Err(SparkError::DuplicateIdentifier {
                identifier: property,
                first: first.clone(),
                second: path,
            });
        }
        paths.insert(property.clone(), path);
        entries.insert(property, value.clone());
    }
    Ok(entries)
}
