//! The style registry.
//!
//! [`StyleRegistry`] is the explicit accumulator every registration goes
//! through. It owns three arenas (token records, component records, block
//! records) addressed by [`TokenId`], [`ComponentId`] and [`BlockId`]. A fork
//! record stores only its delta and points at its parent by id; resolvers walk
//! the chain from the root to assemble identifier tables, rule lists and
//! custom-property tables.
//!
//! Registration order is recorded in a log and fixes emission order, so a fork
//! registered after its parent always comes later in the stylesheet.
//!
//! # Collisions
//!
//! Each generated class belongs to the lineage (root component and all of its
//! forks) that first claimed it, and each custom property to the token lineage
//! that first declared it. With
//! [`strict_collisions`](crate::SparkConfig::strict_collisions) on, an
//! unrelated lineage claiming either is rejected.
//!
//! ```rust
//! use spark_core::{ComponentOptions, SparkError, StyleNode, StyleRegistry};
//!
//! let mut registry = StyleRegistry::new();
//! let tree = StyleNode::new().child("base", StyleNode::new());
//! registry.component(&tree, ComponentOptions::new("card")).unwrap();
//!
//! let clash = registry.component(&StyleNode::new(), ComponentOptions::new("card-base"));
//! assert!(matches!(clash, Err(SparkError::DuplicateClass { .. })));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::blocks::{self, Block, BlockContent, BlockKind, BlockMap, RuleMap};
use crate::component::{self, class_tree, Component, ComponentOptions, ComponentRecord};
use crate::config::SparkConfig;
use crate::error::{Result, SparkError};
use crate::mode::{ColorMode, Forkable, ModeMap};
use crate::path::{validate_prefix, KeyPath};
use crate::sheet::{Rule, SheetItem, Stylesheet};
use crate::token::{flatten, Token, TokenOptions, TokenRecord};
use crate::tree::{Declarations, StyleNode, Value, ValueTree};

static NEXT_REGISTRY: AtomicU64 = AtomicU64::new(1);

/// Identity of one registry instance; handles carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryId(u64);

/// Index of a token record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub(crate) usize);

/// Index of a component record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) usize);

/// Index of a block record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) usize);

impl TokenId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl ComponentId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl BlockId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Options for forks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForkOptions {
    /// Scope selector for the fork's output. `None` inherits the parent's.
    pub scope: Option<String>,
}

impl ForkOptions {
    pub fn scoped(scope: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Token(TokenId),
    Component(ComponentId),
    Block(BlockId),
}

/// Accumulates tokens, components and blocks, and compiles them into a
/// [`Stylesheet`].
#[derive(Debug)]
pub struct StyleRegistry {
    id: RegistryId,
    config: SparkConfig,
    tokens: Vec<TokenRecord>,
    components: Vec<ComponentRecord>,
    blocks: Vec<BlockContent>,
    log: Vec<Entry>,
    class_owners: HashMap<String, ComponentId>,
    property_owners: HashMap<String, TokenId>,
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleRegistry {
    /// Creates a registry with the default configuration.
    pub fn new() -> Self {
        Self::build(SparkConfig::default())
    }

    /// Creates a registry with an explicit configuration.
    pub fn with_config(config: SparkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SparkConfig) -> Self {
        Self {
            id: RegistryId(NEXT_REGISTRY.fetch_add(1, Ordering::Relaxed)),
            config,
            tokens: Vec::new(),
            components: Vec::new(),
            blocks: Vec::new(),
            log: Vec::new(),
            class_owners: HashMap::new(),
            property_owners: HashMap::new(),
        }
    }

    pub fn config(&self) -> &SparkConfig {
        &self.config
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// The scope selector for a mode: `[data-spark-mode="dark"]`.
    pub fn mode_scope(&self, mode: ColorMode) -> String {
        format!("[{}=\"{}\"]", self.config.mode_attribute, mode)
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// Registers a token: one custom property per leaf of `tree`.
    pub fn token(&mut self, tree: &ValueTree, options: TokenOptions) -> Result<Token> {
        validate_prefix(&options.prefix)?;
        tree.validate()?;
        let entries = flatten(&options.prefix, tree)?;
        self.check_properties(entries.keys(), None)?;

        let id = TokenId(self.tokens.len());
        let scope = self.config.root_scope.clone();
        debug!(
            prefix = %options.prefix,
            id = id.0,
            properties = entries.len(),
            "registered token"
        );
        self.claim_properties(entries.keys(), id);
        self.tokens.push(TokenRecord {
            parent: None,
            lineage: id,
            prefix: options.prefix.clone(),
            scope: scope.clone(),
            tree: tree.clone(),
            entries,
        });
        self.log.push(Entry::Token(id));

        Ok(Token {
            registry: self.id,
            id,
            prefix: options.prefix,
            scope,
            tree: tree.clone(),
        })
    }

    /// Forks a token: `patch` is deep-merged over its tree and the patched
    /// leaves are registered again under the same names.
    pub fn fork_token(&mut self, token: &Token, patch: &ValueTree) -> Result<Token> {
        self.fork_token_with(token, patch, ForkOptions::default())
    }

    /// Forks a token, optionally under another scope.
    pub fn fork_token_with(
        &mut self,
        token: &Token,
        patch: &ValueTree,
        options: ForkOptions,
    ) -> Result<Token> {
        let parent = self.token_record(token)?;
        if patch.is_empty() {
            warn!(prefix = %parent.prefix, "forking token with an empty patch");
        }
        let merged = parent.tree.merge(patch)?;
        merged.validate()?;
        flatten(&parent.prefix, &merged)?;
        let entries = flatten(&parent.prefix, patch)?;
        let lineage = parent.lineage;
        let prefix = parent.prefix.clone();
        let scope = options.scope.unwrap_or_else(|| parent.scope.clone());
        self.check_properties(entries.keys(), Some(lineage))?;

        let id = TokenId(self.tokens.len());
        debug!(
            prefix = %prefix,
            id = id.0,
            parent = token.id.0,
            scope = %scope,
            properties = entries.len(),
            "registered token fork"
        );
        self.claim_properties(entries.keys(), lineage);
        self.tokens.push(TokenRecord {
            parent: Some(token.id),
            lineage,
            prefix: prefix.clone(),
            scope: scope.clone(),
            tree: merged.clone(),
            entries,
        });
        self.log.push(Entry::Token(id));

        Ok(Token {
            registry: self.id,
            id,
            prefix,
            scope,
            tree: merged,
        })
    }

    /// The custom properties a token sees: its chain, root first, last wins.
    pub fn token_table(&self, token: &Token) -> Result<IndexMap<String, Value>> {
        self.token_record(token)?;
        let mut table = IndexMap::new();
        for id in self.token_chain(token.id) {
            for (name, value) in &self.tokens[id.0].entries {
                table.insert(name.clone(), value.clone());
            }
        }
        Ok(table)
    }

    fn token_record(&self, token: &Token) -> Result<&TokenRecord> {
        if token.registry != self.id {
            return Err(SparkError::ForeignHandle { kind: "token" });
        }
        self.tokens
            .get(token.id.0)
            .ok_or(SparkError::ForeignHandle { kind: "token" })
    }

    fn token_chain(&self, id: TokenId) -> Vec<TokenId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.tokens[current.0].parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    fn check_properties<'a>(
        &self,
        names: impl Iterator<Item = &'a String>,
        lineage: Option<TokenId>,
    ) -> Result<()> {
        if !self.config.strict_collisions {
            return Ok(());
        }
        for name in names {
            if let Some(owner) = self.property_owners.get(name) {
                if Some(*owner) != lineage {
                    return Err(SparkError::DuplicateProperty {
                        property: name.clone(),
                        owner: self.tokens[owner.0].prefix.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn claim_properties<'a>(&mut self, names: impl Iterator<Item = &'a String>, lineage: TokenId) {
        for name in names {
            self.property_owners.entry(name.clone()).or_insert(lineage);
        }
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Registers a component: a class for every node and a rule for every
    /// node with declarations or nested rules.
    pub fn component(&mut self, tree: &StyleNode, options: ComponentOptions) -> Result<Component> {
        validate_prefix(&options.class_name)?;
        let compiled = component::compile(&options.class_name, &IndexMap::new(), tree, tree, None)?;
        self.check_classes(compiled.added.values(), None)?;

        let id = ComponentId(self.components.len());
        debug!(
            class = %options.class_name,
            id = id.0,
            nodes = compiled.added.len(),
            rules = compiled.rules.len(),
            "registered component"
        );
        self.trace_rules(&compiled.rules);
        self.claim_classes(compiled.added.values(), id);
        let classes = class_tree(tree, &compiled.table);
        self.components.push(ComponentRecord {
            parent: None,
            lineage: id,
            class_name: options.class_name.clone(),
            scope: None,
            tree: tree.clone(),
            added: compiled.added,
            rules: compiled.rules,
        });
        self.log.push(Entry::Component(id));

        Ok(Component {
            registry: self.id,
            id,
            class_name: options.class_name,
            scope: None,
            tree: tree.clone(),
            classes,
        })
    }

    /// Forks a component.
    ///
    /// Every class of `parent` is kept; paths new in `patch` get classes under
    /// the same class name. The patch's rules are emitted after everything
    /// registered before it.
    pub fn fork(&mut self, parent: &Component, patch: &StyleNode) -> Result<Component> {
        self.fork_with(parent, patch, ForkOptions::default())
    }

    /// Forks a component, optionally under another scope.
    pub fn fork_with(
        &mut self,
        parent: &Component,
        patch: &StyleNode,
        options: ForkOptions,
    ) -> Result<Component> {
        let record = self.component_record(parent)?;
        if patch.is_empty() {
            warn!(class = %record.class_name, "forking component with an empty patch");
        }
        let merged = record.tree.merge(patch)?;
        let class_name = record.class_name.clone();
        let lineage = record.lineage;
        let scope = options.scope.or_else(|| record.scope.clone());
        let inherited = self.identifier_table(parent.id);

        let compiled = component::compile(&class_name, &inherited, &merged, patch, scope.as_deref())?;
        self.check_classes(compiled.added.values(), Some(lineage))?;

        let id = ComponentId(self.components.len());
        debug!(
            class = %class_name,
            id = id.0,
            parent = parent.id.0,
            new_nodes = compiled.added.len(),
            rules = compiled.rules.len(),
            "registered component fork"
        );
        self.trace_rules(&compiled.rules);
        self.claim_classes(compiled.added.values(), lineage);
        let classes = class_tree(&merged, &compiled.table);
        self.components.push(ComponentRecord {
            parent: Some(parent.id),
            lineage,
            class_name: class_name.clone(),
            scope: scope.clone(),
            tree: merged.clone(),
            added: compiled.added,
            rules: compiled.rules,
        });
        self.log.push(Entry::Component(id));

        Ok(Component {
            registry: self.id,
            id,
            class_name,
            scope,
            tree: merged,
            classes,
        })
    }

    /// Path → class for every node of the component, across its fork chain.
    pub fn identifiers(&self, component: &Component) -> Result<IndexMap<KeyPath, String>> {
        self.component_record(component)?;
        Ok(self.identifier_table(component.id))
    }

    /// The rules of the component's whole chain, in emission order.
    pub fn rules(&self, component: &Component) -> Result<Vec<Rule>> {
        self.component_record(component)?;
        Ok(self
            .component_chain(component.id)
            .into_iter()
            .flat_map(|id| self.components[id.0].rules.iter().cloned())
            .collect())
    }

    /// The cascade-folded declarations per emitted selector: later rules
    /// override earlier ones property by property.
    pub fn computed(&self, component: &Component) -> Result<IndexMap<String, Declarations>> {
        let mut folded: IndexMap<String, Declarations> = IndexMap::new();
        for rule in self.rules(component)? {
            let entry = folded.entry(rule.selector()).or_default();
            *entry = entry.merge(rule.declarations());
        }
        Ok(folded)
    }

    fn component_record(&self, component: &Component) -> Result<&ComponentRecord> {
        if component.registry != self.id {
            return Err(SparkError::ForeignHandle { kind: "component" });
        }
        self.components
            .get(component.id.0)
            .ok_or(SparkError::ForeignHandle { kind: "component" })
    }

    fn component_chain(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.components[current.0].parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    fn identifier_table(&self, id: ComponentId) -> IndexMap<KeyPath, String> {
        let mut table = IndexMap::new();
        for link in self.component_chain(id) {
            for (path, class) in &self.components[link.0].added {
                table.insert(path.clone(), class.clone());
            }
        }
        table
    }

    fn check_classes<'a>(
        &self,
        classes: impl Iterator<Item = &'a String>,
        lineage: Option<ComponentId>,
    ) -> Result<()> {
        if !self.config.strict_collisions {
            return Ok(());
        }
        for class in classes {
            if let Some(owner) = self.class_owners.get(class) {
                if Some(*owner) != lineage {
                    return Err(SparkError::DuplicateClass {
                        class: class.clone(),
                        owner: self.components[owner.0].class_name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn claim_classes<'a>(&mut self, classes: impl Iterator<Item = &'a String>, lineage: ComponentId) {
        for class in classes {
            self.class_owners.entry(class.clone()).or_insert(lineage);
        }
    }

    fn trace_rules(&self, rules: &[Rule]) {
        for rule in rules {
            trace!(
                selector = %rule.selector(),
                declarations = rule.declarations().len(),
                "rule"
            );
        }
    }

    // =========================================================================
    // Modes
    // =========================================================================

    /// Builds a light/dark pair: `dark` is a fork of `light` scoped to the
    /// dark mode attribute, so both share every identifier.
    pub fn build_modes<T>(&mut self, light: &T, dark_patch: &T::Patch) -> Result<ModeMap<T>>
    where
        T: Forkable + Clone,
    {
        let scope = self.mode_scope(ColorMode::Dark);
        let dark = light.fork_in(self, dark_patch, ForkOptions::scoped(scope))?;
        Ok(ModeMap {
            light: light.clone(),
            dark,
        })
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Registers `@media` blocks.
    pub fn media(&mut self, blocks: BlockMap) -> Block {
        self.push_block(BlockKind::Media, blocks::compile_conditional(BlockKind::Media, blocks))
    }

    /// Registers `@keyframes` blocks. Bare names get the `@keyframes` keyword.
    pub fn keyframe(&mut self, blocks: BlockMap) -> Block {
        self.push_block(
            BlockKind::Keyframes,
            blocks::compile_conditional(BlockKind::Keyframes, blocks),
        )
    }

    /// Registers `@supports` blocks.
    pub fn supports(&mut self, blocks: BlockMap) -> Block {
        self.push_block(
            BlockKind::Supports,
            blocks::compile_conditional(BlockKind::Supports, blocks),
        )
    }

    /// Registers unscoped global rules.
    pub fn global(&mut self, rules: RuleMap) -> Block {
        self.push_block(BlockKind::Global, blocks::compile_global(rules))
    }

    fn push_block(&mut self, kind: BlockKind, content: BlockContent) -> Block {
        let id = BlockId(self.blocks.len());
        if content.is_empty() {
            warn!(?kind, id = id.0, "registered an empty block");
        } else {
            debug!(?kind, id = id.0, "registered block");
        }
        let conditions = content.conditions();
        self.blocks.push(content);
        self.log.push(Entry::Block(id));
        Block {
            registry: self.id,
            id,
            kind,
            conditions,
        }
    }

    // =========================================================================
    // Output
    // =========================================================================

    /// Compiles everything registered so far.
    pub fn stylesheet(&self) -> Stylesheet {
        let mut scopes: IndexMap<String, IndexMap<String, Value>> = IndexMap::new();
        for entry in &self.log {
            if let Entry::Token(id) = entry {
                let record = &self.tokens[id.0];
                let properties = scopes.entry(record.scope.clone()).or_default();
                for (name, value) in &record.entries {
                    properties.insert(name.clone(), value.clone());
                }
            }
        }

        let mut items: Vec<SheetItem> = scopes
            .into_iter()
            .map(|(scope, properties)| SheetItem::Properties { scope, properties })
            .collect();

        for entry in &self.log {
            match entry {
                Entry::Token(_) => {}
                Entry::Component(id) => {
                    items.extend(self.components[id.0].rules.iter().cloned().map(SheetItem::Rule));
                }
                Entry::Block(id) => match &self.blocks[id.0] {
                    BlockContent::Global(rules) => {
                        items.extend(rules.iter().cloned().map(SheetItem::Rule));
                    }
                    BlockContent::Conditional(blocks) => {
                        items.extend(blocks.iter().cloned().map(SheetItem::Conditional));
                    }
                },
            }
        }
        debug!(items = items.len(), "compiled stylesheet");
        Stylesheet::new(items)
    }

    /// Compiles and writes the stylesheet with the configured emit options.
    pub fn to_css(&self) -> String {
        self.stylesheet().to_css(&self.config.emit)
    }

    // =========================================================================
    // Merging
    // =========================================================================

    /// Appends everything registered in `other` after this registry's
    /// registrations.
    ///
    /// Collisions between the two are checked before anything is moved. Handles
    /// created by `other` do not carry over: using one with this registry is a
    /// [`SparkError::ForeignHandle`].
    pub fn merge(&mut self, other: StyleRegistry) -> Result<()> {
        if self.config.strict_collisions {
            for (class, _) in other.class_owners.iter() {
                if let Some(owner) = self.class_owners.get(class) {
                    return Err(SparkError::DuplicateClass {
                        class: class.clone(),
                        owner: self.components[owner.0].class_name.clone(),
                    });
                }
            }
            for (name, _) in other.property_owners.iter() {
                if let Some(owner) = self.property_owners.get(name) {
                    return Err(SparkError::DuplicateProperty {
                        property: name.clone(),
                        owner: self.tokens[owner.0].prefix.clone(),
                    });
                }
            }
        }

        let token_base = self.tokens.len();
        let component_base = self.components.len();
        let block_base = self.blocks.len();
        let shift_token = |id: TokenId| TokenId(id.0 + token_base);
        let shift_component = |id: ComponentId| ComponentId(id.0 + component_base);

        debug!(
            tokens = other.tokens.len(),
            components = other.components.len(),
            blocks = other.blocks.len(),
            "merging registry"
        );

        self.tokens.extend(other.tokens.into_iter().map(|mut record| {
            record.parent = record.parent.map(shift_token);
            record.lineage = shift_token(record.lineage);
            record
        }));
        self.components.extend(other.components.into_iter().map(|mut record| {
            record.parent = record.parent.map(shift_component);
            record.lineage = shift_component(record.lineage);
            record
        }));
        self.blocks.extend(other.blocks);

        for (class, owner) in other.class_owners {
            self.class_owners.entry(class).or_insert(shift_component(owner));
        }
        for (name, owner) in other.property_owners {
            self.property_owners.entry(name).or_insert(shift_token(owner));
        }
        self.log.extend(other.log.into_iter().map(|entry| match entry {
            Entry::Token(id) => Entry::Token(shift_token(id)),
            Entry::Component(id) => Entry::Component(shift_component(id)),
            Entry::Block(id) => Entry::Block(BlockId(id.0 + block_base)),
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::Selector;

    fn card_tree() -> StyleNode {
        StyleNode::new()
            .child("base", StyleNode::new().decl("color", "black"))
            .child("checked", StyleNode::new())
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    #[test]
    fn test_token_registers_properties_under_root() {
        let mut registry = StyleRegistry::new();
        let tree = ValueTree::new().tree("a", ValueTree::new().leaf("b", "1px"));
        let token = registry.token(&tree, TokenOptions::new("x")).unwrap();
        assert_eq!(token.scope(), ":root");
        let sheet = registry.stylesheet();
        let props = sheet.custom_properties(":root").unwrap();
        assert_eq!(props.get("--x-a-b"), Some(&Value::from("1px")));
    }

    #[test]
    fn test_token_invalid_prefix() {
        let mut registry = StyleRegistry::new();
        let err = registry
            .token(&ValueTree::new().leaf("a", 1), TokenOptions::new("Bad Prefix"))
            .unwrap_err();
        assert!(matches!(err, SparkError::InvalidPrefix { .. }));
    }

    #[test]
    fn test_token_fork_registers_only_patch() {
        let mut registry = StyleRegistry::new();
        let base = registry
            .token(
                &ValueTree::new().leaf("color", "black").leaf("gap", "4px"),
                TokenOptions::new("x"),
            )
            .unwrap();
        let fork = registry
            .fork_token(&base, &ValueTree::new().leaf("color", "white"))
            .unwrap();
        assert_eq!(registry.tokens[fork.id.0].entries.len(), 1);
        let table = registry.token_table(&fork).unwrap();
        assert_eq!(table.get("--x-color"), Some(&Value::from("white")));
        assert_eq!(table.get("--x-gap"), Some(&Value::from("4px")));
        // base table unchanged
        let base_table = registry.token_table(&base).unwrap();
        assert_eq!(base_table.get("--x-color"), Some(&Value::from("black")));
    }

    #[test]
    fn test_token_fork_structural_conflict_registers_nothing() {
        let mut registry = StyleRegistry::new();
        let base = registry
            .token(
                &ValueTree::new().tree("color", ValueTree::new().leaf("bg", "#fff")),
                TokenOptions::new("x"),
            )
            .unwrap();
        let err = registry
            .fork_token(&base, &ValueTree::new().leaf("color", "red"))
            .unwrap_err();
        assert!(matches!(err, SparkError::StructuralConflict { .. }));
        assert_eq!(registry.tokens.len(), 1);
        assert_eq!(registry.log.len(), 1);
    }

    #[test]
    fn test_token_duplicate_property_across_lineages() {
        let mut registry = StyleRegistry::new();
        registry
            .token(&ValueTree::new().leaf("gap", "4px"), TokenOptions::new("x"))
            .unwrap();
        let err = registry
            .token(&ValueTree::new().leaf("gap", "8px"), TokenOptions::new("x"))
            .unwrap_err();
        assert_eq!(
            err,
            SparkError::DuplicateProperty {
                property: "--x-gap".to_string(),
                owner: "x".to_string(),
            }
        );
    }

    #[test]
    fn test_token_duplicates_allowed_when_not_strict() {
        let config = SparkConfig {
            strict_collisions: false,
            ..SparkConfig::default()
        };
        let mut registry = StyleRegistry::with_config(config).unwrap();
        registry
            .token(&ValueTree::new().leaf("gap", "4px"), TokenOptions::new("x"))
            .unwrap();
        registry
            .token(&ValueTree::new().leaf("gap", "8px"), TokenOptions::new("x"))
            .unwrap();
        let sheet = registry.stylesheet();
        assert_eq!(
            sheet.custom_properties(":root").unwrap().get("--x-gap"),
            Some(&Value::from("8px"))
        );
    }

    #[test]
    fn test_token_scopes_group_in_first_registration_order() {
        let mut registry = StyleRegistry::new();
        let a = registry
            .token(&ValueTree::new().leaf("fg", "black"), TokenOptions::new("a"))
            .unwrap();
        registry
            .fork_token_with(&a, &ValueTree::new().leaf("fg", "white"), ForkOptions::scoped(".dark"))
            .unwrap();
        registry
            .token(&ValueTree::new().leaf("fg", "blue"), TokenOptions::new("b"))
            .unwrap();
        let sheet = registry.stylesheet();
        let scopes: Vec<&str> = sheet
            .items()
            .iter()
            .filter_map(|item| match item {
                SheetItem::Properties { scope, .. } => Some(scope.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(scopes, [":root", ".dark"]);
        assert_eq!(sheet.custom_properties(":root").unwrap().len(), 2);
    }

    // =========================================================================
    // Components
    // =========================================================================

    #[test]
    fn test_component_fork_keeps_identifiers() {
        let mut registry = StyleRegistry::new();
        let base = registry.component(&card_tree(), ComponentOptions::new("card")).unwrap();
        let fork = registry
            .fork(&base, &StyleNode::new().child("checked", StyleNode::new().decl("color", "red")))
            .unwrap();
        let before = registry.identifiers(&base).unwrap();
        let after = registry.identifiers(&fork).unwrap();
        assert_eq!(before, after);
        assert_eq!(fork.classes(), base.classes());
    }

    #[test]
    fn test_component_fork_rules_follow_parent() {
        let mut registry = StyleRegistry::new();
        let base = registry.component(&card_tree(), ComponentOptions::new("card")).unwrap();
        let fork = registry
            .fork(&base, &StyleNode::new().child("base", StyleNode::new().decl("color", "white")))
            .unwrap();
        let rules = registry.rules(&fork).unwrap();
        let selectors: Vec<String> = rules.iter().map(Rule::selector).collect();
        assert_eq!(selectors, [".card-base", ".card-base"]);
        let computed = registry.computed(&fork).unwrap();
        assert_eq!(computed[".card-base"].get("color"), Some(&Value::from("white")));
        assert_eq!(registry.rules(&base).unwrap().len(), 1);
    }

    #[test]
    fn test_component_fork_adds_new_paths() {
        let mut registry = StyleRegistry::new();
        let base = registry.component(&card_tree(), ComponentOptions::new("card")).unwrap();
        let fork = registry
            .fork(
                &base,
                &StyleNode::new().child("footer", StyleNode::new().decl("padding", "4px")),
            )
            .unwrap();
        assert_eq!(fork.class("footer").unwrap(), "card-footer");
        assert!(base.class("footer").is_err());
    }

    #[test]
    fn test_component_fork_can_reference_parent_nodes() {
        let mut registry = StyleRegistry::new();
        let base = registry.component(&card_tree(), ComponentOptions::new("card")).unwrap();
        let patch = StyleNode::new().child(
            "base",
            StyleNode::new().rule(Selector::parent().and_node("checked"), [("color", "red")]),
        );
        let fork = registry.fork(&base, &patch).unwrap();
        let last = registry.rules(&fork).unwrap().pop().unwrap();
        assert_eq!(last.selector(), ".card-base.card-checked");
    }

    #[test]
    fn test_component_duplicate_class_rejected_before_registration() {
        let mut registry = StyleRegistry::new();
        registry.component(&card_tree(), ComponentOptions::new("card")).unwrap();
        let err = registry
            .component(&StyleNode::new(), ComponentOptions::new("card"))
            .unwrap_err();
        assert!(matches!(err, SparkError::DuplicateClass { ref owner, .. } if owner == "card"));
        assert_eq!(registry.components.len(), 1);
    }

    #[test]
    fn test_fork_of_unrelated_lineage_cannot_steal_class() {
        let mut registry = StyleRegistry::new();
        registry
            .component(&StyleNode::new(), ComponentOptions::new("card-footer"))
            .unwrap();
        let card = registry
            .component(&StyleNode::new(), ComponentOptions::new("card"))
            .unwrap();
        let err = registry
            .fork(&card, &StyleNode::new().child("footer", StyleNode::new()))
            .unwrap_err();
        assert!(matches!(err, SparkError::DuplicateClass { .. }));
    }

    #[test]
    fn test_foreign_handle() {
        let mut a = StyleRegistry::new();
        let mut b = StyleRegistry::new();
        let card = a.component(&card_tree(), ComponentOptions::new("card")).unwrap();
        assert_eq!(
            b.fork(&card, &StyleNode::new()).unwrap_err(),
            SparkError::ForeignHandle { kind: "component" }
        );
        let token = a
            .token(&ValueTree::new().leaf("gap", 1), TokenOptions::new("x"))
            .unwrap();
        assert!(b.token_table(&token).is_err());
    }

    // =========================================================================
    // Blocks and output order
    // =========================================================================

    #[test]
    fn test_stylesheet_order_follows_registration() {
        let mut registry = StyleRegistry::new();
        let mut global = RuleMap::new();
        global.insert("body".to_string(), Declarations::new().with("margin", 0));
        registry.global(global);
        let card = registry.component(&card_tree(), ComponentOptions::new("card")).unwrap();
        let mut media = BlockMap::new();
        let mut rules = RuleMap::new();
        rules.insert(
            format!(".{}", card.class("base").unwrap()),
            Declarations::new().with("color", "gray"),
        );
        media.insert("(max-width: 396px)".to_string(), rules);
        registry.media(media);
        registry
            .token(&ValueTree::new().leaf("gap", "4px"), TokenOptions::new("card"))
            .unwrap();

        let css = registry.to_css();
        let root = css.find(":root").unwrap();
        let body = css.find("body").unwrap();
        let base = css.find(".card-base {").unwrap();
        let media = css.find("@media (max-width: 396px)").unwrap();
        assert!(root < body && body < base && base < media, "{css}");
    }

    #[test]
    fn test_build_modes_scopes_dark() {
        let mut registry = StyleRegistry::new();
        let light = registry
            .token(&ValueTree::new().leaf("color", "black"), TokenOptions::new("x"))
            .unwrap();
        let modes = registry
            .build_modes(&light, &ValueTree::new().leaf("color", "white"))
            .unwrap();
        assert_eq!(modes.dark.scope(), "[data-spark-mode=\"dark\"]");
        assert_eq!(modes[ColorMode::Light].scope(), ":root");
        let sheet = registry.stylesheet();
        assert_eq!(
            sheet
                .custom_properties("[data-spark-mode=\"dark\"]")
                .unwrap()
                .get("--x-color"),
            Some(&Value::from("white"))
        );
    }

    // =========================================================================
    // Merging
    // =========================================================================

    #[test]
    fn test_merge_appends_and_remaps() {
        let mut main = StyleRegistry::new();
        main.component(&card_tree(), ComponentOptions::new("card")).unwrap();

        let mut other = StyleRegistry::new();
        let badge = other
            .component(&StyleNode::new().decl("color", "red"), ComponentOptions::new("badge"))
            .unwrap();
        other
            .fork(&badge, &StyleNode::new().decl("color", "blue"))
            .unwrap();

        main.merge(other).unwrap();
        assert_eq!(main.components.len(), 3);
        assert_eq!(main.components[2].parent, Some(ComponentId(1)));
        assert_eq!(main.components[2].lineage, ComponentId(1));
        let css = main.to_css();
        assert!(css.find("color: red").unwrap() < css.find("color: blue").unwrap());
    }

    #[test]
    fn test_merge_rejects_collisions() {
        let mut main = StyleRegistry::new();
        main.component(&card_tree(), ComponentOptions::new("card")).unwrap();
        let mut other = StyleRegistry::new();
        other.component(&StyleNode::new(), ComponentOptions::new("card")).unwrap();
        assert!(matches!(main.merge(other), Err(SparkError::DuplicateClass { .. })));
        assert_eq!(main.components.len(), 1);
    }
}
