//! Design modules: one feature's tokens, component, modes and blocks.
//!
//! A [`DesignModule`] is the authored description of a feature (a card, a
//! drawer, a button). [`compile_module`] registers its parts in dependency
//! order and returns a [`FeatureConfig`] bundling the handles, which is what
//! feature code consumes.
//!
//! ```yaml
//! name: card
//! prefix: spark-card
//! properties:
//!   color:
//!     bg: "#fff"
//! modes:
//!   dark:
//!     color:
//!       bg: "#111"
//! component:
//!   styles:
//!     background: var(--spark-card-color-bg)
//!     base:
//!       padding: 4px
//!     checked: {}
//!   variants:
//!     compact:
//!       base:
//!         padding: 2px
//! media:
//!   "(max-width: 396px)":
//!     ".$(base)":
//!       padding: 0
//! ```
//!
//! Block selectors and values may reference the base component's nodes with
//! `$(path)`.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blocks::{Block, BlockMap, RuleMap};
use crate::component::{ClassTree, Component, ComponentOptions};
use crate::error::{Result, SparkError};
use crate::mode::{ColorMode, ModeMap};
use crate::path::KeyPath;
use crate::registry::StyleRegistry;
use crate::selector::interpolate_classes;
use crate::token::{Token, TokenOptions};
use crate::tree::{Declarations, StyleNode, Value, ValueTree};

/// The authored form of a feature.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesignModule {
    /// Defaults to the file stem when loaded with [`DesignModule::from_file`].
    #[serde(default)]
    pub name: String,
    /// Prefix of the module's custom properties, and class name of its
    /// component unless the component names its own.
    pub prefix: String,
    #[serde(default)]
    pub properties: Option<ValueTree>,
    #[serde(default)]
    pub modes: Option<ModePatches>,
    #[serde(default)]
    pub component: Option<ComponentSpec>,
    #[serde(default)]
    pub media: BlockMap,
    #[serde(default)]
    pub keyframes: BlockMap,
    #[serde(default)]
    pub supports: BlockMap,
    #[serde(default)]
    pub global: RuleMap,
}

/// Token patches per non-default mode.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModePatches {
    pub dark: ValueTree,
}

/// The authored component of a module.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentSpec {
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub styles: StyleNode,
    /// Patch applied under the dark mode scope.
    #[serde(default)]
    pub dark: Option<StyleNode>,
    /// Named forks of the base component, in authoring order.
    #[serde(default)]
    pub variants: IndexMap<String, StyleNode>,
}

impl DesignModule {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| SparkError::parse(e.to_string()))
    }

    /// Loads a module file. A module without a `name` is named after the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SparkError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut module = Self::from_yaml(&content).map_err(|e| e.in_file(path))?;
        if module.name.is_empty() {
            module.name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
                .unwrap_or_default();
        }
        Ok(module)
    }

    /// The module's name, falling back to its prefix.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.prefix
        } else {
            &self.name
        }
    }
}

/// Handles produced by compiling a [`DesignModule`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConfig {
    pub name: String,
    pub properties: Option<Token>,
    pub modes: Option<ModeMap<Token>>,
    pub component: Option<Component>,
    pub component_modes: Option<ModeMap<Component>>,
    pub variants: IndexMap<String, Component>,
    pub media: Option<Block>,
    pub keyframes: Option<Block>,
    pub supports: Option<Block>,
    pub global: Option<Block>,
}

/// Class trees of a feature, as handed to markup code.
#[derive(Debug, Serialize)]
pub struct FeatureClasses<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<&'a ClassTree>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub variants: IndexMap<&'a str, &'a ClassTree>,
}

impl FeatureConfig {
    pub fn classes(&self) -> FeatureClasses<'_> {
        FeatureClasses {
            component: self.component.as_ref().map(Component::classes),
            variants: self
                .variants
                .iter()
                .map(|(name, variant)| (name.as_str(), variant.classes()))
                .collect(),
        }
    }

    pub fn variant(&self, name: &str) -> Option<&Component> {
        self.variants.get(name)
    }

    /// The token holding this feature's custom properties in `mode`. Without
    /// `modes`, both modes share the base properties.
    pub fn tokens(&self, mode: ColorMode) -> Option<&Token> {
        match &self.modes {
            Some(modes) => Some(modes.get(mode)),
            None => self.properties.as_ref(),
        }
    }
}

/// Registers every part of `module`.
///
/// Order: properties, their modes, the base component, its dark mode, its
/// variants, then global rules and conditional blocks.
pub fn compile_module(registry: &mut StyleRegistry, module: &DesignModule) -> Result<FeatureConfig> {
    let name = module.display_name().to_string();
    debug!(module = %name, prefix = %module.prefix, "compiling module");

    let properties = match &module.properties {
        Some(tree) => Some(registry.token(tree, TokenOptions::new(module.prefix.clone()))?),
        None => None,
    };

    let modes = match (&module.modes, &properties) {
        (Some(patches), Some(token)) => Some(registry.build_modes(token, &patches.dark)?),
        (Some(_), None) => {
            return Err(SparkError::Config {
                message: format!("module '{}' declares modes without properties", name),
            })
        }
        (None, _) => None,
    };

    let mut component = None;
    let mut component_modes = None;
    let mut variants = IndexMap::new();
    if let Some(spec) = &module.component {
        let class_name = spec.class_name.clone().unwrap_or_else(|| module.prefix.clone());
        let base = registry.component(&spec.styles, ComponentOptions::new(class_name))?;
        if let Some(dark) = &spec.dark {
            component_modes = Some(registry.build_modes(&base, dark)?);
        }
        for (variant, patch) in &spec.variants {
            debug!(module = %name, variant = %variant, "compiling variant");
            variants.insert(variant.clone(), registry.fork(&base, patch)?);
        }
        component = Some(base);
    }

    let table = match &component {
        Some(base) => registry.identifiers(base)?,
        None => IndexMap::new(),
    };
    let lookup = |path: &KeyPath| table.get(path).cloned();

    let global = if module.global.is_empty() {
        None
    } else {
        Some(registry.global(resolve_rules(&module.global, &lookup)?))
    };
    let media = if module.media.is_empty() {
        None
    } else {
        Some(registry.media(resolve_blocks(&module.media, &lookup)?))
    };
    let keyframes = if module.keyframes.is_empty() {
        None
    } else {
        Some(registry.keyframe(resolve_blocks(&module.keyframes, &lookup)?))
    };
    let supports = if module.supports.is_empty() {
        None
    } else {
        Some(registry.supports(resolve_blocks(&module.supports, &lookup)?))
    };

    Ok(FeatureConfig {
        name,
        properties,
        modes,
        component,
        component_modes,
        variants,
        media,
        keyframes,
        supports,
        global,
    })
}

fn resolve_blocks<F>(blocks: &BlockMap, lookup: &F) -> Result<BlockMap>
where
    F: Fn(&KeyPath) -> Option<String>,
{
    blocks
        .iter()
        .map(|(condition, rules)| Ok((condition.clone(), resolve_rules(rules, lookup)?)))
        .collect()
}

fn resolve_rules<F>(rules: &RuleMap, lookup: &F) -> Result<RuleMap>
where
    F: Fn(&KeyPath) -> Option<String>,
{
    let mut resolved = RuleMap::new();
    for (selector, decls) in rules {
        let selector = interpolate_classes(selector, lookup)?;
        let mut out = Declarations::new();
        for (property, value) in decls.iter() {
            let value = match value {
                Value::Text(text) if text.contains("$(") => {
                    Value::Text(interpolate_classes(text, lookup)?)
                }
                other => other.clone(),
            };
            out.set(property, value);
        }
        resolved.insert(selector, out);
    }
    Ok(resolved)
}
