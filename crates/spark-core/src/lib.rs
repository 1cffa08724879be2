//! # Spark Core - Style Composition Engine
//!
//! `spark-core` compiles nested style descriptions into CSS. Authors describe
//! design tokens and components as trees; the engine derives deterministic
//! identifiers from each node's path, emits rules in a stable order, and lets
//! later registrations (forks, dark modes, variants) override earlier ones
//! through the cascade without ever renaming a class.
//!
//! ## Core Concepts
//!
//! - [`StyleRegistry`]: explicit accumulator every registration goes through
//! - [`Token`]: a [`ValueTree`] compiled into CSS custom properties
//! - [`Component`]: a [`StyleNode`] tree compiled into classes and rules
//! - Forks: a patch merged over a token or component, keeping its identifiers
//! - [`ModeMap`]: a light/dark pair, the dark side being a scoped fork
//! - [`Stylesheet`]: the compiled output, written with [`EmitOptions`]
//!
//! ## Quick Start
//!
//! ```rust
//! use spark_core::{ComponentOptions, Selector, StyleNode, StyleRegistry, TokenOptions, ValueTree};
//!
//! let mut registry = StyleRegistry::new();
//!
//! let colors = ValueTree::new().leaf("fg", "#222");
//! let token = registry.token(&colors, TokenOptions::new("spark-card")).unwrap();
//!
//! let tree = StyleNode::new()
//!     .decl("color", token.var("fg").unwrap())
//!     .child("base", StyleNode::new().decl("padding", "4px"))
//!     .child("checked", StyleNode::new());
//! let card = registry.component(&tree, ComponentOptions::new("card")).unwrap();
//! assert_eq!(card.class("checked").unwrap(), "card-checked");
//!
//! let patch = StyleNode::new().child(
//!     "base",
//!     StyleNode::new().rule(Selector::parent().and_node("checked"), [("color", "red")]),
//! );
//! let checked = registry.fork(&card, &patch).unwrap();
//! assert_eq!(checked.classes(), card.classes());
//!
//! let css = registry.to_css();
//! assert!(css.contains(".card-base.card-checked {\n  color: red;\n}"));
//! ```
//!
//! ## Authoring in YAML
//!
//! Trees load from YAML or JSON. Keys in selector syntax (`&:hover`,
//! `& > $(icon)`) become nested rules; other mappings become child nodes:
//!
//! ```rust
//! use spark_core::{ComponentOptions, StyleNode, StyleRegistry};
//!
//! let tree = StyleNode::from_yaml(r#"
//! display: flex
//! icon:
//!   width: 16px
//! "&:hover > $(icon)":
//!   opacity: 0.5
//! "#).unwrap();
//!
//! let mut registry = StyleRegistry::new();
//! registry.component(&tree, ComponentOptions::new("chip")).unwrap();
//! assert!(registry.to_css().contains(".chip:hover > .chip-icon {"));
//! ```
//!
//! Whole features (tokens, component, modes, variants, media blocks) are
//! described by a [`DesignModule`] and compiled with [`compile_module`].

pub mod blocks;
mod component;
mod config;
pub mod css;
mod error;
pub mod mode;
pub mod module;
pub mod path;
mod registry;
pub mod selector;
mod sheet;
mod token;
pub mod tree;

pub use error::{Result, SparkError};

pub use path::KeyPath;
pub use tree::{Declarations, StyleNode, StyleTree, Value, ValueNode, ValueTree};

pub use selector::{ClassRef, Combinator, Selector, SelectorAtom};

pub use component::{ClassTree, Component, ComponentOptions};
pub use token::{Token, TokenOptions};

pub use blocks::{Block, BlockKind};
pub use registry::{BlockId, ComponentId, ForkOptions, RegistryId, StyleRegistry, TokenId};
pub use sheet::{Rule, SheetItem, Stylesheet};

pub use config::{EmitOptions, SparkConfig};

pub use mode::{detect_color_mode, set_theme_detector, ColorMode, Forkable, ModeMap};

pub use module::{compile_module, DesignModule, FeatureConfig};
