//! Authored trees: token values and component styles.
//!
//! Two tree shapes feed the engine:
//!
//! - [`ValueTree`]: nested primitive values, compiled into custom properties
//! - [`StyleNode`]: nested style nodes, compiled into classes and rules
//!
//! Both are plain values. Compiling or forking never mutates a tree; deep
//! merges always return a new tree.

pub(crate) mod parse;
mod style_tree;
mod value;
mod value_tree;

pub use style_tree::{StyleNode, StyleTree};
pub use value::{Declarations, Value};
pub use value_tree::{ValueNode, ValueTree};
