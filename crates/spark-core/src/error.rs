//! Error types for the composition engine.
//!
//! Every engine operation returns [`Result`]. Structural problems in an authored
//! tree fail the registration that introduced them; nothing is silently dropped
//! or rewritten.

use std::path::PathBuf;

use thiserror::Error;

use crate::path::KeyPath;

/// Errors raised while compiling, forking or emitting style trees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SparkError {
    /// A patch puts a leaf where the base has a subtree, or the reverse.
    #[error("structural conflict at '{path}': {existing} in base, {incoming} in patch")]
    StructuralConflict {
        path: KeyPath,
        existing: &'static str,
        incoming: &'static str,
    },

    /// Two sibling keys normalize to the same kebab-case segment.
    #[error("keys '{first}' and '{second}' under '{parent}' both resolve to '{segment}'")]
    KeyCollision {
        parent: KeyPath,
        first: String,
        second: String,
        segment: String,
    },

    /// A key cannot name a node: it has no identifier characters, or it
    /// contains the path separator.
    #[error("key '{key}' under '{parent}' {reason}")]
    InvalidKey {
        parent: KeyPath,
        key: String,
        reason: &'static str,
    },

    /// A prefix or class name is empty or not already kebab-case.
    #[error("invalid prefix '{prefix}': expected a non-empty kebab-case identifier")]
    InvalidPrefix { prefix: String },

    /// Two paths of the same component resolve to one class name.
    #[error("paths '{first}' and '{second}' both resolve to class '{identifier}'")]
    DuplicateIdentifier {
        identifier: String,
        first: KeyPath,
        second: KeyPath,
    },

    /// An unrelated component already owns this class name.
    #[error("class '{class}' is already owned by component '{owner}'")]
    DuplicateClass { class: String, owner: String },

    /// An unrelated token already owns this custom property.
    #[error("custom property '{property}' is already owned by token '{owner}'")]
    DuplicateProperty { property: String, owner: String },

    /// A selector or value references a node that does not exist in the build.
    #[error("unknown selector reference '$({reference})' in {context}")]
    UnknownSelector { reference: KeyPath, context: String },

    /// A lookup names a path the token or component does not have.
    #[error("unknown path '{path}' in '{owner}'")]
    UnknownPath { path: KeyPath, owner: String },

    /// Selector template text could not be parsed.
    #[error("invalid selector '{template}': {message}")]
    InvalidSelector { template: String, message: String },

    /// A handle was used with a registry that did not create it.
    #[error("{kind} handle belongs to a different registry")]
    ForeignHandle { kind: &'static str },

    /// Authored YAML, JSON or CSS text could not be understood.
    #[error("{}", parse_message(.path, .message))]
    Parse {
        path: Option<PathBuf>,
        message: String,
    },

    /// The engine configuration is invalid.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// A file could not be read.
    #[error("failed to load {}: {message}", .path.display())]
    Load { path: PathBuf, message: String },
}

fn parse_message(path: &Option<PathBuf>, message: &str) -> String {
    match path {
        Some(p) => format!("failed to parse {}: {}", p.display(), message),
        None => format!("failed to parse: {}", message),
    }
}

impl SparkError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        SparkError::Parse {
            path: None,
            message: message.into(),
        }
    }

    /// Attaches a source path to parse errors that do not have one yet.
    pub(crate) fn in_file(self, file: &std::path::Path) -> Self {
        match self {
            SparkError::Parse {
                path: None,
                message,
            } => SparkError::Parse {
                path: Some(file.to_path_buf()),
                message,
            },
            other => other,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, SparkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_conflict_display() {
        let err = SparkError::StructuralConflict {
            path: KeyPath::parse("color.bg"),
            existing: "subtree",
            incoming: "leaf",
        };
        let msg = err.to_string();
        assert!(msg.contains("color.bg"));
        assert!(msg.contains("subtree in base"));
    }

    #[test]
    fn test_unknown_selector_display() {
        let err = SparkError::UnknownSelector {
            reference: KeyPath::parse("vertical.avatar"),
            context: "rule on 'card'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unknown selector reference '$(vertical.avatar)' in rule on 'card'"
        );
    }

    #[test]
    fn test_parse_error_with_path() {
        let err = SparkError::parse("bad indent").in_file(std::path::Path::new("card.yaml"));
        assert_eq!(err.to_string(), "failed to parse card.yaml: bad indent");
    }

    #[test]
    fn test_in_file_keeps_existing_path() {
        let err = SparkError::Parse {
            path: Some(PathBuf::from("a.yaml")),
            message: "x".into(),
        }
        .in_file(std::path::Path::new("b.yaml"));
        assert!(err.to_string().contains("a.yaml"));
    }
}
