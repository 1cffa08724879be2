//! Key paths and identifier resolution.
//!
//! Every generated name in a stylesheet comes from one pure function,
//! [`resolve`]: a kebab-case prefix followed by the kebab-case form of each key
//! on the way from the tree root to a node.
//!
//! ```rust
//! use spark_core::path::{resolve, custom_property};
//!
//! assert_eq!(resolve("spark-card", &["vertical", "avatar"]), "spark-card-vertical-avatar");
//! assert_eq!(resolve("spark-card", &[] as &[&str]), "spark-card");
//! assert_eq!(custom_property("x", &["a", "b"]), "--x-a-b");
//! ```
//!
//! Because the output depends only on `(prefix, path)`, a fork can re-derive the
//! identifier of any node it shares with its parent instead of looking it up.

use std::fmt;

use deunicode::deunicode;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SparkError};

/// An ordered list of keys from a tree root to a node. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// The root path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parses dot-separated text (`"vertical.avatar"`). Empty text is the root.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::root();
        }
        Self(text.split('.').map(|s| s.trim().to_string()).collect())
    }

    /// Returns a new path with `key` appended.
    pub fn join(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.into());
        Self(segments)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The path without its last key, or `None` at the root.
    pub fn parent(&self) -> Option<KeyPath> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Returns true if `self` is `other` or lies below it.
    pub fn starts_with(&self, other: &KeyPath) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl<S: Into<String>> FromIterator<S> for KeyPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for KeyPath {
    fn from(text: &str) -> Self {
        KeyPath::parse(text)
    }
}

impl From<Vec<String>> for KeyPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

/// Converts one key into its kebab-case identifier segment.
///
/// Non-ASCII text is transliterated first. Words split on any non-alphanumeric
/// character, on lower-to-upper transitions and before the last capital of an
/// acronym. Digits stay attached to the word they follow.
///
/// ```rust
/// use spark_core::path::kebab_case;
///
/// assert_eq!(kebab_case("verticalAvatar"), "vertical-avatar");
/// assert_eq!(kebab_case("HTMLParser"), "html-parser");
/// assert_eq!(kebab_case("already-kebab"), "already-kebab");
/// assert_eq!(kebab_case("396"), "396");
/// assert_eq!(kebab_case("size_xl"), "size-xl");
/// ```
pub fn kebab_case(segment: &str) -> String {
    let ascii;
    let text = if segment.is_ascii() {
        segment
    } else {
        ascii = deunicode(segment);
        ascii.as_str()
    };

    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_ascii_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c.to_ascii_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }

    words.join("-")
}

/// Resolves `prefix` and a key path to a stable identifier.
///
/// An empty path yields the prefix itself.
pub fn resolve<S: AsRef<str>>(prefix: &str, path: &[S]) -> String {
    let mut out = String::from(prefix);
    for segment in path {
        let kebab = kebab_case(segment.as_ref());
        if kebab.is_empty() {
            continue;
        }
        out.push('-');
        out.push_str(&kebab);
    }
    out
}

/// Resolves a [`KeyPath`] under `prefix`.
pub fn resolve_path(prefix: &str, path: &KeyPath) -> String {
    resolve(prefix, path.segments())
}

/// The custom property name for a token leaf: `--{prefix}-{path}`.
pub fn custom_property<S: AsRef<str>>(prefix: &str, path: &[S]) -> String {
    format!("--{}", resolve(prefix, path))
}

/// Checks that a prefix is non-empty and already in kebab-case form.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    let well_formed = !prefix.is_empty()
        && !prefix.starts_with('-')
        && !prefix.ends_with('-')
        && !prefix.contains("--")
        && prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if well_formed {
        Ok(())
    } else {
        Err(SparkError::InvalidPrefix {
            prefix: prefix.to_string(),
        })
    }
}

/// Validates one level of sibling keys.
///
/// Fails when a key has no identifier characters, when it contains `.` (a
/// dotted key could never be addressed by a [`KeyPath`]), or when two keys
/// collapse to the same kebab-case segment.
pub fn check_siblings<'a, I>(parent: &KeyPath, keys: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: Vec<(String, &'a str)> = Vec::new();
    for key in keys {
        let invalid = |reason| SparkError::InvalidKey {
            parent: parent.clone(),
            key: key.to_string(),
            reason,
        };
        if key.contains('.') {
            return Err(invalid("contains '.', the path separator"));
        }
        let segment = kebab_case(key);
        if segment.is_empty() {
            return Err(invalid("has no identifier characters"));
        }
        if let Some((_, first)) = seen.iter().find(|(s, _)| *s == segment) {
            return Err(SparkError::KeyCollision {
                parent: parent.clone(),
                first: first.to_string(),
                second: key.to_string(),
                segment,
            });
        }
        seen.push((segment, key));
    }
    Ok(())
}
