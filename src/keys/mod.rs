//! Key module for query identifiers
//!
//! This module handles:
//! - The `Key` type (a trimmed, non-empty district name)
//! - Normalization of raw key lists (trim, drop empty, dedup, sort)
//! - Reading and writing key files

mod normalize;
mod source;

pub use normalize::normalize_keys;
pub use source::{load_keys, write_keys};

use std::fmt;

/// A trimmed, non-empty query identifier
///
/// Keys compare by their trimmed text. Two raw strings that differ only in
/// surrounding whitespace produce equal keys; strings that differ in case do
/// not.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(String);

impl Key {
    /// Creates a key from raw text
    ///
    /// Returns `None` if the text is empty after trimming.
    ///
    /// # Examples
    ///
    /// ```
    /// use weather_harvest::keys::Key;
    ///
    /// assert_eq!(Key::new("  Kota Batu ").unwrap().as_str(), "Kota Batu");
    /// assert!(Key::new("   ").is_none());
    /// ```
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
