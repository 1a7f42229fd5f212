//! Key path codec
//!
//! Keys address the cache as dotted strings (`"user.profile.name"`) or as
//! ordered segment sequences. Both forms denormalize to a [`KeyPath`]; the
//! first segment is the *root key*, the sole addressing unit of the backing
//! store, and the remainder is the *residual path* into the root's value
//! tree.
//!
//! All operations here are pure and never mutate their input.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between key segments in the normalized string form
pub const SEGMENT_SEPARATOR: char = '.';

/// A denormalized cache key: an ordered sequence of string segments.
///
/// # Examples
///
/// ```
/// use canopy_core::KeyPath;
///
/// let path = KeyPath::from("user.profile.name");
/// assert_eq!(path.root(), Some("user"));
/// assert_eq!(path.residual(), &["profile".to_string(), "name".to_string()]);
/// assert_eq!(path.normalize(), "user.profile.name");
///
/// // The empty string denormalizes to the empty path
/// assert!(KeyPath::from("").is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Build a path from already-denormalized segments
    pub fn new(segments: Vec<String>) -> Self {
        KeyPath { segments }
    }

    /// The empty path (addresses the full snapshot on reads)
    pub fn empty() -> Self {
        KeyPath {
            segments: Vec::new(),
        }
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True when the path has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The denormalized segment sequence
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The first segment: the backing store's addressing unit
    pub fn root(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// The segments after the root, addressing into the root's value tree
    pub fn residual(&self) -> &[String] {
        if self.segments.is_empty() {
            &[]
        } else {
            &self.segments[1..]
        }
    }

    /// Join the segments back into the dotted string form
    pub fn normalize(&self) -> String {
        self.segments.join(".")
    }

    /// Every ancestor prefix of this path, shortest first, in normalized
    /// form: for `a.b.c` this yields `a`, `a.b`, `a.b.c`.
    ///
    /// Subscriptions are registered under each of these so that a subscriber
    /// at a shallow prefix observes mutations anywhere beneath it.
    pub fn prefixes(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.segments.len());
        for i in 1..=self.segments.len() {
            out.push(self.segments[..i].join("."));
        }
        out
    }
}

impl From<&str> for KeyPath {
    fn from(key: &str) -> Self {
        if key.is_empty() {
            return KeyPath::empty();
        }
        KeyPath {
            segments: key
                .split(SEGMENT_SEPARATOR)
                .map(str::to_string)
                .collect(),
        }
    }
}

impl From<String> for KeyPath {
    fn from(key: String) -> Self {
        KeyPath::from(key.as_str())
    }
}

impl From<&String> for KeyPath {
    fn from(key: &String) -> Self {
        KeyPath::from(key.as_str())
    }
}

impl From<Vec<String>> for KeyPath {
    fn from(segments: Vec<String>) -> Self {
        KeyPath { segments }
    }
}

impl From<&[&str]> for KeyPath {
    fn from(segments: &[&str]) -> Self {
        KeyPath {
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl<const N: usize> From<[&str; N]> for KeyPath {
    fn from(segments: [&str; N]) -> Self {
        KeyPath::from(&segments[..])
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalize())
    }
}
