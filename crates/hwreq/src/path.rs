//! Dotted field paths addressing locations in a candidate environment
//!
//! A [`FieldPath`] is an ordered list of segments rendered as `cpu.model-name`.
//! Paths never contain list indices: list-typed fields (`disk`, `network`)
//! are traversed by fanning out across elements at evaluation time.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An ordered, immutable sequence of field-name segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// The empty path, addressing the candidate root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a path from segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns a new path with `segment` appended.
    ///
    /// Parsing descends one mapping level at a time, so extension clones;
    /// paths are short (two or three segments) and built once per parse.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// The individual segments, in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True for the candidate root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True when the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl FromStr for FieldPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        Ok(Self::from_segments(s.split('.')))
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

// Paths serialize as their dotted rendering so reports and reloadable
// schema files stay human-editable.
impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_with_dots() {
        let path = FieldPath::root().child("cpu").child("model-name");
        assert_eq!(path.to_string(), "cpu.model-name");
    }

    #[test]
    fn parse_round_trips() {
        let path: FieldPath = "virtualization.is-virtualized".parse().unwrap();
        assert_eq!(path.segments(), ["virtualization", "is-virtualized"]);
        assert_eq!(path.to_string(), "virtualization.is-virtualized");
    }

    #[test]
    fn root_is_empty() {
        assert!(FieldPath::root().is_root());
        assert_eq!(FieldPath::root().to_string(), "");
        let parsed: FieldPath = "".parse().unwrap();
        assert!(parsed.is_root());
    }

    #[test]
    fn child_does_not_mutate_parent() {
        let parent = FieldPath::from_segments(["cpu"]);
        let child = parent.child("cores");
        assert_eq!(parent.len(), 1);
        assert_eq!(child.len(), 2);
    }
}
