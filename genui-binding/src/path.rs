//! Data-model paths.
//!
//! A path addresses one value in the shared data model as an ordered
//! sequence of string segments. Two notations parse to the same
//! path: dotted with brackets (`a.b[2].c`) and slash-separated
//! (`/a/b/2/c`).

use crate::error::{BindingError, BindingResult};
use std::fmt;

/// Immutable path into the data model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingPath {
    segments: Vec<String>,
    absolute: bool,
}

impl BindingPath {
    /// The empty absolute path (the model root).
    #[must_use]
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
            absolute: true,
        }
    }

    /// Build a path from pre-split segments.
    #[must_use]
    pub fn from_segments<I, S>(segments: I, absolute: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            absolute,
        }
    }

    /// Parse dotted notation with bracket indices: `a.b[2].c`.
    ///
    /// Dotted paths are model-rooted, so the result is absolute and
    /// compares equal to the same path in slash notation.
    pub fn from_dot_notation(input: &str) -> BindingResult<Self> {
        if input.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for piece in input.split('.') {
            if piece.is_empty() {
                return Err(BindingError::invalid_path(input, "empty segment"));
            }
            let (name, brackets) = match piece.find('[') {
                Some(pos) => piece.split_at(pos),
                None => (piece, ""),
            };
            if !name.is_empty() {
                segments.push(name.to_string());
            } else if brackets.is_empty() {
                return Err(BindingError::invalid_path(input, "empty segment"));
            }

            let mut rest = brackets;
            while !rest.is_empty() {
                let Some(inner) = rest.strip_prefix('[') else {
                    return Err(BindingError::invalid_path(input, "malformed index"));
                };
                let Some(end) = inner.find(']') else {
                    return Err(BindingError::invalid_path(input, "unclosed bracket"));
                };
                let index = &inner[..end];
                if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(BindingError::invalid_path(input, "non-numeric index"));
                }
                segments.push(index.to_string());
                rest = &inner[end + 1..];
            }
        }

        Ok(Self {
            segments,
            absolute: true,
        })
    }

    /// Parse slash notation: `/a/b/2/c`. A leading slash marks the
    /// path absolute.
    pub fn from_slash_notation(input: &str) -> BindingResult<Self> {
        let (absolute, rest) = match input.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, input),
        };
        if rest.is_empty() {
            return Ok(Self {
                segments: Vec::new(),
                absolute,
            });
        }

        let mut segments = Vec::new();
        for piece in rest.split('/') {
            if piece.is_empty() {
                return Err(BindingError::invalid_path(input, "empty segment"));
            }
            segments.push(piece.to_string());
        }

        Ok(Self { segments, absolute })
    }

    /// Parse either notation, chosen by the presence of `/`.
    pub fn parse(input: &str) -> BindingResult<Self> {
        if input.contains('/') {
            Self::from_slash_notation(input)
        } else {
            Self::from_dot_notation(input)
        }
    }

    /// The path segments in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether this path is model-rooted.
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the path has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The final segment, if any.
    #[must_use]
    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// All but the last segment. `None` for paths with fewer than
    /// two segments.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
            absolute: self.absolute,
        })
    }

    /// Append another path's segments to this one. The result keeps
    /// this path's absolute flag.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self {
            segments,
            absolute: self.absolute,
        }
    }

    /// Append a single segment.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self {
            segments,
            absolute: self.absolute,
        }
    }

    /// Whether this path starts with the given prefix.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// Render in dotted notation; numeric segments use brackets.
    #[must_use]
    pub fn to_dot_notation(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            let numeric = !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit());
            if numeric {
                out.push('[');
                out.push_str(segment);
                out.push(']');
            } else {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(segment);
            }
        }
        out
    }

    /// Render in slash notation.
    #[must_use]
    pub fn to_slash_notation(&self) -> String {
        let joined = self.segments.join("/");
        if self.absolute {
            format!("/{joined}")
        } else {
            joined
        }
    }
}

impl fmt::Display for BindingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dot_notation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dot_and_slash_notations_agree() {
        let dotted = BindingPath::from_dot_notation("a.b[2].c").unwrap();
        let slashed = BindingPath::from_slash_notation("/a/b/2/c").unwrap();
        assert_eq!(dotted, slashed);
        assert_eq!(dotted.segments(), &["a", "b", "2", "c"]);
        assert!(dotted.is_absolute());
    }

    #[test]
    fn test_dot_notation_multiple_indices() {
        let path = BindingPath::from_dot_notation("grid[1][2].cell").unwrap();
        assert_eq!(path.segments(), &["grid", "1", "2", "cell"]);
    }

    #[test]
    fn test_dot_notation_rejects_malformed() {
        assert!(BindingPath::from_dot_notation("a..b").is_err());
        assert!(BindingPath::from_dot_notation("a[").is_err());
        assert!(BindingPath::from_dot_notation("a[x]").is_err());
        assert!(BindingPath::from_dot_notation("a[]").is_err());
    }

    #[test]
    fn test_slash_notation_relative() {
        let path = BindingPath::from_slash_notation("a/b").unwrap();
        assert!(!path.is_absolute());
        assert_ne!(path, BindingPath::from_slash_notation("/a/b").unwrap());
    }

    #[test]
    fn test_parent_and_leaf() {
        let path = BindingPath::from_dot_notation("user.address.city").unwrap();
        assert_eq!(path.leaf(), Some("city"));
        assert_eq!(
            path.parent().unwrap(),
            BindingPath::from_dot_notation("user.address").unwrap()
        );

        let single = BindingPath::from_dot_notation("user").unwrap();
        assert!(single.parent().is_none());
        assert!(BindingPath::root().parent().is_none());
    }

    #[test]
    fn test_join_and_child() {
        let scope = BindingPath::from_dot_notation("form").unwrap();
        let rel = BindingPath::from_segments(["fields", "name"], false);
        let joined = scope.join(&rel);
        assert_eq!(joined, BindingPath::from_dot_notation("form.fields.name").unwrap());

        assert_eq!(
            scope.child("title"),
            BindingPath::from_dot_notation("form.title").unwrap()
        );
    }

    #[test]
    fn test_starts_with() {
        let path = BindingPath::from_dot_notation("a.b.c").unwrap();
        let prefix = BindingPath::from_dot_notation("a.b").unwrap();
        assert!(path.starts_with(&prefix));
        assert!(path.starts_with(&path));
        assert!(!prefix.starts_with(&path));
    }

    #[test]
    fn test_display_round_trip() {
        let path = BindingPath::from_dot_notation("items[0].label").unwrap();
        assert_eq!(path.to_string(), "items[0].label");
        assert_eq!(BindingPath::from_dot_notation(&path.to_string()).unwrap(), path);
        assert_eq!(path.to_slash_notation(), "/items/0/label");
    }

    #[test]
    fn test_empty_path() {
        let root = BindingPath::root();
        assert!(root.is_empty());
        assert_eq!(root.leaf(), None);
        assert_eq!(BindingPath::from_dot_notation("").unwrap(), root);
    }
}
