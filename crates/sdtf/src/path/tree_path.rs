use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between node names in the dotted form of a tree path.
pub const PATH_SEPARATOR: char = '.';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path segment at position {position} is empty")]
    EmptySegment { position: usize },
    #[error("path segment \"{segment}\" contains the separator \".\"")]
    SeparatorInSegment { segment: String },
    #[error("index {index} is out of range for a path of length {len}")]
    OutOfRange { index: usize, len: usize },
}

/// Location of a node in the document namespace.
///
/// Every name is non-empty and free of [`PATH_SEPARATOR`], so the dotted
/// form is injective and doubles as a hash key.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TreePath(Vec<String>);

impl TreePath {
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new<I, S>(names: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        for (position, name) in names.iter().enumerate() {
            check_name(name, position)?;
        }
        Ok(Self(names))
    }

    /// Validates a single node name.
    pub fn validate_name(name: &str) -> Result<(), PathError> {
        check_name(name, 0)
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn to_array(&self) -> Vec<String> {
        self.0.clone()
    }

    /// Last name of the path, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<TreePath> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// New path with `name` appended.
    pub fn child(&self, name: &str) -> Result<TreePath, PathError> {
        let mut out = self.clone();
        out.append(name)?;
        Ok(out)
    }

    pub fn append(&mut self, name: &str) -> Result<(), PathError> {
        check_name(name, self.0.len())?;
        self.0.push(name.to_string());
        Ok(())
    }

    pub fn prepend(&mut self, name: &str) -> Result<(), PathError> {
        check_name(name, 0)?;
        self.0.insert(0, name.to_string());
        Ok(())
    }

    pub fn replace_at(&mut self, index: usize, name: &str) -> Result<(), PathError> {
        if index >= self.0.len() {
            return Err(PathError::OutOfRange {
                index,
                len: self.0.len(),
            });
        }
        check_name(name, index)?;
        self.0[index] = name.to_string();
        Ok(())
    }

    /// Drops up to `count` names from the start.
    pub fn remove_left(&mut self, count: usize) {
        let count = count.min(self.0.len());
        self.0.drain(..count);
    }

    /// Drops up to `count` names from the end.
    pub fn remove_right(&mut self, count: usize) {
        let keep = self.0.len().saturating_sub(count);
        self.0.truncate(keep);
    }

    /// Names in `start..end`, clamped to the path length.
    pub fn slice(&self, start: usize, end: usize) -> TreePath {
        let end = end.min(self.0.len());
        let start = start.min(end);
        Self(self.0[start..end].to_vec())
    }

    /// Concatenation of `self` and `other`.
    pub fn merge(&self, other: &TreePath) -> TreePath {
        let mut names = self.0.clone();
        names.extend(other.0.iter().cloned());
        Self(names)
    }

    /// True if `prefix` is equal to or an ancestor of this path.
    pub fn starts_with(&self, prefix: &TreePath) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// Strict ancestor test.
    pub fn is_descendant_of(&self, ancestor: &TreePath) -> bool {
        self.0.len() > ancestor.0.len() && self.starts_with(ancestor)
    }

    /// Replaces the `old_prefix` of this path with `new_prefix`.
    ///
    /// Returns `None` when this path does not start with `old_prefix`.
    pub fn rebase(&self, old_prefix: &TreePath, new_prefix: &TreePath) -> Option<TreePath> {
        if !self.starts_with(old_prefix) {
            return None;
        }
        let mut names = new_prefix.0.clone();
        names.extend(self.0[old_prefix.0.len()..].iter().cloned());
        Some(Self(names))
    }

    /// Every strict ancestor, nearest first, ending with the root.
    pub fn ancestors(&self) -> impl Iterator<Item = TreePath> + '_ {
        (0..self.0.len()).rev().map(move |len| Self(self.0[..len].to_vec()))
    }
}

fn check_name(name: &str, position: usize) -> Result<(), PathError> {
    if name.is_empty() {
        return Err(PathError::EmptySegment { position });
    }
    if name.contains(PATH_SEPARATOR) {
        return Err(PathError::SeparatorInSegment {
            segment: name.to_string(),
        });
    }
    Ok(())
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{PATH_SEPARATOR}")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

impl FromStr for TreePath {
    type Err = PathError;

    /// Parses the dotted form. The empty string is the root.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        Self::new(s.split(PATH_SEPARATOR))
    }
}

impl TryFrom<Vec<String>> for TreePath {
    type Error = PathError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<TreePath> for Vec<String> {
    fn from(path: TreePath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> TreePath {
        s.parse().unwrap()
    }

    #[test]
    fn test_rejects_empty_and_separator_segments() {
        assert_eq!(
            TreePath::new(["a", ""]),
            Err(PathError::EmptySegment { position: 1 })
        );
        assert!(matches!(
            TreePath::new(["a.b"]),
            Err(PathError::SeparatorInSegment { .. })
        ));
        assert!(p("a").append("").is_err());
    }

    #[test]
    fn test_in_place_edits() {
        let mut path = p("a.b.c");
        path.prepend("root").unwrap();
        assert_eq!(path.to_string(), "root.a.b.c");
        path.replace_at(1, "x").unwrap();
        assert_eq!(path.to_string(), "root.x.b.c");
        path.remove_left(1);
        path.remove_right(1);
        assert_eq!(path, p("x.b"));
        assert!(path.replace_at(5, "y").is_err());
    }

    #[test]
    fn test_slice_merge_rebase() {
        let path = p("a.b.c.d");
        assert_eq!(path.slice(1, 3), p("b.c"));
        assert_eq!(path.slice(3, 10), p("d"));
        assert_eq!(p("a").merge(&p("b.c")), p("a.b.c"));
        assert_eq!(path.rebase(&p("a.b"), &p("z")), Some(p("z.c.d")));
        assert_eq!(path.rebase(&p("b"), &p("z")), None);
        assert!(path.is_descendant_of(&p("a")));
        assert!(!path.is_descendant_of(&path));
        assert!(TreePath::root().is_root());
        assert_eq!("".parse::<TreePath>().unwrap(), TreePath::root());
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let all: Vec<String> = p("a.b.c").ancestors().map(|a| a.to_string()).collect();
        assert_eq!(all, vec!["a.b", "a", ""]);
    }
}
