use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub use sdtf_token_types::ValueSegment;

/// Location inside one mode's structured value.
///
/// The empty path addresses the whole mode value.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValuePath(Vec<ValueSegment>);

impl ValuePath {
    #[inline]
    pub fn mode_level() -> Self {
        Self(Vec::new())
    }

    pub fn new(segments: Vec<ValueSegment>) -> Self {
        Self(segments)
    }

    #[inline]
    pub fn is_mode_level(&self) -> bool {
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
    pub fn segments(&self) -> &[ValueSegment] {
        &self.0
    }

    pub fn push(&mut self, segment: impl Into<ValueSegment>) {
        self.0.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<ValueSegment> {
        self.0.pop()
    }

    pub fn child(&self, segment: impl Into<ValueSegment>) -> ValuePath {
        let mut out = self.clone();
        out.push(segment);
        out
    }

    pub fn parent(&self) -> Option<ValuePath> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// True when this path is a prefix of (or equal to) `other`.
    pub fn is_root_of(&self, other: &ValuePath) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// Segments as JSON values: keys become strings, indices numbers.
    pub fn to_array(&self) -> Vec<Value> {
        self.0
            .iter()
            .map(|seg| match seg {
                ValueSegment::Key(k) => Value::String(k.clone()),
                ValueSegment::Index(i) => Value::from(*i),
            })
            .collect()
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&sdtf_token_types::format_segments(&self.0))
    }
}

impl From<Vec<ValueSegment>> for ValuePath {
    fn from(segments: Vec<ValueSegment>) -> Self {
        Self(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_level_and_prefix() {
        let root = ValuePath::mode_level();
        assert!(root.is_mode_level());
        let color = root.child("color");
        let red = color.child("red");
        let first = ValuePath::new(vec![ValueSegment::Index(0)]);
        assert!(root.is_root_of(&red));
        assert!(color.is_root_of(&red));
        assert!(color.is_root_of(&color));
        assert!(!red.is_root_of(&color));
        assert!(!first.is_root_of(&color));
        assert_eq!(red.to_string(), "color.red");
        assert_eq!(red.parent(), Some(color));
        assert_eq!(first.to_array(), vec![Value::from(0)]);
        assert_eq!(first.to_string(), "[0]");
        assert_ne!(ValuePath::new(vec!["0".into()]).to_string(), first.to_string());
        assert_ne!(
            ValuePath::new(vec!["a.b".into()]).to_string(),
            ValuePath::new(vec!["a".into(), "b".into()]).to_string()
        );
    }
}
