//! Value path segments.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single step inside a structured token value.
///
/// Keys address object members, indices address array or tuple members.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSegment {
    Key(String),
    Index(usize),
}

impl ValueSegment {
    #[inline]
    pub fn key(k: impl Into<String>) -> Self {
        ValueSegment::Key(k.into())
    }

    #[inline]
    pub fn index(i: usize) -> Self {
        ValueSegment::Index(i)
    }

    #[inline]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            ValueSegment::Key(k) => Some(k),
            ValueSegment::Index(_) => None,
        }
    }

    #[inline]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            ValueSegment::Key(_) => None,
            ValueSegment::Index(i) => Some(*i),
        }
    }
}

impl fmt::Display for ValueSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSegment::Key(k) if k.is_empty() => f.write_str("[]"),
            ValueSegment::Key(k) => {
                for ch in k.chars() {
                    if matches!(ch, '.' | '[' | '\\') {
                        f.write_str("\\")?;
                    }
                    write!(f, "{ch}")?;
                }
                Ok(())
            }
            ValueSegment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

impl From<&str> for ValueSegment {
    fn from(s: &str) -> Self {
        ValueSegment::Key(s.to_owned())
    }
}

impl From<String> for ValueSegment {
    fn from(s: String) -> Self {
        ValueSegment::Key(s)
    }
}

impl From<usize> for ValueSegment {
    fn from(i: usize) -> Self {
        ValueSegment::Index(i)
    }
}

/// Formats a segment list in dot form.
///
/// Keys are dot-separated and any `.`, `[` or backslash inside a key is escaped
/// with a backslash. Indices render as `[n]` and the empty key as `[]`, so
/// distinct lists never share a string form.
pub fn format_segments(segments: &[ValueSegment]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        if i > 0 && matches!(seg, ValueSegment::Key(_)) {
            out.push('.');
        }
        out.push_str(&seg.to_string());
    }
    out
}
