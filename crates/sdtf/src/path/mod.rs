//! Addressing primitives: tree paths locate nodes, value paths locate
//! members inside one mode's value.

mod tree_path;
mod value_path;

pub use tree_path::{PathError, TreePath, PATH_SEPARATOR};
pub use value_path::{ValuePath, ValueSegment};
