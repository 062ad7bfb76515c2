//! Document engine for SDTF design-token trees.
//!
//! Raw JSON is analyzed once into validated node sets, adopted by a live
//! [`TreeState`] that keeps paths and aliases consistent under edits, and
//! read back through queries that render fragments or merge selections into
//! new trees.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use sdtf::{AnalyzerOptions, TreeState, TreePath};
//!
//! let mut state = TreeState::new(
//!     &json!({
//!         "base": {"$type": "number", "$value": {"default": 4}},
//!         "gap": {"$type": "number", "$value": {"default": {"$alias": "base", "$mode": "default"}}}
//!     }),
//!     &AnalyzerOptions::default(),
//! )
//! .unwrap();
//!
//! let base: TreePath = "base".parse().unwrap();
//! state.rename_node(&base, "unit").unwrap();
//! assert_eq!(
//!     state.to_json()["gap"]["$value"]["default"],
//!     json!({"$alias": "unit", "$mode": "default"})
//! );
//! ```

pub mod alias;
pub mod analyzer;
pub mod engine;
pub mod error;
mod node;
pub mod options;
pub mod path;
pub mod query;
pub mod state;
pub mod value_parts;

pub use alias::{AliasFrom, AliasIndex, AliasKind, AliasReference, AliasTo};
pub use analyzer::{
    analyze_token_tree, AnalyzedCollection, AnalyzedGroup, AnalyzedToken, AnalyzedTokenTree,
    ComputedModes, ComputedModesCache, NodeMetadata, TokenResolvability, TokenValue,
};
pub use engine::{EngineExport, SdtfEngine, ViewExport};
pub use error::{CycleScope, Result, SchemaIssue, SdtfError};
pub use node::NodeKind;
pub use options::{AnalyzerOptions, JsonValueOptions};
pub use path::{PathError, TreePath, ValuePath, ValueSegment, PATH_SEPARATOR};
pub use query::{
    ChildrenScope, ChildrenSelect, Clause, MergeCollision, MergeDedupe, QueryResult,
    RenderedFragment, SdtfQuery, Select, SelectShape, Where,
};
pub use state::{CollectionState, GroupState, NodeState, TokenState, TreeState};
pub use value_parts::{RawValuePart, TokenRawValueParts};

pub use sdtf_token_types as token_types;
