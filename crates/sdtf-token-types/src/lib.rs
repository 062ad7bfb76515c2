//! Token type registry for SDTF design tokens.
//!
//! Token types are described declaratively by [`TokenTypesMapping`]. The
//! registry answers two questions for the document engine: does a raw value
//! fit its `$type`, and which concrete token type is expected at a given
//! path inside such a value.
//!
//! # Example
//!
//! ```
//! use sdtf_token_types::{BuiltinRegistry, MatchOutcome, TokenTypeRegistry, ValueSegment};
//!
//! let registry = BuiltinRegistry::new();
//! let outcome = registry
//!     .match_type_at("number", "dimension", &[ValueSegment::key("value")], None)
//!     .unwrap();
//! assert_eq!(outcome, MatchOutcome::Success);
//! ```

mod error;
mod mapping;
mod matcher;
mod registry;
mod segment;
mod validate;

pub use error::MappingError;
pub use mapping::{MappingResolver, Primitive, TokenTypesMapping};
pub use matcher::{match_type_against_mapping, DiscriminatorLookup, MatchOutcome};
pub use registry::{BuiltinRegistry, TokenTypeRegistry};
pub use segment::{format_segments, ValueSegment};
pub use validate::{is_value_alias, validate_value, ValidationIssue};
