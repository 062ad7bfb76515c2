//! Configuration for analysis and value rendering.

use std::sync::Arc;

use sdtf_token_types::{BuiltinRegistry, TokenTypeRegistry};

/// Options for [`analyze_token_tree`](crate::analyze_token_tree) and every
/// tree state built from it.
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// Source of `$type` schemas and type mappings.
    pub registry: Arc<dyn TokenTypeRegistry>,
}

impl AnalyzerOptions {
    pub fn with_registry(registry: impl TokenTypeRegistry + 'static) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self::with_registry(BuiltinRegistry::new())
    }
}

/// Options for [`TokenState::json_value`](crate::TokenState::json_value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonValueOptions {
    /// Replace aliases with the values they point at.
    pub resolve_aliases: bool,
    /// Keep unresolvable aliases as raw alias objects instead of failing.
    pub allow_unresolvable: bool,
    /// Render only this mode's value.
    pub target_mode: Option<String>,
}

impl Default for JsonValueOptions {
    fn default() -> Self {
        Self {
            resolve_aliases: true,
            allow_unresolvable: false,
            target_mode: None,
        }
    }
}
