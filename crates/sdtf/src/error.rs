//! Error types for SDTF analysis and tree mutations.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::path::{PathError, TreePath};
use sdtf_token_types::{MappingError, ValidationIssue};

pub type Result<T> = std::result::Result<T, SdtfError>;

/// One structural or value-shape problem, addressed from the document root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaIssue {
    pub path: Vec<Value>,
    pub code: String,
    pub message: String,
}

impl SchemaIssue {
    pub fn new(path: Vec<Value>, code: &str, message: impl Into<String>) -> Self {
        Self {
            path,
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn at_node(node: &TreePath, code: &str, message: impl Into<String>) -> Self {
        Self::new(node_path(node), code, message)
    }

    pub(crate) fn from_value_issue(prefix: &[Value], issue: &ValidationIssue) -> Self {
        let mut path = prefix.to_vec();
        path.extend(issue.path.iter().map(|seg| match seg {
            sdtf_token_types::ValueSegment::Key(k) => Value::String(k.clone()),
            sdtf_token_types::ValueSegment::Index(i) => Value::from(*i),
        }));
        Self::new(path, issue.code, issue.message.clone())
    }
}

pub(crate) fn node_path(node: &TreePath) -> Vec<Value> {
    node.segments()
        .iter()
        .map(|s| Value::String(s.clone()))
        .collect()
}

fn describe_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn list_modes(modes: &[String]) -> String {
    modes
        .iter()
        .map(|m| format!("\"{m}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Where a circular alias was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleScope {
    InitialTree,
    Mutation,
}

impl std::fmt::Display for CycleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleScope::InitialTree => f.write_str("initial token tree"),
            CycleScope::Mutation => f.write_str("token tree"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SdtfError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    #[error("Schema validation failed at \"{path}\": {}", describe_issues(.issues))]
    SchemaValidation {
        path: TreePath,
        issues: Vec<SchemaIssue>,
    },

    #[error("Token \"{token}\" has unknown type \"{token_type}\"")]
    UnknownTokenType { token: TreePath, token_type: String },

    #[error("Alias \"{alias}\" on token \"{token}\" is of type \"{actual}\" but should be of type \"{expected}\"")]
    AliasTypeMismatch {
        alias: TreePath,
        token: TreePath,
        actual: String,
        expected: String,
    },

    #[error("Token \"{token}\" cannot alias itself")]
    SelfReference { token: TreePath },

    #[error("A circular alias reference was found in {scope}.")]
    CircularAlias { scope: CycleScope },

    #[error("Collection \"{path}\" cannot be nested inside collection \"{parent}\"")]
    NestedCollection { path: TreePath, parent: TreePath },

    #[error(
        "Token \"{token}\" has modes [{}] but collection \"{collection}\" declares modes [{}]",
        list_modes(.token_modes),
        list_modes(.collection_modes)
    )]
    ModeCoherence {
        token: TreePath,
        collection: TreePath,
        token_modes: Vec<String>,
        collection_modes: Vec<String>,
    },

    #[error("Modes of token \"{token}\" in collection \"{collection}\" cannot be computed: its alias chain is unresolvable")]
    UnresolvableModes { token: TreePath, collection: TreePath },

    #[error("{0}")]
    StructuralMutation(String),

    #[error("{kind} \"{path}\" does not exist")]
    NodeNotFound { kind: &'static str, path: TreePath },

    #[error("Path \"{path}\" already exists")]
    PathCollision { path: TreePath },

    #[error("Alias \"{alias}\" on token \"{token}\" cannot be resolved")]
    UnresolvableAlias { token: TreePath, alias: TreePath },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("View \"{0}\" does not exist")]
    ViewNotFound(String),

    #[error("View \"{0}\" already exists")]
    DuplicateView(String),

    #[error(transparent)]
    TypeMapping(#[from] MappingError),
}

impl SdtfError {
    pub(crate) fn structural(message: impl Into<String>) -> Self {
        SdtfError::StructuralMutation(message.into())
    }

    pub(crate) fn schema(path: &TreePath, issues: Vec<SchemaIssue>) -> Self {
        SdtfError::SchemaValidation {
            path: path.clone(),
            issues,
        }
    }

    pub(crate) fn schema_one(path: &TreePath, code: &str, message: impl Into<String>) -> Self {
        Self::schema(path, vec![SchemaIssue::at_node(path, code, message)])
    }

    /// The machine-parseable issue list of a schema error.
    pub fn issues(&self) -> &[SchemaIssue] {
        match self {
            SdtfError::SchemaValidation { issues, .. } => issues,
            _ => &[],
        }
    }
}
