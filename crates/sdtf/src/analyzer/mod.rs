//! Tree analysis: raw SDTF JSON to validated, alias-resolved node sets.
//!
//! Analysis either returns a complete result or fails; there is no partial
//! output. Unknown alias targets and modes are the only soft outcome and are
//! reported through the resolvability flags.

mod classify;
mod decompose;
mod resolution;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use sdtf_token_types::TokenTypeRegistry;

pub use classify::NodeMetadata;
pub use decompose::TokenValue;
pub use resolution::{ComputedModes, ComputedModesCache, TokenResolvability};

pub(crate) use classify::{check_mode_name, check_node_name};
pub(crate) use decompose::{decompose_mode, decompose_token_value};
pub(crate) use resolution::{resolve, Resolution, TokenEntry, TokenGraph};

use classify::{classify, ClassifiedNode};

use crate::alias::AliasReference;
use crate::error::{CycleScope, Result, SdtfError};
use crate::node::{CollectionNode, Node, NodeSet, TokenNode};
use crate::options::AnalyzerOptions;
use crate::path::TreePath;
use crate::value_parts::RawValuePart;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedToken {
    pub path: TreePath,
    pub token_type: String,
    pub metadata: NodeMetadata,
    pub value: TokenValue,
    /// Nearest ancestor collection.
    pub collection: Option<TreePath>,
    pub modes_resolvability: IndexMap<String, bool>,
    pub is_fully_resolvable: bool,
}

impl AnalyzedToken {
    pub fn primitive_parts(&self) -> Vec<&RawValuePart> {
        self.value
            .parts()
            .map(|parts| parts.primitives().collect())
            .unwrap_or_default()
    }

    pub fn alias_parts(&self) -> Vec<&RawValuePart> {
        self.value
            .parts()
            .map(|parts| parts.aliases().collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedGroup {
    pub path: TreePath,
    pub metadata: NodeMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedCollection {
    pub path: TreePath,
    pub metadata: NodeMetadata,
    pub allowed_modes: Vec<String>,
}

/// Result of [`analyze_token_tree`].
#[derive(Debug, Clone)]
pub struct AnalyzedTokenTree {
    pub tokens: IndexMap<TreePath, AnalyzedToken>,
    pub groups: IndexMap<TreePath, AnalyzedGroup>,
    pub collections: IndexMap<TreePath, AnalyzedCollection>,
    pub aliases: Vec<AliasReference>,
    pub(crate) nodes: NodeSet,
    pub(crate) resolution: Resolution,
}

impl AnalyzedTokenTree {
    fn assemble(nodes: NodeSet, resolution: Resolution) -> Self {
        let mut tokens = IndexMap::new();
        let mut groups = IndexMap::new();
        let mut collections = IndexMap::new();
        for (path, node) in nodes.iter() {
            match node {
                Node::Token(token) => {
                    let flags = resolution.resolvability.get(path).cloned().unwrap_or_default();
                    tokens.insert(
                        path.clone(),
                        AnalyzedToken {
                            path: path.clone(),
                            token_type: token.token_type.clone(),
                            metadata: token.metadata.clone(),
                            value: token.value.clone(),
                            collection: nodes.owning_collection(path).map(|(c, _)| c.clone()),
                            modes_resolvability: flags.modes,
                            is_fully_resolvable: flags.is_fully_resolvable,
                        },
                    );
                }
                Node::Group(metadata) => {
                    groups.insert(
                        path.clone(),
                        AnalyzedGroup {
                            path: path.clone(),
                            metadata: metadata.clone(),
                        },
                    );
                }
                Node::Collection(collection) => {
                    collections.insert(
                        path.clone(),
                        AnalyzedCollection {
                            path: path.clone(),
                            metadata: collection.metadata.clone(),
                            allowed_modes: collection.modes.clone(),
                        },
                    );
                }
            }
        }
        Self {
            tokens,
            groups,
            collections,
            aliases: resolution.aliases.clone(),
            nodes,
            resolution,
        }
    }

    /// Memoized modes of every token, top-level aliases followed.
    pub fn computed_modes(&self) -> &ComputedModesCache {
        &self.resolution.computed_modes
    }

    /// Every node path in document order.
    pub fn order(&self) -> Vec<&TreePath> {
        self.nodes.iter().map(|(path, _)| path).collect()
    }
}

/// Analyzes a raw token tree.
pub fn analyze_token_tree(raw: &Value, options: &AnalyzerOptions) -> Result<AnalyzedTokenTree> {
    let registry = options.registry.as_ref();
    let nodes = collect_tree(raw, registry)?;
    let resolution = resolve(&nodes, registry, CycleScope::InitialTree)?;
    let tree = AnalyzedTokenTree::assemble(nodes, resolution);
    debug!(
        tokens = tree.tokens.len(),
        groups = tree.groups.len(),
        collections = tree.collections.len(),
        aliases = tree.aliases.len(),
        "analyzed token tree"
    );
    Ok(tree)
}

pub(crate) fn collect_tree(raw: &Value, registry: &dyn TokenTypeRegistry) -> Result<NodeSet> {
    let root = TreePath::root();
    let Some(map) = raw.as_object() else {
        return Err(SdtfError::schema_one(
            &root,
            "NODE",
            "token tree must be an object",
        ));
    };
    let mut nodes = NodeSet::default();
    for (name, child) in map {
        if let Err(message) = check_node_name(name) {
            return Err(SdtfError::schema_one(&root, "NAME", message));
        }
        collect_subtree(&root.child(name)?, child, None, registry, &mut nodes)?;
    }
    Ok(nodes)
}

/// Classifies and decomposes the subtree at `path`, appending it to `out`
/// parents first.
pub(crate) fn collect_subtree(
    path: &TreePath,
    raw: &Value,
    collection: Option<&TreePath>,
    registry: &dyn TokenTypeRegistry,
    out: &mut NodeSet,
) -> Result<()> {
    match classify(path, raw)? {
        ClassifiedNode::Collection {
            metadata,
            modes,
            children,
        } => {
            if let Some(parent) = collection {
                return Err(SdtfError::NestedCollection {
                    path: path.clone(),
                    parent: parent.clone(),
                });
            }
            out.insert(path.clone(), Node::Collection(CollectionNode { metadata, modes }));
            for (name, child) in children {
                collect_subtree(&path.child(name)?, child, Some(path), registry, out)?;
            }
        }
        ClassifiedNode::Group { metadata, children } => {
            out.insert(path.clone(), Node::Group(metadata));
            for (name, child) in children {
                collect_subtree(&path.child(name)?, child, collection, registry, out)?;
            }
        }
        ClassifiedNode::Token {
            metadata,
            token_type,
            value,
        } => {
            let value = decompose_token_value(path, token_type, value, registry)?;
            out.insert(
                path.clone(),
                Node::Token(TokenNode {
                    token_type: token_type.to_string(),
                    metadata,
                    value,
                }),
            );
        }
    }
    Ok(())
}
