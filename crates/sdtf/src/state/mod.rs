//! Live, mutable token tree.
//!
//! A [`TreeState`] adopts a finished analysis and owns every node. All edits
//! go through its methods; each one is validated, applied, and re-checked
//! with the same alias rules the analyzer enforces. A failing edit leaves the
//! state exactly as it was.

mod modes;
mod mutation;
mod views;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use sdtf_token_types::TokenTypeRegistry;

pub use views::{CollectionState, GroupState, NodeState, TokenState};

use crate::alias::{AliasIndex, AliasReference};
use crate::analyzer::{
    analyze_token_tree, resolve, AnalyzedTokenTree, ComputedModesCache, TokenResolvability,
    TokenValue,
};
use crate::error::{CycleScope, Result, SdtfError};
use crate::node::{Node, NodeKind, NodeSet};
use crate::options::AnalyzerOptions;
use crate::path::TreePath;
use crate::value_parts::{deep_set, RawValuePart};

#[derive(Debug, Clone)]
pub struct TreeState {
    nodes: NodeSet,
    registry: Arc<dyn TokenTypeRegistry>,
    aliases: AliasIndex,
    computed_modes: ComputedModesCache,
    resolvability: HashMap<TreePath, TokenResolvability>,
}

struct Snapshot {
    nodes: NodeSet,
    aliases: AliasIndex,
    computed_modes: ComputedModesCache,
    resolvability: HashMap<TreePath, TokenResolvability>,
}

impl TreeState {
    /// Analyzes `raw` and adopts the result.
    pub fn new(raw: &Value, options: &AnalyzerOptions) -> Result<Self> {
        let analysis = analyze_token_tree(raw, options)?;
        Ok(Self::from_analysis(analysis, options))
    }

    pub fn from_analysis(analysis: AnalyzedTokenTree, options: &AnalyzerOptions) -> Self {
        let AnalyzedTokenTree {
            nodes, resolution, ..
        } = analysis;
        Self {
            nodes,
            registry: Arc::clone(&options.registry),
            aliases: AliasIndex::new(resolution.aliases),
            computed_modes: resolution.computed_modes,
            resolvability: resolution.resolvability,
        }
    }

    /// Builds a state from nodes assembled in memory, such as a merge result.
    pub(crate) fn from_nodes(nodes: NodeSet, registry: Arc<dyn TokenTypeRegistry>) -> Result<Self> {
        nodes.check_nesting()?;
        let resolution = resolve(&nodes, registry.as_ref(), CycleScope::InitialTree)?;
        Ok(Self {
            nodes,
            registry,
            aliases: AliasIndex::new(resolution.aliases),
            computed_modes: resolution.computed_modes,
            resolvability: resolution.resolvability,
        })
    }

    pub fn registry(&self) -> &Arc<dyn TokenTypeRegistry> {
        &self.registry
    }

    pub(crate) fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 0
    }

    pub fn contains(&self, path: &TreePath) -> bool {
        self.nodes.contains(path)
    }

    pub fn node_kind(&self, path: &TreePath) -> Option<NodeKind> {
        self.nodes.kind(path)
    }

    pub fn node(&self, path: &TreePath) -> Option<NodeState<'_>> {
        let (key, node) = self.nodes.entry(path)?;
        Some(NodeState::new(self, key, node))
    }

    pub fn token(&self, path: &TreePath) -> Option<TokenState<'_>> {
        match self.node(path)? {
            NodeState::Token(token) => Some(token),
            _ => None,
        }
    }

    pub fn group(&self, path: &TreePath) -> Option<GroupState<'_>> {
        match self.node(path)? {
            NodeState::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn collection(&self, path: &TreePath) -> Option<CollectionState<'_>> {
        match self.node(path)? {
            NodeState::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    /// Every node, in document order.
    pub fn nodes_iter(&self) -> impl Iterator<Item = NodeState<'_>> {
        self.nodes
            .iter()
            .map(move |(path, node)| NodeState::new(self, path, node))
    }

    pub fn tokens(&self) -> impl Iterator<Item = TokenState<'_>> {
        self.nodes_iter().filter_map(|node| match node {
            NodeState::Token(token) => Some(token),
            _ => None,
        })
    }

    pub fn groups(&self) -> impl Iterator<Item = GroupState<'_>> {
        self.nodes_iter().filter_map(|node| match node {
            NodeState::Group(group) => Some(group),
            _ => None,
        })
    }

    pub fn collections(&self) -> impl Iterator<Item = CollectionState<'_>> {
        self.nodes_iter().filter_map(|node| match node {
            NodeState::Collection(collection) => Some(collection),
            _ => None,
        })
    }

    /// Direct children of `path`; the root path lists top-level nodes.
    pub fn children(&self, path: &TreePath) -> Vec<&TreePath> {
        self.nodes.children(path)
    }

    pub fn alias_references(&self) -> &[AliasReference] {
        self.aliases.references()
    }

    /// Aliases written by the token at `path`.
    pub fn aliases_from(&self, path: &TreePath) -> Vec<&AliasReference> {
        self.aliases.from_token(path)
    }

    /// Aliases pointing at `path`, resolvable or not.
    pub fn aliases_to(&self, path: &TreePath) -> Vec<&AliasReference> {
        self.aliases.to_target(path)
    }

    pub fn to_json(&self) -> Value {
        self.nodes.to_json()
    }

    pub(crate) fn computed_modes(&self, path: &TreePath) -> Option<&[String]> {
        self.computed_modes.get(path).and_then(|modes| modes.modes())
    }

    pub(crate) fn resolvability(&self, path: &TreePath) -> Option<&TokenResolvability> {
        self.resolvability.get(path)
    }

    /// The value of `mode` on the token at `path` with every alias replaced by
    /// its target's value. `None` when any alias on the way is unresolvable.
    pub(crate) fn resolve_mode_value(&self, path: &TreePath, mode: &str) -> Option<Value> {
        let token = self.nodes.token(path)?;
        match &token.value {
            TokenValue::TopLevelAlias { target } => self.resolve_mode_value(target, mode),
            TokenValue::Modes(parts) => {
                if !parts.has_mode(mode) {
                    return None;
                }
                let mut out = Value::Null;
                for part in parts.parts_for_mode(mode) {
                    let leaf = match part {
                        RawValuePart::Primitive { value, .. } => value.clone(),
                        RawValuePart::Alias {
                            target, target_mode, ..
                        } => self.resolve_mode_value(target, target_mode)?,
                    };
                    deep_set(&mut out, part.value_path().segments(), leaf);
                }
                Some(out)
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self.nodes.clone(),
            aliases: self.aliases.clone(),
            computed_modes: self.computed_modes.clone(),
            resolvability: self.resolvability.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.nodes = snapshot.nodes;
        self.aliases = snapshot.aliases;
        self.computed_modes = snapshot.computed_modes;
        self.resolvability = snapshot.resolvability;
    }

    /// Re-runs the alias checks and rebuilds the derived indexes.
    fn refresh(&mut self) -> Result<()> {
        self.nodes.check_nesting()?;
        let resolution = resolve(&self.nodes, self.registry.as_ref(), CycleScope::Mutation)?;
        self.aliases = AliasIndex::new(resolution.aliases);
        self.computed_modes = resolution.computed_modes;
        self.resolvability = resolution.resolvability;
        Ok(())
    }

    /// Applies `apply` and re-checks the tree, restoring the previous state
    /// if either step fails.
    fn commit<T>(&mut self, operation: &str, apply: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let snapshot = self.snapshot();
        let value = match apply(self) {
            Ok(value) => value,
            Err(err) => {
                self.restore(snapshot);
                return Err(err);
            }
        };
        if let Err(err) = self.refresh() {
            warn!(operation, error = %err, "rolled back tree mutation");
            self.restore(snapshot);
            return Err(err);
        }
        debug!(operation, nodes = self.nodes.len(), aliases = self.aliases.len(), "committed tree mutation");
        Ok(value)
    }

    fn require(&self, path: &TreePath, kind: NodeKind) -> Result<()> {
        match self.nodes.kind(path) {
            Some(found) if found == kind => Ok(()),
            _ => Err(SdtfError::NodeNotFound {
                kind: kind.as_str(),
                path: path.clone(),
            }),
        }
    }

    fn require_node(&self, path: &TreePath) -> Result<NodeKind> {
        self.nodes.kind(path).ok_or_else(|| SdtfError::NodeNotFound {
            kind: "Node",
            path: path.clone(),
        })
    }

    /// A parent for new or moved nodes: the root, a group or a collection.
    fn require_container(&self, path: &TreePath) -> Result<()> {
        if path.is_root() {
            return Ok(());
        }
        match self.require_node(path)? {
            NodeKind::Token => Err(SdtfError::structural(format!(
                "Token \"{path}\" cannot contain child nodes"
            ))),
            NodeKind::Group | NodeKind::Collection => Ok(()),
        }
    }

    fn require_free(&self, path: &TreePath) -> Result<()> {
        if self.nodes.contains(path) {
            return Err(SdtfError::PathCollision { path: path.clone() });
        }
        Ok(())
    }

    /// Rejects relocating a node onto a path that unresolvable aliases
    /// already point at, so they never start resolving to an unrelated node.
    fn require_unclaimed(&self, path: &TreePath) -> Result<()> {
        let claimed = self
            .aliases
            .references()
            .iter()
            .find(|alias| alias.to.tree_path.starts_with(path));
        if let Some(alias) = claimed {
            return Err(SdtfError::structural(format!(
                "\"{path}\" is the target of an unresolvable alias from \"{}\"",
                alias.from.tree_path
            )));
        }
        Ok(())
    }

    fn node_mut(&mut self, path: &TreePath) -> Result<&mut Node> {
        self.nodes.get_mut(path).ok_or_else(|| SdtfError::NodeNotFound {
            kind: "Node",
            path: path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(s: &str) -> TreePath {
        s.parse().unwrap()
    }

    #[test]
    fn test_read_views_and_reverse_index() {
        let state = TreeState::new(
            &json!({
                "base": {"$type": "number", "$value": {"default": 4}},
                "spacing": {
                    "small": {"$type": "number", "$value": {"default": {"$alias": "base", "$mode": "default"}}},
                    "large": {"$type": "number", "$value": {"$alias": "base"}}
                }
            }),
            &AnalyzerOptions::default(),
        )
        .unwrap();
        assert_eq!(state.node_kind(&p("spacing")), Some(NodeKind::Group));
        assert_eq!(state.children(&TreePath::root()).len(), 2);
        assert_eq!(state.aliases_to(&p("base")).len(), 2);
        assert_eq!(state.aliases_from(&p("spacing.small")).len(), 1);
        assert_eq!(state.tokens().count(), 3);
        assert!(state.group(&p("base")).is_none());
    }

    #[test]
    fn test_resolve_mode_value_follows_chains() {
        let state = TreeState::new(
            &json!({
                "base": {"$type": "number", "$value": {"default": 4}},
                "mid": {"$type": "number", "$value": {"$alias": "base"}},
                "width": {"$type": "dimension", "$value": {"default": {
                    "value": {"$alias": "mid", "$mode": "default"},
                    "unit": "px"
                }}}
            }),
            &AnalyzerOptions::default(),
        )
        .unwrap();
        assert_eq!(
            state.resolve_mode_value(&p("width"), "default"),
            Some(json!({"value": 4, "unit": "px"}))
        );
        assert_eq!(state.resolve_mode_value(&p("width"), "dark"), None);
    }
}
