//! The flat, path-keyed node namespace shared by analysis and tree state.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analyzer::{NodeMetadata, TokenEntry, TokenGraph, TokenValue};
use crate::error::{Result, SdtfError};
use crate::path::TreePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Token,
    Group,
    Collection,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Token => "Token",
            NodeKind::Group => "Group",
            NodeKind::Collection => "Collection",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TokenNode {
    pub token_type: String,
    pub metadata: NodeMetadata,
    pub value: TokenValue,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CollectionNode {
    pub metadata: NodeMetadata,
    pub modes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Token(TokenNode),
    Group(NodeMetadata),
    Collection(CollectionNode),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Token(_) => NodeKind::Token,
            Node::Group(_) => NodeKind::Group,
            Node::Collection(_) => NodeKind::Collection,
        }
    }

    pub fn metadata(&self) -> &NodeMetadata {
        match self {
            Node::Token(token) => &token.metadata,
            Node::Group(metadata) => metadata,
            Node::Collection(collection) => &collection.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut NodeMetadata {
        match self {
            Node::Token(token) => &mut token.metadata,
            Node::Group(metadata) => metadata,
            Node::Collection(collection) => &mut collection.metadata,
        }
    }

    /// The node's own JSON members, without children.
    fn own_json(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            Node::Token(token) => {
                map.insert("$type".to_string(), Value::String(token.token_type.clone()));
                map.insert("$value".to_string(), token.value.to_json());
            }
            Node::Collection(collection) => {
                let modes = collection
                    .modes
                    .iter()
                    .map(|m| Value::String(m.clone()))
                    .collect();
                let mut declaration = Map::new();
                declaration.insert("$modes".to_string(), Value::Array(modes));
                map.insert("$collection".to_string(), Value::Object(declaration));
            }
            Node::Group(_) => {}
        }
        self.metadata().write_into(&mut map);
        map
    }
}

/// Every node of one tree, keyed by path, in document order.
///
/// Parents always precede their descendants.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct NodeSet {
    nodes: IndexMap<TreePath, Node>,
}

impl NodeSet {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, path: &TreePath) -> Option<&Node> {
        self.nodes.get(path)
    }

    pub fn entry(&self, path: &TreePath) -> Option<(&TreePath, &Node)> {
        self.nodes.get_key_value(path)
    }

    pub fn get_mut(&mut self, path: &TreePath) -> Option<&mut Node> {
        self.nodes.get_mut(path)
    }

    pub fn contains(&self, path: &TreePath) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn kind(&self, path: &TreePath) -> Option<NodeKind> {
        self.nodes.get(path).map(Node::kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TreePath, &Node)> {
        self.nodes.iter()
    }

    pub fn token(&self, path: &TreePath) -> Option<&TokenNode> {
        match self.nodes.get(path) {
            Some(Node::Token(token)) => Some(token),
            _ => None,
        }
    }

    pub fn token_mut(&mut self, path: &TreePath) -> Option<&mut TokenNode> {
        match self.nodes.get_mut(path) {
            Some(Node::Token(token)) => Some(token),
            _ => None,
        }
    }

    pub fn collection(&self, path: &TreePath) -> Option<&CollectionNode> {
        match self.nodes.get(path) {
            Some(Node::Collection(collection)) => Some(collection),
            _ => None,
        }
    }

    /// Appends a node. The caller checks the path is free.
    pub fn insert(&mut self, path: TreePath, node: Node) {
        self.nodes.insert(path, node);
    }

    /// Strict ancestor collection of `path`, nearest first.
    pub fn owning_collection(&self, path: &TreePath) -> Option<(&TreePath, &CollectionNode)> {
        path.ancestors().find_map(|ancestor| match self.nodes.get_key_value(&ancestor) {
            Some((key, Node::Collection(collection))) => Some((key, collection)),
            _ => None,
        })
    }

    /// `path` itself when it is a collection, else its owning collection.
    pub fn enclosing_collection(&self, path: &TreePath) -> Option<&TreePath> {
        if let Some((key, Node::Collection(_))) = self.nodes.get_key_value(path) {
            return Some(key);
        }
        self.owning_collection(path).map(|(key, _)| key)
    }

    /// Direct children of `path`, in document order.
    pub fn children(&self, path: &TreePath) -> Vec<&TreePath> {
        self.nodes
            .keys()
            .filter(|key| key.len() == path.len() + 1 && key.starts_with(path))
            .collect()
    }

    /// `path` and every node below it, in document order.
    pub fn subtree(&self, path: &TreePath) -> Vec<TreePath> {
        self.nodes
            .keys()
            .filter(|key| key.starts_with(path))
            .cloned()
            .collect()
    }

    /// Removes `path` and its descendants.
    pub fn remove_subtree(&mut self, path: &TreePath) {
        self.nodes.retain(|key, _| !key.starts_with(path));
    }

    /// Moves the subtree at `old` to `new`. Renames keep document positions;
    /// moves re-append the subtree so it follows its new parent.
    pub fn rekey_subtree(&mut self, old: &TreePath, new: &TreePath, append: bool) {
        if append {
            let mut moved = Vec::new();
            self.nodes.retain(|key, node| {
                if key.starts_with(old) {
                    moved.push((key.clone(), node.clone()));
                    false
                } else {
                    true
                }
            });
            for (key, node) in moved {
                let key = key.rebase(old, new).unwrap_or(key);
                self.nodes.insert(key, node);
            }
        } else {
            self.nodes = std::mem::take(&mut self.nodes)
                .into_iter()
                .map(|(key, node)| (key.rebase(old, new).unwrap_or(key), node))
                .collect();
        }
    }

    /// Rejects collections that sit below another collection.
    pub fn check_nesting(&self) -> Result<()> {
        for (path, node) in &self.nodes {
            if let Node::Collection(_) = node {
                if let Some((parent, _)) = self.owning_collection(path) {
                    return Err(SdtfError::NestedCollection {
                        path: path.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Renders the subtree at `path` keeping only nodes accepted by `keep`.
    pub fn render_filtered(&self, path: &TreePath, keep: &dyn Fn(&TreePath) -> bool) -> Value {
        let mut map = match self.nodes.get(path) {
            Some(node) => node.own_json(),
            None => Map::new(),
        };
        for child in self.children(path) {
            if keep(child) {
                if let Some(name) = child.name() {
                    map.insert(name.to_string(), self.render_filtered(child, keep));
                }
            }
        }
        Value::Object(map)
    }

    /// The whole tree as SDTF JSON.
    pub fn to_json(&self) -> Value {
        self.render_filtered(&TreePath::root(), &|_| true)
    }
}

impl TokenGraph for NodeSet {
    fn token_paths(&self) -> Vec<&TreePath> {
        self.nodes
            .iter()
            .filter(|(_, node)| matches!(node, Node::Token(_)))
            .map(|(path, _)| path)
            .collect()
    }

    fn token_entry(&self, path: &TreePath) -> Option<TokenEntry<'_>> {
        self.token(path).map(|token| TokenEntry {
            token_type: &token.token_type,
            value: &token.value,
        })
    }

    fn owning_collection(&self, path: &TreePath) -> Option<(&TreePath, &[String])> {
        NodeSet::owning_collection(self, path).map(|(key, collection)| (key, collection.modes.as_slice()))
    }
}
