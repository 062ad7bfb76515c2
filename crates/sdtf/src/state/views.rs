//! Read-only handles onto nodes of a [`TreeState`].

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::TreeState;
use crate::alias::{alias_object, AliasReference};
use crate::analyzer::{NodeMetadata, TokenValue};
use crate::error::{Result, SdtfError};
use crate::node::{CollectionNode, Node, NodeKind, TokenNode};
use crate::options::JsonValueOptions;
use crate::path::TreePath;
use crate::value_parts::RawValuePart;

/// Any node of a tree state.
#[derive(Debug, Clone, Copy)]
pub enum NodeState<'a> {
    Token(TokenState<'a>),
    Group(GroupState<'a>),
    Collection(CollectionState<'a>),
}

impl<'a> NodeState<'a> {
    pub(crate) fn new(state: &'a TreeState, path: &'a TreePath, node: &'a Node) -> Self {
        match node {
            Node::Token(token) => NodeState::Token(TokenState { state, path, token }),
            Node::Group(metadata) => NodeState::Group(GroupState {
                state,
                path,
                metadata,
            }),
            Node::Collection(collection) => NodeState::Collection(CollectionState {
                state,
                path,
                collection,
            }),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeState::Token(_) => NodeKind::Token,
            NodeState::Group(_) => NodeKind::Group,
            NodeState::Collection(_) => NodeKind::Collection,
        }
    }

    pub fn path(&self) -> &'a TreePath {
        match self {
            NodeState::Token(t) => t.path,
            NodeState::Group(g) => g.path,
            NodeState::Collection(c) => c.path,
        }
    }

    pub fn name(&self) -> &'a str {
        self.path().name().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TokenState<'a> {
    state: &'a TreeState,
    path: &'a TreePath,
    token: &'a TokenNode,
}

impl<'a> TokenState<'a> {
    pub fn path(&self) -> &'a TreePath {
        self.path
    }

    pub fn name(&self) -> &'a str {
        self.path.name().unwrap_or_default()
    }

    pub fn token_type(&self) -> &'a str {
        &self.token.token_type
    }

    pub fn description(&self) -> Option<&'a str> {
        self.token.metadata.description.as_deref()
    }

    pub fn extensions(&self) -> Option<&'a Map<String, Value>> {
        self.token.metadata.extensions.as_ref()
    }

    pub fn metadata(&self) -> &'a NodeMetadata {
        &self.token.metadata
    }

    pub fn value(&self) -> &'a TokenValue {
        &self.token.value
    }

    pub fn is_top_level_alias(&self) -> bool {
        self.token.value.is_top_level_alias()
    }

    /// Local modes, or the modes reached through a top-level alias chain.
    /// Empty when the chain is unresolvable.
    pub fn modes(&self) -> Vec<String> {
        self.state
            .computed_modes(self.path)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    pub fn modes_resolvability(&self) -> IndexMap<String, bool> {
        self.state
            .resolvability(self.path)
            .map(|flags| flags.modes.clone())
            .unwrap_or_default()
    }

    pub fn is_fully_resolvable(&self) -> bool {
        self.state
            .resolvability(self.path)
            .map(|flags| flags.is_fully_resolvable)
            .unwrap_or(false)
    }

    /// Snapshot of the decomposed value parts. Empty for top-level aliases.
    pub fn value_parts(&self) -> Vec<&'a RawValuePart> {
        self.token
            .value
            .parts()
            .map(|parts| parts.iter().collect())
            .unwrap_or_default()
    }

    pub fn aliases(&self) -> Vec<&'a AliasReference> {
        self.state.aliases_from(self.path)
    }

    /// Nearest collection above this token.
    pub fn collection(&self) -> Option<CollectionState<'a>> {
        let (path, _) = self.state.nodes().owning_collection(self.path)?;
        self.state.collection(path)
    }

    /// The token node as SDTF JSON.
    pub fn raw_json(&self) -> Value {
        self.state
            .nodes()
            .render_filtered(self.path, &|_| false)
    }

    /// Value of one mode with aliases resolved deeply.
    pub fn resolved_mode_value(&self, mode: &str) -> Option<Value> {
        self.state.resolve_mode_value(self.path, mode)
    }

    /// Renders the token's value.
    ///
    /// Without alias resolution this is the raw `$value`. With it, each mode
    /// is resolved; unresolvable modes fail unless `allow_unresolvable`
    /// keeps them as raw alias objects.
    pub fn json_value(&self, options: &JsonValueOptions) -> Result<Value> {
        if !options.resolve_aliases {
            return Ok(match &options.target_mode {
                Some(mode) => self.raw_mode_value(mode)?,
                None => self.token.value.to_json(),
            });
        }
        match &options.target_mode {
            Some(mode) => self.resolved_or_raw(mode, options.allow_unresolvable),
            None => {
                let mut map = Map::new();
                for mode in self.modes() {
                    let value = self.resolved_or_raw(&mode, options.allow_unresolvable)?;
                    map.insert(mode, value);
                }
                Ok(Value::Object(map))
            }
        }
    }

    fn require_mode(&self, mode: &str) -> Result<()> {
        if self.modes().iter().any(|m| m == mode) {
            Ok(())
        } else {
            Err(SdtfError::structural(format!(
                "Token \"{}\" has no mode \"{mode}\"",
                self.path
            )))
        }
    }

    fn raw_mode_value(&self, mode: &str) -> Result<Value> {
        self.require_mode(mode)?;
        Ok(match &self.token.value {
            TokenValue::TopLevelAlias { target } => alias_object(target, None),
            TokenValue::Modes(parts) => parts.mode_value(mode).unwrap_or(Value::Null),
        })
    }

    fn resolved_or_raw(&self, mode: &str, allow_unresolvable: bool) -> Result<Value> {
        self.require_mode(mode)?;
        if let Some(value) = self.resolved_mode_value(mode) {
            return Ok(value);
        }
        if allow_unresolvable {
            return self.raw_mode_value(mode);
        }
        let alias = self
            .first_unresolvable_target(self.path, mode)
            .unwrap_or_else(|| self.path.clone());
        Err(SdtfError::UnresolvableAlias {
            token: self.path.clone(),
            alias,
        })
    }

    fn first_unresolvable_target(&self, path: &TreePath, mode: &str) -> Option<TreePath> {
        let token = self.state.nodes().token(path)?;
        match &token.value {
            TokenValue::TopLevelAlias { target } => {
                if self.state.resolve_mode_value(target, mode).is_some() {
                    None
                } else {
                    self.first_unresolvable_target(target, mode)
                        .or_else(|| Some(target.clone()))
                }
            }
            TokenValue::Modes(parts) => parts.parts_for_mode(mode).find_map(|part| match part {
                RawValuePart::Alias {
                    target,
                    target_mode,
                    ..
                } if self.state.resolve_mode_value(target, target_mode).is_none() => self
                    .first_unresolvable_target(target, target_mode)
                    .or_else(|| Some(target.clone())),
                _ => None,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GroupState<'a> {
    state: &'a TreeState,
    path: &'a TreePath,
    metadata: &'a NodeMetadata,
}

impl<'a> GroupState<'a> {
    pub fn path(&self) -> &'a TreePath {
        self.path
    }

    pub fn name(&self) -> &'a str {
        self.path.name().unwrap_or_default()
    }

    pub fn description(&self) -> Option<&'a str> {
        self.metadata.description.as_deref()
    }

    pub fn extensions(&self) -> Option<&'a Map<String, Value>> {
        self.metadata.extensions.as_ref()
    }

    pub fn children(&self) -> Vec<NodeState<'a>> {
        children_of(self.state, self.path)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CollectionState<'a> {
    state: &'a TreeState,
    path: &'a TreePath,
    collection: &'a CollectionNode,
}

impl<'a> CollectionState<'a> {
    pub fn path(&self) -> &'a TreePath {
        self.path
    }

    pub fn name(&self) -> &'a str {
        self.path.name().unwrap_or_default()
    }

    pub fn description(&self) -> Option<&'a str> {
        self.collection.metadata.description.as_deref()
    }

    pub fn extensions(&self) -> Option<&'a Map<String, Value>> {
        self.collection.metadata.extensions.as_ref()
    }

    pub fn allowed_modes(&self) -> &'a [String] {
        &self.collection.modes
    }

    pub fn children(&self) -> Vec<NodeState<'a>> {
        children_of(self.state, self.path)
    }

    /// Every token below this collection.
    pub fn tokens(&self) -> Vec<TokenState<'a>> {
        let path = self.path;
        self.state
            .tokens()
            .filter(|token| token.path().is_descendant_of(path))
            .collect()
    }
}

fn children_of<'a>(state: &'a TreeState, path: &TreePath) -> Vec<NodeState<'a>> {
    state
        .nodes()
        .children(path)
        .into_iter()
        .filter_map(|child| state.node(child))
        .collect()
}
