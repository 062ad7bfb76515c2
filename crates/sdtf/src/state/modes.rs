//! Mode operations on collections and token values.

use serde_json::Value;

use super::TreeState;
use crate::analyzer::{check_mode_name, decompose_mode, decompose_token_value, TokenValue};
use crate::error::{Result, SdtfError};
use crate::node::{Node, NodeKind};
use crate::path::TreePath;
use crate::value_parts::TokenRawValueParts;

impl TreeState {
    /// Renames a collection mode in the collection, in every token below it
    /// and in every alias that targeted one of those tokens in that mode.
    pub fn rename_collection_mode(&mut self, path: &TreePath, from: &str, to: &str) -> Result<()> {
        let modes = self.collection_modes(path)?;
        if from == to {
            return Ok(());
        }
        check_mode_name(to).map_err(SdtfError::structural)?;
        if !modes.iter().any(|m| m == from) {
            return Err(missing_mode("Collection", path, from));
        }
        if modes.iter().any(|m| m == to) {
            return Err(duplicate_mode("Collection", path, to));
        }
        self.commit("rename_collection_mode", |state| {
            if let Some(Node::Collection(collection)) = state.nodes.get_mut(path) {
                for mode in collection.modes.iter_mut().filter(|m| m.as_str() == from) {
                    *mode = to.to_string();
                }
            }
            let owned = state.owned_tokens(path);
            for token in &owned {
                if let Some(parts) = state.parts_mut(token) {
                    parts.rename_mode(from, to);
                }
            }
            state.retarget_mode(&owned, from, to);
            Ok(())
        })
    }

    /// Deletes a collection mode and that mode's value on every token below
    /// it. The last mode of a collection cannot be deleted.
    pub fn delete_collection_mode(&mut self, path: &TreePath, mode: &str) -> Result<()> {
        let modes = self.collection_modes(path)?;
        if !modes.iter().any(|m| m == mode) {
            return Err(missing_mode("Collection", path, mode));
        }
        if modes.len() == 1 {
            return Err(SdtfError::structural(format!(
                "Cannot delete mode \"{mode}\": it is the last mode of collection \"{path}\""
            )));
        }
        self.commit("delete_collection_mode", |state| {
            if let Some(Node::Collection(collection)) = state.nodes.get_mut(path) {
                collection.modes.retain(|m| m != mode);
            }
            for token in state.owned_tokens(path) {
                if let Some(parts) = state.parts_mut(&token) {
                    parts.delete_mode(mode);
                }
            }
            Ok(())
        })
    }

    /// Adds a value for a mode the token does not have yet.
    pub fn create_token_mode_value(&mut self, path: &TreePath, mode: &str, raw: &Value) -> Result<()> {
        let parts = self.local_parts(path)?;
        if parts.has_mode(mode) {
            return Err(duplicate_mode("Token", path, mode));
        }
        let new_parts = decompose_mode(path, self.token_type(path)?, mode, raw, self.registry.as_ref())?;
        self.commit("create_token_mode_value", |state| {
            if let Some(parts) = state.parts_mut(path) {
                for part in new_parts {
                    parts.insert(part);
                }
            }
            Ok(())
        })
    }

    pub fn delete_token_mode_value(&mut self, path: &TreePath, mode: &str) -> Result<()> {
        let parts = self.local_parts(path)?;
        if !parts.has_mode(mode) {
            return Err(missing_mode("Token", path, mode));
        }
        if parts.modes().len() == 1 {
            return Err(SdtfError::structural(format!(
                "Cannot delete mode \"{mode}\": it is the last mode of token \"{path}\""
            )));
        }
        self.commit("delete_token_mode_value", |state| {
            if let Some(parts) = state.parts_mut(path) {
                parts.delete_mode(mode);
            }
            Ok(())
        })
    }

    /// Renames a token mode and rewrites aliases that targeted it.
    pub fn rename_token_mode(&mut self, path: &TreePath, from: &str, to: &str) -> Result<()> {
        let parts = self.local_parts(path)?;
        if from == to {
            return Ok(());
        }
        check_mode_name(to).map_err(SdtfError::structural)?;
        if !parts.has_mode(from) {
            return Err(missing_mode("Token", path, from));
        }
        if parts.has_mode(to) {
            return Err(duplicate_mode("Token", path, to));
        }
        self.commit("rename_token_mode", |state| {
            if let Some(parts) = state.parts_mut(path) {
                parts.rename_mode(from, to);
            }
            state.retarget_mode(std::slice::from_ref(path), from, to);
            Ok(())
        })
    }

    /// Replaces the whole `$value` of a token.
    pub fn update_token_value(&mut self, path: &TreePath, raw: &Value) -> Result<()> {
        let token_type = self.token_type(path)?;
        let value = decompose_token_value(path, token_type, raw, self.registry.as_ref())?;
        self.commit("update_token_value", |state| {
            if let Some(token) = state.nodes.token_mut(path) {
                token.value = value;
            }
            Ok(())
        })
    }

    /// Replaces the value of one existing mode.
    pub fn update_token_mode_value(&mut self, path: &TreePath, mode: &str, raw: &Value) -> Result<()> {
        let parts = self.local_parts(path)?;
        if !parts.has_mode(mode) {
            return Err(missing_mode("Token", path, mode));
        }
        let new_parts = decompose_mode(path, self.token_type(path)?, mode, raw, self.registry.as_ref())?;
        self.commit("update_token_mode_value", |state| {
            if let Some(parts) = state.parts_mut(path) {
                parts.replace_mode(mode, new_parts);
            }
            Ok(())
        })
    }

    fn collection_modes(&self, path: &TreePath) -> Result<Vec<String>> {
        self.require(path, NodeKind::Collection)?;
        Ok(self
            .nodes
            .collection(path)
            .map(|c| c.modes.clone())
            .unwrap_or_default())
    }

    fn token_type(&self, path: &TreePath) -> Result<&str> {
        self.require(path, NodeKind::Token)?;
        Ok(self
            .nodes
            .token(path)
            .map(|t| t.token_type.as_str())
            .unwrap_or_default())
    }

    /// Value parts of a token that carries its own modes.
    fn local_parts(&self, path: &TreePath) -> Result<&TokenRawValueParts> {
        self.require(path, NodeKind::Token)?;
        match self.nodes.token(path).map(|t| &t.value) {
            Some(TokenValue::Modes(parts)) => Ok(parts),
            _ => Err(SdtfError::structural(format!(
                "Token \"{path}\" is a top-level alias and has no modes of its own"
            ))),
        }
    }

    fn parts_mut(&mut self, path: &TreePath) -> Option<&mut TokenRawValueParts> {
        self.nodes.token_mut(path).and_then(|t| t.value.parts_mut())
    }

    fn owned_tokens(&self, collection: &TreePath) -> Vec<TreePath> {
        self.nodes
            .iter()
            .filter(|(p, node)| matches!(node, Node::Token(_)) && p.is_descendant_of(collection))
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// `token` and every token that inherits its modes through top-level
    /// alias chains.
    fn mode_inheritors(&self, token: &TreePath) -> Vec<TreePath> {
        let mut out = vec![token.clone()];
        let mut i = 0;
        while i < out.len() {
            for (path, node) in self.nodes.iter() {
                if let Node::Token(t) = node {
                    if let TokenValue::TopLevelAlias { target } = &t.value {
                        if *target == out[i] && !out.contains(path) {
                            out.push(path.clone());
                        }
                    }
                }
            }
            i += 1;
        }
        out
    }

    /// Points every alias at `(token, from)` for the given tokens, and their
    /// mode inheritors, to `to`.
    fn retarget_mode(&mut self, tokens: &[TreePath], from: &str, to: &str) {
        let mut targets: Vec<TreePath> = Vec::new();
        for token in tokens {
            for inheritor in self.mode_inheritors(token) {
                if !targets.contains(&inheritor) {
                    targets.push(inheritor);
                }
            }
        }
        let sources: Vec<TreePath> = targets
            .iter()
            .flat_map(|target| self.aliases.to_target(target))
            .map(|reference| reference.from.tree_path.clone())
            .collect();
        for source in sources {
            if let Some(token) = self.nodes.token_mut(&source) {
                for target in &targets {
                    token.value.retarget_mode(target, from, to);
                }
            }
        }
    }
}

fn missing_mode(kind: &str, path: &TreePath, mode: &str) -> SdtfError {
    SdtfError::structural(format!("{kind} \"{path}\" has no mode \"{mode}\""))
}

fn duplicate_mode(kind: &str, path: &TreePath, mode: &str) -> SdtfError {
    SdtfError::structural(format!("{kind} \"{path}\" already has mode \"{mode}\""))
}
