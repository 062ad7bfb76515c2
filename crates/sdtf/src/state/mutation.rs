//! Structural edits: rename, move, add, remove, metadata.

use serde_json::{Map, Value};
use tracing::debug;

use super::TreeState;
use crate::analyzer::{check_node_name, collect_subtree};
use crate::error::{Result, SdtfError};
use crate::node::{NodeKind, NodeSet};
use crate::path::TreePath;

impl TreeState {
    /// Renames the node at `path`, rewriting the paths below it and every
    /// alias that pointed into it. Returns false when `new_name` is the
    /// current name. Fails when unresolvable aliases target the new path.
    pub fn rename_node(&mut self, path: &TreePath, new_name: &str) -> Result<bool> {
        self.require_node(path)?;
        if path.name() == Some(new_name) {
            return Ok(false);
        }
        check_node_name(new_name).map_err(SdtfError::structural)?;
        let parent = path.parent().unwrap_or_default();
        let new_path = parent.child(new_name)?;
        self.require_free(&new_path)?;
        self.require_unclaimed(&new_path)?;
        self.commit("rename", |state| {
            state.relocate(path, &new_path, false);
            Ok(true)
        })
    }

    /// Moves a group and its subtree below `new_parent`.
    pub fn move_group(&mut self, path: &TreePath, new_parent: &TreePath) -> Result<TreePath> {
        self.require(path, NodeKind::Group)?;
        self.move_node(path, new_parent)
    }

    /// Moves a collection below `new_parent`, which must be the root or a
    /// group outside any collection.
    pub fn move_collection(&mut self, path: &TreePath, new_parent: &TreePath) -> Result<TreePath> {
        self.require(path, NodeKind::Collection)?;
        if !new_parent.is_root() && self.nodes.kind(new_parent) == Some(NodeKind::Collection) {
            return Err(SdtfError::structural(format!(
                "Collection \"{path}\" cannot be moved into collection \"{new_parent}\""
            )));
        }
        self.move_node(path, new_parent)
    }

    pub fn move_token(&mut self, path: &TreePath, new_parent: &TreePath) -> Result<TreePath> {
        self.require(path, NodeKind::Token)?;
        self.move_node(path, new_parent)
    }

    fn move_node(&mut self, path: &TreePath, new_parent: &TreePath) -> Result<TreePath> {
        self.require_container(new_parent)?;
        if new_parent.starts_with(path) {
            return Err(SdtfError::structural(format!(
                "\"{path}\" cannot be moved into itself or one of its descendants"
            )));
        }
        if path.parent().as_ref() == Some(new_parent) {
            return Ok(path.clone());
        }
        let moves_collection = self
            .nodes
            .subtree(path)
            .iter()
            .any(|p| self.nodes.kind(p) == Some(NodeKind::Collection));
        if moves_collection {
            if let Some(target) = self.nodes.enclosing_collection(new_parent) {
                return Err(SdtfError::structural(format!(
                    "\"{path}\" contains a collection and cannot be moved into collection \"{target}\""
                )));
            }
        }
        let name = path.name().unwrap_or_default();
        let new_path = new_parent.child(name)?;
        self.require_free(&new_path)?;
        self.require_unclaimed(&new_path)?;
        self.commit("move", |state| {
            state.relocate(path, &new_path, true);
            Ok(new_path.clone())
        })
    }

    /// Rekeys the subtree at `old` to `new` and rewrites aliases into it.
    fn relocate(&mut self, old: &TreePath, new: &TreePath, append: bool) {
        let referrers = self.aliases.referrers_under(old);
        self.nodes.rekey_subtree(old, new, append);
        for source in referrers {
            let source = source.rebase(old, new).unwrap_or(source);
            if let Some(token) = self.nodes.token_mut(&source) {
                token.value.retarget_paths(|target| target.rebase(old, new));
            }
        }
    }

    pub fn add_token(&mut self, parent: &TreePath, name: &str, raw: &Value) -> Result<TreePath> {
        self.add_node(parent, name, raw, NodeKind::Token)
    }

    /// Adds a group, with any children described in `raw`.
    pub fn add_group(&mut self, parent: &TreePath, name: &str, raw: &Value) -> Result<TreePath> {
        self.add_node(parent, name, raw, NodeKind::Group)
    }

    pub fn add_collection(&mut self, parent: &TreePath, name: &str, raw: &Value) -> Result<TreePath> {
        self.add_node(parent, name, raw, NodeKind::Collection)
    }

    fn add_node(&mut self, parent: &TreePath, name: &str, raw: &Value, kind: NodeKind) -> Result<TreePath> {
        self.require_container(parent)?;
        check_node_name(name).map_err(SdtfError::structural)?;
        let path = parent.child(name)?;
        self.require_free(&path)?;

        let mut added = NodeSet::default();
        let collection = self.nodes.enclosing_collection(parent).cloned();
        collect_subtree(&path, raw, collection.as_ref(), self.registry.as_ref(), &mut added)?;
        match added.kind(&path) {
            Some(found) if found == kind => {}
            found => {
                return Err(SdtfError::structural(format!(
                    "expected a {} at \"{path}\", found a {}",
                    kind,
                    found.map(NodeKind::as_str).unwrap_or("missing node")
                )))
            }
        }
        self.commit("add", |state| {
            for (child, node) in added.iter() {
                state.nodes.insert(child.clone(), node.clone());
            }
            Ok(path.clone())
        })
    }

    /// Removes the node at `path` and everything below it. Aliases into the
    /// removed subtree stay in place and become unresolvable.
    pub fn remove_node(&mut self, path: &TreePath) -> Result<()> {
        self.require_node(path)?;
        self.commit("remove", |state| {
            state.nodes.remove_subtree(path);
            Ok(())
        })
    }

    pub fn set_description(&mut self, path: &TreePath, description: Option<String>) -> Result<()> {
        self.node_mut(path)?.metadata_mut().description = description;
        debug!(%path, "updated description");
        Ok(())
    }

    pub fn set_extensions(&mut self, path: &TreePath, extensions: Option<Map<String, Value>>) -> Result<()> {
        self.node_mut(path)?.metadata_mut().extensions = extensions;
        debug!(%path, "updated extensions");
        Ok(())
    }
}
