//! Projection of a query result into a new, independent tree state.

use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use super::QueryResult;
use crate::analyzer::check_node_name;
use crate::error::{Result, SdtfError};
use crate::node::{NodeKind, NodeSet};
use crate::path::TreePath;
use crate::state::TreeState;

/// Custom names are retried at most this many times per collision.
const MAX_RENAME_ATTEMPTS: usize = 64;

/// A merge root that would land on an occupied path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCollision {
    /// Where the root lives in the source tree.
    pub source: TreePath,
    /// The occupied path in the merged tree.
    pub path: TreePath,
    /// 0 on the first collision, incremented while the chosen name collides.
    pub attempt: usize,
}

/// What to do when two merge roots land on the same path.
#[derive(Default)]
pub enum MergeDedupe<'a> {
    /// Fail with a path collision.
    #[default]
    Reject,
    /// Append `-1`, `-2`, ... to later roots.
    Suffix,
    /// Ask the caller for a new name.
    Custom(&'a mut dyn FnMut(&MergeCollision) -> String),
}

impl fmt::Debug for MergeDedupe<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeDedupe::Reject => f.write_str("Reject"),
            MergeDedupe::Suffix => f.write_str("Suffix"),
            MergeDedupe::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<bool> for MergeDedupe<'_> {
    fn from(dedupe: bool) -> Self {
        if dedupe {
            MergeDedupe::Suffix
        } else {
            MergeDedupe::Reject
        }
    }
}

impl MergeDedupe<'_> {
    fn resolve(&mut self, source: &TreePath, taken: &dyn Fn(&TreePath) -> bool) -> Result<TreePath> {
        let name = source.name().unwrap_or_default();
        let first = TreePath::root().child(name)?;
        if !taken(&first) {
            return Ok(first);
        }
        match self {
            MergeDedupe::Reject => Err(SdtfError::PathCollision { path: first }),
            MergeDedupe::Suffix => {
                let mut n = 1;
                loop {
                    let candidate = TreePath::root().child(&format!("{name}-{n}"))?;
                    if !taken(&candidate) {
                        trace!(%source, renamed = %candidate, "resolved merge collision");
                        return Ok(candidate);
                    }
                    n += 1;
                }
            }
            MergeDedupe::Custom(rename) => {
                let mut collision = MergeCollision {
                    source: source.clone(),
                    path: first,
                    attempt: 0,
                };
                while collision.attempt < MAX_RENAME_ATTEMPTS {
                    let chosen = (*rename)(&collision);
                    check_node_name(&chosen).map_err(SdtfError::structural)?;
                    let candidate = TreePath::root().child(&chosen)?;
                    if !taken(&candidate) {
                        trace!(%source, renamed = %candidate, "resolved merge collision");
                        return Ok(candidate);
                    }
                    collision.path = candidate;
                    collision.attempt += 1;
                }
                Err(SdtfError::PathCollision {
                    path: collision.path,
                })
            }
        }
    }
}

impl QueryResult<'_> {
    /// Copies the selected subtrees into a fresh tree, each result root
    /// placed at the top level. Aliases between copied tokens follow them to
    /// their new paths; aliases to nodes outside the selection are kept as
    /// written.
    pub fn merge(&self, mut dedupe: MergeDedupe<'_>) -> Result<TreeState> {
        let source = self.state().nodes();
        let mut relocated: HashMap<TreePath, TreePath> = HashMap::new();
        let mut nodes = NodeSet::default();

        let roots = self.roots();
        // A selected path belongs to the nearest root above it.
        let owner = |path: &TreePath| {
            roots
                .iter()
                .filter(|root| path.starts_with(root))
                .max_by_key(|root| root.len())
                .copied()
        };
        for &root in &roots {
            let new_root = dedupe.resolve(root, &|candidate: &TreePath| nodes.contains(candidate))?;
            for path in self.paths().iter().filter(|p| owner(*p) == Some(root)) {
                if let (Some(node), Some(new_path)) = (source.get(path), path.rebase(root, &new_root)) {
                    nodes.insert(new_path.clone(), node.clone());
                    relocated.insert(path.clone(), new_path);
                }
            }
        }

        let tokens: Vec<TreePath> = nodes
            .iter()
            .filter(|(_, node)| node.kind() == NodeKind::Token)
            .map(|(path, _)| path.clone())
            .collect();
        for path in tokens {
            if let Some(token) = nodes.token_mut(&path) {
                token
                    .value
                    .retarget_paths(|target| relocated.get(target).cloned());
            }
        }

        trace!(roots = roots.len(), nodes = nodes.len(), "merged query result");
        TreeState::from_nodes(nodes, self.state().registry().clone())
    }
}
