use serde::Serialize;
use serde_json::{Map, Value};

use crate::node::NodeKind;
use crate::path::TreePath;
use crate::state::{NodeState, TreeState};

/// Selected nodes of one query run, in document order.
#[derive(Debug, Clone)]
pub struct QueryResult<'a> {
    state: &'a TreeState,
    paths: Vec<TreePath>,
    matched: Vec<TreePath>,
}

/// One rendered piece of a query result, to be placed under `parent_path`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedFragment {
    pub parent_path: TreePath,
    /// The fragment sits at the top of the document.
    pub is_root: bool,
    /// Every node below the fragment's roots was selected.
    pub is_complete: bool,
    pub value: Value,
}

impl<'a> QueryResult<'a> {
    pub(crate) fn new(state: &'a TreeState, paths: Vec<TreePath>, matched: Vec<TreePath>) -> Self {
        Self {
            state,
            paths,
            matched,
        }
    }

    pub fn state(&self) -> &'a TreeState {
        self.state
    }

    /// Every selected path.
    pub fn paths(&self) -> &[TreePath] {
        &self.paths
    }

    /// Paths whose name (or path) matched a clause pattern.
    pub fn matched(&self) -> &[TreePath] {
        &self.matched
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, path: &TreePath) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeState<'a>> + '_ {
        let state = self.state;
        self.paths.iter().filter_map(move |path| state.node(path))
    }

    /// True when no matched group or collection sits below another matched
    /// group or collection.
    pub fn is_continuous(&self) -> bool {
        let containers: Vec<&TreePath> = self
            .matched
            .iter()
            .filter(|path| {
                matches!(
                    self.state.node_kind(path),
                    Some(NodeKind::Group | NodeKind::Collection)
                )
            })
            .collect();
        !containers.iter().any(|inner| {
            containers
                .iter()
                .any(|outer| inner.is_descendant_of(outer))
        })
    }

    /// Selected nodes whose parent is not selected.
    pub(crate) fn roots(&self) -> Vec<&TreePath> {
        self.paths
            .iter()
            .filter(|path| {
                path.parent()
                    .is_some_and(|parent| !self.paths.contains(&parent))
            })
            .collect()
    }

    /// True when the whole subtree of `root` is selected.
    fn is_complete_below(&self, root: &TreePath) -> bool {
        self.state
            .nodes()
            .subtree(root)
            .iter()
            .all(|path| self.paths.contains(path))
    }

    /// Renders one JSON fragment per distinct parent of the result roots.
    pub fn render(&self) -> Vec<RenderedFragment> {
        let nodes = self.state.nodes();
        let keep = |path: &TreePath| self.paths.contains(path);
        let mut fragments: Vec<(TreePath, Map<String, Value>, bool)> = Vec::new();
        for root in self.roots() {
            let parent = root.parent().unwrap_or_default();
            let Some(name) = root.name() else {
                continue;
            };
            let value = nodes.render_filtered(root, &keep);
            let complete = self.is_complete_below(root);
            match fragments.iter_mut().find(|(p, _, _)| *p == parent) {
                Some((_, map, is_complete)) => {
                    map.insert(name.to_string(), value);
                    *is_complete &= complete;
                }
                None => {
                    let mut map = Map::new();
                    map.insert(name.to_string(), value);
                    fragments.push((parent, map, complete));
                }
            }
        }
        fragments
            .into_iter()
            .map(|(parent_path, map, is_complete)| RenderedFragment {
                is_root: parent_path.is_root(),
                parent_path,
                is_complete,
                value: Value::Object(map),
            })
            .collect()
    }
}
