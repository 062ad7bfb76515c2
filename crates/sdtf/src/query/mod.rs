//! Query DSL over a tree state.
//!
//! ```json
//! { "where": { "group": "^colors$", "select": { "children": true } } }
//! ```
//!
//! Clauses are matched independently and their selections are unioned.

mod merge;
mod result;

use indexmap::IndexSet;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use merge::{MergeCollision, MergeDedupe};
pub use result::{QueryResult, RenderedFragment};

use crate::error::{Result, SdtfError};
use crate::node::NodeKind;
use crate::path::TreePath;
use crate::state::TreeState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdtfQuery {
    #[serde(rename = "where")]
    pub where_: Where,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Where {
    One(Clause),
    Many(Vec<Clause>),
}

impl Where {
    pub fn clauses(&self) -> &[Clause] {
        match self {
            Where::One(clause) => std::slice::from_ref(clause),
            Where::Many(clauses) => clauses,
        }
    }
}

/// One selection rule. Exactly one of `token`, `group`, `collection` holds
/// the pattern.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clause {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default)]
    pub select: Select,
    /// Test the pattern against the dotted path instead of the name.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub match_path: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Select {
    /// `true` selects the matched node and its whole subtree.
    All(bool),
    Shape(SelectShape),
}

impl Default for Select {
    fn default() -> Self {
        Select::All(true)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectShape {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<ChildrenSelect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildrenSelect {
    All(bool),
    Scoped(ChildrenScope),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChildrenScope {
    /// Levels below the matched node; unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collections: Option<bool>,
}

impl SdtfQuery {
    pub fn one(clause: Clause) -> Self {
        Self {
            where_: Where::One(clause),
        }
    }

    pub fn many(clauses: Vec<Clause>) -> Self {
        Self {
            where_: Where::Many(clauses),
        }
    }

    /// Parses the JSON form.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| SdtfError::InvalidQuery(e.to_string()))
    }
}

impl Clause {
    pub fn token(pattern: impl Into<String>) -> Self {
        Self {
            token: Some(pattern.into()),
            ..Self::default()
        }
    }

    pub fn group(pattern: impl Into<String>) -> Self {
        Self {
            group: Some(pattern.into()),
            ..Self::default()
        }
    }

    pub fn collection(pattern: impl Into<String>) -> Self {
        Self {
            collection: Some(pattern.into()),
            ..Self::default()
        }
    }

    pub fn with_select(mut self, select: Select) -> Self {
        self.select = select;
        self
    }

    pub fn matching_path(mut self) -> Self {
        self.match_path = true;
        self
    }
}

struct CompiledClause {
    kind: NodeKind,
    pattern: Regex,
    match_path: bool,
    include_self: bool,
    children: Option<CompiledChildren>,
}

struct CompiledChildren {
    depth: Option<usize>,
    tokens: bool,
    groups: bool,
    collections: bool,
}

impl CompiledChildren {
    fn all() -> Self {
        Self {
            depth: None,
            tokens: true,
            groups: true,
            collections: true,
        }
    }

    fn accepts(&self, kind: NodeKind, depth: usize) -> bool {
        if self.depth.is_some_and(|max| depth > max) {
            return false;
        }
        match kind {
            NodeKind::Token => self.tokens,
            NodeKind::Group => self.groups,
            NodeKind::Collection => self.collections,
        }
    }
}

fn compile_clause(clause: &Clause) -> Result<CompiledClause> {
    let (kind, pattern) = match (&clause.token, &clause.group, &clause.collection) {
        (Some(p), None, None) => (NodeKind::Token, p),
        (None, Some(p), None) => (NodeKind::Group, p),
        (None, None, Some(p)) => (NodeKind::Collection, p),
        _ => {
            return Err(SdtfError::InvalidQuery(
                "a clause needs exactly one of \"token\", \"group\" or \"collection\"".to_string(),
            ))
        }
    };
    let pattern = Regex::new(pattern).map_err(|e| SdtfError::InvalidQuery(e.to_string()))?;
    let (include_self, children) = match &clause.select {
        Select::All(true) => (true, Some(CompiledChildren::all())),
        Select::All(false) => (false, None),
        Select::Shape(shape) => {
            let include_self = match kind {
                NodeKind::Token => shape.token,
                NodeKind::Group => shape.group,
                NodeKind::Collection => shape.collection,
            }
            .unwrap_or(true);
            let children = match &shape.children {
                None | Some(ChildrenSelect::All(false)) => None,
                Some(ChildrenSelect::All(true)) => Some(CompiledChildren::all()),
                Some(ChildrenSelect::Scoped(scope)) => Some(CompiledChildren {
                    depth: scope.depth,
                    tokens: scope.tokens.unwrap_or(true),
                    groups: scope.groups.unwrap_or(true),
                    collections: scope.collections.unwrap_or(true),
                }),
            };
            (include_self, children)
        }
    };
    Ok(CompiledClause {
        kind,
        pattern,
        match_path: clause.match_path,
        include_self,
        children,
    })
}

impl TreeState {
    /// Runs `query` against the current tree.
    pub fn query(&self, query: &SdtfQuery) -> Result<QueryResult<'_>> {
        let clauses = query
            .where_
            .clauses()
            .iter()
            .map(compile_clause)
            .collect::<Result<Vec<_>>>()?;

        let nodes = self.nodes();
        let mut selected: IndexSet<&TreePath> = IndexSet::new();
        let mut matched: IndexSet<&TreePath> = IndexSet::new();
        for clause in &clauses {
            for (path, node) in nodes.iter() {
                if node.kind() != clause.kind {
                    continue;
                }
                let is_match = if clause.match_path {
                    clause.pattern.is_match(&path.to_string())
                } else {
                    clause.pattern.is_match(path.name().unwrap_or_default())
                };
                if !is_match {
                    continue;
                }
                matched.insert(path);
                if clause.include_self {
                    selected.insert(path);
                }
                if let Some(children) = &clause.children {
                    for (descendant, child) in nodes.iter() {
                        if descendant.is_descendant_of(path)
                            && children.accepts(child.kind(), descendant.len() - path.len())
                        {
                            selected.insert(descendant);
                        }
                    }
                }
            }
        }

        // Document order, independent of clause order.
        let in_order = |set: &IndexSet<&TreePath>| -> Vec<TreePath> {
            nodes
                .iter()
                .filter(|(path, _)| set.contains(path))
                .map(|(path, _)| path.clone())
                .collect()
        };
        Ok(QueryResult::new(self, in_order(&selected), in_order(&matched)))
    }
}
