//! Alias records and the reverse alias index.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::path::{TreePath, ValuePath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AliasKind {
    TopLevel,
    ModeLevel,
    ValueLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasFrom {
    pub tree_path: TreePath,
    pub value_path: ValuePath,
    /// `None` for top-level aliases, which carry no local modes.
    pub mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasTo {
    pub tree_path: TreePath,
    pub mode: Option<String>,
}

/// A materialized alias: where it is written and what it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasReference {
    pub from: AliasFrom,
    pub to: AliasTo,
    pub is_resolvable: bool,
}

impl AliasReference {
    pub fn kind(&self) -> AliasKind {
        match (&self.from.mode, self.from.value_path.is_mode_level()) {
            (None, _) => AliasKind::TopLevel,
            (Some(_), true) => AliasKind::ModeLevel,
            (Some(_), false) => AliasKind::ValueLevel,
        }
    }
}

/// Parses `{"$alias": "...", "$mode"?: "..."}`.
///
/// Returns the raw target string and the optional target mode. Objects with
/// any other member are not aliases.
pub(crate) fn parse_alias_object(value: &Value) -> Option<(&str, Option<&str>)> {
    let map = value.as_object()?;
    let target = map.get("$alias")?.as_str()?;
    let mode = match map.get("$mode") {
        Some(Value::String(m)) => Some(m.as_str()),
        Some(_) => return None,
        None => None,
    };
    let expected_len = if mode.is_some() { 2 } else { 1 };
    if map.len() != expected_len {
        return None;
    }
    Some((target, mode))
}

pub(crate) fn alias_object(target: &TreePath, mode: Option<&str>) -> Value {
    let mut map = Map::new();
    map.insert("$alias".to_string(), Value::String(target.to_string()));
    if let Some(mode) = mode {
        map.insert("$mode".to_string(), Value::String(mode.to_string()));
    }
    Value::Object(map)
}

/// All alias references of a tree, indexed both ways.
///
/// `by_source` maps a token to the aliases it writes, `by_target` maps a
/// target path to the aliases pointing at it (resolvable or not).
#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    references: Vec<AliasReference>,
    by_source: IndexMap<TreePath, Vec<usize>>,
    by_target: IndexMap<TreePath, Vec<usize>>,
}

impl AliasIndex {
    pub fn new(references: Vec<AliasReference>) -> Self {
        let mut by_source: IndexMap<TreePath, Vec<usize>> = IndexMap::new();
        let mut by_target: IndexMap<TreePath, Vec<usize>> = IndexMap::new();
        for (i, reference) in references.iter().enumerate() {
            by_source
                .entry(reference.from.tree_path.clone())
                .or_default()
                .push(i);
            by_target
                .entry(reference.to.tree_path.clone())
                .or_default()
                .push(i);
        }
        Self {
            references,
            by_source,
            by_target,
        }
    }

    pub fn references(&self) -> &[AliasReference] {
        &self.references
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn from_token(&self, source: &TreePath) -> Vec<&AliasReference> {
        self.collect(self.by_source.get(source))
    }

    pub fn to_target(&self, target: &TreePath) -> Vec<&AliasReference> {
        self.collect(self.by_target.get(target))
    }

    /// Tokens holding an alias whose target lies at or below `prefix`.
    pub fn referrers_under(&self, prefix: &TreePath) -> Vec<TreePath> {
        let mut out: Vec<TreePath> = Vec::new();
        for (target, ids) in &self.by_target {
            if !target.starts_with(prefix) {
                continue;
            }
            for &i in ids {
                let source = &self.references[i].from.tree_path;
                if !out.contains(source) {
                    out.push(source.clone());
                }
            }
        }
        out
    }

    fn collect(&self, ids: Option<&Vec<usize>>) -> Vec<&AliasReference> {
        ids.map(|ids| ids.iter().map(|&i| &self.references[i]).collect())
            .unwrap_or_default()
    }
}
