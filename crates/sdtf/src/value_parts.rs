//! Flat storage of a token's decomposed `$value`.
//!
//! Each mode value is split into leaves keyed by `(mode, value path)`:
//! concrete JSON leaves and alias leaves. Nested JSON is rebuilt on demand
//! by deep assignment, so a single mode or a single nested member can be
//! edited without touching the rest of the token.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::alias::alias_object;
use crate::path::{TreePath, ValuePath, ValueSegment};

#[derive(Debug, Clone, PartialEq)]
pub enum RawValuePart {
    Primitive {
        mode: String,
        value_path: ValuePath,
        value: Value,
    },
    Alias {
        mode: String,
        value_path: ValuePath,
        target: TreePath,
        target_mode: String,
    },
}

impl RawValuePart {
    pub fn mode(&self) -> &str {
        match self {
            RawValuePart::Primitive { mode, .. } | RawValuePart::Alias { mode, .. } => mode,
        }
    }

    pub fn value_path(&self) -> &ValuePath {
        match self {
            RawValuePart::Primitive { value_path, .. } | RawValuePart::Alias { value_path, .. } => {
                value_path
            }
        }
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, RawValuePart::Alias { .. })
    }

    fn set_mode(&mut self, new_mode: &str) {
        match self {
            RawValuePart::Primitive { mode, .. } | RawValuePart::Alias { mode, .. } => {
                *mode = new_mode.to_string()
            }
        }
    }

    /// The JSON written at this leaf.
    pub fn to_json(&self) -> Value {
        match self {
            RawValuePart::Primitive { value, .. } => value.clone(),
            RawValuePart::Alias {
                target,
                target_mode,
                ..
            } => alias_object(target, Some(target_mode)),
        }
    }
}

type PartKey = (String, ValuePath);

/// Indexed set of value parts for one token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenRawValueParts {
    parts: IndexMap<PartKey, RawValuePart>,
}

impl TokenRawValueParts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(parts: impl IntoIterator<Item = RawValuePart>) -> Self {
        let mut out = Self::new();
        for part in parts {
            out.insert(part);
        }
        out
    }

    pub fn insert(&mut self, part: RawValuePart) {
        let key = (part.mode().to_string(), part.value_path().clone());
        self.parts.insert(key, part);
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Restartable iteration over all parts, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RawValuePart> {
        self.parts.values()
    }

    pub fn aliases(&self) -> impl Iterator<Item = &RawValuePart> {
        self.parts.values().filter(|p| p.is_alias())
    }

    pub fn primitives(&self) -> impl Iterator<Item = &RawValuePart> {
        self.parts.values().filter(|p| !p.is_alias())
    }

    pub fn get(&self, mode: &str, value_path: &ValuePath) -> Option<&RawValuePart> {
        self.parts.get(&(mode.to_string(), value_path.clone()))
    }

    /// Modes present, in first-seen order.
    pub fn modes(&self) -> Vec<String> {
        let mut modes: Vec<String> = Vec::new();
        for part in self.parts.values() {
            if !modes.iter().any(|m| m == part.mode()) {
                modes.push(part.mode().to_string());
            }
        }
        modes
    }

    pub fn has_mode(&self, mode: &str) -> bool {
        self.parts.values().any(|p| p.mode() == mode)
    }

    pub fn parts_for_mode<'a>(&'a self, mode: &'a str) -> impl Iterator<Item = &'a RawValuePart> {
        self.parts.values().filter(move |p| p.mode() == mode)
    }

    /// Parts strictly below `value_path` in `mode`.
    pub fn children(&self, mode: &str, value_path: &ValuePath) -> Vec<&RawValuePart> {
        self.parts
            .values()
            .filter(|p| {
                p.mode() == mode
                    && value_path.is_root_of(p.value_path())
                    && p.value_path() != value_path
            })
            .collect()
    }

    /// Nearest part in `mode` whose path is a strict prefix of `value_path`.
    pub fn parent(&self, mode: &str, value_path: &ValuePath) -> Option<&RawValuePart> {
        let mut candidate = value_path.parent();
        while let Some(path) = candidate {
            if let Some(part) = self.get(mode, &path) {
                return Some(part);
            }
            candidate = path.parent();
        }
        None
    }

    /// Renames every part of `from` to `to`, keeping positions.
    pub fn rename_mode(&mut self, from: &str, to: &str) {
        self.parts = std::mem::take(&mut self.parts)
            .into_iter()
            .map(|((mode, path), mut part)| {
                if mode == from {
                    part.set_mode(to);
                    ((to.to_string(), path), part)
                } else {
                    ((mode, path), part)
                }
            })
            .collect();
    }

    pub fn delete_mode(&mut self, mode: &str) {
        self.parts.retain(|(m, _), _| m != mode);
    }

    /// Replaces the parts of `mode`, keeping the mode at its position.
    pub fn replace_mode(&mut self, mode: &str, parts: Vec<RawValuePart>) {
        let position = self.parts.keys().position(|(m, _)| m == mode);
        let mut rebuilt = IndexMap::with_capacity(self.parts.len() + parts.len());
        let mut pending = Some(parts);
        for (i, (key, part)) in std::mem::take(&mut self.parts).into_iter().enumerate() {
            if Some(i) == position {
                for part in pending.take().unwrap_or_default() {
                    rebuilt.insert((part.mode().to_string(), part.value_path().clone()), part);
                }
            }
            if key.0 != mode {
                rebuilt.insert(key, part);
            }
        }
        self.parts = rebuilt;
        for part in pending.unwrap_or_default() {
            self.insert(part);
        }
    }

    /// Applies `rewrite` to every alias target; returns true if any changed.
    pub fn retarget_aliases<F>(&mut self, mut rewrite: F) -> bool
    where
        F: FnMut(&TreePath, &str) -> Option<(TreePath, String)>,
    {
        let mut changed = false;
        for part in self.parts.values_mut() {
            if let RawValuePart::Alias {
                target,
                target_mode,
                ..
            } = part
            {
                if let Some((new_target, new_mode)) = rewrite(target, target_mode) {
                    *target = new_target;
                    *target_mode = new_mode;
                    changed = true;
                }
            }
        }
        changed
    }

    /// Rebuilds the nested JSON of one mode.
    pub fn mode_value(&self, mode: &str) -> Option<Value> {
        let mut out: Option<Value> = None;
        for part in self.parts_for_mode(mode) {
            let root = out.get_or_insert(Value::Null);
            deep_set(root, part.value_path().segments(), part.to_json());
        }
        out
    }

    /// Rebuilds the whole `{mode: value}` object.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for mode in self.modes() {
            if let Some(value) = self.mode_value(&mode) {
                map.insert(mode, value);
            }
        }
        Value::Object(map)
    }
}

/// Writes `value` at `path` inside `root`, creating containers as needed.
///
/// Key segments create objects, index segments create arrays padded with
/// `null` up to the index.
pub(crate) fn deep_set(root: &mut Value, path: &[ValueSegment], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        *root = value;
        return;
    };
    let slot = match first {
        ValueSegment::Key(k) => {
            if !root.is_object() {
                *root = Value::Object(Map::new());
            }
            match root {
                Value::Object(map) => map.entry(k.clone()).or_insert(Value::Null),
                _ => return,
            }
        }
        ValueSegment::Index(i) => {
            if !root.is_array() {
                *root = Value::Array(Vec::new());
            }
            match root {
                Value::Array(items) => {
                    if items.len() <= *i {
                        items.resize(*i + 1, Value::Null);
                    }
                    &mut items[*i]
                }
                _ => return,
            }
        }
    };
    deep_set(slot, rest, value);
}

/// Splits one mode value into leaves. Alias objects become alias leaves,
/// empty containers are kept as leaves so they survive reconstruction.
pub(crate) fn decompose_mode_value(
    mode: &str,
    value: &Value,
    path: &mut ValuePath,
    out: &mut Vec<DecomposedLeaf>,
) {
    if let Some((target, Some(target_mode))) = crate::alias::parse_alias_object(value) {
        out.push(DecomposedLeaf::Alias {
            mode: mode.to_string(),
            value_path: path.clone(),
            target: target.to_string(),
            target_mode: target_mode.to_string(),
        });
        return;
    }
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, member) in map {
                path.push(ValueSegment::key(key.as_str()));
                decompose_mode_value(mode, member, path, out);
                path.pop();
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, item) in items.iter().enumerate() {
                path.push(ValueSegment::Index(i));
                decompose_mode_value(mode, item, path, out);
                path.pop();
            }
        }
        _ => out.push(DecomposedLeaf::Primitive(RawValuePart::Primitive {
            mode: mode.to_string(),
            value_path: path.clone(),
            value: value.clone(),
        })),
    }
}

/// A leaf before its alias target string has been parsed into a path.
#[derive(Debug, Clone)]
pub(crate) enum DecomposedLeaf {
    Primitive(RawValuePart),
    Alias {
        mode: String,
        value_path: ValuePath,
        target: String,
        target_mode: String,
    },
}
