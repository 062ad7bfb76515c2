//! Splits a token's raw `$value` into primitive parts and alias parts.

use serde_json::Value;

use sdtf_token_types::TokenTypeRegistry;

use super::classify::check_mode_name;
use crate::alias::parse_alias_object;
use crate::error::{node_path, Result, SdtfError, SchemaIssue};
use crate::path::{TreePath, ValuePath};
use crate::value_parts::{decompose_mode_value, DecomposedLeaf, RawValuePart, TokenRawValueParts};

/// A token's value: one top-level alias, or concrete modes.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    /// `{"$alias": "..."}` standing for the whole value.
    TopLevelAlias { target: TreePath },
    Modes(TokenRawValueParts),
}

impl TokenValue {
    pub fn is_top_level_alias(&self) -> bool {
        matches!(self, TokenValue::TopLevelAlias { .. })
    }

    pub fn parts(&self) -> Option<&TokenRawValueParts> {
        match self {
            TokenValue::Modes(parts) => Some(parts),
            TokenValue::TopLevelAlias { .. } => None,
        }
    }

    pub(crate) fn parts_mut(&mut self) -> Option<&mut TokenRawValueParts> {
        match self {
            TokenValue::Modes(parts) => Some(parts),
            TokenValue::TopLevelAlias { .. } => None,
        }
    }

    /// The raw `$value` JSON.
    pub fn to_json(&self) -> Value {
        match self {
            TokenValue::TopLevelAlias { target } => crate::alias::alias_object(target, None),
            TokenValue::Modes(parts) => parts.to_json(),
        }
    }

    /// Every alias target written by this value.
    pub fn alias_targets(&self) -> Vec<&TreePath> {
        match self {
            TokenValue::TopLevelAlias { target } => vec![target],
            TokenValue::Modes(parts) => parts
                .aliases()
                .filter_map(|part| match part {
                    RawValuePart::Alias { target, .. } => Some(target),
                    RawValuePart::Primitive { .. } => None,
                })
                .collect(),
        }
    }

    /// Rewrites alias target paths; returns true if any changed.
    pub(crate) fn retarget_paths<F>(&mut self, mut rewrite: F) -> bool
    where
        F: FnMut(&TreePath) -> Option<TreePath>,
    {
        match self {
            TokenValue::TopLevelAlias { target } => match rewrite(target) {
                Some(new_target) => {
                    *target = new_target;
                    true
                }
                None => false,
            },
            TokenValue::Modes(parts) => parts.retarget_aliases(|target, mode| {
                rewrite(target).map(|new_target| (new_target, mode.to_string()))
            }),
        }
    }

    /// Points aliases at `(target, from)` to `(target, to)` instead.
    pub(crate) fn retarget_mode(&mut self, target: &TreePath, from: &str, to: &str) -> bool {
        match self {
            TokenValue::TopLevelAlias { .. } => false,
            TokenValue::Modes(parts) => parts.retarget_aliases(|t, mode| {
                (t == target && mode == from).then(|| (t.clone(), to.to_string()))
            }),
        }
    }
}

fn value_prefix(token: &TreePath, mode: &str) -> Vec<Value> {
    let mut prefix = node_path(token);
    prefix.push(Value::String("$value".to_string()));
    prefix.push(Value::String(mode.to_string()));
    prefix
}

fn parse_target(token: &TreePath, mode: Option<&str>, raw: &str) -> Result<TreePath> {
    let parsed = raw.parse::<TreePath>().map_err(|e| e.to_string()).and_then(|path| {
        if path.is_root() {
            Err("alias target must not be empty".to_string())
        } else {
            Ok(path)
        }
    });
    parsed.map_err(|e| {
        let mut path = node_path(token);
        path.push(Value::String("$value".to_string()));
        if let Some(mode) = mode {
            path.push(Value::String(mode.to_string()));
        }
        SdtfError::schema(
            token,
            vec![SchemaIssue::new(
                path,
                "ALIAS",
                format!("alias target \"{raw}\" is not a valid path: {e}"),
            )],
        )
    })
}

/// Decomposes the full `$value` of a token.
pub(crate) fn decompose_token_value(
    token: &TreePath,
    token_type: &str,
    raw: &Value,
    registry: &dyn TokenTypeRegistry,
) -> Result<TokenValue> {
    if !registry.is_known(token_type) {
        return Err(SdtfError::UnknownTokenType {
            token: token.clone(),
            token_type: token_type.to_string(),
        });
    }
    if let Some((target, None)) = parse_alias_object(raw) {
        let target = parse_target(token, None, target)?;
        return Ok(TokenValue::TopLevelAlias { target });
    }
    let Some(modes) = raw.as_object() else {
        return Err(SdtfError::schema_one(token, "VALUE", "\"$value\" must be an object"));
    };
    if modes.is_empty() {
        return Err(SdtfError::schema_one(
            token,
            "VALUE",
            "\"$value\" must define at least one mode",
        ));
    }
    let mut parts = TokenRawValueParts::new();
    for (mode, mode_value) in modes {
        for part in decompose_mode(token, token_type, mode, mode_value, registry)? {
            parts.insert(part);
        }
    }
    Ok(TokenValue::Modes(parts))
}

/// Validates and decomposes the value of a single mode.
pub(crate) fn decompose_mode(
    token: &TreePath,
    token_type: &str,
    mode: &str,
    raw: &Value,
    registry: &dyn TokenTypeRegistry,
) -> Result<Vec<RawValuePart>> {
    if let Err(message) = check_mode_name(mode) {
        let mut path = node_path(token);
        path.push(Value::String("$value".to_string()));
        return Err(SdtfError::schema(
            token,
            vec![SchemaIssue::new(path, "MODE", message)],
        ));
    }
    match parse_alias_object(raw) {
        Some((target, Some(target_mode))) => {
            return Ok(vec![RawValuePart::Alias {
                mode: mode.to_string(),
                value_path: ValuePath::mode_level(),
                target: parse_target(token, Some(mode), target)?,
                target_mode: target_mode.to_string(),
            }]);
        }
        Some((_, None)) => {
            return Err(SdtfError::schema(
                token,
                vec![SchemaIssue::new(
                    value_prefix(token, mode),
                    "ALIAS",
                    "a mode-level alias requires \"$mode\"",
                )],
            ));
        }
        None => {}
    }

    if let Err(issues) = registry.validate(token_type, raw) {
        let prefix = value_prefix(token, mode);
        return Err(SdtfError::schema(
            token,
            issues
                .iter()
                .map(|issue| SchemaIssue::from_value_issue(&prefix, issue))
                .collect(),
        ));
    }

    let mut leaves = Vec::new();
    decompose_mode_value(mode, raw, &mut ValuePath::mode_level(), &mut leaves);
    leaves
        .into_iter()
        .map(|leaf| match leaf {
            DecomposedLeaf::Primitive(part) => Ok(part),
            DecomposedLeaf::Alias {
                mode,
                value_path,
                target,
                target_mode,
            } => Ok(RawValuePart::Alias {
                target: parse_target(token, Some(&mode), &target)?,
                mode,
                value_path,
                target_mode,
            }),
        })
        .collect()
}
