//! Structural classification of raw tree nodes.

use serde_json::{Map, Value};

use crate::error::{Result, SdtfError, SchemaIssue};
use crate::path::TreePath;

/// Optional `$description` / `$extensions` carried by every node kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMetadata {
    pub description: Option<String>,
    pub extensions: Option<Map<String, Value>>,
}

impl NodeMetadata {
    pub(crate) fn write_into(&self, map: &mut Map<String, Value>) {
        if let Some(description) = &self.description {
            map.insert("$description".to_string(), Value::String(description.clone()));
        }
        if let Some(extensions) = &self.extensions {
            map.insert("$extensions".to_string(), Value::Object(extensions.clone()));
        }
    }
}

static NULL: Value = Value::Null;

pub(crate) enum ClassifiedNode<'a> {
    Collection {
        metadata: NodeMetadata,
        modes: Vec<String>,
        children: Vec<(&'a str, &'a Value)>,
    },
    Group {
        metadata: NodeMetadata,
        children: Vec<(&'a str, &'a Value)>,
    },
    Token {
        metadata: NodeMetadata,
        token_type: &'a str,
        value: &'a Value,
    },
}

/// Mode names are non-empty and never `$`-prefixed.
pub(crate) fn check_mode_name(mode: &str) -> std::result::Result<(), String> {
    if mode.is_empty() {
        return Err("mode name must not be empty".to_string());
    }
    if mode.starts_with('$') {
        return Err(format!("mode name \"{mode}\" must not start with \"$\""));
    }
    Ok(())
}

/// Node names follow path rules and are never `$`-prefixed.
pub(crate) fn check_node_name(name: &str) -> std::result::Result<(), String> {
    TreePath::validate_name(name).map_err(|e| e.to_string())?;
    if name.starts_with('$') {
        return Err(format!("node name \"{name}\" must not start with \"$\""));
    }
    Ok(())
}

fn parse_metadata(path: &TreePath, map: &Map<String, Value>, issues: &mut Vec<SchemaIssue>) -> NodeMetadata {
    let mut metadata = NodeMetadata::default();
    match map.get("$description") {
        Some(Value::String(s)) => metadata.description = Some(s.clone()),
        Some(_) => issues.push(SchemaIssue::at_node(
            path,
            "DESCRIPTION",
            "\"$description\" must be a string",
        )),
        None => {}
    }
    match map.get("$extensions") {
        Some(Value::Object(o)) => metadata.extensions = Some(o.clone()),
        Some(_) => issues.push(SchemaIssue::at_node(
            path,
            "EXTENSIONS",
            "\"$extensions\" must be an object",
        )),
        None => {}
    }
    metadata
}

fn parse_modes(path: &TreePath, collection: &Value, issues: &mut Vec<SchemaIssue>) -> Vec<String> {
    let Some(modes) = collection
        .as_object()
        .and_then(|c| c.get("$modes"))
        .and_then(Value::as_array)
    else {
        issues.push(SchemaIssue::at_node(
            path,
            "COLLECTION",
            "\"$collection\" must be an object with a \"$modes\" array",
        ));
        return Vec::new();
    };
    if modes.is_empty() {
        issues.push(SchemaIssue::at_node(
            path,
            "COLLECTION_MODES",
            "\"$collection.$modes\" must declare at least one mode",
        ));
    }
    let mut out: Vec<String> = Vec::with_capacity(modes.len());
    for mode in modes {
        match mode.as_str() {
            Some(name) => {
                if let Err(message) = check_mode_name(name) {
                    issues.push(SchemaIssue::at_node(path, "COLLECTION_MODES", message));
                } else if out.iter().any(|m| m == name) {
                    issues.push(SchemaIssue::at_node(
                        path,
                        "COLLECTION_MODES",
                        format!("mode \"{name}\" is declared twice"),
                    ));
                } else {
                    out.push(name.to_string());
                }
            }
            None => issues.push(SchemaIssue::at_node(
                path,
                "COLLECTION_MODES",
                format!("mode {mode} must be a string"),
            )),
        }
    }
    out
}

fn node_children<'a>(
    path: &TreePath,
    map: &'a Map<String, Value>,
    issues: &mut Vec<SchemaIssue>,
) -> Vec<(&'a str, &'a Value)> {
    let mut children = Vec::new();
    for (key, child) in map {
        if key.starts_with('$') {
            continue;
        }
        if let Err(e) = TreePath::validate_name(key) {
            issues.push(SchemaIssue::at_node(path, "NAME", e.to_string()));
            continue;
        }
        children.push((key.as_str(), child));
    }
    children
}

fn reject_unknown_properties(
    path: &TreePath,
    map: &Map<String, Value>,
    allowed: &[&str],
    issues: &mut Vec<SchemaIssue>,
) {
    for key in map.keys() {
        if key.starts_with('$') && !allowed.contains(&key.as_str()) {
            issues.push(SchemaIssue::at_node(
                path,
                "UNKNOWN_PROPERTY",
                format!("unknown property \"{key}\""),
            ));
        }
    }
}

/// Classifies the node at `path` against the collection, token and group
/// shapes, reporting every structural problem of this node at once.
pub(crate) fn classify<'a>(path: &TreePath, raw: &'a Value) -> Result<ClassifiedNode<'a>> {
    let Some(map) = raw.as_object() else {
        return Err(SdtfError::schema_one(
            path,
            "NODE",
            format!("node must be an object, found {raw}"),
        ));
    };
    let mut issues = Vec::new();
    let metadata = parse_metadata(path, map, &mut issues);

    let node = if let Some(collection) = map.get("$collection") {
        reject_unknown_properties(
            path,
            map,
            &["$collection", "$description", "$extensions"],
            &mut issues,
        );
        let modes = parse_modes(path, collection, &mut issues);
        let children = node_children(path, map, &mut issues);
        ClassifiedNode::Collection {
            metadata,
            modes,
            children,
        }
    } else if map.contains_key("$type") || map.contains_key("$value") {
        reject_unknown_properties(
            path,
            map,
            &["$type", "$value", "$description", "$extensions"],
            &mut issues,
        );
        if map.keys().any(|k| !k.starts_with('$')) {
            issues.push(SchemaIssue::at_node(
                path,
                "TOKEN_CHILDREN",
                "a token cannot contain child nodes",
            ));
        }
        let token_type = match map.get("$type") {
            Some(Value::String(t)) => t.as_str(),
            Some(_) => {
                issues.push(SchemaIssue::at_node(path, "TYPE", "\"$type\" must be a string"));
                ""
            }
            None => {
                issues.push(SchemaIssue::at_node(path, "TYPE", "token is missing \"$type\""));
                ""
            }
        };
        let value = match map.get("$value") {
            Some(v @ Value::Object(_)) => v,
            Some(_) => {
                issues.push(SchemaIssue::at_node(path, "VALUE", "\"$value\" must be an object"));
                &NULL
            }
            None => {
                issues.push(SchemaIssue::at_node(path, "VALUE", "token is missing \"$value\""));
                &NULL
            }
        };
        ClassifiedNode::Token {
            metadata,
            token_type,
            value,
        }
    } else {
        reject_unknown_properties(path, map, &["$description", "$extensions"], &mut issues);
        let children = node_children(path, map, &mut issues);
        ClassifiedNode::Group { metadata, children }
    };

    if issues.is_empty() {
        Ok(node)
    } else {
        Err(SdtfError::schema(path, issues))
    }
}
