//! Runtime value validation against token type mappings.
//!
//! Dispatches on the mapping variant and collects every issue instead of
//! stopping at the first one. Positions typed as another token type may hold
//! a value-level alias (`{"$alias": "...", "$mode": "..."}`).

use serde::Serialize;
use serde_json::Value;

use crate::mapping::{MappingResolver, TokenTypesMapping};
use crate::segment::ValueSegment;

/// One problem found while validating a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub path: Vec<ValueSegment>,
    pub code: &'static str,
    pub message: String,
}

/// Returns true if `value` is a value-level alias object.
pub fn is_value_alias(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.len() == 2
                && map.get("$alias").map(Value::is_string).unwrap_or(false)
                && map.get("$mode").map(Value::is_string).unwrap_or(false)
        }
        _ => false,
    }
}

/// Validates `value` against the definition of `token_type`.
pub fn validate_value<R>(resolver: &R, token_type: &str, value: &Value) -> Vec<ValidationIssue>
where
    R: MappingResolver + ?Sized,
{
    let mut issues = Vec::new();
    match resolver.definition(token_type) {
        Some(mapping) => {
            let mut path = Vec::new();
            validate_inner(resolver, value, mapping, &mut path, &mut issues);
        }
        None => issues.push(ValidationIssue {
            path: Vec::new(),
            code: "TYPE",
            message: format!("unknown token type \"{token_type}\""),
        }),
    }
    issues
}

fn push(issues: &mut Vec<ValidationIssue>, path: &[ValueSegment], code: &'static str, message: String) {
    issues.push(ValidationIssue {
        path: path.to_vec(),
        code,
        message,
    });
}

fn validate_inner<R>(
    resolver: &R,
    value: &Value,
    mapping: &TokenTypesMapping,
    path: &mut Vec<ValueSegment>,
    issues: &mut Vec<ValidationIssue>,
) where
    R: MappingResolver + ?Sized,
{
    match mapping {
        TokenTypesMapping::Primitive(p) => {
            if !p.accepts(value) {
                push(
                    issues,
                    path,
                    "PRIMITIVE",
                    format!("expected {}, found {}", p.type_name(), value),
                );
            }
        }

        TokenTypesMapping::TokenType(name) => {
            if is_value_alias(value) {
                return;
            }
            match resolver.definition(name) {
                Some(definition) => validate_inner(resolver, value, definition, path, issues),
                None => push(issues, path, "TYPE", format!("unknown token type \"{name}\"")),
            }
        }

        TokenTypesMapping::ArrayOf(inner) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    path.push(ValueSegment::Index(i));
                    validate_inner(resolver, item, inner, path, issues);
                    path.pop();
                }
            }
            None => push(issues, path, "ARR", format!("expected array, found {value}")),
        },

        TokenTypesMapping::Tuple(items) => match value.as_array() {
            Some(values) if values.len() == items.len() => {
                for (i, (item, mapping)) in values.iter().zip(items).enumerate() {
                    path.push(ValueSegment::Index(i));
                    validate_inner(resolver, item, mapping, path, issues);
                    path.pop();
                }
            }
            Some(values) => push(
                issues,
                path,
                "TUP",
                format!("expected {} items, found {}", items.len(), values.len()),
            ),
            None => push(issues, path, "TUP", format!("expected tuple, found {value}")),
        },

        TokenTypesMapping::MapOf(fields) => match value.as_object() {
            Some(map) => {
                for (key, field) in fields {
                    path.push(ValueSegment::key(key.as_str()));
                    match map.get(key) {
                        Some(member) => validate_inner(resolver, member, field, path, issues),
                        None => push(issues, path, "KEY", format!("missing required key \"{key}\"")),
                    }
                    path.pop();
                }
                for key in map.keys() {
                    if !fields.contains_key(key) {
                        path.push(ValueSegment::key(key.as_str()));
                        push(issues, path, "EXTRA_KEY", format!("unexpected key \"{key}\""));
                        path.pop();
                    }
                }
            }
            None => push(issues, path, "OBJ", format!("expected object, found {value}")),
        },

        TokenTypesMapping::UnionOf(branches) => {
            let accepted = branches.iter().any(|branch| {
                let mut scratch = Vec::new();
                let mut branch_path = path.clone();
                validate_inner(resolver, value, branch, &mut branch_path, &mut scratch);
                scratch.is_empty()
            });
            if !accepted {
                push(
                    issues,
                    path,
                    "OR",
                    format!("expected {}, found {}", mapping.describe(), value),
                );
            }
        }

        TokenTypesMapping::DiscriminatedUnionOf {
            discriminator,
            branches,
        } => {
            let tag = value
                .as_object()
                .and_then(|m| m.get(discriminator))
                .and_then(Value::as_str);
            match tag {
                Some(tag) => match branches.get(tag) {
                    Some(branch) => validate_inner(resolver, value, branch, path, issues),
                    None => {
                        path.push(ValueSegment::key(discriminator.as_str()));
                        push(
                            issues,
                            path,
                            "DISCRIMINATOR",
                            format!(
                                "\"{tag}\" is not one of {}",
                                branches.keys().cloned().collect::<Vec<_>>().join(", ")
                            ),
                        );
                        path.pop();
                    }
                },
                None => push(
                    issues,
                    path,
                    "DISCRIMINATOR",
                    format!("missing discriminator \"{discriminator}\""),
                ),
            }
        }
    }
}
