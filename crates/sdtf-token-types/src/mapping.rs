//! Declarative token type mappings.
//!
//! A mapping describes the shape of one token type's value. Leaves are either
//! literal primitives (which can only hold concrete JSON) or references to
//! another token type (which may also be filled by a value-level alias).

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

fn hex_color_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#(?:[0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").ok())
        .as_ref()
}

/// Primitive leaf kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    String,
    Number,
    Integer,
    Boolean,
    Null,
    /// Inclusive numeric range.
    Range { min: f64, max: f64 },
    /// One of a fixed set of strings.
    OneOf(Vec<String>),
    /// Exactly this JSON value.
    Literal(Value),
    /// `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`.
    HexColor,
}

impl Primitive {
    pub fn type_name(&self) -> String {
        match self {
            Primitive::String => "string".to_string(),
            Primitive::Number => "number".to_string(),
            Primitive::Integer => "integer".to_string(),
            Primitive::Boolean => "boolean".to_string(),
            Primitive::Null => "null".to_string(),
            Primitive::Range { min, max } => format!("number[{min}..{max}]"),
            Primitive::OneOf(options) => options
                .iter()
                .map(|o| format!("\"{o}\""))
                .collect::<Vec<_>>()
                .join(" | "),
            Primitive::Literal(v) => v.to_string(),
            Primitive::HexColor => "hex color string".to_string(),
        }
    }

    /// Returns true if the given JSON value satisfies this primitive.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Primitive::String => value.is_string(),
            Primitive::Number => value.is_number(),
            Primitive::Integer => value.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false),
            Primitive::Boolean => value.is_boolean(),
            Primitive::Null => value.is_null(),
            Primitive::Range { min, max } => value
                .as_f64()
                .map(|n| n >= *min && n <= *max)
                .unwrap_or(false),
            Primitive::OneOf(options) => value
                .as_str()
                .map(|s| options.iter().any(|o| o == s))
                .unwrap_or(false),
            Primitive::Literal(expected) => value == expected,
            Primitive::HexColor => match (value.as_str(), hex_color_regex()) {
                (Some(s), Some(re)) => re.is_match(s),
                _ => false,
            },
        }
    }
}

/// The shape of a token type's value.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenTypesMapping {
    Primitive(Primitive),
    /// A nested value of another token type.
    TokenType(String),
    ArrayOf(Box<TokenTypesMapping>),
    Tuple(Vec<TokenTypesMapping>),
    /// An object with exactly these named members.
    MapOf(IndexMap<String, TokenTypesMapping>),
    UnionOf(Vec<TokenTypesMapping>),
    /// An object whose `discriminator` member selects the branch.
    DiscriminatedUnionOf {
        discriminator: String,
        branches: IndexMap<String, TokenTypesMapping>,
    },
}

impl TokenTypesMapping {
    pub fn token_type(name: impl Into<String>) -> Self {
        TokenTypesMapping::TokenType(name.into())
    }

    pub fn array_of(inner: TokenTypesMapping) -> Self {
        TokenTypesMapping::ArrayOf(Box::new(inner))
    }

    pub fn map_of<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, TokenTypesMapping)>,
    {
        TokenTypesMapping::MapOf(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn discriminated<K, I>(discriminator: impl Into<String>, branches: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, TokenTypesMapping)>,
    {
        TokenTypesMapping::DiscriminatedUnionOf {
            discriminator: discriminator.into(),
            branches: branches.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn one_of<S: Into<String>>(options: impl IntoIterator<Item = S>) -> Self {
        TokenTypesMapping::Primitive(Primitive::OneOf(
            options.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        TokenTypesMapping::Primitive(Primitive::Literal(value.into()))
    }

    /// Human readable name of the type this mapping expects.
    pub fn describe(&self) -> String {
        match self {
            TokenTypesMapping::Primitive(p) => p.type_name(),
            TokenTypesMapping::TokenType(name) => name.clone(),
            TokenTypesMapping::ArrayOf(_) => "array".to_string(),
            TokenTypesMapping::Tuple(items) => format!("tuple[{}]", items.len()),
            TokenTypesMapping::MapOf(_) | TokenTypesMapping::DiscriminatedUnionOf { .. } => {
                "object".to_string()
            }
            TokenTypesMapping::UnionOf(branches) => branches
                .iter()
                .map(TokenTypesMapping::describe)
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }
}

/// Looks up the mapping that defines a token type.
pub trait MappingResolver {
    fn definition(&self, token_type: &str) -> Option<&TokenTypesMapping>;
}

impl MappingResolver for IndexMap<String, TokenTypesMapping> {
    fn definition(&self, token_type: &str) -> Option<&TokenTypesMapping> {
        self.get(token_type)
    }
}
