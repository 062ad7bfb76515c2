//! The token type registry contract and the builtin catalog.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::MappingError;
use crate::mapping::{MappingResolver, Primitive, TokenTypesMapping};
use crate::matcher::{match_type_against_mapping, DiscriminatorLookup, MatchOutcome};
use crate::segment::ValueSegment;
use crate::validate::{validate_value, ValidationIssue};

/// What the document engine needs to know about token types.
pub trait TokenTypeRegistry: MappingResolver + std::fmt::Debug + Send + Sync {
    fn is_known(&self, token_type: &str) -> bool {
        self.definition(token_type).is_some()
    }

    /// Validates one mode's raw value against `token_type`.
    fn validate(&self, token_type: &str, value: &Value) -> Result<(), Vec<ValidationIssue>> {
        let issues = validate_value(self, token_type, value);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    /// Checks whether a value of `candidate_type` may be placed at
    /// `value_path` inside a value of `token_type`.
    fn match_type_at(
        &self,
        candidate_type: &str,
        token_type: &str,
        value_path: &[ValueSegment],
        lookup: Option<DiscriminatorLookup<'_>>,
    ) -> Result<MatchOutcome, MappingError> {
        let root = TokenTypesMapping::TokenType(token_type.to_string());
        match_type_against_mapping(candidate_type, &root, value_path, self, lookup)
    }
}

/// Registry backed by an ordered map of type definitions.
#[derive(Debug, Clone)]
pub struct BuiltinRegistry {
    types: IndexMap<String, TokenTypesMapping>,
}

impl MappingResolver for BuiltinRegistry {
    fn definition(&self, token_type: &str) -> Option<&TokenTypesMapping> {
        self.types.get(token_type)
    }
}

impl TokenTypeRegistry for BuiltinRegistry {}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinRegistry {
    /// An empty registry, for callers that bring their own catalog.
    pub fn empty() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    pub fn new() -> Self {
        use TokenTypesMapping as M;

        let number = || M::token_type("number");
        let dimension = || M::token_type("dimension");
        let color = || M::token_type("color");
        let alpha = || M::token_type("zeroToOne");

        let mut registry = Self::empty();
        registry
            .with_type("string", M::Primitive(Primitive::String))
            .with_type("number", M::Primitive(Primitive::Number))
            .with_type("integer", M::Primitive(Primitive::Integer))
            .with_type("boolean", M::Primitive(Primitive::Boolean))
            .with_type(
                "zeroToOne",
                M::Primitive(Primitive::Range { min: 0.0, max: 1.0 }),
            )
            .with_type(
                "opacity",
                M::Primitive(Primitive::Range { min: 0.0, max: 1.0 }),
            )
            .with_type(
                "dimensionUnit",
                M::one_of(["px", "em", "rem", "%", "pt", "vw", "vh", "cm", "mm", "in"]),
            )
            .with_type(
                "dimension",
                M::map_of([("value", number()), ("unit", M::token_type("dimensionUnit"))]),
            )
            .with_type("durationUnit", M::one_of(["ms", "s"]))
            .with_type(
                "duration",
                M::map_of([("value", number()), ("unit", M::token_type("durationUnit"))]),
            )
            .with_type(
                "color",
                M::discriminated(
                    "model",
                    [
                        (
                            "hex",
                            M::map_of([
                                ("model", M::literal("hex")),
                                ("hex", M::Primitive(Primitive::HexColor)),
                                ("alpha", alpha()),
                            ]),
                        ),
                        (
                            "rgb",
                            M::map_of([
                                ("model", M::literal("rgb")),
                                ("red", number()),
                                ("green", number()),
                                ("blue", number()),
                                ("alpha", alpha()),
                            ]),
                        ),
                        (
                            "hsl",
                            M::map_of([
                                ("model", M::literal("hsl")),
                                ("hue", number()),
                                ("saturation", number()),
                                ("lightness", number()),
                                ("alpha", alpha()),
                            ]),
                        ),
                    ],
                ),
            )
            .with_type("fontFamily", M::Primitive(Primitive::String))
            .with_type(
                "fontWeight",
                M::UnionOf(vec![
                    number(),
                    M::one_of(["thin", "light", "regular", "medium", "semibold", "bold", "black"]),
                ]),
            )
            .with_type("cubicBezier", M::Tuple(vec![number(), number(), number(), number()]))
            .with_type(
                "borderStyle",
                M::one_of(["solid", "dashed", "dotted", "double", "groove", "none"]),
            )
            .with_type(
                "border",
                M::map_of([
                    ("color", color()),
                    ("width", dimension()),
                    ("style", M::token_type("borderStyle")),
                ]),
            )
            .with_type("shadowType", M::one_of(["outer", "inner"]))
            .with_type(
                "shadow",
                M::map_of([
                    ("color", color()),
                    ("offsetX", dimension()),
                    ("offsetY", dimension()),
                    ("blurRadius", dimension()),
                    ("spreadRadius", dimension()),
                    ("type", M::token_type("shadowType")),
                ]),
            )
            .with_type("shadows", M::array_of(M::token_type("shadow")))
            .with_type(
                "colorStop",
                M::map_of([("color", color()), ("position", alpha())]),
            )
            .with_type(
                "gradient",
                M::map_of([
                    ("type", M::one_of(["linear", "radial", "conic"])),
                    ("angle", number()),
                    ("colorStops", M::array_of(M::token_type("colorStop"))),
                ]),
            );
        registry
    }

    /// Adds or replaces a type definition.
    pub fn with_type(&mut self, name: impl Into<String>, mapping: TokenTypesMapping) -> &mut Self {
        self.types.insert(name.into(), mapping);
        self
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_catalog_references_are_closed() {
        fn visit(registry: &BuiltinRegistry, mapping: &TokenTypesMapping) {
            match mapping {
                TokenTypesMapping::TokenType(name) => {
                    assert!(registry.is_known(name), "dangling type reference {name}")
                }
                TokenTypesMapping::ArrayOf(inner) => visit(registry, inner),
                TokenTypesMapping::Tuple(items) | TokenTypesMapping::UnionOf(items) => {
                    items.iter().for_each(|m| visit(registry, m))
                }
                TokenTypesMapping::MapOf(fields) => fields.values().for_each(|m| visit(registry, m)),
                TokenTypesMapping::DiscriminatedUnionOf { branches, .. } => {
                    branches.values().for_each(|m| visit(registry, m))
                }
                TokenTypesMapping::Primitive(_) => {}
            }
        }
        let registry = BuiltinRegistry::new();
        for name in registry.type_names() {
            visit(&registry, registry.definition(name).unwrap());
        }
    }

    #[test]
    fn test_validate_accepts_value_level_alias_at_token_type_position() {
        let registry = BuiltinRegistry::new();
        let value = json!({"value": {"$alias": "base", "$mode": "default"}, "unit": "px"});
        assert!(registry.validate("dimension", &value).is_ok());
    }

    #[test]
    fn test_validate_checks_hex_format() {
        let registry = BuiltinRegistry::new();
        for hex in ["#fff", "#ffff", "#0055ff", "#0055FF80"] {
            let value = json!({"model": "hex", "hex": hex, "alpha": 1});
            assert!(registry.validate("color", &value).is_ok(), "{hex} is valid");
        }
        for hex in ["fff", "#ff", "#abcdeg", "#0055ff8"] {
            let value = json!({"model": "hex", "hex": hex, "alpha": 1});
            let issues = registry.validate("color", &value).unwrap_err();
            assert_eq!(issues[0].code, "PRIMITIVE", "{hex} is rejected");
        }
    }

    #[test]
    fn test_validate_rejects_alias_at_primitive_position() {
        let registry = BuiltinRegistry::new();
        let value = json!({"model": "hex", "hex": {"$alias": "x", "$mode": "m"}, "alpha": 1});
        let issues = registry.validate("color", &value).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, vec![ValueSegment::key("hex")]);
    }
}
