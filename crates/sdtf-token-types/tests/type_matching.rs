use sdtf_token_types::{
    BuiltinRegistry, MappingError, MatchOutcome, TokenTypeRegistry, ValueSegment,
};
use serde_json::{json, Value};

fn key(k: &str) -> ValueSegment {
    ValueSegment::key(k)
}

fn lookup_in(value: Value) -> impl Fn(&[ValueSegment]) -> Option<Value> {
    move |path: &[ValueSegment]| {
        let mut current = &value;
        for seg in path {
            current = match seg {
                ValueSegment::Key(k) => current.get(k.as_str())?,
                ValueSegment::Index(i) => current.get(*i)?,
            };
        }
        Some(current.clone())
    }
}

#[test]
fn nested_token_types_resolve_through_the_catalog() {
    let registry = BuiltinRegistry::new();

    let outcome = registry
        .match_type_at("dimension", "border", &[key("width")], None)
        .unwrap();
    assert_eq!(outcome, MatchOutcome::Success);

    let outcome = registry
        .match_type_at("number", "border", &[key("width"), key("value")], None)
        .unwrap();
    assert_eq!(outcome, MatchOutcome::Success);

    let outcome = registry
        .match_type_at("color", "border", &[key("width")], None)
        .unwrap();
    assert_eq!(
        outcome,
        MatchOutcome::Failure {
            expected_type: "dimension".to_string()
        }
    );
}

#[test]
fn arrays_and_tuples_are_addressed_by_index() {
    let registry = BuiltinRegistry::new();

    let outcome = registry
        .match_type_at("shadow", "shadows", &[ValueSegment::Index(3)], None)
        .unwrap();
    assert!(outcome.is_success());

    let outcome = registry
        .match_type_at("number", "cubicBezier", &[ValueSegment::Index(2)], None)
        .unwrap();
    assert!(outcome.is_success());

    let err = registry
        .match_type_at("number", "cubicBezier", &[ValueSegment::Index(4)], None)
        .unwrap_err();
    assert!(matches!(
        err,
        MappingError::TupleIndexOutOfRange { index: 4, len: 4, .. }
    ));

    let err = registry
        .match_type_at("shadow", "shadows", &[key("first")], None)
        .unwrap_err();
    assert!(matches!(err, MappingError::ExpectedIndex { .. }));
}

#[test]
fn color_members_depend_on_the_model_discriminator() {
    let registry = BuiltinRegistry::new();
    let rgb = json!({"model": "rgb", "red": 1, "green": 2, "blue": 3, "alpha": 1});
    let lookup = lookup_in(rgb);

    let outcome = registry
        .match_type_at("number", "color", &[key("red")], Some(&lookup))
        .unwrap();
    assert!(outcome.is_success());

    let hex = lookup_in(json!({"model": "hex", "hex": "#fff", "alpha": 1}));
    let err = registry
        .match_type_at("number", "color", &[key("red")], Some(&hex))
        .unwrap_err();
    assert!(matches!(err, MappingError::UnknownKey { .. }));

    let missing = lookup_in(json!({}));
    let err = registry
        .match_type_at("number", "color", &[key("red")], Some(&missing))
        .unwrap_err();
    assert!(matches!(err, MappingError::MissingDiscriminator { .. }));
}

#[test]
fn discriminator_is_looked_up_relative_to_the_nested_value() {
    let registry = BuiltinRegistry::new();
    let border = json!({
        "color": {"model": "hsl", "hue": 1, "saturation": 2, "lightness": 3, "alpha": 1},
        "width": {"value": 1, "unit": "px"},
        "style": "solid"
    });
    let lookup = lookup_in(border);
    let outcome = registry
        .match_type_at("number", "border", &[key("color"), key("hue")], Some(&lookup))
        .unwrap();
    assert!(outcome.is_success());

    let outcome = registry
        .match_type_at("zeroToOne", "border", &[key("color"), key("alpha")], Some(&lookup))
        .unwrap();
    assert!(outcome.is_success());
}

#[test]
fn mode_level_match_compares_the_declared_union_type() {
    let registry = BuiltinRegistry::new();
    let outcome = registry.match_type_at("number", "fontWeight", &[], None).unwrap();
    assert_eq!(
        outcome,
        MatchOutcome::Failure {
            expected_type: "fontWeight".to_string()
        }
    );
}

#[test]
fn path_past_a_primitive_is_a_usage_error() {
    let registry = BuiltinRegistry::new();
    let err = registry
        .match_type_at("number", "dimension", &[key("unit"), key("deeper")], None)
        .unwrap_err();
    assert!(matches!(err, MappingError::PathPastPrimitive { .. }));
}

#[test]
fn validation_collects_structured_issues() {
    let registry = BuiltinRegistry::new();
    let issues = registry
        .validate("dimension", &json!({"value": "12", "unit": "parsec", "extra": true}))
        .unwrap_err();
    let codes: Vec<_> = issues.iter().map(|i| i.code).collect();
    assert_eq!(codes, vec!["PRIMITIVE", "PRIMITIVE", "EXTRA_KEY"]);
    assert_eq!(issues[0].path, vec![key("value")]);

    assert!(registry
        .validate("shadows", &json!([{
            "color": {"model": "hex", "hex": "#000", "alpha": 0.5},
            "offsetX": {"value": 0, "unit": "px"},
            "offsetY": {"value": 2, "unit": "px"},
            "blurRadius": {"value": 4, "unit": "px"},
            "spreadRadius": {"value": 0, "unit": "px"},
            "type": "outer"
        }]))
        .is_ok());

    assert!(registry.validate("zeroToOne", &json!(1.5)).is_err());
    assert!(registry.validate("fontWeight", &json!("bold")).is_ok());
    assert!(registry.validate("fontWeight", &json!(700)).is_ok());
    assert!(registry.validate("fontWeight", &json!(true)).is_err());
}
