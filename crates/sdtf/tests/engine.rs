mod common;

use common::{path, themed_tree};
use sdtf::{AnalyzerOptions, Clause, EngineExport, SdtfEngine, SdtfError, SdtfQuery};
use serde_json::json;

fn engine() -> SdtfEngine {
    SdtfEngine::new(&themed_tree(), &AnalyzerOptions::default()).expect("fixture engine")
}

fn spacing_view() -> SdtfQuery {
    SdtfQuery::one(Clause::group("^spacing$"))
}

#[test]
fn views_are_registered_once_and_rerun_live() {
    let mut engine = engine();
    engine
        .register_view("spacing", spacing_view())
        .expect("register must succeed");
    assert!(matches!(
        engine.register_view("spacing", spacing_view()),
        Err(SdtfError::DuplicateView(ref name)) if name == "spacing"
    ));
    assert_eq!(engine.run_view("spacing").expect("view runs").len(), 3);

    engine
        .state_mut()
        .add_token(
            &path("spacing"),
            "large",
            &json!({"$type": "dimension", "$value": {"default": {"value": 16, "unit": "px"}}}),
        )
        .expect("add must succeed");
    let result = engine.run_view("spacing").expect("view runs");
    assert_eq!(result.len(), 4);
    assert!(result.contains(&path("spacing.large")));
}

#[test]
fn invalid_queries_are_refused_at_registration() {
    let mut engine = engine();
    let err = engine
        .register_view("broken", SdtfQuery::one(Clause::token("[")))
        .unwrap_err();
    assert!(matches!(err, SdtfError::InvalidQuery(_)));
    assert_eq!(engine.views().count(), 0);
}

#[test]
fn updating_and_deleting_views() {
    let mut engine = engine();
    assert!(matches!(
        engine.update_query("missing", spacing_view()),
        Err(SdtfError::ViewNotFound(_))
    ));

    engine.register_view("v", spacing_view()).expect("register");
    engine
        .update_query("v", SdtfQuery::one(Clause::token("^border$")))
        .expect("update must succeed");
    let paths: Vec<String> = engine
        .run_view("v")
        .expect("view runs")
        .paths()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(paths, vec!["border"]);

    engine.set_active_view(Some("v")).expect("activate");
    assert_eq!(engine.active_view().map(|(name, _)| name), Some("v"));
    engine.delete_view("v").expect("delete");
    assert!(engine.active_view().is_none(), "deleting the active view clears it");
    assert!(matches!(engine.delete_view("v"), Err(SdtfError::ViewNotFound(_))));
    assert!(matches!(engine.run_view("v"), Err(SdtfError::ViewNotFound(_))));
}

#[test]
fn active_view_must_exist() {
    let mut engine = engine();
    assert!(matches!(
        engine.set_active_view(Some("nope")),
        Err(SdtfError::ViewNotFound(_))
    ));
    engine.set_active_view(None).expect("clearing is always allowed");
}

#[test]
fn export_then_import_rebuilds_the_same_engine() {
    let mut engine = engine();
    engine.register_view("spacing", spacing_view()).expect("register");
    engine
        .register_view("tokens", SdtfQuery::one(Clause::token(".*")))
        .expect("register");
    engine.set_active_view(Some("tokens")).expect("activate");
    engine
        .state_mut()
        .rename_node(&path("spacing.small"), "tiny")
        .expect("rename");

    let export = engine.export();
    assert_eq!(export.active_view_name.as_deref(), Some("tokens"));
    let wire = serde_json::to_value(&export).expect("export serializes");
    assert!(wire.get("tokenTree").is_some());
    assert_eq!(wire["views"][0]["name"], json!("spacing"));

    let decoded: EngineExport = serde_json::from_value(wire).expect("export deserializes");
    let imported = SdtfEngine::import(&decoded, &AnalyzerOptions::default()).expect("import");
    assert_eq!(imported.export(), export);
    assert!(imported.state().contains(&path("spacing.tiny")));
}

#[test]
fn forks_are_isolated() {
    let mut original = engine();
    original.register_view("spacing", spacing_view()).expect("register");
    let mut fork = original.fork();

    fork.state_mut()
        .remove_node(&path("spacing"))
        .expect("remove");
    fork.delete_view("spacing").expect("delete");

    assert!(original.state().contains(&path("spacing.small")));
    assert_eq!(original.run_view("spacing").expect("view runs").len(), 3);
    assert!(!fork.state().contains(&path("spacing")));
    assert_eq!(fork.views().count(), 0);
}
