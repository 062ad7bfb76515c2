mod common;

use common::{hex, path, state, themed_tree};
use sdtf::{
    ChildrenScope, ChildrenSelect, Clause, MergeCollision, MergeDedupe, SdtfError, SdtfQuery,
    Select, SelectShape, TreePath,
};
use serde_json::json;

fn paths(result: &sdtf::QueryResult<'_>) -> Vec<String> {
    result.paths().iter().map(TreePath::to_string).collect()
}

fn shape(children: Option<ChildrenSelect>) -> Select {
    Select::Shape(SelectShape {
        children,
        ..SelectShape::default()
    })
}

fn duplicated_primaries() -> serde_json::Value {
    json!({
        "light": {"primary": {"$type": "number", "$value": {"default": 1}}},
        "dark": {"primary": {"$type": "number", "$value": {"default": 2}}}
    })
}

#[test]
fn disjoint_groups_are_continuous() {
    let tree = state(json!({
        "colors": {"brand": {"red": {"$type": "number", "$value": {"default": 1}}}},
        "sizes": {"base": {"$type": "number", "$value": {"default": 4}}}
    }));
    let disjoint = tree
        .query(&SdtfQuery::one(Clause::group("^(colors|sizes)$")))
        .expect("query must run");
    assert!(disjoint.is_continuous());
    assert_eq!(
        paths(&disjoint),
        vec!["colors", "colors.brand", "colors.brand.red", "sizes", "sizes.base"]
    );

    let nested = tree
        .query(&SdtfQuery::one(Clause::group("^(colors|brand)$")))
        .expect("query must run");
    assert!(!nested.is_continuous());
}

#[test]
fn query_parses_from_json() {
    let tree = state(themed_tree());
    let query = SdtfQuery::from_json(&json!({
        "where": [
            {"token": "^small$", "select": true},
            {"token": "^border$", "select": true}
        ]
    }))
    .expect("query must parse");
    let result = tree.query(&query).expect("query must run");
    assert_eq!(paths(&result), vec!["spacing.small", "border"]);

    let bad = SdtfQuery::from_json(&json!({"where": {"select": true}}));
    assert!(bad.is_ok(), "shape parses, compilation rejects it");
    assert!(matches!(
        tree.query(&bad.expect("parsed")),
        Err(SdtfError::InvalidQuery(_))
    ));
}

#[test]
fn select_shapes_scope_children() {
    let tree = state(themed_tree());

    let shallow = tree
        .query(&SdtfQuery::one(Clause::collection("^theme$").with_select(shape(Some(
            ChildrenSelect::Scoped(ChildrenScope {
                depth: Some(1),
                ..ChildrenScope::default()
            }),
        )))))
        .expect("query must run");
    assert_eq!(paths(&shallow), vec!["theme", "theme.colors"]);

    let tokens_only = tree
        .query(&SdtfQuery::one(
            Clause::collection("^theme$").with_select(Select::Shape(SelectShape {
                collection: Some(false),
                children: Some(ChildrenSelect::Scoped(ChildrenScope {
                    groups: Some(false),
                    ..ChildrenScope::default()
                })),
                ..SelectShape::default()
            })),
        ))
        .expect("query must run");
    assert_eq!(paths(&tokens_only), vec!["theme.colors.primary", "theme.colors.surface"]);

    let nothing = tree
        .query(&SdtfQuery::one(Clause::group("^spacing$").with_select(Select::All(false))))
        .expect("query must run");
    assert!(nothing.is_empty());
    assert_eq!(nothing.matched(), &[path("spacing")]);
}

#[test]
fn match_path_tests_the_dotted_path() {
    let tree = state(themed_tree());
    let by_name = tree
        .query(&SdtfQuery::one(Clause::token(r"^theme\.colors\.")))
        .expect("query must run");
    assert!(by_name.is_empty());

    let by_path = tree
        .query(&SdtfQuery::one(Clause::token(r"^theme\.colors\.").matching_path()))
        .expect("query must run");
    assert_eq!(paths(&by_path), vec!["theme.colors.primary", "theme.colors.surface"]);
}

#[test]
fn render_groups_roots_by_parent() {
    let tree = state(themed_tree());
    let tokens = tree
        .query(&SdtfQuery::one(Clause::token("^(small|medium)$")))
        .expect("query must run");
    let fragments = tokens.render();
    assert_eq!(fragments.len(), 1);
    let fragment = &fragments[0];
    assert_eq!(fragment.parent_path, path("spacing"));
    assert!(!fragment.is_root);
    assert!(fragment.is_complete);
    assert_eq!(fragment.value, themed_tree()["spacing"]);

    let group_only = tree
        .query(&SdtfQuery::one(Clause::group("^spacing$").with_select(shape(None))))
        .expect("query must run");
    let fragments = group_only.render();
    assert_eq!(fragments.len(), 1);
    assert!(fragments[0].is_root);
    assert!(!fragments[0].is_complete);
    assert_eq!(fragments[0].value, json!({"spacing": {}}));
}

#[test]
fn merge_moves_roots_to_the_top_and_rewrites_aliases() {
    let tree = state(themed_tree());
    let result = tree
        .query(&SdtfQuery::one(Clause::group("^colors$")))
        .expect("query must run");
    let merged = result.merge(MergeDedupe::default()).expect("merge must succeed");
    assert_eq!(
        merged.to_json(),
        json!({"colors": {
            "primary": {"$type": "color", "$value": {"light": hex("#0055ff"), "dark": hex("#3377ff")}},
            "surface": {"$type": "color", "$value": {
                "light": {"$alias": "colors.primary", "$mode": "light"},
                "dark": hex("#111111")
            }}
        }})
    );
    assert!(merged.token(&path("colors.surface")).expect("surface").is_fully_resolvable());
    assert_eq!(tree.to_json(), themed_tree(), "source tree is untouched");
}

#[test]
fn merge_keeps_aliases_that_leave_the_selection() {
    let tree = state(themed_tree());
    let result = tree
        .query(&SdtfQuery::one(Clause::token("^border$")))
        .expect("query must run");
    let merged = result.merge(MergeDedupe::Reject).expect("merge must succeed");
    let border = merged.token(&path("border")).expect("border");
    assert!(!border.is_fully_resolvable());
    let width = &merged.to_json()["border"]["$value"]["default"]["width"];
    assert_eq!(*width, json!({"$alias": "spacing.small", "$mode": "default"}));
}

#[test]
fn colliding_roots_are_rejected_or_suffixed() {
    let tree = state(duplicated_primaries());
    let result = tree
        .query(&SdtfQuery::one(Clause::token("^primary$")))
        .expect("query must run");

    let err = result.merge(false.into()).unwrap_err();
    assert!(matches!(err, SdtfError::PathCollision { ref path } if path.to_string() == "primary"));

    let merged = result.merge(true.into()).expect("suffixed merge");
    assert_eq!(
        merged.to_json(),
        json!({
            "primary": {"$type": "number", "$value": {"default": 1}},
            "primary-1": {"$type": "number", "$value": {"default": 2}}
        })
    );
}

#[test]
fn suffixes_count_up_per_collision() {
    let tree = state(json!({
        "light": {"primary": {"$type": "number", "$value": {"default": 1}}},
        "dark": {"primary": {"$type": "number", "$value": {"default": 2}}},
        "contrast": {"primary": {"$type": "number", "$value": {"default": 3}}}
    }));
    let result = tree
        .query(&SdtfQuery::one(Clause::token("^primary$")))
        .expect("query must run");
    let merged = result.merge(MergeDedupe::Suffix).expect("suffixed merge");
    let names: Vec<String> = merged.to_json().as_object().expect("object").keys().cloned().collect();
    assert_eq!(names, vec!["primary", "primary-1", "primary-2"]);
    assert_eq!(merged.to_json()["primary-2"]["$value"]["default"], json!(3));
}

#[test]
fn custom_dedupe_is_asked_until_the_name_is_free() {
    let tree = state(duplicated_primaries());
    let result = tree
        .query(&SdtfQuery::one(Clause::token("^primary$")))
        .expect("query must run");

    let mut seen: Vec<MergeCollision> = Vec::new();
    let mut rename = |collision: &MergeCollision| {
        seen.push(collision.clone());
        if collision.attempt == 0 {
            "primary".to_string()
        } else {
            "primaryDark".to_string()
        }
    };
    let merged = result
        .merge(MergeDedupe::Custom(&mut rename))
        .expect("custom merge");
    assert!(merged.contains(&path("primaryDark")));
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].source, path("dark.primary"));
    assert_eq!(seen[1].attempt, 1);

    let mut invalid = |_: &MergeCollision| "bad.name".to_string();
    assert!(result.merge(MergeDedupe::Custom(&mut invalid)).is_err());
}
