mod common;

use common::{hex, path, px, state, themed_tree};
use sdtf::{JsonValueOptions, NodeKind, SdtfError, TreePath};
use serde_json::{json, Value};

fn border_aliases(value: &Value) -> (Value, Value) {
    let default = &value["border"]["$value"]["default"];
    (default["color"].clone(), default["width"].clone())
}

#[test]
fn rename_rewrites_every_alias_below_the_old_path() {
    let mut tree = state(themed_tree());
    assert!(tree.rename_node(&path("spacing"), "space").expect("rename must succeed"));

    let mut expected = themed_tree();
    let spacing = expected
        .as_object_mut()
        .and_then(|root| root.remove("spacing"))
        .expect("fixture has spacing");
    expected["space"] = spacing;
    expected["border"]["$value"]["default"]["width"] = json!({"$alias": "space.small", "$mode": "default"});
    assert_eq!(tree.to_json(), expected);

    assert!(tree.token(&path("space.small")).is_some());
    assert!(tree.token(&path("spacing.small")).is_none());
    assert_eq!(tree.aliases_to(&path("space.small")).len(), 1);
    assert!(tree.token(&path("border")).expect("border").is_fully_resolvable());
}

#[test]
fn renaming_a_token_keeps_its_position() {
    let mut tree = state(themed_tree());
    tree.rename_node(&path("theme.colors.primary"), "brand")
        .expect("rename must succeed");
    let colors: Vec<String> = tree
        .children(&path("theme.colors"))
        .into_iter()
        .map(TreePath::to_string)
        .collect();
    assert_eq!(colors, vec!["theme.colors.brand", "theme.colors.surface"]);
    let (color, _) = border_aliases(&tree.to_json());
    assert_eq!(color, json!({"$alias": "theme.colors.brand", "$mode": "dark"}));
}

#[test]
fn moving_a_group_rewrites_aliases_into_it() {
    let mut tree = state(themed_tree());
    tree.add_group(&TreePath::root(), "layout", &json!({}))
        .expect("add must succeed");
    let moved = tree
        .move_group(&path("spacing"), &path("layout"))
        .expect("move must succeed");
    assert_eq!(moved, path("layout.spacing"));
    let (_, width) = border_aliases(&tree.to_json());
    assert_eq!(width, json!({"$alias": "layout.spacing.small", "$mode": "default"}));
    assert_eq!(tree.node_kind(&path("layout.spacing.medium")), Some(NodeKind::Token));
}

#[test]
fn collections_never_nest() {
    let mut tree = state(json!({
        "a": {"$collection": {"$modes": ["m"]}},
        "b": {"$collection": {"$modes": ["m"]}},
        "wrapper": {"c": {"$collection": {"$modes": ["m"]}}}
    }));
    assert!(matches!(
        tree.move_collection(&path("a"), &path("b")),
        Err(SdtfError::StructuralMutation(_))
    ));
    assert!(matches!(
        tree.move_group(&path("wrapper"), &path("b")),
        Err(SdtfError::StructuralMutation(_))
    ));
    assert!(matches!(
        tree.add_collection(&path("a"), "inner", &json!({"$collection": {"$modes": ["m"]}})),
        Err(SdtfError::NestedCollection { .. })
    ));
}

#[test]
fn failed_move_restores_the_previous_state() {
    let mut tree = state(themed_tree());
    let before = tree.to_json();
    let err = tree
        .move_token(&path("spacing.small"), &path("theme"))
        .unwrap_err();
    assert!(matches!(err, SdtfError::ModeCoherence { .. }));
    assert_eq!(tree.to_json(), before);
    let (_, width) = border_aliases(&tree.to_json());
    assert_eq!(width, json!({"$alias": "spacing.small", "$mode": "default"}));
}

#[test]
fn renaming_a_collection_mode_cascades_into_tokens_and_aliases() {
    let mut tree = state(themed_tree());
    tree.rename_collection_mode(&path("theme"), "light", "day")
        .expect("mode rename must succeed");
    let json = tree.to_json();
    let colors = &json["theme"]["colors"];
    assert_eq!(json["theme"]["$collection"]["$modes"], json!(["day", "dark"]));
    assert_eq!(colors["primary"]["$value"]["day"], hex("#0055ff"));
    assert_eq!(
        colors["surface"]["$value"]["day"],
        json!({"$alias": "theme.colors.primary", "$mode": "day"})
    );
    let (color, _) = border_aliases(&json);
    assert_eq!(color, json!({"$alias": "theme.colors.primary", "$mode": "dark"}));
    assert!(tree.alias_references().iter().all(|a| a.is_resolvable));
}

#[test]
fn deleting_a_collection_mode_leaves_aliases_unresolvable() {
    let mut tree = state(themed_tree());
    tree.delete_collection_mode(&path("theme"), "dark")
        .expect("delete must succeed");
    let primary = tree.token(&path("theme.colors.primary")).expect("primary");
    assert_eq!(primary.modes(), vec!["light"]);
    let border = tree.token(&path("border")).expect("border");
    assert!(!border.is_fully_resolvable());

    let err = tree
        .delete_collection_mode(&path("theme"), "light")
        .unwrap_err();
    assert!(matches!(err, SdtfError::StructuralMutation(_)));
}

#[test]
fn rename_token_mode_follows_referrers() {
    let mut tree = state(themed_tree());
    tree.rename_token_mode(&path("spacing.small"), "default", "base")
        .expect("rename must succeed");
    let (_, width) = border_aliases(&tree.to_json());
    assert_eq!(width, json!({"$alias": "spacing.small", "$mode": "base"}));
    assert!(tree.token(&path("border")).expect("border").is_fully_resolvable());
}

#[test]
fn mutation_introducing_a_cycle_is_rolled_back() {
    let mut tree = state(json!({
        "a": {"$type": "number", "$value": {"default": 1}},
        "b": {"$type": "number", "$value": {"$alias": "a"}}
    }));
    let before = tree.to_json();
    let err = tree
        .update_token_value(&path("a"), &json!({"$alias": "b"}))
        .unwrap_err();
    assert_eq!(err.to_string(), "A circular alias reference was found in token tree.");
    assert_eq!(tree.to_json(), before);
}

#[test]
fn mutation_with_type_mismatch_is_rolled_back() {
    let mut tree = state(themed_tree());
    let err = tree
        .update_token_mode_value(
            &path("border"),
            "default",
            &json!({
                "color": {"$alias": "spacing.small", "$mode": "default"},
                "width": px(1.0),
                "style": "solid"
            }),
        )
        .unwrap_err();
    assert!(matches!(err, SdtfError::AliasTypeMismatch { .. }));
    assert_eq!(tree.to_json(), themed_tree());
}

#[test]
fn removing_a_target_makes_aliases_unresolvable() {
    let mut tree = state(themed_tree());
    tree.remove_node(&path("spacing")).expect("remove must succeed");
    assert!(!tree.contains(&path("spacing.small")));
    let border = tree.token(&path("border")).expect("border");
    assert!(!border.is_fully_resolvable());
    let dangling = tree.aliases_to(&path("spacing.small"));
    assert_eq!(dangling.len(), 1);
    assert!(!dangling[0].is_resolvable);
}

#[test]
fn json_value_resolves_aliases_deeply() {
    let tree = state(themed_tree());
    let border = tree.token(&path("border")).expect("border");
    let resolved = border
        .json_value(&JsonValueOptions::default())
        .expect("border resolves");
    assert_eq!(
        resolved,
        json!({"default": {"color": hex("#3377ff"), "width": px(4.0), "style": "solid"}})
    );

    let raw = border
        .json_value(&JsonValueOptions {
            resolve_aliases: false,
            ..JsonValueOptions::default()
        })
        .expect("raw value");
    assert_eq!(raw, themed_tree()["border"]["$value"]);

    let surface = tree.token(&path("theme.colors.surface")).expect("surface");
    let light = surface
        .json_value(&JsonValueOptions {
            target_mode: Some("light".into()),
            ..JsonValueOptions::default()
        })
        .expect("light resolves");
    assert_eq!(light, hex("#0055ff"));
}

#[test]
fn json_value_reports_or_keeps_unresolvable_aliases() {
    let tree = state(json!({
        "gap": {"$type": "number", "$value": {"default": {"$alias": "missing", "$mode": "default"}}}
    }));
    let gap = tree.token(&path("gap")).expect("gap");
    let err = gap.json_value(&JsonValueOptions::default()).unwrap_err();
    assert!(matches!(err, SdtfError::UnresolvableAlias { ref alias, .. } if *alias == path("missing")));

    let kept = gap
        .json_value(&JsonValueOptions {
            allow_unresolvable: true,
            ..JsonValueOptions::default()
        })
        .expect("kept as alias");
    assert_eq!(kept, json!({"default": {"$alias": "missing", "$mode": "default"}}));
}

#[test]
fn added_tokens_join_collection_checks() {
    let mut tree = state(themed_tree());
    let ok = tree.add_token(
        &path("theme.colors"),
        "accent",
        &json!({"$type": "color", "$value": {"light": hex("#ff0000"), "dark": hex("#aa0000")}}),
    );
    assert_eq!(ok.expect("matching modes"), path("theme.colors.accent"));

    let err = tree
        .add_token(
            &path("theme.colors"),
            "partial",
            &json!({"$type": "color", "$value": {"light": hex("#ff0000")}}),
        )
        .unwrap_err();
    assert!(matches!(err, SdtfError::ModeCoherence { .. }));
    assert!(!tree.contains(&path("theme.colors.partial")));

    let collection = tree.collection(&path("theme")).expect("theme");
    assert_eq!(collection.tokens().len(), 3);
    assert_eq!(collection.description(), Some("Theme colors"));
}

#[test]
fn collections_move_to_the_root() {
    let mut tree = state(json!({
        "wrapper": {"palette": {
            "$collection": {"$modes": ["m"]},
            "tone": {"$type": "number", "$value": {"m": 1}}
        }},
        "ref": {"$type": "number", "$value": {"default": {"$alias": "wrapper.palette.tone", "$mode": "m"}}}
    }));
    let moved = tree
        .move_collection(&path("wrapper.palette"), &TreePath::root())
        .expect("move to root must succeed");
    assert_eq!(moved, path("palette"));
    assert!(tree.collection(&path("palette")).is_some());
    assert!(!tree.contains(&path("wrapper.palette")));
    assert_eq!(tree.node_kind(&path("palette.tone")), Some(NodeKind::Token));
    assert_eq!(
        tree.to_json()["ref"]["$value"]["default"],
        json!({"$alias": "palette.tone", "$mode": "m"})
    );
    assert!(tree.token(&path("ref")).expect("ref").is_fully_resolvable());
}

#[test]
fn moves_into_a_group_inside_a_collection() {
    let mut tree = state(themed_tree());
    tree.add_collection(&TreePath::root(), "other", &json!({"$collection": {"$modes": ["light", "dark"]}}))
        .expect("add must succeed");
    assert!(matches!(
        tree.move_collection(&path("other"), &path("theme.colors")),
        Err(SdtfError::StructuralMutation(_))
    ));

    tree.add_group(&TreePath::root(), "holder", &json!({}))
        .expect("add must succeed");
    tree.move_collection(&path("other"), &path("holder"))
        .expect("a plain group accepts a collection");
    assert!(matches!(
        tree.move_group(&path("holder"), &path("theme.colors")),
        Err(SdtfError::StructuralMutation(_))
    ));

    let before = tree.to_json();
    let err = tree
        .move_group(&path("spacing"), &path("theme.colors"))
        .unwrap_err();
    assert!(matches!(err, SdtfError::ModeCoherence { .. }));
    assert_eq!(tree.to_json(), before);

    tree.add_group(
        &TreePath::root(),
        "extra",
        &json!({"accent": {"$type": "color", "$value": {"light": hex("#ff0000"), "dark": hex("#aa0000")}}}),
    )
    .expect("add must succeed");
    let moved = tree
        .move_group(&path("extra"), &path("theme.colors"))
        .expect("matching modes may join the collection");
    assert_eq!(moved, path("theme.colors.extra"));
    let theme = tree.collection(&path("theme")).expect("theme");
    assert_eq!(theme.tokens().len(), 3);
}

#[test]
fn renaming_onto_a_dangling_alias_target_is_refused() {
    let mut tree = state(json!({
        "a": {"$type": "number", "$value": {"default": 1}},
        "x": {"$type": "number", "$value": {"default": {"$alias": "b", "$mode": "default"}}}
    }));
    assert!(!tree.token(&path("x")).expect("x").is_fully_resolvable());

    let err = tree.rename_node(&path("a"), "b").unwrap_err();
    assert!(matches!(err, SdtfError::StructuralMutation(_)));
    assert!(tree.contains(&path("a")));
    assert!(!tree.token(&path("x")).expect("x").is_fully_resolvable());

    assert!(tree.rename_node(&path("a"), "c").expect("free name"));
}
