use proptest::prelude::*;
use sdtf::{TreePath, ValuePath, ValueSegment};

fn arb_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_$ -]{1,8}"
}

fn arb_path() -> impl Strategy<Value = TreePath> {
    prop::collection::vec(arb_name(), 0..5)
        .prop_map(|names| TreePath::new(names).expect("generated names are valid"))
}

fn arb_segment() -> impl Strategy<Value = ValueSegment> {
    prop_oneof![
        r"[a-z0-9.\[\]\\]{0,3}".prop_map(ValueSegment::Key),
        (0usize..4).prop_map(ValueSegment::Index),
    ]
}

fn arb_value_path() -> impl Strategy<Value = ValuePath> {
    prop::collection::vec(arb_segment(), 0..4).prop_map(ValuePath::new)
}

proptest! {
    #[test]
    fn dotted_form_is_injective(a in arb_path(), b in arb_path()) {
        prop_assert_eq!(a == b, a.to_string() == b.to_string());
        let parsed: TreePath = a.to_string().parse().expect("dotted form parses");
        prop_assert_eq!(parsed, a);
    }

    #[test]
    fn rebase_moves_descendants_only(
        prefix in arb_path(),
        rest in arb_path(),
        target in arb_path(),
    ) {
        let full = prefix.merge(&rest);
        let moved = full.rebase(&prefix, &target).expect("full starts with prefix");
        prop_assert!(moved.starts_with(&target));
        prop_assert_eq!(moved.len(), target.len() + rest.len());
        prop_assert_eq!(moved.slice(target.len(), moved.len()), rest);
    }

    #[test]
    fn ancestors_are_strict_prefixes(path in arb_path()) {
        let ancestors: Vec<TreePath> = path.ancestors().collect();
        prop_assert_eq!(ancestors.len(), path.len());
        for ancestor in &ancestors {
            prop_assert!(path.starts_with(ancestor));
            prop_assert!(path.is_descendant_of(ancestor));
        }
    }

    #[test]
    fn value_path_string_form_is_injective(a in arb_value_path(), b in arb_value_path()) {
        prop_assert_eq!(a == b, a.to_string() == b.to_string());
    }
}
