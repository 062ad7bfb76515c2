#![allow(dead_code)]

use sdtf::{AnalyzerOptions, TreePath, TreeState};
use serde_json::{json, Value};

pub fn path(s: &str) -> TreePath {
    s.parse().expect("fixture path must parse")
}

pub fn state(raw: Value) -> TreeState {
    TreeState::new(&raw, &AnalyzerOptions::default()).expect("fixture tree must analyze")
}

pub fn hex(hex: &str) -> Value {
    json!({"model": "hex", "hex": hex, "alpha": 1})
}

pub fn px(value: f64) -> Value {
    json!({"value": value, "unit": "px"})
}

/// A themed tree: a `theme` collection with light/dark colors, a `spacing`
/// group and a border that aliases into both.
pub fn themed_tree() -> Value {
    json!({
        "theme": {
            "$collection": {"$modes": ["light", "dark"]},
            "$description": "Theme colors",
            "colors": {
                "primary": {"$type": "color", "$value": {
                    "light": hex("#0055ff"),
                    "dark": hex("#3377ff")
                }},
                "surface": {"$type": "color", "$value": {
                    "light": {"$alias": "theme.colors.primary", "$mode": "light"},
                    "dark": hex("#111111")
                }}
            }
        },
        "spacing": {
            "small": {"$type": "dimension", "$value": {"default": px(4.0)}},
            "medium": {"$type": "dimension", "$value": {"default": px(8.0)}}
        },
        "border": {"$type": "border", "$value": {"default": {
            "color": {"$alias": "theme.colors.primary", "$mode": "dark"},
            "width": {"$alias": "spacing.small", "$mode": "default"},
            "style": "solid"
        }}}
    })
}
