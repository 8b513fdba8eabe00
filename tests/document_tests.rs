//! Field discovery and expansion tests

use nestguard::document::{ConcretePath, Document, FieldPath, discover_fields, is_leaf};
use serde_json::{Value, json};
use std::collections::BTreeSet;

fn sample() -> Value {
    json!({
        "id": 7,
        "tags": ["a", "b"],
        "addresses": [
            {"city": "philadelphia", "zip": null},
            {"city": "pittsburgh", "geo": {"lat": 40.4, "lon": -79.9}},
            {}
        ],
        "matrix": [[1, 2], [3]],
        "empty": {},
        "none": []
    })
}

fn names(fields: &BTreeSet<FieldPath>) -> Vec<String> {
    fields.iter().map(ToString::to_string).collect()
}

// =============================================================================
// Discovery
// =============================================================================

mod discovery {
    use super::*;

    #[test]
    fn test_discovers_normalized_leaves() {
        let fields = discover_fields(&sample());
        let mut expected = vec![
            "id",
            "tags.*",
            "addresses.*.city",
            "addresses.*.zip",
            "addresses.*.geo.lat",
            "addresses.*.geo.lon",
            "matrix.*.*",
        ];
        expected.sort();
        let mut actual = names(&fields);
        actual.sort();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_every_field_expands_to_leaves_only() {
        let doc = Document::from_value(sample());
        for field in doc.fields() {
            let paths = doc.expand(&field);
            assert!(!paths.is_empty(), "{field} expanded to nothing");
            for path in paths {
                let node = doc.get(&path).unwrap();
                assert!(is_leaf(node), "{path} is not a leaf");
            }
        }
    }

    #[test]
    fn test_every_leaf_belongs_to_exactly_one_field() {
        let doc = Document::from_value(sample());
        let mut seen: Vec<ConcretePath> = Vec::new();
        for field in doc.fields() {
            for path in doc.expand(&field) {
                assert_eq!(path.normalize(), field);
                assert!(!seen.contains(&path), "{path} expanded twice");
                seen.push(path);
            }
        }
        // id, 2 tags, 2 cities, 1 zip, lat, lon, 3 matrix cells
        assert_eq!(seen.len(), 11);
    }

    #[test]
    fn test_root_scalar_is_one_field() {
        let fields = discover_fields(&json!("just a string"));
        assert_eq!(names(&fields), vec!["$"]);
        let field = fields.into_iter().next().unwrap();
        assert!(field.is_root());
        assert_eq!(field.resource_name(), "$");
    }

    #[test]
    fn test_empty_containers_have_no_fields() {
        assert!(discover_fields(&json!({})).is_empty());
        assert!(discover_fields(&json!([])).is_empty());
        assert!(discover_fields(&json!({"a": {"b": []}})).is_empty());
    }

    #[test]
    fn test_many_siblings_do_not_hide_leaves() {
        // "a.1" sorts before "a.10"; every sibling must still be found
        let mut object = serde_json::Map::new();
        for i in 0..12 {
            object.insert(i.to_string(), json!(i));
        }
        let fields = discover_fields(&json!({"a": object}));
        assert_eq!(fields.len(), 12);
    }
}

// =============================================================================
// Expansion
// =============================================================================

mod expansion {
    use super::*;

    #[test]
    fn test_expansion_is_in_document_order() {
        let doc = Document::from_value(sample());
        let paths: Vec<String> = doc
            .expand(&FieldPath::parse("addresses.*.city"))
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(paths, vec!["addresses[0].city", "addresses[1].city"]);
    }

    #[test]
    fn test_expansion_skips_non_leaves() {
        let doc = Document::from_value(sample());
        assert!(doc.expand(&FieldPath::parse("addresses.*.geo")).is_empty());
        assert!(doc.expand(&FieldPath::parse("missing")).is_empty());
    }

    #[test]
    fn test_replace_rewrites_one_leaf() {
        let mut doc = Document::parse(r#"{"a":[{"v":1},{"v":2}]}"#).unwrap();
        let paths = doc.expand(&FieldPath::parse("a.*.v"));
        let previous = doc.replace(&paths[1], json!(0));
        assert_eq!(previous, Some(json!(2)));
        assert_eq!(doc.to_json_string(), r#"{"a":[{"v":1},{"v":0}]}"#);
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        assert!(Document::parse(r#"{"a": "#).is_err());
    }
}

// =============================================================================
// Resource names
// =============================================================================

mod resource_names {
    use super::*;

    #[test]
    fn test_interior_wildcards_collapse() {
        assert_eq!(FieldPath::parse("items.*.v").resource_name(), "items.v");
        assert_eq!(FieldPath::parse("a.*.b.*.c").resource_name(), "a.b.c");
    }

    #[test]
    fn test_nested_arrays_keep_one_wildcard() {
        assert_eq!(FieldPath::parse("matrix.*.*.x").resource_name(), "matrix.*.x");
        assert_eq!(FieldPath::parse("matrix.*.*").resource_name(), "matrix.*");
    }

    #[test]
    fn test_trailing_wildcard_is_kept() {
        assert_eq!(FieldPath::parse("tags.*").resource_name(), "tags.*");
    }

    #[test]
    fn test_plain_path_is_unchanged() {
        assert_eq!(
            FieldPath::parse("address.city").resource_name(),
            "address.city"
        );
    }
}
