//! Field discovery over arbitrary JSON documents
//!
//! Finds every addressable leaf of a document, collapses leaves that only
//! differ by array index into one [`FieldPath`], and expands a [`FieldPath`]
//! back into the concrete locations it matches.
//!
//! Leaves are scalar and `null` nodes. Objects and arrays are always internal,
//! so empty containers contribute no fields.
//!
//! ```text
//! {"addresses":[{"city":"a"},{"city":"b"}],"id":7}
//!
//! fields:  addresses.*.city, id
//! expand(addresses.*.city): addresses[0].city, addresses[1].city
//! ```

pub mod path;

pub use path::{ConcretePath, FieldPath, FieldSegment, PathSegment};

use serde_json::Value;
use std::collections::BTreeSet;

/// A parsed JSON record owned by one authorization call
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Value,
}

impl Document {
    /// Parse a JSON string, failing on any syntax error
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        let root = serde_json::from_str(json)?;
        Ok(Self { root })
    }

    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    /// Normalized paths of every leaf in the document
    pub fn fields(&self) -> BTreeSet<FieldPath> {
        discover_fields(&self.root)
    }

    /// Concrete leaf locations matching `field`, in document order
    pub fn expand(&self, field: &FieldPath) -> Vec<ConcretePath> {
        expand(field, &self.root)
    }

    /// Node at a concrete location
    pub fn get(&self, path: &ConcretePath) -> Option<&Value> {
        path.segments()
            .iter()
            .try_fold(&self.root, |node, segment| match (segment, node) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key),
                (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
                _ => None,
            })
    }

    fn get_mut(&mut self, path: &ConcretePath) -> Option<&mut Value> {
        path.segments()
            .iter()
            .try_fold(&mut self.root, |node, segment| match (segment, node) {
                (PathSegment::Key(key), Value::Object(map)) => map.get_mut(key),
                (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index),
                _ => None,
            })
    }

    /// Replace the node at `path`, returning the previous value.
    ///
    /// Returns `None` and leaves the document untouched if `path` does not exist.
    pub fn replace(&mut self, path: &ConcretePath, value: Value) -> Option<Value> {
        self.get_mut(path)
            .map(|slot| std::mem::replace(slot, value))
    }

    /// Compact JSON rendering of the (possibly masked) document
    pub fn to_json_string(&self) -> String {
        self.root.to_string()
    }
}

/// Whether a node is a leaf (scalar or null)
pub fn is_leaf(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

/// Enumerate the concrete path of every leaf, depth first, in document order
pub fn leaf_paths(root: &Value) -> Vec<ConcretePath> {
    let mut out = Vec::new();
    collect_leaves(root, ConcretePath::root(), &mut out);
    out
}

fn collect_leaves(node: &Value, at: ConcretePath, out: &mut Vec<ConcretePath>) {
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                collect_leaves(child, at.child(PathSegment::Key(key.clone())), out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                collect_leaves(child, at.child(PathSegment::Index(index)), out);
            }
        }
        _ => out.push(at),
    }
}

/// Normalized paths of every leaf under `root`
pub fn discover_fields(root: &Value) -> BTreeSet<FieldPath> {
    leaf_paths(root).iter().map(ConcretePath::normalize).collect()
}

/// Every concrete leaf location under `root` that `field` matches, in document order
pub fn expand(field: &FieldPath, root: &Value) -> Vec<ConcretePath> {
    let mut out = Vec::new();
    expand_from(root, field.segments(), ConcretePath::root(), &mut out);
    out
}

fn expand_from(node: &Value, rest: &[FieldSegment], at: ConcretePath, out: &mut Vec<ConcretePath>) {
    let Some((head, tail)) = rest.split_first() else {
        if is_leaf(node) {
            out.push(at);
        }
        return;
    };

    match (head, node) {
        (FieldSegment::Key(key), Value::Object(map)) => {
            if let Some(child) = map.get(key) {
                expand_from(child, tail, at.child(PathSegment::Key(key.clone())), out);
            }
        }
        (FieldSegment::AnyIndex, Value::Array(items)) => {
            for (index, child) in items.iter().enumerate() {
                expand_from(child, tail, at.child(PathSegment::Index(index)), out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rendered(fields: &BTreeSet<FieldPath>) -> Vec<String> {
        fields.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_discover_nested_object() {
        let doc = json!({"foo": "1", "address": {"city": "x", "street": "y"}, "bar": null});
        assert_eq!(
            rendered(&discover_fields(&doc)),
            vec!["address.city", "address.street", "bar", "foo"]
        );
    }

    #[test]
    fn test_discover_collapses_array_elements() {
        let doc = json!({"addresses": [{"city": "a"}, {"city": "b", "zip": 1}]});
        assert_eq!(
            rendered(&discover_fields(&doc)),
            vec!["addresses.*.city", "addresses.*.zip"]
        );
    }

    #[test]
    fn test_discover_empty_object() {
        assert!(discover_fields(&json!({})).is_empty());
    }

    #[test]
    fn test_discover_skips_empty_containers() {
        let doc = json!({"a": {}, "b": [], "c": 1});
        assert_eq!(rendered(&discover_fields(&doc)), vec!["c"]);
    }

    #[test]
    fn test_discover_root_scalar() {
        let fields = discover_fields(&json!("just a string"));
        assert_eq!(fields.len(), 1);
        assert!(fields.iter().next().unwrap().is_root());
    }

    #[test]
    fn test_discover_many_siblings() {
        // Eleven elements: index 10 must not be mistaken for a parent of index 1
        let items: Vec<_> = (0..11).map(|i| json!({"v": i})).collect();
        let doc = json!({ "items": items, "items_total": 11 });
        assert_eq!(
            rendered(&discover_fields(&doc)),
            vec!["items.*.v", "items_total"]
        );
    }

    #[test]
    fn test_expand_in_document_order() {
        let doc = json!({"items": [{"v": 1}, {"w": 2}, {"v": 3}]});
        let paths = expand(&FieldPath::parse("items.*.v"), &doc);
        let rendered: Vec<_> = paths.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["items[0].v", "items[2].v"]);
    }

    #[test]
    fn test_expand_ignores_internal_nodes() {
        let doc = json!({"a": {"b": 1}});
        assert!(expand(&FieldPath::parse("a"), &doc).is_empty());
    }

    #[test]
    fn test_expand_nested_arrays() {
        let doc = json!({"m": [[1, 2], [3]]});
        let paths = expand(&FieldPath::parse("m.*.*"), &doc);
        let rendered: Vec<_> = paths.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["m[0][0]", "m[0][1]", "m[1][0]"]);
    }

    #[test]
    fn test_replace_and_get() {
        let mut doc = Document::from_value(json!({"items": [{"v": 1}, {"v": 2}]}));
        let path = ConcretePath::from(vec![
            PathSegment::Key("items".into()),
            PathSegment::Index(1),
            PathSegment::Key("v".into()),
        ]);
        assert_eq!(doc.replace(&path, json!(0)), Some(json!(2)));
        assert_eq!(doc.get(&path), Some(&json!(0)));
        assert_eq!(doc.to_json_string(), r#"{"items":[{"v":1},{"v":0}]}"#);
    }

    #[test]
    fn test_replace_missing_path() {
        let mut doc = Document::from_value(json!({"a": 1}));
        let path = ConcretePath::from(vec![PathSegment::Key("b".into())]);
        assert_eq!(doc.replace(&path, json!(0)), None);
        assert_eq!(doc.root(), &json!({"a": 1}));
    }

    #[test]
    fn test_replace_root() {
        let mut doc = Document::from_value(json!(42));
        assert_eq!(doc.replace(&ConcretePath::root(), json!(-11111)), Some(json!(42)));
        assert_eq!(doc.to_json_string(), "-11111");
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        assert!(Document::parse("{\"a\": ").is_err());
        assert!(Document::parse("{\"a\": 1}").is_ok());
    }
}
