//! Product tree normalization.
//!
//! The product taxonomy is self-similar at every depth and each level is
//! subject to the same cardinality collapsing: a node with one child carries
//! a bare `Branch` object, a node with several carries an array. The
//! normalizer walks the tree once and rebuilds it with `children` always a
//! sequence, without assuming a fixed depth.

use crate::models::{Branch, FullProductName};
use crate::shape::{coerce_objects, scalar_text};
use serde_json::{Map, Value};

/// Normalize one raw branch node and everything below it.
///
/// Children that are not objects are ignored.
pub fn normalize_branch(node: &Map<String, Value>) -> Branch {
    Branch {
        name: text_field(node, "Name"),
        branch_type: text_field(node, "Type"),
        full_product_name: full_product_name(node.get("FullProductName")),
        children: coerce_objects(node.get("Branch"))
            .iter()
            .map(normalize_branch)
            .collect(),
    }
}

/// Normalize a document's `ProductTree`.
///
/// The tree element itself is a synthetic root around the real top-level
/// branch; when it wraps exactly one branch that branch becomes the root.
/// This happens once, at the root only.
///
/// A repeated `ProductTree` is a list of such wrappers; their top-level
/// branches are pooled under one root.
pub fn normalize_product_tree(tree: Option<&Value>) -> Branch {
    let root = match tree {
        Some(Value::Object(node)) => normalize_branch(node),
        Some(Value::Array(_)) => Branch {
            children: coerce_objects(tree)
                .iter()
                .flat_map(|wrapper| coerce_objects(wrapper.get("Branch")))
                .map(|branch| normalize_branch(&branch))
                .collect(),
            ..Default::default()
        },
        _ => Branch::default(),
    };

    unwrap_root(root)
}

fn unwrap_root(mut root: Branch) -> Branch {
    if root.children.len() == 1 {
        root.children.remove(0)
    } else {
        root
    }
}

fn full_product_name(value: Option<&Value>) -> Option<FullProductName> {
    let first = coerce_objects(value).into_iter().next();
    match (first, value) {
        (Some(map), _) => Some(FullProductName {
            text: text_field(&map, "text"),
            product_id: text_field(&map, "ProductID"),
        }),
        // An element without attributes collapses to its text.
        (None, Some(Value::String(text))) => Some(FullProductName {
            text: text.clone(),
            product_id: String::new(),
        }),
        (None, _) => None,
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> String {
    map.get(key).and_then(scalar_text).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn version(name: &str, id: &str) -> Value {
        json!({
            "Name": name,
            "Type": "Product Version",
            "FullProductName": { "ProductID": id, "text": format!("{} {}", id, name) }
        })
    }

    #[test]
    fn test_single_child_object_becomes_sequence() {
        let node = json!({
            "Name": "FortiClientEMS",
            "Type": "Product Name",
            "Branch": version("7.2.2", "FortiClientEMS-7.2.2")
        });
        let branch = normalize_branch(node.as_object().unwrap());

        assert_eq!(branch.children.len(), 1);
        let leaf = &branch.children[0];
        assert_eq!(leaf.name, "7.2.2");
        assert_eq!(leaf.branch_type, "Product Version");
        assert_eq!(
            leaf.full_product_name.as_ref().unwrap().product_id,
            "FortiClientEMS-7.2.2"
        );
        assert!(leaf.children.is_empty());
    }

    #[test]
    fn test_single_and_many_children_have_same_shape() {
        let one = json!({"Name": "FortiOS", "Branch": version("6.4.10", "FortiOS-6.4.10")});
        let many = json!({"Name": "FortiOS", "Branch": [version("6.4.10", "FortiOS-6.4.10")]});
        assert_eq!(
            normalize_branch(one.as_object().unwrap()),
            normalize_branch(many.as_object().unwrap())
        );
    }

    #[test]
    fn test_root_wrapper_is_removed_once() {
        let tree = json!({
            "Branch": {
                "Name": "Fortinet",
                "Type": "Vendor",
                "Branch": {
                    "Name": "FortiOS",
                    "Type": "Product Name",
                    "Branch": [version("7.2.0", "FortiOS-7.2.0"), version("7.2.1", "FortiOS-7.2.1")]
                }
            }
        });
        let root = normalize_product_tree(Some(&tree));

        assert_eq!(root.name, "Fortinet");
        assert_eq!(root.branch_type, "Vendor");
        // The single product line below the vendor is an interior level and stays.
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "FortiOS");
        assert_eq!(root.children[0].children.len(), 2);
    }

    #[test]
    fn test_root_with_several_branches_is_kept() {
        let tree = json!({
            "Branch": [
                {"Name": "Fortinet", "Type": "Vendor"},
                {"Name": "Other", "Type": "Vendor"}
            ]
        });
        let root = normalize_product_tree(Some(&tree));
        assert!(root.name.is_empty());
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn test_tree_given_as_list_of_wrappers() {
        let tree = json!([{
            "Branch": {
                "Name": "Fortinet",
                "Type": "Vendor",
                "Branch": {"Name": "FortiOS", "Branch": version("7.2.0", "FortiOS-7.2.0")}
            }
        }]);
        let root = normalize_product_tree(Some(&tree));

        assert_eq!(root.name, "Fortinet");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "FortiOS");
    }

    #[test]
    fn test_depth_is_not_fixed() {
        let tree = json!({
            "Branch": {
                "Name": "Fortinet",
                "Branch": {
                    "Name": "FortiGate",
                    "Branch": {
                        "Name": "FortiOS",
                        "Branch": version("7.4.1", "FortiOS-7.4.1")
                    }
                }
            }
        });
        let root = normalize_product_tree(Some(&tree));
        let leaf = &root.children[0].children[0].children[0];
        assert_eq!(leaf.name, "7.4.1");
    }

    #[test]
    fn test_malformed_branches_are_empty() {
        let node = json!({"Name": "FortiOS", "Branch": "garbage"});
        assert!(normalize_branch(node.as_object().unwrap()).children.is_empty());

        let node = json!({"Name": "FortiOS", "Branch": ["garbage", 42]});
        assert!(normalize_branch(node.as_object().unwrap()).children.is_empty());

        assert!(normalize_product_tree(None).is_empty());
        assert!(normalize_product_tree(Some(&json!("garbage"))).is_empty());
    }
}
