//! Nested category forest from flat records.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The fields of a stored category the tree needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub slug: String,
    #[serde(rename = "parentId", default)]
    pub parent_id: Option<String>,
}

impl CategoryRecord {
    /// `None` for documents that are not categories (no string id).
    pub fn from_value(doc: &Value) -> Option<Self> {
        serde_json::from_value(doc.clone()).ok()
    }

    /// Absent and empty `parentId` both mean root.
    pub fn parent(&self) -> Option<&str> {
        self.parent_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Derived view of a category with its children. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryNode {
    pub id: String,
    pub name: String,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub slug: String,
    pub children: Vec<CategoryNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("Category '{id}' is part of a parent cycle")]
    CyclicHierarchy { id: String },
}

fn node(record: &CategoryRecord, children: Vec<CategoryNode>) -> CategoryNode {
    CategoryNode {
        id: record.id.clone(),
        name: record.name.clone(),
        images: record.images.clone(),
        color: record.color.clone(),
        slug: record.slug.clone(),
        children,
    }
}

fn build_level<'a>(
    records: &'a [CategoryRecord],
    parent: Option<&str>,
    visited: &mut HashSet<&'a str>,
) -> Result<Vec<CategoryNode>, TreeError> {
    let mut level = Vec::new();

    for record in records.iter().filter(|r| r.parent() == parent) {
        if !visited.insert(record.id.as_str()) {
            return Err(TreeError::CyclicHierarchy {
                id: record.id.clone(),
            });
        }
        let children = build_level(records, Some(record.id.as_str()), visited)?;
        level.push(node(record, children));
    }

    Ok(level)
}

/// Where following `parentId` links from a record ends up.
enum Ancestry {
    MissingParent(String),
    Cycle,
    Root,
}

fn ancestry<'a>(by_id: &HashMap<&str, &'a CategoryRecord>, start: &'a CategoryRecord) -> Ancestry {
    let mut seen = HashSet::new();
    let mut current = start;

    loop {
        if !seen.insert(current.id.as_str()) {
            return Ancestry::Cycle;
        }
        let Some(parent) = current.parent() else {
            return Ancestry::Root;
        };
        match by_id.get(parent) {
            Some(next) => current = *next,
            None => return Ancestry::MissingParent(parent.to_string()),
        }
    }
}

/// Nest `records` under their parents. Roots and children keep the order
/// of `records`.
///
/// Records whose parent chain ends at a missing category are dropped with a
/// warning. Records that take part in, or hang below, a parent cycle fail
/// the whole build.
pub fn build_forest(records: &[CategoryRecord]) -> Result<Vec<CategoryNode>, TreeError> {
    let mut visited = HashSet::with_capacity(records.len());
    let forest = build_level(records, None, &mut visited)?;

    if visited.len() == records.len() {
        return Ok(forest);
    }

    let by_id: HashMap<&str, &CategoryRecord> =
        records.iter().map(|r| (r.id.as_str(), r)).collect();

    for record in records.iter().filter(|r| !visited.contains(r.id.as_str())) {
        match ancestry(&by_id, record) {
            Ancestry::MissingParent(parent) => {
                tracing::warn!(
                    id = %record.id,
                    missing_parent = %parent,
                    "dropping category with missing parent from the tree"
                );
            }
            Ancestry::Cycle | Ancestry::Root => {
                return Err(TreeError::CyclicHierarchy {
                    id: record.id.clone(),
                })
            }
        }
    }

    Ok(forest)
}

/// True when making `parent_id` the parent of `id` would close a cycle:
/// the parent is the category itself or one of its descendants.
pub fn creates_cycle(records: &[CategoryRecord], id: &str, parent_id: &str) -> bool {
    let by_id: HashMap<&str, &CategoryRecord> =
        records.iter().map(|r| (r.id.as_str(), r)).collect();

    let mut seen = HashSet::new();
    let mut current = Some(parent_id);

    while let Some(cur) = current {
        if cur == id {
            return true;
        }
        if !seen.insert(cur) {
            // Already cyclic above us; not something this edit introduces.
            return false;
        }
        current = by_id.get(cur).and_then(|r| r.parent());
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(id: &str, parent: Option<&str>) -> CategoryRecord {
        CategoryRecord {
            id: id.to_string(),
            name: id.to_uppercase(),
            images: vec![],
            color: None,
            slug: id.to_string(),
            parent_id: parent.map(|p| p.to_string()),
        }
    }

    fn ids(nodes: &[CategoryNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    fn depth_of(nodes: &[CategoryNode], id: &str, depth: usize) -> Option<usize> {
        nodes.iter().find_map(|n| {
            if n.id == id {
                Some(depth)
            } else {
                depth_of(&n.children, id, depth + 1)
            }
        })
    }

    fn count(nodes: &[CategoryNode]) -> usize {
        nodes.iter().map(|n| 1 + count(&n.children)).sum()
    }

    #[test]
    fn empty_input_gives_empty_forest() {
        assert_eq!(build_forest(&[]).unwrap(), vec![]);
    }

    #[test]
    fn child_is_nested_under_its_parent() {
        let forest = build_forest(&[cat("c1", None), cat("c2", Some("c1"))]).unwrap();

        assert_eq!(ids(&forest), vec!["c1"]);
        assert_eq!(ids(&forest[0].children), vec!["c2"]);
        assert!(forest[0].children[0].children.is_empty());
    }

    #[test]
    fn every_record_appears_once_at_its_chain_depth() {
        let records = vec![
            cat("b", Some("a")),
            cat("a", None),
            cat("d", Some("b")),
            cat("x", None),
            cat("c", Some("a")),
            cat("e", Some("d")),
            cat("y", Some("x")),
        ];
        let forest = build_forest(&records).unwrap();

        assert_eq!(count(&forest), records.len());
        for (id, depth) in [("a", 0), ("b", 1), ("c", 1), ("d", 2), ("e", 3), ("x", 0), ("y", 1)] {
            assert_eq!(depth_of(&forest, id, 0), Some(depth), "depth of {id}");
        }
    }

    #[test]
    fn siblings_keep_store_order() {
        let records = vec![
            cat("r", None),
            cat("z", Some("r")),
            cat("m", Some("r")),
            cat("a", Some("r")),
        ];
        let forest = build_forest(&records).unwrap();
        assert_eq!(ids(&forest[0].children), vec!["z", "m", "a"]);
    }

    #[test]
    fn empty_parent_id_is_a_root() {
        let forest = build_forest(&[cat("a", Some("")), cat("b", Some("  "))]).unwrap();
        assert_eq!(ids(&forest), vec!["a", "b"]);
    }

    #[test]
    fn parent_cycle_fails_instead_of_recursing() {
        let records = vec![cat("root", None), cat("a", Some("b")), cat("b", Some("a"))];
        assert_eq!(
            build_forest(&records),
            Err(TreeError::CyclicHierarchy { id: "a".into() })
        );
    }

    #[test]
    fn self_parent_is_a_cycle() {
        assert_eq!(
            build_forest(&[cat("a", Some("a"))]),
            Err(TreeError::CyclicHierarchy { id: "a".into() })
        );
    }

    #[test]
    fn revisited_id_is_rejected() {
        let records = vec![cat("a", None), cat("a", None)];
        assert_eq!(
            build_forest(&records),
            Err(TreeError::CyclicHierarchy { id: "a".into() })
        );
    }

    #[test]
    fn missing_parent_subtree_is_dropped() {
        let records = vec![
            cat("a", None),
            cat("orphan", Some("gone")),
            cat("under-orphan", Some("orphan")),
        ];
        let forest = build_forest(&records).unwrap();
        assert_eq!(ids(&forest), vec!["a"]);
        assert_eq!(count(&forest), 1);
    }

    #[test]
    fn reparenting_under_a_descendant_is_detected() {
        let records = vec![cat("a", None), cat("b", Some("a")), cat("c", Some("b"))];

        assert!(creates_cycle(&records, "a", "c"));
        assert!(creates_cycle(&records, "a", "a"));
        assert!(!creates_cycle(&records, "c", "a"));
        assert!(!creates_cycle(&records, "b", "unknown"));
    }

    #[test]
    fn nodes_serialize_without_parent_links() {
        let forest = build_forest(&[cat("c1", None)]).unwrap();
        let json = serde_json::to_value(&forest).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"id": "c1", "name": "C1", "images": [], "slug": "c1", "children": []}])
        );
    }
}
