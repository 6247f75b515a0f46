//! Tree builder: turns plain nested records into a normalized arena forest.

use std::collections::HashSet;

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::domain::arena::{DataNode, TreeArena};
use crate::domain::entities::{DataType, NodeRecord};
use crate::domain::error::DomainError;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

/// Constructs data-source forests from externally supplied definitions.
///
/// Every record becomes a [`DataNode`] with an id, a child list matching its type
/// and a parent link. Records that would break sibling uniqueness or put a
/// container inside a Table are rejected.
pub struct TreeBuilder {
    force_ids: bool,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    /// Builder for freshly loaded trees: ids are always reassigned.
    pub fn new() -> Self {
        Self { force_ids: true }
    }

    /// Keep ids present on the records, generating only the missing ones.
    pub fn keep_ids(mut self) -> Self {
        self.force_ids = false;
        self
    }

    /// Build a new forest from `records`.
    #[instrument(level = "debug", skip(self, records), fields(roots = records.len()))]
    pub fn build(&self, records: &[NodeRecord]) -> TreeResult<TreeArena> {
        let mut tree = TreeArena::new();
        self.insert_all(&mut tree, records, None)?;
        debug!("build: {} nodes", tree.len());
        Ok(tree)
    }

    /// Check that `records` could be inserted under `parent` in `tree`
    /// without violating any invariant.
    pub fn validate(
        &self,
        tree: &TreeArena,
        records: &[NodeRecord],
        parent: Option<Index>,
    ) -> TreeResult<()> {
        let parent = container_of(tree, parent);
        let mut taken: HashSet<&str> = tree
            .children_of(parent)
            .iter()
            .filter_map(|&i| tree.get_node(i))
            .map(|n| n.name.as_str())
            .filter(|name| !name.is_empty())
            .collect();
        let container = parent.and_then(|p| tree.get_node(p)).map(|n| n.data_type());

        Self::validate_group(records, &mut taken, container)
    }

    fn validate_group<'a>(
        records: &'a [NodeRecord],
        taken: &mut HashSet<&'a str>,
        container: Option<DataType>,
    ) -> TreeResult<()> {
        for record in records {
            if let Some(container) = container {
                if !record.data_type.fits_into(container) {
                    return Err(DomainError::InvalidContainer {
                        container,
                        child: record.data_type,
                    });
                }
            }
            if !record.name.is_empty() && !taken.insert(record.name.as_str()) {
                return Err(DomainError::DuplicateName {
                    name: record.name.clone(),
                });
            }
            if record.data_type.is_reference() {
                let children = record.children.as_deref().unwrap_or_default();
                Self::validate_group(children, &mut HashSet::new(), Some(record.data_type))?;
            }
        }
        Ok(())
    }

    /// Validate, then insert `records` into `tree` under `parent` starting at `at`.
    /// Returns the indices of the inserted top-level nodes; `tree` is untouched on error.
    pub(crate) fn insert_all(
        &self,
        tree: &mut TreeArena,
        records: &[NodeRecord],
        parent: Option<Index>,
    ) -> TreeResult<Vec<Index>> {
        self.validate(tree, records, parent)?;
        Ok(self.insert_unchecked(tree, records, parent, None))
    }

    pub(crate) fn insert_at(
        &self,
        tree: &mut TreeArena,
        record: &NodeRecord,
        parent: Option<Index>,
        at: usize,
    ) -> TreeResult<Index> {
        self.validate(tree, std::slice::from_ref(record), parent)?;
        let inserted = self.insert_unchecked(tree, std::slice::from_ref(record), parent, Some(at));
        Ok(inserted[0])
    }

    fn insert_unchecked(
        &self,
        tree: &mut TreeArena,
        records: &[NodeRecord],
        parent: Option<Index>,
        at: Option<usize>,
    ) -> Vec<Index> {
        let parent = container_of(tree, parent);
        let mut inserted = Vec::with_capacity(records.len());
        for (offset, record) in records.iter().enumerate() {
            let node = DataNode::from_record(record, self.force_ids);
            let idx = tree.insert_node(node, parent, at.map(|a| a + offset));
            if record.data_type.is_reference() {
                let children = record.children.as_deref().unwrap_or_default();
                self.insert_unchecked(tree, children, Some(idx), None);
            }
            inserted.push(idx);
        }
        inserted
    }
}

/// A leaf "parent" counts as no parent at all.
fn container_of(tree: &TreeArena, parent: Option<Index>) -> Option<Index> {
    parent.filter(|&p| tree.get_node(p).is_some_and(|n| n.is_reference()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::NodeId;

    #[test]
    fn test_build_wires_parents_and_children() {
        let records = vec![NodeRecord::new("ns", DataType::Namespace).with_children(vec![
            NodeRecord::new("tbl", DataType::Table)
                .with_children(vec![NodeRecord::new("c", DataType::Text)]),
        ])];
        let tree = TreeBuilder::new().build(&records).unwrap();

        assert_eq!(tree.len(), 3);
        for (idx, node) in tree.iter() {
            if let Some(parent) = node.parent {
                let siblings = tree.get_node(parent).unwrap().children();
                assert_eq!(siblings.iter().filter(|&&i| i == idx).count(), 1);
            } else {
                assert!(tree.roots().contains(&idx));
            }
        }
    }

    #[test]
    fn test_build_drops_children_of_leaf_records() {
        let records = vec![NodeRecord::new("c", DataType::Text)
            .with_children(vec![NodeRecord::new("x", DataType::Text)])];
        let tree = TreeBuilder::new().build(&records).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.to_records()[0].children, None);
    }

    #[test]
    fn test_build_gives_containers_an_empty_child_list() {
        let records = vec![NodeRecord::new("ns", DataType::Namespace)];
        let tree = TreeBuilder::new().build(&records).unwrap();
        assert_eq!(tree.to_records()[0].children, Some(vec![]));
    }

    #[test]
    fn test_force_ids_reassigns() {
        let mut record = NodeRecord::new("c", DataType::Text);
        record.id = Some(NodeId::from("fixed"));

        let forced = TreeBuilder::new().build(std::slice::from_ref(&record)).unwrap();
        assert!(forced.get_by_id(&NodeId::from("fixed")).is_none());

        let kept = TreeBuilder::new().keep_ids().build(&[record]).unwrap();
        assert!(kept.get_by_id(&NodeId::from("fixed")).is_some());
    }

    #[test]
    fn test_build_rejects_duplicate_siblings() {
        let records = vec![
            NodeRecord::new("a", DataType::Text),
            NodeRecord::new("a", DataType::Number),
        ];
        let err = TreeBuilder::new().build(&records).unwrap_err();
        assert_eq!(err, DomainError::DuplicateName { name: "a".into() });
    }

    #[test]
    fn test_build_rejects_table_in_table() {
        let records = vec![NodeRecord::new("t", DataType::Table)
            .with_children(vec![NodeRecord::new("inner", DataType::Table)])];
        let err = TreeBuilder::new().build(&records).unwrap_err();
        assert!(matches!(err, DomainError::InvalidContainer { .. }));
    }
}
