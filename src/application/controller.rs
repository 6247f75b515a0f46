//! Data-form controller
//!
//! The collaborator between the editing UI (or CLI) and the two services.
//! It owns the command policies: commit/cancel of in-place edits, pre-checks
//! before moves and binding cleanup after nodes disappear.

use itertools::Itertools;
use tracing::{debug, instrument, warn};

use crate::application::services::{BindingService, DataSourceService};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    Binding, BindingRecord, BindingSheetInfo, DataFormDocument, DataType, DomainError, NodeId,
    NodeRecord, Position,
};

pub struct DataFormController {
    source: DataSourceService,
    bindings: BindingService,
    default_node_type: DataType,
}

impl Default for DataFormController {
    fn default() -> Self {
        Self::new(DataSourceService::new(), BindingService::default())
    }
}

impl DataFormController {
    pub fn new(source: DataSourceService, bindings: BindingService) -> Self {
        Self {
            source,
            bindings,
            default_node_type: DataType::Text,
        }
    }

    /// Type given to nodes created by the add-subnode/add-sibling commands.
    pub fn with_default_node_type(mut self, data_type: DataType) -> Self {
        self.default_node_type = data_type;
        self
    }

    /// Load a persisted definition, re-resolving binding paths to the fresh ids.
    #[instrument(level = "debug", skip(document), fields(nodes = document.nodes.len(), bindings = document.bindings.len()))]
    pub fn from_document(document: &DataFormDocument) -> ApplicationResult<Self> {
        let repeated = document
            .bindings
            .iter()
            .duplicates_by(|&b| b.name.as_str())
            .next();
        if let Some(dup) = repeated {
            return Err(DomainError::DuplicateBindingName(dup.name.clone()).into());
        }
        let source = DataSourceService::from_records(&document.nodes)?;
        let bindings = document
            .bindings
            .iter()
            .map(|record| -> ApplicationResult<Binding> {
                let node = source
                    .find_by_path(&record.node_path)
                    .ok_or_else(|| ApplicationError::DanglingBinding(record.node_path.join("/")))?;
                Ok(Binding {
                    name: record.name.clone(),
                    node_id: node.id.clone(),
                    unit_id: record.unit_id.clone(),
                    sub_unit_id: record.sub_unit_id.clone(),
                    range: record.range,
                })
            })
            .collect::<ApplicationResult<Vec<_>>>()?;
        Ok(Self::new(source, BindingService::new(bindings)))
    }

    /// Persistable form: records without ids, bindings addressed by path.
    pub fn to_document(&self) -> DataFormDocument {
        let nodes = self.source.to_records().into_iter().map(strip_ids).collect();
        let bindings = self
            .bindings
            .bindings()
            .iter()
            .filter_map(|binding| match self.source.path(&binding.node_id) {
                Some(node_path) => Some(BindingRecord {
                    name: binding.name.clone(),
                    node_path,
                    unit_id: binding.unit_id.clone(),
                    sub_unit_id: binding.sub_unit_id.clone(),
                    range: binding.range,
                }),
                None => {
                    warn!("skipping stale binding {}", binding.name);
                    None
                }
            })
            .collect();
        DataFormDocument { nodes, bindings }
    }

    pub fn source(&self) -> &DataSourceService {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut DataSourceService {
        &mut self.source
    }

    pub fn bindings(&self) -> &BindingService {
        &self.bindings
    }

    /// Remove a node and every binding that pointed into its subtree.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_node(&mut self, id: &NodeId) -> ApplicationResult<Vec<NodeId>> {
        let removed = self.source.remove_node(id)?;
        self.bindings.remove_bindings_for_nodes(&removed);
        Ok(removed)
    }

    /// Append an unnamed child to `parent` and put it into editing state.
    #[instrument(level = "debug", skip(self))]
    pub fn add_subnode(&mut self, parent: &NodeId) -> ApplicationResult<NodeId> {
        let node = self
            .source
            .get_by_id(parent)
            .ok_or_else(|| DomainError::NodeNotFound(parent.clone()))?;
        if !node.is_reference() {
            return Err(DomainError::NotAContainer(parent.clone()).into());
        }
        let record = NodeRecord::new("", self.default_node_type);
        let id = self.source.add_node(record, Some(parent), None, Position::Before)?;
        self.source.change_to_editing(&id)?;
        Ok(id)
    }

    pub fn add_previous_sibling(&mut self, anchor: &NodeId) -> ApplicationResult<NodeId> {
        self.add_sibling(anchor, Position::Before)
    }

    pub fn add_next_sibling(&mut self, anchor: &NodeId) -> ApplicationResult<NodeId> {
        self.add_sibling(anchor, Position::After)
    }

    #[instrument(level = "debug", skip(self))]
    fn add_sibling(&mut self, anchor: &NodeId, position: Position) -> ApplicationResult<NodeId> {
        if self.source.get_by_id(anchor).is_none() {
            return Err(DomainError::NodeNotFound(anchor.clone()).into());
        }
        let parent = self.source.parent(anchor).map(|p| p.id.clone());
        let record = NodeRecord::new("", self.default_node_type);
        let id = self
            .source
            .add_node(record, parent.as_ref(), Some(anchor), position)?;
        self.source.change_to_editing(&id)?;
        Ok(id)
    }

    /// Commit an in-place edit: validate, rename, leave editing state.
    #[instrument(level = "debug", skip(self))]
    pub fn edit_done(&mut self, id: &NodeId, new_name: &str) -> ApplicationResult<()> {
        self.source.rename(id, new_name)?;
        self.source.change_to_normal(id)
    }

    /// Abort an in-place edit. A node that never got a name is removed.
    #[instrument(level = "debug", skip(self))]
    pub fn edit_cancel(&mut self, id: &NodeId) -> ApplicationResult<()> {
        let node = self
            .source
            .get_by_id(id)
            .ok_or_else(|| DomainError::NodeNotFound(id.clone()))?;
        if node.name.is_empty() {
            debug!("edit_cancel: dropping unnamed node {}", id);
            self.remove_node(id)?;
            Ok(())
        } else {
            self.source.change_to_normal(id)
        }
    }

    /// Retype a node; bindings of nodes discarded by the conversion go with them.
    #[instrument(level = "debug", skip(self))]
    pub fn switch_node_type(
        &mut self,
        id: &NodeId,
        new_type: DataType,
    ) -> ApplicationResult<Vec<NodeId>> {
        let dropped = self.source.change_type(id, new_type)?;
        self.bindings.remove_bindings_for_nodes(&dropped);
        Ok(dropped)
    }

    /// Move nodes after checking the destination and the batch for name clashes.
    #[instrument(level = "debug", skip(self))]
    pub fn move_nodes(
        &mut self,
        ids: &[NodeId],
        index: usize,
        parent: Option<&NodeId>,
    ) -> ApplicationResult<()> {
        if let Some(clash) = self.source.get_move_duplicate(ids, parent)? {
            return Err(DomainError::DuplicateName {
                name: self.name_of(&clash),
            }
            .into());
        }
        if let Some(clash) = self.source.get_batch_duplicate(ids)? {
            return Err(DomainError::DuplicateInBatch {
                name: self.name_of(&clash),
            }
            .into());
        }
        self.source.move_nodes(ids, index, parent)
    }

    #[instrument(level = "debug", skip(self, info))]
    pub fn bind_node(&mut self, id: &NodeId, info: BindingSheetInfo) -> ApplicationResult<Binding> {
        let node = self
            .source
            .get_by_id(id)
            .ok_or_else(|| DomainError::NodeNotFound(id.clone()))?;
        self.bindings.bind_node(node, info)
    }

    pub fn unbind(&mut self, binding_name: &str) -> ApplicationResult<Binding> {
        self.bindings.unbind_by_name(binding_name)
    }

    pub fn get_bindings_by_node_id(&self, id: &NodeId) -> Vec<&Binding> {
        self.bindings.get_bindings_by_node_id(id)
    }

    fn name_of(&self, id: &NodeId) -> String {
        self.source
            .get_by_id(id)
            .map(|n| n.name.clone())
            .unwrap_or_default()
    }
}

fn strip_ids(mut record: NodeRecord) -> NodeRecord {
    record.id = None;
    record.children = record
        .children
        .map(|children| children.into_iter().map(strip_ids).collect());
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CellRange;

    fn controller() -> DataFormController {
        let records = vec![
            NodeRecord::new("ns", DataType::Namespace).with_children(vec![
                NodeRecord::new("tbl", DataType::Table)
                    .with_children(vec![NodeRecord::new("col", DataType::Text)]),
            ]),
            NodeRecord::new("field1", DataType::Number),
        ];
        DataFormController::new(
            DataSourceService::from_records(&records).unwrap(),
            BindingService::default(),
        )
    }

    fn id(c: &DataFormController, path: &[&str]) -> NodeId {
        c.source().find_by_path(path).unwrap().id.clone()
    }

    fn info() -> BindingSheetInfo {
        BindingSheetInfo {
            unit_id: "u".into(),
            sub_unit_id: "s".into(),
            range: CellRange {
                start_row: 0,
                start_column: 0,
                end_row: 9,
                end_column: 0,
            },
        }
    }

    #[test]
    fn test_add_subnode_starts_editing_unnamed_text() {
        let mut c = controller();
        let tbl = id(&c, &["ns", "tbl"]);
        let new_id = c.add_subnode(&tbl).unwrap();

        let node = c.source().get_by_id(&new_id).unwrap();
        assert_eq!(node.name, "");
        assert_eq!(node.data_type(), DataType::Text);
        assert!(node.editing);
        assert!(c.source().is_editing());
    }

    #[test]
    fn test_add_subnode_on_leaf_fails() {
        let mut c = controller();
        let leaf = id(&c, &["field1"]);
        assert!(c.add_subnode(&leaf).is_err());
    }

    #[test]
    fn test_add_next_sibling_lands_after_anchor() {
        let mut c = controller();
        let ns = id(&c, &["ns"]);
        let new_id = c.add_next_sibling(&ns).unwrap();
        assert_eq!(c.source().get_nodes()[1].id, new_id);
    }

    #[test]
    fn test_edit_cancel_removes_never_named_node() {
        let mut c = controller();
        let ns = id(&c, &["ns"]);
        let new_id = c.add_subnode(&ns).unwrap();
        c.edit_cancel(&new_id).unwrap();
        assert!(c.source().get_by_id(&new_id).is_none());
        assert!(!c.source().is_editing());
    }

    #[test]
    fn test_edit_cancel_keeps_named_node() {
        let mut c = controller();
        let col = id(&c, &["ns", "tbl", "col"]);
        c.source_mut().change_to_editing(&col).unwrap();
        c.edit_cancel(&col).unwrap();
        let node = c.source().get_by_id(&col).unwrap();
        assert_eq!(node.name, "col");
        assert!(!node.editing);
    }

    #[test]
    fn test_edit_done_rejects_and_keeps_editing() {
        let mut c = controller();
        let ns = id(&c, &["ns"]);
        let new_id = c.add_previous_sibling(&ns).unwrap();

        let err = c.edit_done(&new_id, "ns").unwrap_err();
        assert!(err.is_validation());
        assert!(c.source().get_by_id(&new_id).unwrap().editing);

        c.edit_done(&new_id, "ns2").unwrap();
        let node = c.source().get_by_id(&new_id).unwrap();
        assert_eq!(node.name, "ns2");
        assert!(!node.editing);
    }

    #[test]
    fn test_remove_cascades_bindings_of_descendants() {
        let mut c = controller();
        let col = id(&c, &["ns", "tbl", "col"]);
        let field = id(&c, &["field1"]);
        c.bind_node(&col, info()).unwrap();
        c.bind_node(&field, info()).unwrap();

        let ns = id(&c, &["ns"]);
        c.remove_node(&ns).unwrap();
        assert!(c.get_bindings_by_node_id(&col).is_empty());
        assert_eq!(c.bindings().bindings().len(), 1);
    }

    #[test]
    fn test_switch_type_cascades_bindings_of_dropped_children() {
        let mut c = controller();
        let col = id(&c, &["ns", "tbl", "col"]);
        c.bind_node(&col, info()).unwrap();

        let ns = id(&c, &["ns"]);
        let dropped = c.switch_node_type(&ns, DataType::Table).unwrap();
        assert_eq!(dropped.len(), 2);
        assert!(c.bindings().bindings().is_empty());
    }

    #[test]
    fn test_document_round_trip_keeps_bindings_on_paths() {
        let mut c = controller();
        let col = id(&c, &["ns", "tbl", "col"]);
        c.bind_node(&col, info()).unwrap();

        let doc = c.to_document();
        assert_eq!(doc.bindings[0].node_path, ["ns", "tbl", "col"]);
        assert!(doc.nodes.iter().all(|n| n.id.is_none()));

        let reloaded = DataFormController::from_document(&doc).unwrap();
        let new_col = id(&reloaded, &["ns", "tbl", "col"]);
        assert_ne!(new_col, col);
        assert_eq!(reloaded.get_bindings_by_node_id(&new_col).len(), 1);
    }

    #[test]
    fn test_document_with_dangling_binding_fails() {
        let doc = DataFormDocument {
            nodes: vec![],
            bindings: vec![BindingRecord {
                name: "x".into(),
                node_path: vec!["missing".into()],
                unit_id: "u".into(),
                sub_unit_id: "s".into(),
                range: info().range,
            }],
        };
        assert!(matches!(
            DataFormController::from_document(&doc),
            Err(ApplicationError::DanglingBinding(_))
        ));
    }
}
