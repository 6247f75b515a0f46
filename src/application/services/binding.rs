//! Binding service: binds tree nodes to spreadsheet ranges

use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    Binding, BindingRegistry, BindingSheetInfo, DataNode, DomainError, NodeId, TreeArena,
};

/// Service owning the binding registry.
#[derive(Debug, Default)]
pub struct BindingService {
    registry: BindingRegistry,
}

impl BindingService {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self {
            registry: BindingRegistry::new(bindings),
        }
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    pub fn bindings(&self) -> &[Binding] {
        self.registry.bindings()
    }

    pub fn set_bindings(&mut self, bindings: Vec<Binding>) {
        self.registry.set_bindings(bindings);
    }

    /// Bind `node` to a sheet range under a freshly generated, unique binding name.
    #[instrument(level = "debug", skip(self, node), fields(node = %node.id))]
    pub fn bind_node(
        &mut self,
        node: &DataNode,
        info: BindingSheetInfo,
    ) -> ApplicationResult<Binding> {
        if node.name.is_empty() {
            return Err(DomainError::EmptyName.into());
        }
        let binding = Binding {
            name: self.gen_binding_name(node),
            node_id: node.id.clone(),
            unit_id: info.unit_id,
            sub_unit_id: info.sub_unit_id,
            range: info.range,
        };
        debug!("bind_node: {} -> {}", binding.name, binding.range);
        self.registry.add_binding(binding.clone());
        Ok(binding)
    }

    pub fn unbind_node(&mut self, binding: &Binding) -> bool {
        self.registry.remove_binding(binding)
    }

    pub fn unbind_by_name(&mut self, name: &str) -> ApplicationResult<Binding> {
        self.registry
            .remove_binding_by_name(name)
            .ok_or_else(|| ApplicationError::BindingNotFound(name.to_string()))
    }

    pub fn get_bindings_by_node_id(&self, node_id: &NodeId) -> Vec<&Binding> {
        self.registry.get_bindings_by_node_id(node_id)
    }

    pub fn remove_bindings_by_node_id(&mut self, node_id: &NodeId) -> usize {
        self.registry.remove_bindings_by_node_id(node_id)
    }

    /// Cascade cleanup after nodes were deleted from the tree.
    #[instrument(level = "debug", skip(self, node_ids), fields(nodes = node_ids.len()))]
    pub fn remove_bindings_for_nodes(&mut self, node_ids: &[NodeId]) -> usize {
        let removed: usize = node_ids
            .iter()
            .map(|id| self.registry.remove_bindings_by_node_id(id))
            .sum();
        debug!("remove_bindings_for_nodes: {} bindings removed", removed);
        removed
    }

    /// Drop bindings whose node is no longer in `tree`.
    pub fn purge_missing(&mut self, tree: &TreeArena) -> Vec<Binding> {
        self.registry.retain_nodes(|id| tree.index_of(id).is_some())
    }

    /// Node name for the first binding, then the name suffixed with the number of
    /// existing bindings, counting up until no binding uses it.
    fn gen_binding_name(&self, node: &DataNode) -> String {
        let mut seq = self.registry.get_bindings_by_node_id(&node.id).len();
        loop {
            let candidate = if seq == 0 {
                node.name.clone()
            } else {
                format!("{}{}", node.name, seq)
            };
            if !self.registry.is_name_taken(&candidate) {
                return candidate;
            }
            seq += 1;
        }
    }
}
