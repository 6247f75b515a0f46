//! Binding registry: node-to-range associations keyed by node id

use crate::domain::entities::{Binding, NodeId};

/// Ordered list of bindings.
///
/// Holds node ids only; a binding whose node was deleted is simply stale until
/// [`BindingRegistry::remove_bindings_by_node_id`] purges it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingRegistry {
    bindings: Vec<Binding>,
}

impl BindingRegistry {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    pub fn set_bindings(&mut self, bindings: Vec<Binding>) {
        self.bindings = bindings;
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn add_binding(&mut self, binding: Binding) {
        self.bindings.push(binding);
    }

    /// Remove the binding with the same name. Returns whether one was removed.
    pub fn remove_binding(&mut self, binding: &Binding) -> bool {
        self.remove_binding_by_name(&binding.name).is_some()
    }

    pub fn remove_binding_by_name(&mut self, name: &str) -> Option<Binding> {
        let pos = self.bindings.iter().position(|b| b.name == name)?;
        Some(self.bindings.remove(pos))
    }

    /// Drop every binding of `node_id`, returning how many were removed.
    pub fn remove_bindings_by_node_id(&mut self, node_id: &NodeId) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|b| &b.node_id != node_id);
        before - self.bindings.len()
    }

    pub fn get_bindings_by_node_id(&self, node_id: &NodeId) -> Vec<&Binding> {
        self.bindings
            .iter()
            .filter(|b| &b.node_id == node_id)
            .collect()
    }

    pub fn get_binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    pub fn is_name_taken(&self, name: &str) -> bool {
        self.get_binding(name).is_some()
    }

    /// Keep only bindings whose node still satisfies `exists`. Returns the removed ones.
    pub fn retain_nodes(&mut self, mut exists: impl FnMut(&NodeId) -> bool) -> Vec<Binding> {
        let (kept, dropped) = std::mem::take(&mut self.bindings)
            .into_iter()
            .partition(|b| exists(&b.node_id));
        self.bindings = kept;
        dropped
    }
}
