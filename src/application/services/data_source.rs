//! Data-source service
//!
//! Owns the node forest and is its only writer: every structural edit goes
//! through here, gets validated before anything is touched, and publishes a
//! fresh snapshot once it succeeded.

use std::collections::HashSet;
use std::sync::Arc;

use generational_arena::Index;
use itertools::Itertools;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::application::ApplicationResult;
use crate::domain::{
    DataNode, DataType, DomainError, NodeId, NodeKind, NodeRecord, Position, TreeArena,
    TreeBuilder,
};

/// Consistent, immutable view of the forest handed to subscribers.
pub type Snapshot = Arc<TreeArena>;

/// Mutation engine over the data-source forest.
///
/// Not reentrant: callers serialize mutations (the UI command pipeline does).
pub struct DataSourceService {
    tree: TreeArena,
    nodes_tx: watch::Sender<Snapshot>,
}

impl Default for DataSourceService {
    fn default() -> Self {
        Self::new()
    }
}

fn reject<T>(err: DomainError) -> ApplicationResult<T> {
    warn!("rejected: {}", err);
    Err(err.into())
}

impl DataSourceService {
    pub fn new() -> Self {
        Self::with_tree(TreeArena::new())
    }

    /// Service over a forest normalized from plain records (ids are reassigned).
    pub fn from_records(records: &[NodeRecord]) -> ApplicationResult<Self> {
        let tree = TreeBuilder::new().build(records)?;
        Ok(Self::with_tree(tree))
    }

    fn with_tree(tree: TreeArena) -> Self {
        let (nodes_tx, _) = watch::channel(Arc::new(tree.clone()));
        Self { tree, nodes_tx }
    }

    /// Receiver that always holds the latest snapshot, including the current one
    /// at subscription time.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.nodes_tx.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.nodes_tx.borrow().clone()
    }

    fn notify(&self) {
        self.nodes_tx.send_replace(Arc::new(self.tree.clone()));
    }

    /// Read access to the whole store.
    pub fn tree(&self) -> &TreeArena {
        &self.tree
    }

    /// Root nodes in order.
    pub fn get_nodes(&self) -> Vec<&DataNode> {
        self.tree
            .roots()
            .iter()
            .filter_map(|&idx| self.tree.get_node(idx))
            .collect()
    }

    pub fn get_by_id(&self, id: &NodeId) -> Option<&DataNode> {
        self.tree.get_by_id(id)
    }

    pub fn children(&self, id: &NodeId) -> Vec<&DataNode> {
        match self.tree.get_by_id(id) {
            Some(node) => node
                .children()
                .iter()
                .filter_map(|&idx| self.tree.get_node(idx))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn parent(&self, id: &NodeId) -> Option<&DataNode> {
        self.tree
            .get_by_id(id)
            .and_then(|n| n.parent)
            .and_then(|p| self.tree.get_node(p))
    }

    /// Name path from the root to the node, derived from the current tree.
    pub fn path(&self, id: &NodeId) -> Option<Vec<String>> {
        self.tree.index_of(id).map(|idx| self.tree.path(idx))
    }

    pub fn find_by_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&DataNode> {
        self.tree
            .find_by_path(path)
            .and_then(|idx| self.tree.get_node(idx))
    }

    /// Replace the whole forest with a definition loaded from outside.
    #[instrument(level = "debug", skip(self, records))]
    pub fn set_nodes(&mut self, records: &[NodeRecord]) -> ApplicationResult<()> {
        let tree = TreeBuilder::new().build(records)?;
        self.set_tree(tree);
        Ok(())
    }

    /// Swap in an already built forest.
    pub fn set_tree(&mut self, tree: TreeArena) {
        self.tree = tree;
        self.notify();
    }

    /// Forest as plain records, without parent links.
    pub fn to_records(&self) -> Vec<NodeRecord> {
        self.tree.to_records()
    }

    fn resolve(&self, id: &NodeId) -> Result<Index, DomainError> {
        self.tree
            .index_of(id)
            .ok_or_else(|| DomainError::NodeNotFound(id.clone()))
    }

    fn node_at(&self, idx: Index) -> Result<&DataNode, DomainError> {
        self.tree
            .get_node(idx)
            .ok_or_else(|| DomainError::StaleIndex(format!("{:?}", idx)))
    }

    fn node_at_mut(&mut self, idx: Index) -> Result<&mut DataNode, DomainError> {
        self.tree
            .get_node_mut(idx)
            .ok_or_else(|| DomainError::StaleIndex(format!("{:?}", idx)))
    }

    // ---------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------

    /// Create a node from `record` inside `parent` (root list if none, or if
    /// `parent` is a leaf), before or after `anchor`, or appended at the end.
    ///
    /// Empty names are accepted for nodes that are about to be named by the user.
    #[instrument(level = "debug", skip(self, record), fields(name = %record.name, data_type = %record.data_type))]
    pub fn add_node(
        &mut self,
        record: NodeRecord,
        parent: Option<&NodeId>,
        anchor: Option<&NodeId>,
        position: Position,
    ) -> ApplicationResult<NodeId> {
        let parent_idx = match parent {
            Some(id) => Some(self.resolve(id)?),
            None => None,
        }
        .filter(|&p| self.tree.get_node(p).is_some_and(|n| n.is_reference()));

        if let Some(taken) = self.first_id_in_use(&record) {
            return reject(DomainError::IdInUse(taken));
        }

        let group = self.tree.children_of(parent_idx);
        let mut insert_at = match anchor {
            Some(anchor_id) => {
                let anchor_idx = self.resolve(anchor_id)?;
                match group.iter().position(|&i| i == anchor_idx) {
                    Some(pos) => pos,
                    None => {
                        return reject(DomainError::AnchorNotInGroup {
                            anchor: anchor_id.clone(),
                        })
                    }
                }
            }
            None => group.len(),
        };
        if position == Position::After {
            insert_at += 1;
        }

        let idx = match TreeBuilder::new()
            .keep_ids()
            .insert_at(&mut self.tree, &record, parent_idx, insert_at)
        {
            Ok(idx) => idx,
            Err(e) => return reject(e),
        };
        let id = self.node_at(idx)?.id.clone();
        debug!("add_node: {} at {}", id, insert_at);
        self.notify();
        Ok(id)
    }

    /// First id in `record` that is already live or repeats inside the record.
    fn first_id_in_use(&self, record: &NodeRecord) -> Option<NodeId> {
        let mut seen = HashSet::new();
        let mut stack = vec![record];
        while let Some(current) = stack.pop() {
            if let Some(id) = &current.id {
                if self.tree.index_of(id).is_some() || !seen.insert(id) {
                    return Some(id.clone());
                }
            }
            stack.extend(current.children.as_deref().unwrap_or_default().iter());
        }
        None
    }

    /// Detach the node from its sibling group and drop it with its descendants.
    ///
    /// Returns the ids of every removed node. Bindings are not touched here;
    /// cleaning them up is the caller's job.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_node(&mut self, id: &NodeId) -> ApplicationResult<Vec<NodeId>> {
        let idx = self.resolve(id)?;
        let removed = self.tree.remove_subtree(idx);
        debug!("remove_node: {} nodes removed", removed.len());
        self.notify();
        Ok(removed)
    }

    /// Rename a node. Empty and sibling-duplicate names are rejected.
    #[instrument(level = "debug", skip(self))]
    pub fn rename(&mut self, id: &NodeId, new_name: &str) -> ApplicationResult<()> {
        let idx = self.resolve(id)?;
        if new_name.trim().is_empty() {
            return reject(DomainError::EmptyName);
        }
        if self.is_duplicated(id, new_name) {
            return reject(DomainError::DuplicateName {
                name: new_name.to_string(),
            });
        }
        self.node_at_mut(idx)?.name = new_name.to_string();
        self.notify();
        Ok(())
    }

    /// Switch the node's type in place and reshape its child list to match.
    ///
    /// Turning a container into a leaf drops all children; Namespace -> Table drops
    /// the Namespace/Table children. Dropped nodes are gone for good, their ids
    /// (descendants included) are returned.
    #[instrument(level = "debug", skip(self))]
    pub fn change_type(
        &mut self,
        id: &NodeId,
        new_type: DataType,
    ) -> ApplicationResult<Vec<NodeId>> {
        let idx = self.resolve(id)?;
        let node = self.node_at(idx)?;
        let old_type = node.data_type();
        if old_type == new_type {
            return Ok(Vec::new());
        }
        if let Some(parent) = node.parent {
            let container = self.node_at(parent)?.data_type();
            if !new_type.fits_into(container) {
                return reject(DomainError::InvalidContainer {
                    container,
                    child: new_type,
                });
            }
        }

        let old_kind = std::mem::replace(&mut self.node_at_mut(idx)?.kind, NodeKind::empty(new_type));
        let old_children = old_kind.children().map(<[Index]>::to_vec).unwrap_or_default();

        let (kept, discarded): (Vec<Index>, Vec<Index>) = old_children.into_iter().partition(|&c| {
            self.tree
                .get_node(c)
                .is_some_and(|child| child.data_type().fits_into(new_type))
        });
        if let Some(children) = self.node_at_mut(idx)?.kind.children_mut() {
            *children = kept;
        }

        let mut dropped = Vec::new();
        for child in discarded {
            dropped.extend(self.tree.free_subtree(child));
        }
        debug!(
            "change_type: {} -> {}, {} nodes dropped",
            old_type,
            new_type,
            dropped.len()
        );
        self.notify();
        Ok(dropped)
    }

    /// Move a batch of nodes, keeping their relative order, into `parent`'s child
    /// list (root list if none) at `index`.
    ///
    /// Name collisions are not checked here; run [`Self::get_move_duplicate`] and
    /// [`Self::get_batch_duplicate`] first. Structural problems (leaf target, Table
    /// receiving a container, moving a node below itself) are rejected before
    /// anything moves.
    #[instrument(level = "debug", skip(self))]
    pub fn move_nodes(
        &mut self,
        ids: &[NodeId],
        index: usize,
        parent: Option<&NodeId>,
    ) -> ApplicationResult<()> {
        let target = match parent {
            Some(id) => {
                let idx = self.resolve(id)?;
                if !self.node_at(idx)?.is_reference() {
                    return reject(DomainError::NotAContainer(id.clone()));
                }
                Some(idx)
            }
            None => None,
        };
        let container = match target {
            Some(t) => Some(self.node_at(t)?.data_type()),
            None => None,
        };

        let mut moving = Vec::with_capacity(ids.len());
        for id in ids {
            let idx = self.resolve(id)?;
            if moving.contains(&idx) {
                return reject(DomainError::RepeatedNode(id.clone()));
            }
            if let Some(t) = target {
                if self.tree.is_ancestor_or_self(idx, t) {
                    return reject(DomainError::MoveIntoDescendant(id.clone()));
                }
            }
            if let Some(container) = container {
                let child = self.node_at(idx)?.data_type();
                if !child.fits_into(container) {
                    return reject(DomainError::InvalidContainer { container, child });
                }
            }
            moving.push(idx);
        }

        // Walk backwards inserting at the same slot so the batch keeps its order.
        let mut insert_index = index;
        for &idx in moving.iter().rev() {
            if self.node_at(idx)?.parent == target {
                if let Some(old) = self.tree.position_in_group(idx) {
                    if old < index {
                        insert_index = insert_index.saturating_sub(1);
                    }
                }
            }
            self.tree.detach(idx);
            self.tree.attach(idx, target, insert_index);
        }
        debug!("move_nodes: {} nodes to index {}", moving.len(), index);
        self.notify();
        Ok(())
    }

    // ---------------------------------------------------------------
    // Duplicate validation
    // ---------------------------------------------------------------

    /// True if another node in `id`'s sibling group is already called `candidate`.
    pub fn is_duplicated(&self, id: &NodeId, candidate: &str) -> bool {
        let Some(idx) = self.tree.index_of(id) else {
            return false;
        };
        self.tree.siblings(idx).iter().any(|&other| {
            other != idx
                && self
                    .tree
                    .get_node(other)
                    .is_some_and(|n| n.name == candidate)
        })
    }

    /// First node of the batch whose name is already used by a node that stays in
    /// the destination group.
    pub fn get_move_duplicate(
        &self,
        ids: &[NodeId],
        parent: Option<&NodeId>,
    ) -> ApplicationResult<Option<NodeId>> {
        let target = match parent {
            Some(id) => Some(self.resolve(id)?),
            None => None,
        };
        let moving = ids
            .iter()
            .map(|id| self.resolve(id))
            .collect::<Result<Vec<_>, _>>()?;

        let staying: Vec<&str> = self
            .tree
            .children_of(target)
            .iter()
            .filter(|&&idx| !moving.contains(&idx))
            .filter_map(|&idx| self.tree.get_node(idx))
            .map(|n| n.name.as_str())
            .collect();

        for (id, &idx) in ids.iter().zip(&moving) {
            let name = self.node_at(idx)?.name.as_str();
            if staying.contains(&name) {
                return Ok(Some(id.clone()));
            }
        }
        Ok(None)
    }

    /// A node of the batch that shares its name with an earlier node of the batch.
    pub fn get_batch_duplicate(&self, ids: &[NodeId]) -> ApplicationResult<Option<NodeId>> {
        let named = ids
            .iter()
            .map(|id| {
                let idx = self.resolve(id)?;
                Ok((id, self.node_at(idx)?.name.as_str()))
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        Ok(named
            .into_iter()
            .duplicates_by(|&(_, name)| name)
            .next()
            .map(|(id, _)| id.clone()))
    }

    // ---------------------------------------------------------------
    // Editing state
    // ---------------------------------------------------------------

    /// Mark the node as being renamed in place.
    pub fn change_to_editing(&mut self, id: &NodeId) -> ApplicationResult<()> {
        self.set_editing(id, true)
    }

    /// Leave in-place editing without touching the name.
    pub fn change_to_normal(&mut self, id: &NodeId) -> ApplicationResult<()> {
        self.set_editing(id, false)
    }

    /// True while any node of the forest is being edited.
    pub fn is_editing(&self) -> bool {
        self.tree.iter().any(|(_, node)| node.editing)
    }

    #[instrument(level = "trace", skip(self))]
    fn set_editing(&mut self, id: &NodeId, editing: bool) -> ApplicationResult<()> {
        let idx = self.resolve(id)?;
        let node = self.node_at(idx)?;
        if node.editing == editing {
            return Ok(());
        }
        let mut copy = node.clone();
        copy.editing = editing;
        self.tree
            .replace_node(idx, copy)
            .ok_or_else(|| DomainError::NodeNotFound(id.clone()))?;
        self.notify();
        Ok(())
    }
}
