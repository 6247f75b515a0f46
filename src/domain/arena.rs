use generational_arena::{Arena, Index};
use std::fmt;
use tracing::instrument;

use crate::domain::entities::{DataType, NodeId, NodeRecord};

/// Node kind with its per-variant payload.
///
/// Only the container variants carry a child list, so a leaf can never own children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Namespace { children: Vec<Index> },
    Table { children: Vec<Index> },
    Text,
    Date,
    Number,
}

impl NodeKind {
    /// Fresh kind for `data_type`, with an empty child list for containers.
    pub fn empty(data_type: DataType) -> Self {
        match data_type {
            DataType::Namespace => NodeKind::Namespace {
                children: Vec::new(),
            },
            DataType::Table => NodeKind::Table {
                children: Vec::new(),
            },
            DataType::Text => NodeKind::Text,
            DataType::Date => NodeKind::Date,
            DataType::Number => NodeKind::Number,
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            NodeKind::Namespace { .. } => DataType::Namespace,
            NodeKind::Table { .. } => DataType::Table,
            NodeKind::Text => DataType::Text,
            NodeKind::Date => DataType::Date,
            NodeKind::Number => DataType::Number,
        }
    }

    pub fn children(&self) -> Option<&[Index]> {
        match self {
            NodeKind::Namespace { children } | NodeKind::Table { children } => Some(children),
            NodeKind::Text | NodeKind::Date | NodeKind::Number => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<Index>> {
        match self {
            NodeKind::Namespace { children } | NodeKind::Table { children } => Some(children),
            NodeKind::Text | NodeKind::Date | NodeKind::Number => None,
        }
    }
}

/// Tree node in the arena-based data-source forest.
///
/// `Clone` is a shallow copy: the copy points at the same parent and child slots.
/// Use [`TreeArena::deep_clone`] for a recursive copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataNode {
    pub id: NodeId,
    /// Label, unique among siblings (empty while a new node awaits its name)
    pub name: String,
    pub kind: NodeKind,
    /// Index of the owning container, None for root nodes
    pub parent: Option<Index>,
    /// In-place name editing in progress
    pub editing: bool,
}

impl DataNode {
    /// Build a detached node from a record: keeps the record's id unless
    /// `force_id` is set or it has none, and normalizes the child list to the type.
    /// Children of the record are not converted here.
    pub fn from_record(record: &NodeRecord, force_id: bool) -> Self {
        let id = match (&record.id, force_id) {
            (Some(id), false) => id.clone(),
            _ => NodeId::generate(),
        };
        Self {
            id,
            name: record.name.clone(),
            kind: NodeKind::empty(record.data_type),
            parent: None,
            editing: false,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.kind.data_type()
    }

    pub fn is_reference(&self) -> bool {
        self.data_type().is_reference()
    }

    pub fn is_table(&self) -> bool {
        matches!(self.kind, NodeKind::Table { .. })
    }

    pub fn is_namespace(&self) -> bool {
        matches!(self.kind, NodeKind::Namespace { .. })
    }

    /// Child slots, empty for leaves.
    pub fn children(&self) -> &[Index] {
        self.kind.children().unwrap_or_default()
    }

    pub fn have_children(&self) -> bool {
        !self.children().is_empty()
    }
}

impl fmt::Display for DataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "<unnamed> ({})", self.data_type())
        } else {
            write!(f, "{} ({})", self.name, self.data_type())
        }
    }
}

/// Arena-based forest of data-source nodes.
///
/// The arena owns every node; parent links are plain indices into it, and the
/// ordered root list plus each container's child list define the shape.
/// Mutating methods are crate-internal: `DataSourceService` is the only writer.
#[derive(Debug, Clone)]
pub struct TreeArena {
    /// Arena storage for all tree nodes
    arena: Arena<DataNode>,
    /// Top-level nodes in display order
    roots: Vec<Index>,
}

impl Default for TreeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            roots: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node(&self, idx: Index) -> Option<&DataNode> {
        self.arena.get(idx)
    }

    pub(crate) fn get_node_mut(&mut self, idx: Index) -> Option<&mut DataNode> {
        self.arena.get_mut(idx)
    }

    /// Depth-first lookup by id. Absence is a normal outcome.
    #[instrument(level = "trace", skip(self))]
    pub fn index_of(&self, id: &NodeId) -> Option<Index> {
        self.iter().find(|(_, node)| &node.id == id).map(|(idx, _)| idx)
    }

    pub fn get_by_id(&self, id: &NodeId) -> Option<&DataNode> {
        self.index_of(id).and_then(|idx| self.get_node(idx))
    }

    /// The sibling group `idx` belongs to (parent's children or the root list).
    pub fn siblings(&self, idx: Index) -> &[Index] {
        match self.get_node(idx).and_then(|n| n.parent) {
            Some(parent) => self.children_of(Some(parent)),
            None => &self.roots,
        }
    }

    /// Child list of `parent`, or the root list for `None`. Leaves yield an empty slice.
    pub fn children_of(&self, parent: Option<Index>) -> &[Index] {
        match parent {
            Some(p) => self.get_node(p).map(|n| n.children()).unwrap_or_default(),
            None => &self.roots,
        }
    }

    fn group_mut(&mut self, parent: Option<Index>) -> Option<&mut Vec<Index>> {
        match parent {
            Some(p) => self.arena.get_mut(p).and_then(|n| n.kind.children_mut()),
            None => Some(&mut self.roots),
        }
    }

    pub fn position_in_group(&self, idx: Index) -> Option<usize> {
        self.siblings(idx).iter().position(|&i| i == idx)
    }

    /// Ordered name path from the forest root down to `idx`.
    #[instrument(level = "trace", skip(self))]
    pub fn path(&self, idx: Index) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = Some(idx);
        while let Some(i) = current {
            match self.get_node(i) {
                Some(node) => {
                    names.push(node.name.clone());
                    current = node.parent;
                }
                None => break,
            }
        }
        names.reverse();
        names
    }

    /// Resolve a name path (root first) to a node.
    pub fn find_by_path<S: AsRef<str>>(&self, path: &[S]) -> Option<Index> {
        let mut group = self.roots.as_slice();
        let mut found = None;
        for segment in path {
            let idx = group
                .iter()
                .copied()
                .find(|&i| self.get_node(i).is_some_and(|n| n.name == segment.as_ref()))?;
            group = self.children_of(Some(idx));
            found = Some(idx);
        }
        found
    }

    /// True if `ancestor` is `idx` itself or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: Index, idx: Index) -> bool {
        let mut current = Some(idx);
        while let Some(i) = current {
            if i == ancestor {
                return true;
            }
            current = self.get_node(i).and_then(|n| n.parent);
        }
        false
    }

    /// Store a node and link it into `parent`'s child list (or the roots) at `at`,
    /// clamped to the end. A leaf `parent` is treated as no parent.
    #[instrument(level = "trace", skip(self, node), fields(id = %node.id))]
    pub(crate) fn insert_node(
        &mut self,
        mut node: DataNode,
        parent: Option<Index>,
        at: Option<usize>,
    ) -> Index {
        let parent = parent.filter(|&p| self.get_node(p).is_some_and(|n| n.is_reference()));
        node.parent = None;
        let idx = self.arena.insert(node);
        self.attach(idx, parent, at.unwrap_or(usize::MAX));
        idx
    }

    /// Unlink `idx` from its sibling group; the node stays in the arena.
    pub(crate) fn detach(&mut self, idx: Index) {
        let parent = match self.get_node(idx) {
            Some(node) => node.parent,
            None => return,
        };
        if let Some(group) = self.group_mut(parent) {
            group.retain(|&i| i != idx);
        }
        if let Some(node) = self.arena.get_mut(idx) {
            node.parent = None;
        }
    }

    /// Link a detached node into `parent`'s group at `at` (clamped).
    pub(crate) fn attach(&mut self, idx: Index, parent: Option<Index>, at: usize) {
        if let Some(group) = self.group_mut(parent) {
            let at = at.min(group.len());
            group.insert(at, idx);
        }
        if let Some(node) = self.arena.get_mut(idx) {
            node.parent = parent;
        }
    }

    /// Detach `idx` and free it with all descendants. Returns the freed ids.
    #[instrument(level = "debug", skip(self))]
    pub(crate) fn remove_subtree(&mut self, idx: Index) -> Vec<NodeId> {
        self.detach(idx);
        self.free_subtree(idx)
    }

    /// Free an already detached subtree, children first.
    pub(crate) fn free_subtree(&mut self, idx: Index) -> Vec<NodeId> {
        let order: Vec<Index> = self.iter_postorder(idx).map(|(i, _)| i).collect();
        order
            .into_iter()
            .filter_map(|i| self.arena.remove(i))
            .map(|node| node.id)
            .collect()
    }

    /// Copy-on-write replacement: stores `node` under a new index, splices it into
    /// the old slot of its sibling group and repoints the children's parent links.
    ///
    /// The old index becomes invalid, so index-keyed observers see a changed node.
    #[instrument(level = "trace", skip(self, node))]
    pub(crate) fn replace_node(&mut self, idx: Index, mut node: DataNode) -> Option<Index> {
        let old = self.arena.remove(idx)?;
        node.parent = old.parent;
        let children = node.children().to_vec();
        let new_idx = self.arena.insert(node);

        if let Some(group) = self.group_mut(old.parent) {
            if let Some(slot) = group.iter_mut().find(|i| **i == idx) {
                *slot = new_idx;
            }
        }
        for child in children {
            if let Some(child_node) = self.arena.get_mut(child) {
                child_node.parent = Some(new_idx);
            }
        }
        Some(new_idx)
    }

    /// Recursive owned copy of the subtree at `idx`, ids included, no parent links.
    pub fn deep_clone(&self, idx: Index) -> Option<NodeRecord> {
        let node = self.get_node(idx)?;
        let children = node.kind.children().map(|children| {
            children
                .iter()
                .filter_map(|&child| self.deep_clone(child))
                .collect()
        });
        Some(NodeRecord {
            id: Some(node.id.clone()),
            name: node.name.clone(),
            data_type: node.data_type(),
            children,
        })
    }

    /// Whole forest as plain records.
    #[instrument(level = "debug", skip(self))]
    pub fn to_records(&self) -> Vec<NodeRecord> {
        self.roots
            .iter()
            .filter_map(|&root| self.deep_clone(root))
            .collect()
    }

    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self) -> TreeIterator {
        TreeIterator::new(self)
    }

    /// Children-first walk of the subtree rooted at `idx`.
    #[instrument(level = "trace", skip(self))]
    pub fn iter_postorder(&self, idx: Index) -> PostOrderIterator {
        PostOrderIterator::new(self, idx)
    }
}

pub struct TreeIterator<'a> {
    arena: &'a TreeArena,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a TreeArena) -> Self {
        let stack = arena.roots().iter().rev().copied().collect();
        Self { arena, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a DataNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children().iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    arena: &'a TreeArena,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(arena: &'a TreeArena, root: Index) -> Self {
        Self {
            arena,
            stack: vec![(root, false)],
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a DataNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children().iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}
