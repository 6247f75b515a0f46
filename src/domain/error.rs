//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::{DataType, NodeId};

/// Domain errors represent rejected edits and broken caller contracts.
///
/// Validation failures (see [`DomainError::is_validation`]) are expected user input
/// problems: the operation is not applied and the tree is left untouched.
/// Everything else signals an integration bug on the caller's side.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("duplicate name among siblings: {name}")]
    DuplicateName { name: String },

    #[error("duplicate name within moved nodes: {name}")]
    DuplicateInBatch { name: String },

    #[error("duplicate binding name: {0}")]
    DuplicateBindingName(String),

    #[error("{child:?} cannot be placed inside {container:?}")]
    InvalidContainer { container: DataType, child: DataType },

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("not a container node: {0}")]
    NotAContainer(NodeId),

    #[error("anchor {anchor} is not a sibling in the target group")]
    AnchorNotInGroup { anchor: NodeId },

    #[error("cannot move {0} into itself or one of its descendants")]
    MoveIntoDescendant(NodeId),

    #[error("node listed more than once: {0}")]
    RepeatedNode(NodeId),

    #[error("node id already in use: {0}")]
    IdInUse(NodeId),

    #[error("stale node index: {0}")]
    StaleIndex(String),

    #[error("unknown data type: {0}")]
    UnknownDataType(String),

    #[error("invalid cell range (expected R<row>C<col>[:R<row>C<col>]): {0}")]
    InvalidRange(String),
}

impl DomainError {
    /// True for recoverable input-validation failures that should be shown to the user.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DomainError::EmptyName
                | DomainError::DuplicateName { .. }
                | DomainError::DuplicateInBatch { .. }
                | DomainError::DuplicateBindingName(_)
                | DomainError::InvalidContainer { .. }
        )
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
