//! Domain layer: entities and tree logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod binding;
pub mod builder;
pub mod entities;
pub mod error;

pub use arena::{DataNode, NodeKind, TreeArena};
pub use binding::BindingRegistry;
pub use builder::TreeBuilder;
pub use entities::*;
pub use error::{DomainError, DomainResult};
