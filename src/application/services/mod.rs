//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services own their stores and are plain structs, not traits.

mod binding;
mod data_source;

pub use binding::BindingService;
pub use data_source::{DataSourceService, Snapshot};
