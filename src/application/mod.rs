//! Application layer: services and use cases
//!
//! This layer orchestrates domain logic; the controller implements the
//! command policies the editing UI relies on.

pub mod controller;
pub mod error;
pub mod services;

pub use controller::DataFormController;
pub use error::{ApplicationError, ApplicationResult};
