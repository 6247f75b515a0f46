//! dataform: typed data-source trees for spreadsheet data binding
//!
//! A forest of namespace, table and field nodes, a mutation engine that keeps
//! it consistent, and a registry binding nodes to spreadsheet ranges.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
