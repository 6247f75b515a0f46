//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::domain::{CellRange, DataType};

/// Typed data-source trees (namespaces, tables, fields) bound to spreadsheet ranges
#[derive(Parser, Debug)]
#[command(name = "dataform")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Definition document (default: from config, else ./dataform.json)
    #[arg(short, long, global = true, env = "DATAFORM_FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty definition document
    Init,

    /// Show the node tree with bindings
    Tree {
        /// Show node ids
        #[arg(long)]
        ids: bool,
    },

    /// Add a node (appended to the root list or to --parent)
    Add {
        /// Node name
        name: String,
        /// Node type (default: from config)
        #[arg(short = 't', long = "type")]
        data_type: Option<DataType>,
        /// Parent node path
        #[arg(short, long, conflicts_with_all = ["before", "after"])]
        parent: Option<String>,
        /// Insert before this sibling
        #[arg(long, conflicts_with = "after")]
        before: Option<String>,
        /// Insert after this sibling
        #[arg(long)]
        after: Option<String>,
    },

    /// Rename a node
    Rename {
        /// Node path
        path: String,
        /// New name
        name: String,
    },

    /// Change a node's type (children that no longer fit are dropped)
    Retype {
        /// Node path
        path: String,
        /// New type
        #[arg(value_name = "TYPE")]
        data_type: DataType,
    },

    /// Move nodes, keeping their order
    Mv {
        /// Node paths to move
        #[arg(required = true)]
        paths: Vec<String>,
        /// Destination parent (default: root list)
        #[arg(long)]
        to: Option<String>,
        /// Position in the destination (default: end)
        #[arg(long)]
        index: Option<usize>,
    },

    /// Remove a node with its subtree and bindings
    Rm {
        /// Node path
        path: String,
    },

    /// Bind a node to a sheet range
    Bind {
        /// Node path
        path: String,
        /// Workbook id
        #[arg(long)]
        unit: String,
        /// Sheet id
        #[arg(long)]
        sheet: String,
        /// Cell range, e.g. R1C1:R10C1
        #[arg(long)]
        range: CellRange,
    },

    /// Remove a binding by name
    Unbind {
        /// Binding name
        name: String,
    },

    /// List bindings (of one node if given)
    Bindings {
        /// Node path
        path: Option<String>,
    },

    /// Print the definition document as JSON
    Export {
        /// Write to file instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print a config template
    Template,

    /// Show config file location
    Path,
}
