//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint};

/// Boolean search-condition trees: build, persist and render as SQL
#[derive(Parser, Debug)]
#[command(name = "condtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file, layered over the global one
    #[arg(short, long, global = true, env = "CONDTREE_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a tree from a condition chain and print it
    Build {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Tree)]
        format: OutputFormat,

        /// Conditions joined by and/or, e.g. 'SUBJECT CONTAINS x' and 'READ EQUALS 0'
        #[arg(required = true, num_args = 1..)]
        exprs: Vec<String>,
    },

    /// Build a tree and save it under a name
    Save {
        /// Search name
        name: String,

        /// Conditions joined by and/or
        #[arg(required = true, num_args = 1..)]
        exprs: Vec<String>,
    },

    /// Load a saved search and print it
    Show {
        /// Search name
        name: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Tree)]
        format: OutputFormat,
    },

    /// List saved searches
    List,

    /// Delete a saved search
    Delete {
        /// Search name
        name: String,
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
    /// Show effective configuration
    Show,

    /// Show config paths
    Path,

    /// Print a template config file
    Template,
}

/// Rendering of a condition tree.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Indented tree
    Tree,
    /// MPTT rows as JSON lines
    Rows,
    /// SQL WHERE fragment and arguments
    Sql,
    /// Nested JSON transport form
    Json,
    /// Binary transport form as hex
    Hex,
}
