//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Stream tree nodes into a live tree view and render it
#[derive(Parser, Debug)]
#[command(name = "livetree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file layered over the global config
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a tree from JSON-lines nodes and render it
    Render {
        /// Node file, one JSON node per line ("-" reads stdin)
        #[arg(default_value = "-", value_hint = ValueHint::FilePath)]
        input: PathBuf,

        /// Tree identifier
        #[arg(short, long, default_value = "tree")]
        tree_id: String,

        /// JSON schema file for node data
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        schema: Option<PathBuf>,

        /// Insert nodes expanded (overrides config)
        #[arg(short, long)]
        expand: bool,

        /// Toggle a node after population (repeatable)
        #[arg(long = "toggle", value_name = "NODE_ID")]
        toggle: Vec<String>,

        /// Print the final tree state as JSON instead of drawing it
        #[arg(long)]
        json: bool,

        /// Disable colored markers
        #[arg(long)]
        no_color: bool,
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
    /// Show effective settings as TOML
    Show,
    /// Show global config file path
    Path,
}
