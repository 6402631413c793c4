//! Command line arguments

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// xui command line
#[derive(Parser, Debug)]
#[command(name = "xui", version)]
#[command(about = "Replay live-set delta logs and inspect persisted sessions")]
pub struct Cli {
    /// Config file (defaults to ./xui.toml when present)
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Apply a JSON-lines delta log and print the final set
    Replay {
        /// Log file, one wire message per line
        file: PathBuf,
    },
    /// Work with the persisted session
    Session {
        /// Session action
        #[command(subcommand)]
        action: SessionAction,
    },
}

/// `xui session` actions
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum SessionAction {
    /// Print one field
    Get {
        /// Field key
        key: String,
    },
    /// Set and persist one field
    Set {
        /// Field key
        key: String,
        /// JSON value; bare words are taken as strings
        value: String,
    },
    /// Print every field
    Show,
}
