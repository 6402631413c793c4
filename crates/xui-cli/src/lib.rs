//! XUI command line support
//!
//! Library half of the `xui` binary: argument definitions, configuration,
//! logging setup, and the command implementations.
//!
//! # Commands
//!
//! - `xui replay <file>`: feed a JSON-lines delta log through a live set of
//!   schemaless documents and print the final set
//! - `xui session get|set|show`: read and write the file-backed session

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cli;
pub mod config;
pub mod logging;
pub mod replay;
pub mod session;

pub use cli::{Cli, Command, SessionAction};
pub use config::{ConfigError, LiveConfig, LogConfig, SessionConfig, XuiConfig, DEFAULT_CONFIG_FILE};
pub use replay::{replay_file, replay_text, ReplayReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
