//! # kp2bw
//!
//! Command-line front end for migrating a KeePass 2.x database into a
//! Bitwarden vault. The work happens in the workspace crates:
//!
//! - `kp2bw-keepass` reads the source database
//! - `kp2bw-convert` resolves references and maps entries
//! - `kp2bw-bitwarden` talks to the vault through the `bw` CLI
//!
//! This crate wires them together with argument parsing, an optional JSON
//! config file, secret prompts and logging.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod prompt;

pub use app::{plan_lines, run};
pub use cli::Cli;
pub use config::{default_config_path, load_file_config, resolve_settings, FileConfig, Settings};
pub use error::{AppError, AppErrorKind};
