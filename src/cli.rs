//! Command-line arguments.
//!
//! The compact legacy flag names (`--kppw`, `--bworg`, ...) are accepted as
//! aliases of the long options.

use std::path::PathBuf;

use clap::Parser;
use kp2bw_convert::convert::FolderMode;

/// Migrate a KeePass 2.x database into a Bitwarden vault.
#[derive(Parser, Debug, Clone)]
#[command(name = "kp2bw", version, about, long_about = None)]
pub struct Cli {
    /// KeePass 2.x database (.kdbx) or XML export (.xml)
    pub keepass_file: Option<PathBuf>,

    /// KeePass database password (else KP2BW_KEEPASS_PASSWORD or a prompt)
    #[arg(long = "kp-password", alias = "kppw", value_name = "PASSWORD")]
    pub kp_password: Option<String>,

    /// KeePass key file
    #[arg(long = "kp-keyfile", alias = "kpkf", value_name = "FILE")]
    pub kp_keyfile: Option<PathBuf>,

    /// Bitwarden master password (else BW_PASSWORD or a prompt)
    #[arg(long = "bw-password", alias = "bwpw", value_name = "PASSWORD")]
    pub bw_password: Option<String>,

    /// Bitwarden organization id
    #[arg(long = "bw-org", alias = "bworg", value_name = "ID")]
    pub bw_org: Option<String>,

    /// Existing Bitwarden session key from `bw unlock` (else BW_SESSION)
    #[arg(long = "bw-session", alias = "bwsession", value_name = "KEY")]
    pub bw_session: Option<String>,

    /// Only import entries carrying at least one of these tags
    #[arg(long = "import-tags", alias = "import_tags", num_args = 1.., value_name = "TAG")]
    pub import_tags: Option<Vec<String>>,

    /// Organization collection id, or `auto` to use one collection per top-level folder
    #[arg(long = "bw-coll", alias = "bwcoll", value_name = "ID|auto")]
    pub bw_coll: Option<String>,

    /// Create one sub-collection per folder below the --bw-coll parent
    #[arg(long = "nested-collections", alias = "nestcoll")]
    pub nested_collections: bool,

    /// Do not prepend the folder path to item names
    #[arg(long = "no-path-to-name")]
    pub no_path_to_name: bool,

    /// Leading folders left out of the name prefix [default: 1]
    #[arg(long = "path-to-name-skip", alias = "path2nameskip", value_name = "N")]
    pub path_to_name_skip: Option<usize>,

    /// Folder naming: first-level or full-path [default: first-level]
    #[arg(long = "folder-mode", value_name = "MODE")]
    pub folder_mode: Option<FolderMode>,

    /// Path to the `bw` executable
    #[arg(long = "bw-path", value_name = "PATH")]
    pub bw_path: Option<String>,

    /// JSON config file [default: <config dir>/kp2bw/config.json]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Read and resolve entries, print the plan, and stop before touching Bitwarden
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the bw setup confirmation
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    pub log_json: bool,
}
