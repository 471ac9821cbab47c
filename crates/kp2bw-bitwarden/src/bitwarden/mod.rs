//! Bitwarden destination: sub-modules.
//!
//! - CLI bridge for `bw` executable operations (unlock, sync, list, create)
//! - Connect-time vault snapshot (folders, collections, existing item names)
//! - `VaultDestination` seam and the `bw`-backed client implementing it

pub mod types;
pub mod cli;
pub mod snapshot;
pub mod client;

pub use types::*;
pub use cli::BitwardenCli;
pub use snapshot::{group_item_names, VaultSnapshot};
pub use client::{BitwardenClient, SessionCredentials, VaultDestination};
