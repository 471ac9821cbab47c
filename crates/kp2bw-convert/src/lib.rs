//! # kp2bw – migration engine
//!
//! Turns KeePass entries into Bitwarden items:
//!
//! - **Resolver** – indexes entries by identifier and resolves `{REF:…}`
//!   username/password references, merging aliases into their target
//! - **Mapper** – converts an entry into a Bitwarden login item with folder,
//!   collection, custom fields and pending attachments
//! - **Orchestrator** – submits the resolved items to a `VaultDestination`
//!   one at a time and produces a [`convert::MigrationReport`]

pub mod convert;
