//! # kp2bw – Bitwarden destination
//!
//! Writes migrated items into a Bitwarden vault through the official `bw`
//! command-line client: session unlock or reuse, sync, folder and
//! organization-collection creation, item creation, and attachment upload.

pub mod bitwarden;
