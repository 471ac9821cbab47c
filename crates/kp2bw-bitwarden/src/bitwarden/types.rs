//! Core types for the Bitwarden destination.
//!
//! Vault item models in the `bw` CLI JSON format, connection settings,
//! attachment payloads, and error types.

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Error types ─────────────────────────────────────────────────────

/// Bitwarden-specific error kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitwardenErrorKind {
    /// CLI executable not found or not in PATH.
    CliNotFound,
    /// Unlock failed (bad master password, not logged in).
    AuthFailed,
    /// Vault is locked and a session key is required.
    VaultLocked,
    /// The `bw` command returned a non-zero exit status.
    ApiError,
    /// JSON parsing or serialization failure.
    ParseError,
    /// `bw sync` failed.
    SyncFailed,
    /// Operation timed out.
    Timeout,
    /// Generic I/O error (spawning `bw`, staging attachment files).
    IoError,
    /// Organization-level error (collections).
    OrganizationError,
}

/// A Bitwarden destination error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitwardenError {
    pub kind: BitwardenErrorKind,
    pub message: String,
}

impl fmt::Display for BitwardenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for BitwardenError {}

impl BitwardenError {
    pub fn cli_not_found(msg: impl Into<String>) -> Self {
        Self { kind: BitwardenErrorKind::CliNotFound, message: msg.into() }
    }
    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self { kind: BitwardenErrorKind::AuthFailed, message: msg.into() }
    }
    pub fn vault_locked(msg: impl Into<String>) -> Self {
        Self { kind: BitwardenErrorKind::VaultLocked, message: msg.into() }
    }
    pub fn api(msg: impl Into<String>) -> Self {
        Self { kind: BitwardenErrorKind::ApiError, message: msg.into() }
    }
    pub fn parse(msg: impl Into<String>) -> Self {
        Self { kind: BitwardenErrorKind::ParseError, message: msg.into() }
    }
    pub fn sync_failed(msg: impl Into<String>) -> Self {
        Self { kind: BitwardenErrorKind::SyncFailed, message: msg.into() }
    }
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self { kind: BitwardenErrorKind::Timeout, message: msg.into() }
    }
    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: BitwardenErrorKind::IoError, message: msg.into() }
    }
    pub fn organization(msg: impl Into<String>) -> Self {
        Self { kind: BitwardenErrorKind::OrganizationError, message: msg.into() }
    }
}

// ── Vault item types ────────────────────────────────────────────────

/// Bitwarden vault item type (matching CLI enums).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ItemType {
    Login = 1,
    SecureNote = 2,
}

/// Custom field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum FieldType {
    Text = 0,
    Hidden = 1,
}

// ── Vault data models ───────────────────────────────────────────────

/// A login URI entry attached to a login item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUri {
    pub uri: Option<String>,
    #[serde(rename = "match")]
    pub match_type: Option<u8>,
}

impl LoginUri {
    pub fn new(uri: &str) -> Self {
        Self { uri: Some(uri.to_string()), match_type: None }
    }
}

/// Login item data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    #[serde(default)]
    pub uris: Vec<LoginUri>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub totp: Option<String>,
}

/// A custom field on a vault item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    pub name: Option<String>,
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub field_type: u8,
}

impl CustomField {
    pub fn text(name: &str, value: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            value: Some(value.to_string()),
            field_type: FieldType::Text as u8,
        }
    }

    pub fn hidden(name: &str, value: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            value: Some(value.to_string()),
            field_type: FieldType::Hidden as u8,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.field_type == FieldType::Hidden as u8
    }
}

/// A Bitwarden vault item (cipher) as sent to `bw create item`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(rename = "type")]
    pub item_type: u8,
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub login: Option<LoginData>,
    #[serde(default)]
    pub fields: Vec<CustomField>,
    #[serde(default)]
    pub collection_ids: Vec<String>,
}

impl VaultItem {
    /// Create a new login vault item.
    pub fn new_login(name: &str, login: LoginData) -> Self {
        Self {
            id: None,
            organization_id: None,
            folder_id: None,
            item_type: ItemType::Login as u8,
            name: name.to_string(),
            notes: None,
            favorite: false,
            login: Some(login),
            fields: Vec::new(),
            collection_ids: Vec::new(),
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.login.as_ref()?.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.login.as_ref()?.password.as_deref()
    }

    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.login
            .iter()
            .flat_map(|l| l.uris.iter())
            .filter_map(|u| u.uri.as_deref())
    }
}

/// A Bitwarden folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

impl Folder {
    pub fn new(name: &str) -> Self {
        Self { id: None, name: name.to_string() }
    }
}

/// A Bitwarden organization collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
    pub name: String,
}

/// Minimal view of an existing vault item, used for the skip snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub name: String,
    #[serde(default)]
    pub folder_id: Option<String>,
}

// ── Attachments ─────────────────────────────────────────────────────

/// An attachment waiting to be uploaded to a freshly created item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentPayload {
    /// A binary attachment carried over from the source entry.
    Native { name: String, data: Vec<u8> },
    /// Text content moved out of the item because it exceeded the field size limit.
    Synthetic { name: String, data: String },
}

impl AttachmentPayload {
    /// File name used for the upload. Synthetic payloads get a `.txt` suffix.
    pub fn file_name(&self) -> String {
        match self {
            Self::Native { name, .. } => name.clone(),
            Self::Synthetic { name, .. } => format!("{}.txt", name),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Native { data, .. } => data,
            Self::Synthetic { data, .. } => data.as_bytes(),
        }
    }
}

// ── Configuration ───────────────────────────────────────────────────

/// How the client talks to `bw`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitwardenConfig {
    /// Path to the `bw` binary (None = look in PATH).
    #[serde(default)]
    pub cli_path: Option<String>,
    /// Per-command timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Organization that receives items and owns collections.
    #[serde(default)]
    pub organization_id: Option<String>,
}

fn default_timeout() -> u64 {
    120
}

impl Default for BitwardenConfig {
    fn default() -> Self {
        Self {
            cli_path: None,
            timeout_secs: default_timeout(),
            organization_id: None,
        }
    }
}

// ── Session / status ───────────────────────────────────────────────

/// Vault lock status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultStatus {
    Unauthenticated,
    Locked,
    Unlocked,
}

impl fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Locked => write!(f, "locked"),
            Self::Unlocked => write!(f, "unlocked"),
        }
    }
}

impl VaultStatus {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "unlocked" => Self::Unlocked,
            "locked" => Self::Locked,
            _ => Self::Unauthenticated,
        }
    }
}

/// Status response from `bw status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo {
    pub server_url: Option<String>,
    pub last_sync: Option<String>,
    pub user_email: Option<String>,
    pub status: String,
}

impl StatusInfo {
    pub fn vault_status(&self) -> VaultStatus {
        VaultStatus::parse(&self.status)
    }
}
