// ── kp2bw-convert / types ──────────────────────────────────────────────────────
//
// Migration settings and the resolved item model.

use kp2bw_bitwarden::bitwarden::{AttachmentPayload, CustomField, LoginData, VaultItem};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marker that flags a username/password as a field reference.
pub const REFERENCE_MARKER: &str = "{REF:";

/// Longest note or custom field value (in characters) kept inline.
pub const MAX_FIELD_LENGTH: usize = 10_000;

/// Title used for entries that have none.
pub const UNTITLED: &str = "_untitled";

/// Synthetic attachment name for oversized notes.
pub const NOTES_ATTACHMENT: &str = "notes";

// ─── Settings ─────────────────────────────────────────────────────────────────

/// How a KeePass group path becomes a Bitwarden folder name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FolderMode {
    /// First path segment only.
    #[default]
    FirstLevel,
    /// All segments joined with `/`, which Bitwarden shows as nested folders.
    FullPath,
}

impl FromStr for FolderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-level" => Ok(Self::FirstLevel),
            "full-path" => Ok(Self::FullPath),
            other => Err(format!("unknown folder mode '{}' (expected first-level or full-path)", other)),
        }
    }
}

impl fmt::Display for FolderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstLevel => write!(f, "first-level"),
            Self::FullPath => write!(f, "full-path"),
        }
    }
}

/// Organization collection assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "mode", content = "id")]
pub enum CollectionMode {
    #[default]
    None,
    /// Every item goes into this collection.
    Fixed(String),
    /// One collection per first-level folder, created on demand.
    Auto,
    /// One sub-collection per folder path below this parent collection.
    Nested(String),
}

/// Options that shape the mapping of every entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertConfig {
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub collection: CollectionMode,
    /// Prepend the group path to item titles.
    #[serde(default = "default_true")]
    pub title_prefix: bool,
    /// Leading path segments left out of the title prefix.
    #[serde(default = "default_prefix_skip")]
    pub prefix_skip_depth: usize,
    #[serde(default)]
    pub folder_mode: FolderMode,
    /// Only entries carrying at least one of these tags are migrated.
    #[serde(default)]
    pub required_tags: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

fn default_prefix_skip() -> usize {
    1
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            organization_id: None,
            collection: CollectionMode::None,
            title_prefix: default_true(),
            prefix_skip_depth: default_prefix_skip(),
            folder_mode: FolderMode::FirstLevel,
            required_tags: None,
        }
    }
}

impl ConvertConfig {
    pub fn is_nested(&self) -> bool {
        matches!(self.collection, CollectionMode::Nested(_))
    }
}

// ─── Resolved items ───────────────────────────────────────────────────────────

/// Where an item should land collection-wise, before ids are looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionTarget {
    None,
    /// A known collection id.
    Fixed(String),
    /// A collection found or created by name.
    Named(String),
    /// The parent collection itself (`path == None`) or `<parent name>/<path>`.
    Nested { parent_id: String, path: Option<String> },
}

/// A source entry mapped into Bitwarden terms, not yet submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    /// Identifier of the source entry this item came from.
    pub source_id: String,
    pub title: String,
    pub notes: String,
    pub login: LoginData,
    pub fields: Vec<CustomField>,
    /// Folder name, `None` for unfiled items.
    pub folder: Option<String>,
    pub collection: CollectionTarget,
    pub organization_id: Option<String>,
    pub attachments: Vec<AttachmentPayload>,
}

impl ResolvedItem {
    pub fn username(&self) -> &str {
        self.login.username.as_deref().unwrap_or_default()
    }

    pub fn password(&self) -> &str {
        self.login.password.as_deref().unwrap_or_default()
    }

    pub fn add_uri(&mut self, uri: &str) {
        self.login.uris.push(kp2bw_bitwarden::bitwarden::LoginUri::new(uri));
    }

    /// Build the `bw create item` payload once folder and collection ids are known.
    pub fn to_vault_item(&self, folder_id: Option<String>, collection_id: Option<String>) -> VaultItem {
        let mut item = VaultItem::new_login(&self.title, self.login.clone());
        item.notes = if self.notes.is_empty() { None } else { Some(self.notes.clone()) };
        item.fields = self.fields.clone();
        item.folder_id = folder_id;
        item.organization_id = self.organization_id.clone();
        item.collection_ids = collection_id.into_iter().collect();
        item
    }
}
