// ── kp2bw-keepass / types ──────────────────────────────────────────────────────
//
// Source entry model and error types for KeePass reading.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard string keys that never become custom properties.
pub const RESERVED_KEYS: &[&str] = &["Title", "UserName", "Password", "URL", "Notes", "otp"];

// ─── Error Types ──────────────────────────────────────────────────────────────

/// KeePass reader error kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeePassErrorKind {
    /// The database path does not exist.
    NotFound,
    /// Wrong master password or key file.
    Decryption,
    /// The file is not a recognized KeePass database or export.
    Format,
    /// The key file could not be read.
    KeyFile,
    /// Generic I/O failure while reading.
    Io,
}

/// A KeePass reader error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeePassError {
    pub kind: KeePassErrorKind,
    pub message: String,
}

impl fmt::Display for KeePassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for KeePassError {}

impl KeePassError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self { kind: KeePassErrorKind::NotFound, message: msg.into() }
    }
    pub fn decryption(msg: impl Into<String>) -> Self {
        Self { kind: KeePassErrorKind::Decryption, message: msg.into() }
    }
    pub fn format(msg: impl Into<String>) -> Self {
        Self { kind: KeePassErrorKind::Format, message: msg.into() }
    }
    pub fn key_file(msg: impl Into<String>) -> Self {
        Self { kind: KeePassErrorKind::KeyFile, message: msg.into() }
    }
    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: KeePassErrorKind::Io, message: msg.into() }
    }
}

// ─── Entry Types ──────────────────────────────────────────────────────────────

/// A custom string field on an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomProperty {
    pub name: String,
    pub value: String,
    /// Whether KeePass marks this field as memory-protected (sensitive)
    pub is_protected: bool,
}

/// A binary attachment carried by an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryBinary {
    pub filename: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// A decrypted KeePass entry, flattened for migration.
///
/// Read once from the source and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Entry UUID as 32 uppercase hex characters, no dashes
    pub uuid: String,
    pub title: String,
    pub username: String,
    pub password: String,
    pub url: String,
    pub notes: String,
    /// One-time-password secret or `otpauth://` URI
    pub otp: String,
    /// Group names from below the root group down to the entry's group
    pub group_path: Vec<String>,
    pub tags: Vec<String>,
    /// Custom string fields in document order
    pub custom_properties: Vec<CustomProperty>,
    pub attachments: Vec<EntryBinary>,
}

impl SourceEntry {
    /// Whether the entry lives directly in the root group.
    pub fn is_at_root(&self) -> bool {
        self.group_path.is_empty()
    }

    /// The first-level group the entry lives under, if any.
    pub fn first_level_group(&self) -> Option<&str> {
        self.group_path.first().map(String::as_str)
    }

    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }

    /// `Group/Sub/Title` style label used in log output.
    pub fn display_path(&self) -> String {
        if self.group_path.is_empty() {
            self.title.clone()
        } else {
            format!("{}/{}", self.group_path.join("/"), self.title)
        }
    }

    /// Route a named string field into the right slot.
    ///
    /// Reserved keys fill the standard fields; everything else becomes a
    /// custom property.
    pub fn set_string_field(&mut self, key: &str, value: String, is_protected: bool) {
        match key {
            "Title" => self.title = value,
            "UserName" => self.username = value,
            "Password" => self.password = value,
            "URL" => self.url = value,
            "Notes" => self.notes = value,
            "otp" => self.otp = value,
            _ => self.custom_properties.push(CustomProperty {
                name: key.to_string(),
                value,
                is_protected,
            }),
        }
    }
}

/// Normalize raw UUID bytes to the uppercase-hex form used by `{REF:...@I:...}`.
pub fn normalize_uuid(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Split a KeePass tag string (`a;b` or `a,b`) into trimmed, non-empty tags.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split([';', ','])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_keys_fill_standard_fields() {
        let mut entry = SourceEntry::default();
        entry.set_string_field("Title", "Mail".into(), false);
        entry.set_string_field("UserName", "alice".into(), false);
        entry.set_string_field("Password", "s3cret".into(), true);
        entry.set_string_field("otp", "otpauth://totp/x?secret=ABC".into(), true);
        entry.set_string_field("PIN", "1234".into(), true);

        assert_eq!(entry.title, "Mail");
        assert_eq!(entry.username, "alice");
        assert_eq!(entry.password, "s3cret");
        assert_eq!(entry.otp, "otpauth://totp/x?secret=ABC");
        assert_eq!(entry.custom_properties.len(), 1);
        assert_eq!(entry.custom_properties[0].name, "PIN");
        assert!(entry.custom_properties[0].is_protected);
    }

    #[test]
    fn uuid_normalized_to_upper_hex() {
        let bytes = [0xcf, 0xc0, 0x14, 0x10, 0x68, 0xe8, 0x35, 0x47, 0xbc, 0xee, 0xaf, 0x0c, 0x1a, 0xda, 0xba, 0xe0];
        assert_eq!(normalize_uuid(&bytes), "CFC0141068E83547BCEEAF0C1ADABAE0");
    }

    #[test]
    fn tags_split_on_both_separators() {
        assert_eq!(split_tags("prod; web,,db "), vec!["prod", "web", "db"]);
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn tag_membership() {
        let entry = SourceEntry { tags: vec!["dev".into()], ..Default::default() };
        assert!(!entry.has_any_tag(&["prod".to_string()]));
        assert!(entry.has_any_tag(&["prod".to_string(), "dev".to_string()]));
    }

    #[test]
    fn display_path_and_root() {
        let mut entry = SourceEntry { title: "Router".into(), ..Default::default() };
        assert!(entry.is_at_root());
        assert_eq!(entry.display_path(), "Router");
        entry.group_path = vec!["Infra".into(), "Net".into()];
        assert_eq!(entry.first_level_group(), Some("Infra"));
        assert_eq!(entry.display_path(), "Infra/Net/Router");
    }
}
