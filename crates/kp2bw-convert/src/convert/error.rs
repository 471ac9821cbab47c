// ── kp2bw-convert / error ──────────────────────────────────────────────────────

use kp2bw_bitwarden::bitwarden::BitwardenError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-entry migration error kinds. None of these stop the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvertErrorKind {
    /// A `{REF:…}` string that does not have the `<field>@<mode>:<target>` shape.
    ReferenceFormat,
    /// A lookup mode other than `I` (by identifier).
    UnsupportedMode,
    /// A referenced field other than `U` or `P`.
    UnsupportedField,
    /// The referenced entry is not in the index.
    UnresolvedReference,
    FolderCreation,
    CollectionCreation,
    ItemCreation,
    AttachmentUpload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertError {
    pub kind: ConvertErrorKind,
    pub message: String,
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ConvertError {}

impl ConvertError {
    pub fn reference_format(msg: impl Into<String>) -> Self {
        Self { kind: ConvertErrorKind::ReferenceFormat, message: msg.into() }
    }
    pub fn unsupported_mode(msg: impl Into<String>) -> Self {
        Self { kind: ConvertErrorKind::UnsupportedMode, message: msg.into() }
    }
    pub fn unsupported_field(msg: impl Into<String>) -> Self {
        Self { kind: ConvertErrorKind::UnsupportedField, message: msg.into() }
    }
    pub fn unresolved(msg: impl Into<String>) -> Self {
        Self { kind: ConvertErrorKind::UnresolvedReference, message: msg.into() }
    }
    pub fn folder_creation(e: &BitwardenError) -> Self {
        Self { kind: ConvertErrorKind::FolderCreation, message: e.to_string() }
    }
    pub fn collection_creation(msg: impl Into<String>) -> Self {
        Self { kind: ConvertErrorKind::CollectionCreation, message: msg.into() }
    }
    pub fn item_creation(e: &BitwardenError) -> Self {
        Self { kind: ConvertErrorKind::ItemCreation, message: e.to_string() }
    }
    pub fn attachment_upload(e: &BitwardenError) -> Self {
        Self { kind: ConvertErrorKind::AttachmentUpload, message: e.to_string() }
    }

    /// Whether the error came from reference resolution rather than submission.
    pub fn is_reference_error(&self) -> bool {
        matches!(
            self.kind,
            ConvertErrorKind::ReferenceFormat
                | ConvertErrorKind::UnsupportedMode
                | ConvertErrorKind::UnsupportedField
                | ConvertErrorKind::UnresolvedReference
        )
    }
}
