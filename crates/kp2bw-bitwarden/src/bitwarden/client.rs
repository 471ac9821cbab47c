//! Destination client.
//!
//! [`VaultDestination`] is the seam the migration engine writes through;
//! [`BitwardenClient`] implements it on top of the `bw` CLI bridge.

use crate::bitwarden::cli::BitwardenCli;
use crate::bitwarden::snapshot::VaultSnapshot;
use crate::bitwarden::types::*;
use async_trait::async_trait;
use log::{debug, info};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

/// Operations the migration needs from the destination vault.
#[async_trait]
pub trait VaultDestination: Send {
    /// Whether a folder with this name already exists.
    fn has_folder(&self, name: &str) -> bool;

    /// Return the id of folder `name`, creating it when absent.
    async fn ensure_folder(&mut self, name: &str) -> Result<String, BitwardenError>;

    /// Return the id of collection `name` in `org_id`, creating it when absent.
    async fn ensure_collection(&mut self, org_id: &str, name: &str) -> Result<String, BitwardenError>;

    /// Name of a known collection.
    fn collection_name(&self, id: &str) -> Option<String>;

    /// Create an item and return its new id.
    async fn create_item(&mut self, item: &VaultItem) -> Result<String, BitwardenError>;

    async fn create_attachment(
        &mut self,
        item_id: &str,
        payload: &AttachmentPayload,
    ) -> Result<(), BitwardenError>;

    /// Whether an item named `name` existed in `folder` when the client connected.
    fn item_exists(&self, folder: Option<&str>, name: &str) -> bool;
}

/// How to obtain a session.
pub enum SessionCredentials {
    /// Reuse an already unlocked `BW_SESSION` key.
    Session(SecretString),
    /// Unlock with the master password.
    MasterPassword(SecretString),
}

/// [`VaultDestination`] backed by the `bw` CLI.
pub struct BitwardenClient {
    cli: BitwardenCli,
    snapshot: VaultSnapshot,
    /// Attachment files are staged here; removed when the client is dropped.
    staging: TempDir,
}

impl BitwardenClient {
    /// Check the CLI, unlock (or reuse a session), sync and snapshot the vault.
    ///
    /// Any failure here is fatal for the migration.
    pub async fn connect(
        config: &BitwardenConfig,
        credentials: SessionCredentials,
    ) -> Result<Self, BitwardenError> {
        let mut cli = BitwardenCli::from_config(config);

        let version = cli.check_available().await?;
        info!("Using Bitwarden CLI {}", version);

        match credentials {
            SessionCredentials::Session(key) => {
                info!("Using existing Bitwarden session");
                cli.set_session_key(Some(key.expose_secret().clone()));
            }
            SessionCredentials::MasterPassword(password) => {
                info!("Unlocking Bitwarden vault");
                let key = cli.unlock(password.expose_secret()).await.map_err(|e| {
                    BitwardenError::auth_failed(format!(
                        "Could not unlock the Bitwarden vault. Is the master password correct and is bw logged in? ({})",
                        e.message
                    ))
                })?;
                cli.set_session_key(Some(key));
            }
        }

        let status = cli.status().await?;
        if status.vault_status() != VaultStatus::Unlocked {
            return Err(BitwardenError::vault_locked(format!(
                "Bitwarden vault is {} after unlock",
                status.vault_status()
            )));
        }
        if let Some(email) = &status.user_email {
            debug!("Connected as {}", email);
        }

        let snapshot = VaultSnapshot::capture(&cli, config.organization_id.as_deref()).await?;
        let staging = tempfile::Builder::new()
            .prefix("kp2bw-attachments")
            .tempdir()
            .map_err(|e| BitwardenError::io(format!("Cannot create attachment staging directory: {}", e)))?;

        Ok(Self { cli, snapshot, staging })
    }

    pub fn snapshot(&self) -> &VaultSnapshot {
        &self.snapshot
    }

    fn staged_path(&self, file_name: &str) -> PathBuf {
        self.staging.path().join(sanitize_file_name(file_name))
    }
}

#[async_trait]
impl VaultDestination for BitwardenClient {
    fn has_folder(&self, name: &str) -> bool {
        self.snapshot.folders.contains_key(name)
    }

    async fn ensure_folder(&mut self, name: &str) -> Result<String, BitwardenError> {
        if let Some(id) = self.snapshot.folders.get(name) {
            return Ok(id.clone());
        }
        let created = self.cli.create_folder(&Folder::new(name)).await?;
        let id = created
            .id
            .ok_or_else(|| BitwardenError::parse(format!("bw returned no id for folder '{}'", name)))?;
        info!("Created folder '{}'", name);
        self.snapshot.folders.insert(name.to_string(), id.clone());
        Ok(id)
    }

    async fn ensure_collection(&mut self, org_id: &str, name: &str) -> Result<String, BitwardenError> {
        if let Some(id) = self.snapshot.collections.get(name) {
            return Ok(id.clone());
        }

        let mut template = self.cli.get_template("org-collection").await?;
        let Value::Object(fields) = &mut template else {
            return Err(BitwardenError::parse("org-collection template is not a JSON object"));
        };
        fields.insert("name".into(), Value::String(name.to_string()));
        fields.insert("organizationId".into(), Value::String(org_id.to_string()));

        let created = self
            .cli
            .create_org_collection(org_id, &template)
            .await
            .map_err(|e| BitwardenError::organization(format!("Cannot create collection '{}': {}", name, e.message)))?;
        let id = created
            .id
            .ok_or_else(|| BitwardenError::organization(format!("bw returned no id for collection '{}'", name)))?;
        info!("Created collection '{}'", name);
        self.snapshot.collections.insert(name.to_string(), id.clone());
        Ok(id)
    }

    fn collection_name(&self, id: &str) -> Option<String> {
        self.snapshot.collection_name(id)
    }

    async fn create_item(&mut self, item: &VaultItem) -> Result<String, BitwardenError> {
        let created = self.cli.create_item(item).await?;
        created
            .id
            .ok_or_else(|| BitwardenError::parse(format!("bw returned no id for item '{}'", item.name)))
    }

    async fn create_attachment(
        &mut self,
        item_id: &str,
        payload: &AttachmentPayload,
    ) -> Result<(), BitwardenError> {
        let path = self.staged_path(&payload.file_name());
        tokio::fs::write(&path, payload.bytes())
            .await
            .map_err(|e| BitwardenError::io(format!("Cannot stage attachment {}: {}", path.display(), e)))?;

        let result = self.cli.create_attachment(item_id, &path).await;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            debug!("Could not remove staged attachment {}: {}", path.display(), e);
        }
        result
    }

    fn item_exists(&self, folder: Option<&str>, name: &str) -> bool {
        self.snapshot.contains_item(folder, name)
    }
}

/// Keep only the final path component and replace characters that are not
/// valid in file names on common platforms.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        "attachment".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("cert.pem"), "cert.pem");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_file_name("a:b*c?.txt"), "a_b_c_.txt");
        assert_eq!(sanitize_file_name(".."), "attachment");
        assert_eq!(sanitize_file_name(""), "attachment");
    }

    #[tokio::test]
    async fn connect_fails_without_cli() {
        let config = BitwardenConfig {
            cli_path: Some("nonexistent_bw_binary_path".into()),
            ..Default::default()
        };
        let creds = SessionCredentials::Session(SecretString::new("key".into()));
        let err = BitwardenClient::connect(&config, creds).await.err().unwrap();
        assert_eq!(err.kind, BitwardenErrorKind::CliNotFound);
    }
}
