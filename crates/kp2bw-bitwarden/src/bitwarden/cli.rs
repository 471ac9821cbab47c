//! CLI bridge for the Bitwarden `bw` command-line tool.
//!
//! Spawns one `bw` subprocess per operation. Session keys and the master
//! password travel through environment variables, never through argv.

use crate::bitwarden::types::*;
use base64::Engine;
use log::debug;
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Environment variable used to hand the master password to `bw unlock`.
const PASSWORD_ENV: &str = "KP2BW_BW_MASTER_PASSWORD";

/// Bitwarden CLI bridge for executing `bw` commands.
#[derive(Debug, Clone)]
pub struct BitwardenCli {
    /// Path to the `bw` binary (None = look in PATH).
    cli_path: Option<String>,
    /// Value passed as BW_SESSION.
    session_key: Option<String>,
    timeout: Duration,
}

impl Default for BitwardenCli {
    fn default() -> Self {
        Self {
            cli_path: None,
            session_key: None,
            timeout: Duration::from_secs(120),
        }
    }
}

impl BitwardenCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &BitwardenConfig) -> Self {
        Self {
            cli_path: config.cli_path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            ..Default::default()
        }
    }

    pub fn with_cli_path(mut self, path: &str) -> Self {
        self.cli_path = Some(path.to_string());
        self
    }

    pub fn set_session_key(&mut self, key: Option<String>) {
        self.session_key = key;
    }

    pub fn has_session(&self) -> bool {
        self.session_key.is_some()
    }

    fn bw_path(&self) -> &str {
        self.cli_path.as_deref().unwrap_or("bw")
    }

    /// Run a `bw` command and return raw stdout.
    async fn run_command(&self, args: &[&str]) -> Result<String, BitwardenError> {
        self.run_command_with_env(args, &[]).await
    }

    async fn run_command_with_env(
        &self,
        args: &[&str],
        extra_env: &[(&str, &str)],
    ) -> Result<String, BitwardenError> {
        debug!("Running bw command: bw {}", redact_args(args));

        let mut cmd = Command::new(self.bw_path());
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("BW_NOINTERACTION", "true")
            .kill_on_drop(true);

        if let Some(ref key) = self.session_key {
            cmd.env("BW_SESSION", key);
        }
        for (k, v) in extra_env {
            cmd.env(k, v);
        }

        let result = tokio::time::timeout(self.timeout, cmd.output()).await;

        match result {
            Err(_) => Err(BitwardenError::timeout(format!(
                "bw {} timed out after {}s",
                args.first().copied().unwrap_or_default(),
                self.timeout.as_secs()
            ))),
            Ok(Err(e)) => {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Err(BitwardenError::cli_not_found(format!(
                        "Bitwarden CLI not found at '{}'. Install from https://bitwarden.com/help/cli/",
                        self.bw_path()
                    )))
                } else {
                    Err(BitwardenError::io(format!("Failed to execute bw: {}", e)))
                }
            }
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();

                if output.status.success() {
                    return Ok(stdout);
                }

                let code = output.status.code().unwrap_or(-1);
                debug!("bw exited with code {}: stderr={}", code, stderr.trim());
                Err(classify_failure(code, &stdout, &stderr))
            }
        }
    }

    async fn run_json<T: serde::de::DeserializeOwned>(&self, args: &[&str]) -> Result<T, BitwardenError> {
        let output = self.run_command(args).await?;
        parse_json(&output)
    }

    // ── Version & status ──────────────────────────────────────────

    /// Check that the `bw` CLI can be executed; returns its version.
    pub async fn check_available(&self) -> Result<String, BitwardenError> {
        let output = self.run_command(&["--version"]).await?;
        Ok(output.trim().to_string())
    }

    pub async fn status(&self) -> Result<StatusInfo, BitwardenError> {
        self.run_json(&["status"]).await
    }

    // ── Session ─────────────────────────────────────────────────────

    /// Unlock the vault with a master password and return the session key.
    pub async fn unlock(&self, password: &str) -> Result<String, BitwardenError> {
        let output = self
            .run_command_with_env(
                &["unlock", "--passwordenv", PASSWORD_ENV, "--raw"],
                &[(PASSWORD_ENV, password)],
            )
            .await?;
        let key = output.trim().to_string();
        if key.is_empty() {
            return Err(BitwardenError::auth_failed("bw unlock returned an empty session key"));
        }
        Ok(key)
    }

    /// Pull the latest vault state from the server.
    pub async fn sync(&self) -> Result<(), BitwardenError> {
        self.run_command(&["sync"])
            .await
            .map_err(|e| BitwardenError::sync_failed(format!("Could not sync with the Bitwarden server: {}", e.message)))?;
        Ok(())
    }

    // ── Listing ─────────────────────────────────────────────────────

    pub async fn list_items(&self) -> Result<Vec<ItemSummary>, BitwardenError> {
        self.run_json(&["list", "items"]).await
    }

    pub async fn list_folders(&self) -> Result<Vec<Folder>, BitwardenError> {
        self.run_json(&["list", "folders"]).await
    }

    pub async fn list_org_collections(&self, org_id: &str) -> Result<Vec<Collection>, BitwardenError> {
        self.run_json(&["list", "org-collections", "--organizationid", org_id]).await
    }

    /// Get an object template (e.g. `org-collection`) for create operations.
    pub async fn get_template(&self, template_name: &str) -> Result<Value, BitwardenError> {
        self.run_json(&["get", "template", template_name]).await
    }

    // ── Create operations ───────────────────────────────────────────

    pub async fn create_item(&self, item: &VaultItem) -> Result<VaultItem, BitwardenError> {
        let encoded = encode_payload(item)?;
        self.run_json(&["create", "item", &encoded]).await
    }

    pub async fn create_folder(&self, folder: &Folder) -> Result<Folder, BitwardenError> {
        let encoded = encode_payload(folder)?;
        self.run_json(&["create", "folder", &encoded]).await
    }

    /// Create an organization collection from a filled-in template.
    pub async fn create_org_collection(
        &self,
        org_id: &str,
        collection: &Value,
    ) -> Result<Collection, BitwardenError> {
        let encoded = encode_payload(collection)?;
        self.run_json(&["create", "org-collection", &encoded, "--organizationid", org_id])
            .await
    }

    /// Upload a file from disk as an attachment of `item_id`.
    pub async fn create_attachment(&self, item_id: &str, file_path: &Path) -> Result<(), BitwardenError> {
        let file = file_path.to_string_lossy();
        self.run_command(&["create", "attachment", "--file", &file, "--itemid", item_id])
            .await?;
        Ok(())
    }
}

/// Serialize to JSON and base64 encode, the form `bw create` expects.
fn encode_payload<T: serde::Serialize>(value: &T) -> Result<String, BitwardenError> {
    let json = serde_json::to_string(value)
        .map_err(|e| BitwardenError::parse(format!("Serialize error: {}", e)))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(json.as_bytes()))
}

fn parse_json<T: serde::de::DeserializeOwned>(output: &str) -> Result<T, BitwardenError> {
    serde_json::from_str(output.trim()).map_err(|e| {
        let preview: String = output.chars().take(200).collect();
        BitwardenError::parse(format!("Failed to parse JSON: {} (output: {})", e, preview))
    })
}

/// Map a failed `bw` invocation onto an error kind using its output.
fn classify_failure(code: i32, stdout: &str, stderr: &str) -> BitwardenError {
    let combined = format!("{} {}", stdout, stderr);
    if combined.contains("You are not logged in") {
        return BitwardenError::auth_failed("Not logged in. Run `bw login` first");
    }
    if combined.contains("Vault is locked") {
        return BitwardenError::vault_locked("Vault is locked");
    }
    if combined.contains("Invalid master password") {
        return BitwardenError::auth_failed("Invalid master password");
    }
    let msg = if !stderr.trim().is_empty() { stderr } else { stdout };
    BitwardenError::api(format!("bw command failed (exit {}): {}", code, msg.trim()))
}

/// Argument list for logs; encoded payloads are shortened.
fn redact_args(args: &[&str]) -> String {
    args.iter()
        .map(|a| {
            if a.len() > 64 {
                format!("<{} bytes>", a.len())
            } else {
                a.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
