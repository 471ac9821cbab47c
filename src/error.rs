//! Top-level error type and exit codes.

use kp2bw_bitwarden::bitwarden::BitwardenError;
use kp2bw_keepass::keepass::KeePassError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppErrorKind {
    /// Invalid or conflicting command-line arguments.
    Usage,
    /// Unreadable or invalid config file.
    Config,
    /// The KeePass database could not be read.
    Source,
    /// The Bitwarden vault could not be reached or unlocked.
    Destination,
    /// The user declined the confirmation prompt.
    Cancelled,
    /// Terminal or prompt I/O failure.
    Io,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub message: String,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { kind: AppErrorKind::Usage, message: msg.into() }
    }
    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: AppErrorKind::Config, message: msg.into() }
    }
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self { kind: AppErrorKind::Cancelled, message: msg.into() }
    }
    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: AppErrorKind::Io, message: msg.into() }
    }

    /// Process exit code: 2 for argument/config problems and cancellation, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self.kind {
            AppErrorKind::Usage | AppErrorKind::Config | AppErrorKind::Cancelled => 2,
            AppErrorKind::Source | AppErrorKind::Destination | AppErrorKind::Io => 1,
        }
    }
}

impl From<KeePassError> for AppError {
    fn from(e: KeePassError) -> Self {
        Self { kind: AppErrorKind::Source, message: format!("KeePass: {}", e) }
    }
}

impl From<BitwardenError> for AppError {
    fn from(e: BitwardenError) -> Self {
        Self { kind: AppErrorKind::Destination, message: format!("Bitwarden: {}", e) }
    }
}
