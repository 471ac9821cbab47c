//! Secret acquisition and the `bw` setup confirmation.
//!
//! Priority for every secret:
//! 1. command-line flag
//! 2. environment variable (non-empty)
//! 3. interactive TTY prompt via `rpassword`

use std::io::{BufRead, IsTerminal, Write};
use std::path::Path;

use kp2bw_bitwarden::bitwarden::SessionCredentials;
use secrecy::SecretString;

use crate::error::AppError;

/// KeePass database password.
pub const KEEPASS_PASSWORD_ENV: &str = "KP2BW_KEEPASS_PASSWORD";
/// Bitwarden master password.
pub const BW_PASSWORD_ENV: &str = "BW_PASSWORD";
/// Session key of an already unlocked vault.
pub const BW_SESSION_ENV: &str = "BW_SESSION";

fn env_secret(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Read a hidden line from the terminal, or `None` when stdin is not a TTY.
fn read_hidden(label: &str) -> Result<Option<String>, AppError> {
    if !std::io::stdin().is_terminal() {
        return Ok(None);
    }
    eprint!("{}: ", label);
    rpassword::read_password()
        .map(Some)
        .map_err(|e| AppError::io(format!("failed to read {}: {}", label.to_lowercase(), e)))
}

fn is_xml_export(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xml"))
        .unwrap_or(false)
}

/// Password for the KeePass database.
///
/// XML exports need none. An empty prompt answer means "key file only".
pub fn keepass_password(flag: Option<&str>, path: &Path) -> Result<Option<String>, AppError> {
    if is_xml_export(path) {
        return Ok(None);
    }
    if let Some(p) = flag {
        return Ok(Some(p.to_string()));
    }
    if let Some(p) = env_secret(KEEPASS_PASSWORD_ENV) {
        return Ok(Some(p));
    }
    Ok(read_hidden("KeePass password")?.filter(|p| !p.is_empty()))
}

/// How to open the Bitwarden vault.
///
/// Flags beat environment variables; within each source a session beats a
/// password.
pub fn bitwarden_credentials(
    password_flag: Option<&str>,
    session_flag: Option<&str>,
) -> Result<SessionCredentials, AppError> {
    if let Some(key) = session_flag {
        return Ok(SessionCredentials::Session(SecretString::new(key.to_string())));
    }
    if let Some(p) = password_flag {
        return Ok(SessionCredentials::MasterPassword(SecretString::new(p.to_string())));
    }
    if let Some(key) = env_secret(BW_SESSION_ENV) {
        return Ok(SessionCredentials::Session(SecretString::new(key)));
    }
    if let Some(p) = env_secret(BW_PASSWORD_ENV) {
        return Ok(SessionCredentials::MasterPassword(SecretString::new(p)));
    }
    match read_hidden("Bitwarden master password")? {
        Some(p) if !p.is_empty() => Ok(SessionCredentials::MasterPassword(SecretString::new(p))),
        Some(_) => Err(AppError::usage("empty Bitwarden master password")),
        None => Err(AppError::usage(format!(
            "No Bitwarden credentials. Pass --bw-password or --bw-session, set {} or {}, or run interactively.",
            BW_PASSWORD_ENV, BW_SESSION_ENV
        ))),
    }
}

/// Ask the user to confirm `bw` is installed and logged in.
///
/// Repeats until the answer is `y` or `n`. `n` and end of input cancel the run.
pub fn confirm_with<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<(), AppError> {
    let io_err = |e: std::io::Error| AppError::io(format!("confirmation prompt: {}", e));

    writeln!(output, "Do you have bw cli installed and is it set up?").map_err(io_err)?;
    writeln!(
        output,
        "1) If you use an on premise installation, use bw config to set the url: bw config server <url>"
    )
    .map_err(io_err)?;
    writeln!(
        output,
        "2) execute bw login once, as this script uses bw unlock only: bw login <user>"
    )
    .map_err(io_err)?;

    let mut line = String::new();
    loop {
        write!(output, "Confirm that you have set up bw cli [y/n]: ").map_err(io_err)?;
        output.flush().map_err(io_err)?;

        line.clear();
        if input.read_line(&mut line).map_err(io_err)? == 0 {
            return Err(AppError::cancelled("exiting..."));
        }
        match line.trim().to_lowercase().as_str() {
            "y" => return Ok(()),
            "n" => return Err(AppError::cancelled("exiting...")),
            _ => continue,
        }
    }
}

/// [`confirm_with`] on the process stdin/stdout.
pub fn confirm() -> Result<(), AppError> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    confirm_with(&mut stdin.lock(), &mut stdout)
}
