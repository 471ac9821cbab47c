// ── kp2bw-keepass / kdbx ───────────────────────────────────────────────────────
//
// Encrypted KDBX reader backed by the `keepass` crate.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use keepass::db::{Entry, Group, Node, Value};
use keepass::error::DatabaseOpenError;
use keepass::{Database, DatabaseKey};
use log::{debug, info};

use super::source::{EntrySource, SourceCredentials};
use super::types::*;
use super::xml::parse_document_with_pool;

pub struct KdbxReader {
    path: PathBuf,
    credentials: SourceCredentials,
}

impl KdbxReader {
    pub fn new(path: impl AsRef<Path>, credentials: SourceCredentials) -> Self {
        Self { path: path.as_ref().to_path_buf(), credentials }
    }

    fn key(&self) -> Result<DatabaseKey, KeePassError> {
        let mut key = DatabaseKey::new();
        if let Some(password) = &self.credentials.password {
            key = key.with_password(password);
        }
        if let Some(key_file) = &self.credentials.key_file {
            let mut file = File::open(key_file).map_err(|e| {
                KeePassError::key_file(format!("Cannot open key file {}: {}", key_file.display(), e))
            })?;
            key = key.with_keyfile(&mut file).map_err(|e| {
                KeePassError::key_file(format!("Cannot read key file {}: {}", key_file.display(), e))
            })?;
        }
        Ok(key)
    }
}

impl EntrySource for KdbxReader {
    fn list_entries(&self) -> Result<Vec<SourceEntry>, KeePassError> {
        let data = std::fs::read(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                KeePassError::not_found(format!("File not found: {}", self.path.display()))
            } else {
                KeePassError::io(format!("Cannot open {}: {}", self.path.display(), e))
            }
        })?;
        let key = self.key()?;

        let db = Database::open(&mut data.as_slice(), key.clone()).map_err(open_error)?;
        let mut entries = Vec::new();
        let mut path = Vec::new();
        collect_group(&db.root, &mut path, &mut entries);

        // The database model drops entry <Binary> references, so read them
        // from the decrypted document.
        let xml = Database::get_xml(&mut data.as_slice(), key).map_err(open_error)?;
        attach_binaries(&mut entries, &String::from_utf8_lossy(&xml), binary_pool(&db))?;

        info!("Found {} entries in {}", entries.len(), self.path.display());
        Ok(entries)
    }
}

fn open_error(e: DatabaseOpenError) -> KeePassError {
    match e {
        DatabaseOpenError::Io(io) => KeePassError::io(io.to_string()),
        DatabaseOpenError::Key(key) => KeePassError::decryption(key.to_string()),
        other => KeePassError::format(other.to_string()),
    }
}

/// Attachment contents by reference id: the KDBX 4 inner header first, then
/// the KDBX 3 `Meta/Binaries` pool.
fn binary_pool(db: &Database) -> HashMap<String, Vec<u8>> {
    let mut pool: HashMap<String, Vec<u8>> = db
        .header_attachments
        .iter()
        .enumerate()
        .map(|(index, attachment)| (index.to_string(), attachment.content.clone()))
        .collect();
    for (index, binary) in db.meta.binaries.binaries.iter().enumerate() {
        let id = binary.identifier.clone().unwrap_or_else(|| index.to_string());
        pool.entry(id).or_insert_with(|| binary.content.clone());
    }
    pool
}

/// Fill `entries` with the attachments referenced from `xml`, matched by UUID.
fn attach_binaries(
    entries: &mut [SourceEntry],
    xml: &str,
    pool: HashMap<String, Vec<u8>>,
) -> Result<(), KeePassError> {
    let mut by_uuid: HashMap<String, Vec<EntryBinary>> = parse_document_with_pool(xml, pool)?
        .into_iter()
        .filter(|e| !e.attachments.is_empty())
        .map(|e| (e.uuid, e.attachments))
        .collect();

    for entry in entries.iter_mut() {
        if let Some(binaries) = by_uuid.remove(&entry.uuid) {
            debug!("{} carries {} attachment(s)", entry.display_path(), binaries.len());
            entry.attachments = binaries;
        }
    }
    Ok(())
}

/// Depth-first walk; `path` excludes the root group.
fn collect_group(group: &Group, path: &mut Vec<String>, out: &mut Vec<SourceEntry>) {
    for node in &group.children {
        match node {
            Node::Entry(entry) => out.push(convert_entry(entry, path)),
            Node::Group(child) => {
                path.push(child.name.clone());
                collect_group(child, path, out);
                path.pop();
            }
        }
    }
}

fn convert_entry(entry: &Entry, path: &[String]) -> SourceEntry {
    let mut out = SourceEntry {
        uuid: normalize_uuid(entry.uuid.as_bytes()),
        group_path: path.to_vec(),
        tags: entry.tags.clone(),
        ..Default::default()
    };

    // Field order is not preserved by the database model; sort for stable output.
    let mut keys: Vec<&String> = entry.fields.keys().collect();
    keys.sort();
    for key in keys {
        let (value, is_protected) = match &entry.fields[key] {
            Value::Unprotected(s) => (s.clone(), false),
            Value::Protected(secret) => (String::from_utf8_lossy(secret.unsecure()).to_string(), true),
            Value::Bytes(_) => {
                debug!("Skipping binary field '{}' on {}", key, out.uuid);
                continue;
            }
        };
        out.set_string_field(key, value, is_protected);
    }
    out
}
