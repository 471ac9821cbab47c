// ── kp2bw-keepass / source ─────────────────────────────────────────────────────
//
// Reader abstraction and selection by file extension.

use std::path::{Path, PathBuf};

use super::types::*;
use super::xml::XmlExportReader;

/// Anything that can produce the flat list of decrypted entries.
pub trait EntrySource {
    /// Every entry in the database, in document order. Historical revisions
    /// are not included.
    fn list_entries(&self) -> Result<Vec<SourceEntry>, KeePassError>;
}

/// Credentials for opening an encrypted database.
#[derive(Debug, Clone, Default)]
pub struct SourceCredentials {
    pub password: Option<String>,
    pub key_file: Option<PathBuf>,
}

/// Pick a reader for `path`.
///
/// `.xml` files are read as KeePass XML exports. Everything else is treated
/// as an encrypted KDBX database, which needs the `kdbx` feature.
pub fn open_source(
    path: &Path,
    credentials: SourceCredentials,
) -> Result<Box<dyn EntrySource>, KeePassError> {
    if !path.exists() {
        return Err(KeePassError::not_found(format!("File not found: {}", path.display())));
    }
    if let Some(key_file) = &credentials.key_file {
        if !key_file.exists() {
            return Err(KeePassError::key_file(format!(
                "Key file not found: {}",
                key_file.display()
            )));
        }
    }

    let is_xml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xml"))
        .unwrap_or(false);

    if is_xml {
        log::debug!("Reading {} as KeePass XML export", path.display());
        return Ok(Box::new(XmlExportReader::new(path)));
    }

    open_kdbx(path, credentials)
}

#[cfg(feature = "kdbx")]
fn open_kdbx(
    path: &Path,
    credentials: SourceCredentials,
) -> Result<Box<dyn EntrySource>, KeePassError> {
    log::debug!("Reading {} as KDBX database", path.display());
    Ok(Box::new(super::kdbx::KdbxReader::new(path, credentials)))
}

#[cfg(not(feature = "kdbx"))]
fn open_kdbx(
    path: &Path,
    _credentials: SourceCredentials,
) -> Result<Box<dyn EntrySource>, KeePassError> {
    Err(KeePassError::format(format!(
        "{} is not an XML export and KDBX support is not compiled in (enable the `kdbx` feature)",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_database_is_not_found() {
        let err = open_source(Path::new("/nonexistent/db.kdbx"), SourceCredentials::default())
            .err()
            .unwrap();
        assert_eq!(err.kind, KeePassErrorKind::NotFound);
    }

    #[test]
    fn missing_key_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("export.xml");
        std::fs::write(&db, "<KeePassFile/>").unwrap();

        let creds = SourceCredentials {
            password: None,
            key_file: Some(dir.path().join("missing.key")),
        };
        let err = open_source(&db, creds).err().unwrap();
        assert_eq!(err.kind, KeePassErrorKind::KeyFile);
    }

    #[test]
    fn xml_extension_selects_export_reader() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("Export.XML");
        std::fs::write(&db, "<KeePassFile><Root><Group><Name>R</Name></Group></Root></KeePassFile>")
            .unwrap();

        let source = open_source(&db, SourceCredentials::default()).unwrap();
        assert!(source.list_entries().unwrap().is_empty());
    }

    #[cfg(feature = "kdbx")]
    #[test]
    fn kdbx_extension_decrypts_with_credentials() {
        use keepass::config::{DatabaseConfig, KdfConfig};
        use keepass::db::{Entry, Value};
        use keepass::{Database, DatabaseKey};

        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("vault.kdbx");
        let config = DatabaseConfig { kdf_config: KdfConfig::Aes { rounds: 10 }, ..Default::default() };
        let mut db = Database::new(config);
        let mut entry = Entry::new();
        entry.fields.insert("Title".into(), Value::Unprotected("Router".into()));
        db.root.add_child(entry);
        let mut file = std::fs::File::create(&db_path).unwrap();
        db.save(&mut file, DatabaseKey::new().with_password("right")).unwrap();

        let creds = |pw: &str| SourceCredentials { password: Some(pw.into()), key_file: None };

        let wrong = open_source(&db_path, creds("wrong")).unwrap();
        assert_eq!(wrong.list_entries().unwrap_err().kind, KeePassErrorKind::Decryption);

        let right = open_source(&db_path, creds("right")).unwrap();
        let entries = right.list_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Router");
    }
}
