// ── kp2bw-keepass / xml ────────────────────────────────────────────────────────
//
// KeePass 2.x XML export reader. Walks the document once, collecting the
// meta binary pool and every entry outside of <History> blocks.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use base64::Engine;
use flate2::read::GzDecoder;
use log::{debug, info, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::source::EntrySource;
use super::types::*;

/// Reads entries from a KeePass 2.x XML export file.
#[derive(Debug, Clone)]
pub struct XmlExportReader {
    path: PathBuf,
}

impl XmlExportReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EntrySource for XmlExportReader {
    fn list_entries(&self) -> Result<Vec<SourceEntry>, KeePassError> {
        if !self.path.exists() {
            return Err(KeePassError::not_found(format!(
                "File not found: {}",
                self.path.display()
            )));
        }
        let data = std::fs::read_to_string(&self.path)
            .map_err(|e| KeePassError::io(format!("Failed to read {}: {}", self.path.display(), e)))?;
        let entries = parse_document(&data)?;
        info!("Found {} entries in {}", entries.len(), self.path.display());
        Ok(entries)
    }
}

/// Binary reference recorded while parsing, resolved once the pool is known.
struct PendingBinary {
    filename: String,
    pool_ref: Option<String>,
    inline: Option<String>,
}

/// Per-entry parse state.
#[derive(Default)]
struct EntryState {
    entry: SourceEntry,
    binaries: Vec<PendingBinary>,
    key: String,
    value: String,
    protected: bool,
    binary_ref: Option<String>,
}

/// Parse a KeePass XML document into source entries.
pub fn parse_document(data: &str) -> Result<Vec<SourceEntry>, KeePassError> {
    parse_document_with_pool(data, HashMap::new())
}

/// Parse a KeePass XML document whose binaries are (partly) stored outside
/// of it, such as the inner header of a KDBX 4 file.
///
/// `pool` maps binary ids to their content and wins over `Meta/Binaries`.
pub fn parse_document_with_pool(
    data: &str,
    mut pool: HashMap<String, Vec<u8>>,
) -> Result<Vec<SourceEntry>, KeePassError> {
    let mut reader = Reader::from_str(data);

    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut groups: Vec<String> = Vec::new();
    let mut pool_id: Option<(String, bool)> = None;
    let mut current: Option<EntryState> = None;
    let mut history_depth = 0usize;
    let mut parsed: Vec<(SourceEntry, Vec<PendingBinary>)> = Vec::new();
    let mut saw_root_element = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| KeePassError::format(format!("Invalid XML at byte {}: {}", reader.buffer_position(), e)))?;

        match event {
            Event::Start(ref start) => {
                let name = local_name(start);
                if !saw_root_element {
                    if name != "KeePassFile" {
                        return Err(KeePassError::format(format!(
                            "Not a KeePass XML document (root element <{}>)",
                            name
                        )));
                    }
                    saw_root_element = true;
                }
                text.clear();
                open_element(&name, start, &path, &mut groups, &mut current, &mut history_depth, &mut pool_id)?;
                path.push(name);
            }
            Event::Empty(ref start) => {
                let name = local_name(start);
                if !saw_root_element {
                    if name != "KeePassFile" {
                        return Err(KeePassError::format(format!(
                            "Not a KeePass XML document (root element <{}>)",
                            name
                        )));
                    }
                    saw_root_element = true;
                }
                open_element(&name, start, &path, &mut groups, &mut current, &mut history_depth, &mut pool_id)?;
                text.clear();
                path.push(name.clone());
                close_element(&name, &path, &mut text, &mut groups, &mut current, &mut history_depth, &mut pool_id, &mut pool, &mut parsed)?;
                path.pop();
            }
            Event::Text(ref t) => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| KeePassError::format(format!("Invalid XML text: {}", e)))?;
                text.push_str(&unescaped);
            }
            Event::CData(ref c) => {
                text.push_str(&String::from_utf8_lossy(c));
            }
            Event::End(ref end) => {
                let name = String::from_utf8_lossy(end.local_name().as_ref()).to_string();
                close_element(&name, &path, &mut text, &mut groups, &mut current, &mut history_depth, &mut pool_id, &mut pool, &mut parsed)?;
                path.pop();
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root_element {
        return Err(KeePassError::format("Empty document"));
    }

    debug!("Binary pool holds {} attachment(s)", pool.len());

    let mut entries = Vec::with_capacity(parsed.len());
    for (mut entry, binaries) in parsed {
        for binary in binaries {
            let data = match (binary.pool_ref, binary.inline) {
                (Some(id), _) => match pool.get(&id) {
                    Some(data) => data.clone(),
                    None => {
                        warn!(
                            "Attachment '{}' on '{}' references missing binary {}",
                            binary.filename,
                            entry.display_path(),
                            id
                        );
                        continue;
                    }
                },
                (None, Some(inline)) => decode_base64(&inline)?,
                (None, None) => Vec::new(),
            };
            entry.attachments.push(EntryBinary { filename: binary.filename, data });
        }
        entries.push(entry);
    }

    Ok(entries)
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).to_string()
}

fn attribute(start: &BytesStart<'_>, key: &str) -> Result<Option<String>, KeePassError> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| KeePassError::format(format!("Invalid attribute: {}", e)))?;
        if attr.key.as_ref() == key.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| KeePassError::format(format!("Invalid attribute value: {}", e)))?;
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}

fn is_true(value: Option<String>) -> bool {
    value.map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

fn parent_is(path: &[String], name: &str) -> bool {
    path.last().map(|p| p == name).unwrap_or(false)
}

#[allow(clippy::too_many_arguments)]
fn open_element(
    name: &str,
    start: &BytesStart<'_>,
    path: &[String],
    groups: &mut Vec<String>,
    current: &mut Option<EntryState>,
    history_depth: &mut usize,
    pool_id: &mut Option<(String, bool)>,
) -> Result<(), KeePassError> {
    if *history_depth > 0 {
        if name == "History" {
            *history_depth += 1;
        }
        return Ok(());
    }

    match name {
        "Group" => groups.push(String::new()),
        "Entry" if current.is_none() => *current = Some(EntryState::default()),
        "History" if current.is_some() => *history_depth = 1,
        "Binary" if parent_is(path, "Binaries") => {
            let id = attribute(start, "ID")?.unwrap_or_default();
            let compressed = is_true(attribute(start, "Compressed")?);
            *pool_id = Some((id, compressed));
        }
        "Value" => {
            if let Some(state) = current.as_mut() {
                if parent_is(path, "String") {
                    // Plain exports mark protected strings with ProtectedInMemory,
                    // decrypted KDBX payloads with Protected.
                    state.protected = is_true(attribute(start, "ProtectedInMemory")?)
                        || is_true(attribute(start, "Protected")?);
                } else if parent_is(path, "Binary") {
                    state.binary_ref = attribute(start, "Ref")?;
                }
            }
        }
        "String" | "Binary" => {
            if let Some(state) = current.as_mut() {
                state.key.clear();
                state.value.clear();
                state.protected = false;
                state.binary_ref = None;
            }
        }
        _ => {}
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn close_element(
    name: &str,
    path: &[String],
    text: &mut String,
    groups: &mut Vec<String>,
    current: &mut Option<EntryState>,
    history_depth: &mut usize,
    pool_id: &mut Option<(String, bool)>,
    pool: &mut HashMap<String, Vec<u8>>,
    parsed: &mut Vec<(SourceEntry, Vec<PendingBinary>)>,
) -> Result<(), KeePassError> {
    if *history_depth > 0 {
        if name == "History" {
            *history_depth -= 1;
        }
        return Ok(());
    }

    // `path` still ends with `name`; the parent sits one below it.
    let parent = &path[..path.len().saturating_sub(1)];

    match name {
        "Group" => {
            groups.pop();
        }
        "Name" if parent_is(parent, "Group") && current.is_none() => {
            if let Some(last) = groups.last_mut() {
                *last = text.trim().to_string();
            }
        }
        "Binary" if parent_is(parent, "Binaries") => {
            if let Some((id, compressed)) = pool_id.take() {
                let mut data = decode_base64(text)?;
                if compressed {
                    data = gunzip(&data)?;
                }
                pool.entry(id).or_insert(data);
            }
        }
        "Entry" => {
            if let Some(state) = current.take() {
                let mut entry = state.entry;
                // The outermost group is the database root and is not part of the path.
                entry.group_path = groups.iter().skip(1).cloned().collect();
                parsed.push((entry, state.binaries));
            }
        }
        _ => {
            if let Some(state) = current.as_mut() {
                match name {
                    "UUID" if parent_is(parent, "Entry") => {
                        let raw = decode_base64(text.trim())?;
                        state.entry.uuid = normalize_uuid(&raw);
                    }
                    "Tags" if parent_is(parent, "Entry") => {
                        state.entry.tags = split_tags(text);
                    }
                    "Key" => state.key = text.clone(),
                    "Value" if parent_is(parent, "String") => state.value = text.clone(),
                    "Value" if parent_is(parent, "Binary") && state.binary_ref.is_none() => {
                        state.value = text.clone();
                    }
                    "String" => {
                        let key = std::mem::take(&mut state.key);
                        let value = std::mem::take(&mut state.value);
                        state.entry.set_string_field(&key, value, state.protected);
                    }
                    "Binary" => {
                        let inline = std::mem::take(&mut state.value);
                        state.binaries.push(PendingBinary {
                            filename: std::mem::take(&mut state.key),
                            pool_ref: state.binary_ref.take(),
                            inline: if inline.trim().is_empty() { None } else { Some(inline) },
                        });
                    }
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

fn decode_base64(raw: &str) -> Result<Vec<u8>, KeePassError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| KeePassError::format(format!("Invalid base64 content: {}", e)))
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>, KeePassError> {
    let mut out = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| KeePassError::format(format!("Invalid compressed binary: {}", e)))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const ENTRY_A: &str = "z8AUEGjoNUe87q8MGtq64A==";

    fn b64(data: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(data)
    }

    fn sample_document(binary_pool: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>
<KeePassFile>
  <Meta>
    <Generator>KeePass</Generator>
    <Binaries>{binary_pool}</Binaries>
  </Meta>
  <Root>
    <Group>
      <UUID>AAAAAAAAAAAAAAAAAAAAAA==</UUID>
      <Name>Database</Name>
      <Entry>
        <UUID>{ENTRY_A}</UUID>
        <Tags>prod;web</Tags>
        <String><Key>Title</Key><Value>Root entry</Value></String>
        <String><Key>UserName</Key><Value>alice</Value></String>
        <String><Key>Password</Key><Value ProtectedInMemory="True"> p&amp;ss </Value></String>
        <String><Key>URL</Key><Value>https://a.example</Value></String>
        <String><Key>Notes</Key><Value /></String>
        <String><Key>PIN</Key><Value ProtectedInMemory="True">1234</Value></String>
        <String><Key>Comment</Key><Value>plain</Value></String>
        <Binary><Key>cert.pem</Key><Value Ref="0" /></Binary>
        <History>
          <Entry>
            <UUID>{ENTRY_A}</UUID>
            <String><Key>Title</Key><Value>Old title</Value></String>
          </Entry>
        </History>
      </Entry>
      <Group>
        <UUID>AQEBAQEBAQEBAQEBAQEBAQ==</UUID>
        <Name>Infra</Name>
        <Group>
          <UUID>AgICAgICAgICAgICAgICAg==</UUID>
          <Name>Network</Name>
          <Entry>
            <UUID>EBAQEBAQEBAQEBAQEBAQEA==</UUID>
            <String><Key>Title</Key><Value>Router</Value></String>
            <String><Key>otp</Key><Value>otpauth://totp/r?secret=JBSWY3DP</Value></String>
          </Entry>
        </Group>
      </Group>
    </Group>
    <DeletedObjects />
  </Root>
</KeePassFile>"#
        )
    }

    #[test]
    fn parses_fields_paths_and_history() {
        let pool = format!(r#"<Binary ID="0">{}</Binary>"#, b64(b"certificate"));
        let entries = parse_document(&sample_document(&pool)).unwrap();
        assert_eq!(entries.len(), 2);

        let root = &entries[0];
        assert_eq!(root.uuid, "CFC0141068E83547BCEEAF0C1ADABAE0");
        assert_eq!(root.title, "Root entry");
        assert_eq!(root.username, "alice");
        assert_eq!(root.password, " p&ss ");
        assert_eq!(root.notes, "");
        assert!(root.group_path.is_empty());
        assert_eq!(root.tags, vec!["prod", "web"]);
        assert_eq!(root.custom_properties.len(), 2);
        assert!(root.custom_properties[0].is_protected);
        assert!(!root.custom_properties[1].is_protected);
        assert_eq!(root.attachments.len(), 1);
        assert_eq!(root.attachments[0].filename, "cert.pem");
        assert_eq!(root.attachments[0].data, b"certificate");

        let router = &entries[1];
        assert_eq!(router.group_path, vec!["Infra", "Network"]);
        assert_eq!(router.otp, "otpauth://totp/r?secret=JBSWY3DP");
        assert!(router.custom_properties.is_empty());
    }

    #[test]
    fn compressed_pool_binary_is_inflated() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"zipped bytes").unwrap();
        let gz = encoder.finish().unwrap();
        let pool = format!(r#"<Binary ID="0" Compressed="True">{}</Binary>"#, b64(&gz));

        let entries = parse_document(&sample_document(&pool)).unwrap();
        assert_eq!(entries[0].attachments[0].data, b"zipped bytes");
    }

    #[test]
    fn protected_in_memory_marks_custom_fields_hidden() {
        let doc = r#"<KeePassFile><Root><Group><Name>Database</Name>
            <Entry>
              <UUID>z8AUEGjoNUe87q8MGtq64A==</UUID>
              <String><Key>Title</Key><Value>Bank</Value></String>
              <String><Key>PIN</Key><Value ProtectedInMemory="True">1234</Value></String>
              <String><Key>Branch</Key><Value ProtectedInMemory="False">north</Value></String>
              <String><Key>Token</Key><Value Protected="True">abc</Value></String>
            </Entry>
        </Group></Root></KeePassFile>"#;

        let entries = parse_document(doc).unwrap();
        let props = &entries[0].custom_properties;
        let pin = props.iter().find(|p| p.name == "PIN").unwrap();
        let branch = props.iter().find(|p| p.name == "Branch").unwrap();
        let token = props.iter().find(|p| p.name == "Token").unwrap();
        assert!(pin.is_protected);
        assert_eq!(pin.value, "1234");
        assert!(!branch.is_protected);
        assert!(token.is_protected);
    }

    #[test]
    fn external_pool_resolves_refs_without_meta_binaries() {
        let mut pool = HashMap::new();
        pool.insert("0".to_string(), b"ssh key".to_vec());

        let entries = parse_document_with_pool(&sample_document(""), pool).unwrap();
        assert_eq!(entries[0].attachments.len(), 1);
        assert_eq!(entries[0].attachments[0].filename, "cert.pem");
        assert_eq!(entries[0].attachments[0].data, b"ssh key");
    }

    #[test]
    fn external_pool_wins_over_meta_binaries() {
        let mut pool = HashMap::new();
        pool.insert("0".to_string(), b"decoded".to_vec());
        let meta = format!(r#"<Binary ID="0">{}</Binary>"#, b64(b"raw"));

        let entries = parse_document_with_pool(&sample_document(&meta), pool).unwrap();
        assert_eq!(entries[0].attachments[0].data, b"decoded");
    }

    #[test]
    fn missing_pool_binary_is_dropped() {
        let entries = parse_document(&sample_document("")).unwrap();
        assert!(entries[0].attachments.is_empty());
    }

    #[test]
    fn rejects_foreign_root_element() {
        let err = parse_document("<html><body/></html>").unwrap_err();
        assert_eq!(err.kind, KeePassErrorKind::Format);
    }

    #[test]
    fn rejects_empty_document() {
        let err = parse_document("").unwrap_err();
        assert_eq!(err.kind, KeePassErrorKind::Format);
    }

    #[test]
    fn reader_reports_missing_file() {
        let reader = XmlExportReader::new("/nonexistent/kp2bw/export.xml");
        let err = reader.list_entries().unwrap_err();
        assert_eq!(err.kind, KeePassErrorKind::NotFound);
    }

    #[test]
    fn reader_loads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.xml");
        std::fs::write(&path, sample_document("")).unwrap();

        let entries = XmlExportReader::new(&path).list_entries().unwrap();
        assert_eq!(entries.len(), 2);
    }
}
