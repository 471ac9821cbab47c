// ── kp2bw-convert / mapper ─────────────────────────────────────────────────────
//
// SourceEntry + ConvertConfig → ResolvedItem. Pure; never fails.

use kp2bw_bitwarden::bitwarden::{AttachmentPayload, CustomField, LoginData, LoginUri};
use kp2bw_keepass::keepass::SourceEntry;

use super::types::*;

/// Map one entry into a Bitwarden login item.
pub fn map_entry(entry: &SourceEntry, config: &ConvertConfig) -> ResolvedItem {
    let mut attachments = Vec::new();

    let notes = if exceeds_limit(&entry.notes) {
        attachments.push(AttachmentPayload::Synthetic {
            name: NOTES_ATTACHMENT.to_string(),
            data: entry.notes.clone(),
        });
        String::new()
    } else {
        entry.notes.clone()
    };

    let mut fields = Vec::with_capacity(entry.custom_properties.len());
    for prop in &entry.custom_properties {
        if exceeds_limit(&prop.value) {
            attachments.push(AttachmentPayload::Synthetic {
                name: prop.name.clone(),
                data: prop.value.clone(),
            });
        } else if prop.is_protected {
            fields.push(CustomField::hidden(&prop.name, &prop.value));
        } else {
            fields.push(CustomField::text(&prop.name, &prop.value));
        }
    }

    attachments.extend(entry.attachments.iter().map(|a| AttachmentPayload::Native {
        name: a.filename.clone(),
        data: a.data.clone(),
    }));

    ResolvedItem {
        source_id: entry.uuid.clone(),
        title: item_title(entry, config),
        notes,
        login: LoginData {
            uris: if entry.url.is_empty() { Vec::new() } else { vec![LoginUri::new(&entry.url)] },
            username: Some(entry.username.clone()),
            password: Some(entry.password.clone()),
            totp: if entry.otp.is_empty() { None } else { Some(entry.otp.clone()) },
        },
        fields,
        folder: folder_name(entry, config.folder_mode),
        collection: collection_target(entry, &config.collection),
        organization_id: config.organization_id.clone(),
        attachments,
    }
}

fn exceeds_limit(value: &str) -> bool {
    value.chars().count() > MAX_FIELD_LENGTH
}

fn item_title(entry: &SourceEntry, config: &ConvertConfig) -> String {
    let title = if entry.title.is_empty() { UNTITLED } else { entry.title.as_str() };
    if !config.title_prefix || config.is_nested() || entry.is_at_root() {
        return title.to_string();
    }

    let mut out: String = entry
        .group_path
        .iter()
        .skip(config.prefix_skip_depth)
        .map(|segment| format!("{} / ", segment))
        .collect();
    out.push_str(title);
    out
}

fn folder_name(entry: &SourceEntry, mode: FolderMode) -> Option<String> {
    if entry.is_at_root() {
        return None;
    }
    match mode {
        FolderMode::FirstLevel => entry.first_level_group().map(str::to_string),
        FolderMode::FullPath => Some(entry.group_path.join("/")),
    }
}

fn collection_target(entry: &SourceEntry, mode: &CollectionMode) -> CollectionTarget {
    match mode {
        CollectionMode::None => CollectionTarget::None,
        CollectionMode::Fixed(id) => CollectionTarget::Fixed(id.clone()),
        CollectionMode::Auto => match entry.first_level_group() {
            Some(group) => CollectionTarget::Named(group.to_string()),
            None => CollectionTarget::None,
        },
        CollectionMode::Nested(parent) => CollectionTarget::Nested {
            parent_id: parent.clone(),
            path: if entry.is_at_root() { None } else { Some(entry.group_path.join("/")) },
        },
    }
}
