// ── kp2bw-convert / resolver ───────────────────────────────────────────────────
//
// Two-pass index build. Pass 1 maps every entry without a field reference;
// pass 2 resolves the deferred entries against a read-only view of pass 1
// and its outcomes are applied once all of them are known.

use std::collections::HashMap;

use kp2bw_keepass::keepass::SourceEntry;

use super::error::ConvertError;
use super::mapper::map_entry;
use super::reference::{parse_token, LookupMode, ReferencedField};
use super::sink::{MigrationEvent, MigrationSink};
use super::types::*;

/// Resolved items keyed by source identifier, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct EntryIndex {
    order: Vec<String>,
    items: HashMap<String, ResolvedItem>,
}

impl EntryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item. Re-inserting an identifier replaces the item in place.
    pub fn insert(&mut self, item: ResolvedItem) {
        if !self.items.contains_key(&item.source_id) {
            self.order.push(item.source_id.clone());
        }
        self.items.insert(item.source_id.clone(), item);
    }

    pub fn get(&self, id: &str) -> Option<&ResolvedItem> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ResolvedItem> {
        self.items.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedItem> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }
}

/// Result of resolving the full entry sequence.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub index: EntryIndex,
    /// Entries whose username or password held a reference.
    pub deferred: usize,
    /// Deferred entries folded into their target as an extra URI.
    pub merged: usize,
    /// Deferred entries that could not be resolved and were left out.
    pub failed: usize,
}

/// What a deferred entry turns into.
#[derive(Debug)]
enum Outcome {
    Merge { target: String, uri: String },
    NewItem(ResolvedItem),
}

/// Build the entry index, resolving field references.
pub fn resolve(
    entries: &[SourceEntry],
    config: &ConvertConfig,
    sink: &mut dyn MigrationSink,
) -> Resolution {
    let mut resolution = Resolution::default();
    let mut deferred: Vec<&SourceEntry> = Vec::new();

    for entry in entries {
        if has_reference(entry) {
            sink.record(MigrationEvent::Deferred { entry: &label(entry) });
            deferred.push(entry);
        } else {
            resolution.index.insert(map_entry(entry, config));
        }
    }
    resolution.deferred = deferred.len();

    if deferred.is_empty() {
        return resolution;
    }

    log::info!("Resolving {} entries with field references", deferred.len());

    let view = &resolution.index;
    let outcomes: Vec<(&SourceEntry, Result<Outcome, ConvertError>)> = deferred
        .into_iter()
        .map(|entry| (entry, resolve_deferred(entry, view, config)))
        .collect();

    for (entry, outcome) in outcomes {
        match outcome {
            Ok(Outcome::Merge { target, uri }) => {
                if let Some(item) = resolution.index.get_mut(&target) {
                    if !uri.is_empty() {
                        item.add_uri(&uri);
                    }
                    let target_title = item.title.clone();
                    sink.record(MigrationEvent::AliasMerged { entry: &label(entry), target: &target_title });
                }
                resolution.merged += 1;
            }
            Ok(Outcome::NewItem(item)) => resolution.index.insert(item),
            Err(error) => {
                sink.record(MigrationEvent::ReferenceFailed { entry: &label(entry), error: &error });
                resolution.failed += 1;
            }
        }
    }

    resolution
}

fn has_reference(entry: &SourceEntry) -> bool {
    entry.username.contains(REFERENCE_MARKER) || entry.password.contains(REFERENCE_MARKER)
}

fn label(entry: &SourceEntry) -> String {
    format!("{} [{}]", entry.display_path(), entry.uuid)
}

/// Resolve one deferred entry against the pass-1 view.
fn resolve_deferred(
    entry: &SourceEntry,
    view: &EntryIndex,
    config: &ConvertConfig,
) -> Result<Outcome, ConvertError> {
    let mut resolved = entry.clone();
    let mut touched: Vec<&ResolvedItem> = Vec::with_capacity(2);

    for slot in [Slot::Username, Slot::Password] {
        let raw = slot.get(entry);
        if !raw.contains(REFERENCE_MARKER) {
            continue;
        }

        let token = parse_token(raw)?;
        if let LookupMode::Other(mode) = &token.mode {
            return Err(ConvertError::unsupported_mode(format!(
                "Unsupported REF lookup mode '{}' in '{}'",
                mode, raw
            )));
        }

        let target = view.get(&token.target).ok_or_else(|| {
            ConvertError::unresolved(format!("Could not resolve REF to {}", token.target))
        })?;

        let value = match &token.field {
            ReferencedField::Username => target.username(),
            ReferencedField::Password => target.password(),
            ReferencedField::Other(code) => {
                return Err(ConvertError::unsupported_field(format!(
                    "Unsupported REF field '{}' in '{}'",
                    code, raw
                )))
            }
        };
        slot.set(&mut resolved, value.to_string());
        touched.push(target);
    }

    let all_match = touched
        .iter()
        .all(|t| t.username() == resolved.username && t.password() == resolved.password);

    match touched.last() {
        Some(target) if all_match => Ok(Outcome::Merge {
            target: target.source_id.clone(),
            uri: resolved.url,
        }),
        _ => Ok(Outcome::NewItem(map_entry(&resolved, config))),
    }
}

#[derive(Clone, Copy)]
enum Slot {
    Username,
    Password,
}

impl Slot {
    fn get(self, entry: &SourceEntry) -> &str {
        match self {
            Self::Username => &entry.username,
            Self::Password => &entry.password,
        }
    }

    fn set(self, entry: &mut SourceEntry, value: String) {
        match self {
            Self::Username => entry.username = value,
            Self::Password => entry.password = value,
        }
    }
}
