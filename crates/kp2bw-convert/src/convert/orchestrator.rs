// ── kp2bw-convert / orchestrator ───────────────────────────────────────────────
//
// Drives a migration run: Loading → Resolving → Submitting → Done.
// Submission is sequential and never retries; per-item failures are counted
// and reported, never propagated.

use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

use kp2bw_bitwarden::bitwarden::VaultDestination;
use kp2bw_keepass::keepass::SourceEntry;
use serde::{Deserialize, Serialize};

use super::error::ConvertError;
use super::resolver::{resolve, EntryIndex};
use super::sink::{MigrationEvent, MigrationSink};
use super::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Loading,
    Resolving,
    Submitting,
    Done,
}

/// Counters for a finished (or planned) run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub entries_read: usize,
    pub filtered_by_tag: usize,
    pub reference_failures: usize,
    pub aliases_merged: usize,
    /// Items in the resolved index.
    pub items_planned: usize,
    pub items_created: usize,
    pub items_skipped: usize,
    pub items_failed: usize,
    /// Folders that did not exist in the vault before this run.
    pub folders_created: usize,
    pub attachments_uploaded: usize,
    pub attachments_failed: usize,
    pub duration_ms: u64,
}

impl MigrationReport {
    /// Whether anything went wrong that the user should look at.
    pub fn has_failures(&self) -> bool {
        self.reference_failures > 0 || self.items_failed > 0 || self.attachments_failed > 0
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries read ({} filtered by tag, {} merged as aliases, {} unresolved); \
             {} created, {} skipped, {} failed; attachments {} uploaded, {} failed",
            self.entries_read,
            self.filtered_by_tag,
            self.aliases_merged,
            self.reference_failures,
            self.items_created,
            self.items_skipped,
            self.items_failed,
            self.attachments_uploaded,
            self.attachments_failed
        )
    }
}

/// Runs one migration with a fixed configuration and sink.
pub struct Migrator<S: MigrationSink> {
    config: ConvertConfig,
    sink: S,
    phase: Phase,
    report: MigrationReport,
    /// (folder, name) of every item created in this run.
    history: HashSet<(Option<String>, String)>,
    started: Instant,
}

impl<S: MigrationSink> Migrator<S> {
    pub fn new(config: ConvertConfig, sink: S) -> Self {
        Self {
            config,
            sink,
            phase: Phase::Loading,
            report: MigrationReport::default(),
            history: HashSet::new(),
            started: Instant::now(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn report(&self) -> &MigrationReport {
        &self.report
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.sink.record(MigrationEvent::PhaseStarted(phase));
    }

    /// Filter by required tags and resolve references into the entry index.
    pub fn plan(&mut self, entries: Vec<SourceEntry>) -> EntryIndex {
        self.enter(Phase::Loading);
        let total = entries.len();
        let kept: Vec<SourceEntry> = match &self.config.required_tags {
            Some(tags) => {
                let mut kept = Vec::with_capacity(entries.len());
                for entry in entries {
                    if entry.has_any_tag(tags) {
                        kept.push(entry);
                    } else {
                        self.sink.record(MigrationEvent::FilteredOut { entry: &entry.display_path() });
                    }
                }
                kept
            }
            None => entries,
        };
        self.report.entries_read = total;
        self.report.filtered_by_tag = total - kept.len();
        self.sink.record(MigrationEvent::Loaded { total, kept: kept.len() });

        self.enter(Phase::Resolving);
        let resolution = resolve(&kept, &self.config, &mut self.sink);
        self.report.reference_failures = resolution.failed;
        self.report.aliases_merged = resolution.merged;
        self.report.items_planned = resolution.index.len();
        resolution.index
    }

    /// Submit every item in `index` to `dest`, in index order.
    pub async fn submit<D>(&mut self, index: &EntryIndex, dest: &mut D) -> MigrationReport
    where
        D: VaultDestination + ?Sized,
    {
        self.enter(Phase::Submitting);
        let total = index.len();

        for (position, item) in index.iter().enumerate() {
            self.sink.record(MigrationEvent::Submitting { position: position + 1, total, item });
            self.submit_item(item, dest).await;
        }

        self.finish()
    }

    /// Close the run without submitting (dry run).
    pub fn finish(&mut self) -> MigrationReport {
        self.enter(Phase::Done);
        self.report.duration_ms = self.started.elapsed().as_millis() as u64;
        self.report.clone()
    }

    async fn submit_item<D>(&mut self, item: &ResolvedItem, dest: &mut D)
    where
        D: VaultDestination + ?Sized,
    {
        let folder = item.folder.as_deref();
        let history_key = (item.folder.clone(), item.title.clone());

        if dest.item_exists(folder, &item.title) || self.history.contains(&history_key) {
            self.report.items_skipped += 1;
            self.sink.record(MigrationEvent::Skipped { item });
            return;
        }

        let folder_id = match folder {
            Some(name) => {
                let existed = dest.has_folder(name);
                match dest.ensure_folder(name).await {
                    Ok(id) => {
                        if !existed {
                            self.report.folders_created += 1;
                        }
                        Some(id)
                    }
                    Err(e) => return self.fail_item(item, ConvertError::folder_creation(&e)),
                }
            }
            None => None,
        };

        let collection_id = match self.collection_id(&item.collection, dest).await {
            Ok(id) => id,
            Err(e) => return self.fail_item(item, e),
        };

        let payload = item.to_vault_item(folder_id, collection_id);
        let item_id = match dest.create_item(&payload).await {
            Ok(id) => id,
            Err(e) => return self.fail_item(item, ConvertError::item_creation(&e)),
        };
        self.report.items_created += 1;
        self.history.insert(history_key);
        self.sink.record(MigrationEvent::Created { item, id: &item_id });

        for attachment in &item.attachments {
            let file_name = attachment.file_name();
            match dest.create_attachment(&item_id, attachment).await {
                Ok(()) => {
                    self.report.attachments_uploaded += 1;
                    self.sink.record(MigrationEvent::AttachmentUploaded { item, file_name: &file_name });
                }
                Err(e) => {
                    self.report.attachments_failed += 1;
                    let error = ConvertError::attachment_upload(&e);
                    self.sink.record(MigrationEvent::AttachmentFailed { item, file_name: &file_name, error: &error });
                }
            }
        }
    }

    fn fail_item(&mut self, item: &ResolvedItem, error: ConvertError) {
        self.report.items_failed += 1;
        self.sink.record(MigrationEvent::ItemFailed { item, error: &error });
    }

    async fn collection_id<D>(
        &self,
        target: &CollectionTarget,
        dest: &mut D,
    ) -> Result<Option<String>, ConvertError>
    where
        D: VaultDestination + ?Sized,
    {
        let name = match target {
            CollectionTarget::None => return Ok(None),
            CollectionTarget::Fixed(id) => return Ok(Some(id.clone())),
            CollectionTarget::Nested { parent_id, path: None } => return Ok(Some(parent_id.clone())),
            CollectionTarget::Named(name) => name.clone(),
            CollectionTarget::Nested { parent_id, path: Some(path) } => {
                let parent = dest.collection_name(parent_id).ok_or_else(|| {
                    ConvertError::collection_creation(format!("Unknown parent collection {}", parent_id))
                })?;
                format!("{}/{}", parent, path)
            }
        };

        let org = self.config.organization_id.as_deref().ok_or_else(|| {
            ConvertError::collection_creation(format!("Collection '{}' needs an organization id", name))
        })?;
        dest.ensure_collection(org, &name)
            .await
            .map(Some)
            .map_err(|e| ConvertError::collection_creation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::sink::LogSink;

    #[test]
    fn report_summary_and_failures() {
        let mut report = MigrationReport { entries_read: 3, items_created: 2, items_skipped: 1, ..Default::default() };
        assert!(!report.has_failures());
        assert!(report.to_string().starts_with("3 entries read"));
        report.attachments_failed = 1;
        assert!(report.has_failures());
    }

    #[test]
    fn plan_filters_and_resolves() {
        let entries = vec![
            SourceEntry { uuid: "1".into(), title: "Prod".into(), tags: vec!["prod".into()], ..Default::default() },
            SourceEntry { uuid: "2".into(), title: "Dev".into(), tags: vec!["dev".into()], ..Default::default() },
        ];
        let config = ConvertConfig { required_tags: Some(vec!["prod".into()]), ..Default::default() };
        let mut migrator = Migrator::new(config, LogSink);

        let index = migrator.plan(entries);
        assert_eq!(migrator.phase(), Phase::Resolving);
        assert_eq!(index.len(), 1);
        assert_eq!(migrator.report().filtered_by_tag, 1);
        assert_eq!(migrator.report().items_planned, 1);

        let report = migrator.finish();
        assert_eq!(migrator.phase(), Phase::Done);
        assert_eq!(report.entries_read, 2);
    }
}
