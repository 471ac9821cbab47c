// ── kp2bw-convert / sink ───────────────────────────────────────────────────────
//
// Progress and outcome reporting for a migration run.

use log::{debug, error, info, warn};

use super::error::ConvertError;
use super::orchestrator::Phase;
use super::types::ResolvedItem;

/// Something worth reporting while migrating.
#[derive(Debug)]
pub enum MigrationEvent<'a> {
    PhaseStarted(Phase),
    /// Entries read from the source and how many the tag filter kept.
    Loaded { total: usize, kept: usize },
    /// An entry left out by the tag filter.
    FilteredOut { entry: &'a str },
    /// An entry whose username or password is a field reference.
    Deferred { entry: &'a str },
    ReferenceFailed { entry: &'a str, error: &'a ConvertError },
    /// A referencing entry folded into its target as an extra URI.
    AliasMerged { entry: &'a str, target: &'a str },
    Submitting { position: usize, total: usize, item: &'a ResolvedItem },
    Skipped { item: &'a ResolvedItem },
    Created { item: &'a ResolvedItem, id: &'a str },
    ItemFailed { item: &'a ResolvedItem, error: &'a ConvertError },
    AttachmentUploaded { item: &'a ResolvedItem, file_name: &'a str },
    AttachmentFailed { item: &'a ResolvedItem, file_name: &'a str, error: &'a ConvertError },
}

/// Receives migration events. Passed explicitly through the pipeline.
pub trait MigrationSink {
    fn record(&mut self, event: MigrationEvent<'_>);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MigrationSink for LogSink {
    fn record(&mut self, event: MigrationEvent<'_>) {
        match event {
            MigrationEvent::PhaseStarted(phase) => debug!("Phase: {:?}", phase),
            MigrationEvent::Loaded { total, kept } if total == kept => {
                info!("Read {} entries from KeePass", total)
            }
            MigrationEvent::Loaded { total, kept } => {
                info!("Read {} entries from KeePass, {} match the required tags", total, kept)
            }
            MigrationEvent::FilteredOut { entry } => debug!("Skipping {} (no required tag)", entry),
            MigrationEvent::Deferred { entry } => debug!("Deferring {} (field reference)", entry),
            MigrationEvent::ReferenceFailed { entry, error } => {
                warn!("Could not resolve references of {}: {}", entry, error)
            }
            MigrationEvent::AliasMerged { entry, target } => {
                info!("Merged {} into {} as additional URI", entry, target)
            }
            MigrationEvent::Submitting { position, total, item } => info!(
                "[{} of {}] Creating Bitwarden entry in {} for {}",
                position,
                total,
                item.folder.as_deref().unwrap_or("(no folder)"),
                item.title
            ),
            MigrationEvent::Skipped { item } => info!(
                "Entry {} already exists in folder {}, skipping",
                item.title,
                item.folder.as_deref().unwrap_or("(no folder)")
            ),
            MigrationEvent::Created { item, id } => debug!("Created {} ({})", item.title, id),
            MigrationEvent::ItemFailed { item, error } => {
                error!("Creation of entry {} failed: {}", item.title, error)
            }
            MigrationEvent::AttachmentUploaded { item, file_name } => {
                info!("    uploaded attachment {} for {}", file_name, item.title)
            }
            MigrationEvent::AttachmentFailed { item, file_name, error } => {
                error!("Uploading attachment {} for {} failed: {}", file_name, item.title, error)
            }
        }
    }
}
