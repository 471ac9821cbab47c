//! One migration run from parsed arguments to the final report.

use kp2bw_bitwarden::bitwarden::BitwardenClient;
use kp2bw_convert::convert::{CollectionTarget, EntryIndex, LogSink, MigrationReport, Migrator};
use kp2bw_keepass::keepass::{open_source, SourceCredentials};

use crate::cli::Cli;
use crate::config::{load_file_config, resolve_settings};
use crate::error::AppError;
use crate::prompt;

/// Run the migration described by `cli`.
///
/// Order: settings, confirmation, KeePass read and resolution, Bitwarden
/// connect, submission. A dry run stops after resolution and prints the plan.
/// Per-item failures end up in the report, not in the error.
pub async fn run(cli: &Cli) -> Result<MigrationReport, AppError> {
    let file = load_file_config(cli.config.as_deref())?;
    let settings = resolve_settings(cli, file)?;

    if !settings.dry_run && !settings.skip_confirm {
        prompt::confirm()?;
    }

    let password = prompt::keepass_password(cli.kp_password.as_deref(), &settings.keepass_file)?;
    let credentials = SourceCredentials { password, key_file: settings.key_file.clone() };
    tracing::info!(file = %settings.keepass_file.display(), "Reading KeePass entries");
    let entries = open_source(&settings.keepass_file, credentials)?.list_entries()?;

    let mut migrator = Migrator::new(settings.convert.clone(), LogSink);
    let index = migrator.plan(entries);

    if settings.dry_run {
        for line in plan_lines(&index) {
            println!("{}", line);
        }
        return Ok(migrator.finish());
    }

    let credentials = prompt::bitwarden_credentials(cli.bw_password.as_deref(), cli.bw_session.as_deref())?;
    let mut client = BitwardenClient::connect(&settings.bitwarden, credentials).await?;
    tracing::info!(items = index.len(), "Submitting items to Bitwarden");

    Ok(migrator.submit(&index, &mut client).await)
}

/// One human-readable line per planned item.
pub fn plan_lines(index: &EntryIndex) -> Vec<String> {
    index
        .iter()
        .map(|item| {
            let mut line = format!(
                "{} / {}",
                item.folder.as_deref().unwrap_or("(no folder)"),
                item.title
            );
            match &item.collection {
                CollectionTarget::None => {}
                CollectionTarget::Fixed(id) => line.push_str(&format!(" [collection {}]", id)),
                CollectionTarget::Named(name) => line.push_str(&format!(" [collection {}]", name)),
                CollectionTarget::Nested { parent_id, path: None } => {
                    line.push_str(&format!(" [collection {}]", parent_id))
                }
                CollectionTarget::Nested { parent_id, path: Some(path) } => {
                    line.push_str(&format!(" [collection {} / {}]", parent_id, path))
                }
            }
            let extra = [
                (item.login.uris.len(), "uris"),
                (item.fields.len(), "fields"),
                (item.attachments.len(), "attachments"),
            ]
            .iter()
            .filter(|(n, _)| *n > 0)
            .map(|(n, label)| format!("{} {}", n, label))
            .collect::<Vec<_>>();
            if !extra.is_empty() {
                line.push_str(&format!(" ({})", extra.join(", ")));
            }
            line
        })
        .collect()
}
