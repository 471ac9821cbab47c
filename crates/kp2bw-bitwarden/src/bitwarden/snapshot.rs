//! Connect-time view of the destination vault.
//!
//! Captured once after unlock and sync. Folder and collection maps grow as
//! the client creates new ones; the per-folder item names never change.

use crate::bitwarden::cli::BitwardenCli;
use crate::bitwarden::types::*;
use log::info;
use std::collections::{HashMap, HashSet};

/// Cached folder/collection ids and pre-existing item names.
#[derive(Debug, Clone, Default)]
pub struct VaultSnapshot {
    /// folder name → id
    pub folders: HashMap<String, String>,
    /// collection name → id
    pub collections: HashMap<String, String>,
    /// folder name (None = unfiled) → item names
    pub items: HashMap<Option<String>, HashSet<String>>,
}

impl VaultSnapshot {
    /// Sync with the server and read folders, items and (with an
    /// organization) its collections.
    pub async fn capture(cli: &BitwardenCli, org_id: Option<&str>) -> Result<Self, BitwardenError> {
        let start = std::time::Instant::now();
        cli.sync().await?;

        let folders = cli.list_folders().await?;
        let items = cli.list_items().await?;
        let collections = match org_id {
            Some(org) => cli.list_org_collections(org).await?,
            None => Vec::new(),
        };

        let snapshot = Self::from_parts(&folders, &collections, &items);
        info!(
            "Vault snapshot: {} folders, {} collections, {} items ({} ms)",
            snapshot.folders.len(),
            snapshot.collections.len(),
            items.len(),
            start.elapsed().as_millis()
        );
        Ok(snapshot)
    }

    pub fn from_parts(folders: &[Folder], collections: &[Collection], items: &[ItemSummary]) -> Self {
        Self {
            folders: folders
                .iter()
                .filter_map(|f| f.id.clone().map(|id| (f.name.clone(), id)))
                .collect(),
            collections: collections
                .iter()
                .filter_map(|c| c.id.clone().map(|id| (c.name.clone(), id)))
                .collect(),
            items: group_item_names(folders, items),
        }
    }

    pub fn contains_item(&self, folder: Option<&str>, name: &str) -> bool {
        self.items
            .get(&folder.map(str::to_string))
            .map(|names| names.contains(name))
            .unwrap_or(false)
    }

    pub fn collection_name(&self, id: &str) -> Option<String> {
        self.collections
            .iter()
            .find(|(_, cid)| cid.as_str() == id)
            .map(|(name, _)| name.clone())
    }
}

/// Group existing item names by folder name. Items without a folder, or in a
/// folder that is not listed, land under `None`.
pub fn group_item_names(
    folders: &[Folder],
    items: &[ItemSummary],
) -> HashMap<Option<String>, HashSet<String>> {
    let by_id: HashMap<&str, &str> = folders
        .iter()
        .filter_map(|f| f.id.as_deref().map(|id| (id, f.name.as_str())))
        .collect();

    let mut grouped: HashMap<Option<String>, HashSet<String>> = HashMap::new();
    for item in items {
        let folder = item
            .folder_id
            .as_deref()
            .and_then(|id| by_id.get(id))
            .map(|name| name.to_string());
        grouped.entry(folder).or_default().insert(item.name.clone());
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(id: &str, name: &str) -> Folder {
        Folder { id: Some(id.into()), name: name.into() }
    }

    fn item(name: &str, folder_id: Option<&str>) -> ItemSummary {
        ItemSummary { name: name.into(), folder_id: folder_id.map(str::to_string) }
    }

    #[test]
    fn items_grouped_by_folder_name() {
        let folders = vec![folder("f1", "Infra"), folder("f2", "Mail")];
        let items = vec![
            item("Router", Some("f1")),
            item("Switch", Some("f1")),
            item("Gmail", Some("f2")),
            item("Loose", None),
            item("Orphan", Some("gone")),
        ];
        let grouped = group_item_names(&folders, &items);

        assert_eq!(grouped[&Some("Infra".to_string())].len(), 2);
        assert!(grouped[&Some("Mail".to_string())].contains("Gmail"));
        let unfiled = &grouped[&None];
        assert!(unfiled.contains("Loose"));
        assert!(unfiled.contains("Orphan"));
    }

    #[test]
    fn snapshot_lookups() {
        let collections = vec![Collection {
            id: Some("c1".into()),
            organization_id: Some("org".into()),
            name: "Shared".into(),
        }];
        let snapshot = VaultSnapshot::from_parts(
            &[folder("f1", "Infra")],
            &collections,
            &[item("Router", Some("f1")), item("Note", None)],
        );

        assert!(snapshot.contains_item(Some("Infra"), "Router"));
        assert!(!snapshot.contains_item(None, "Router"));
        assert!(snapshot.contains_item(None, "Note"));
        assert_eq!(snapshot.folders.get("Infra").map(String::as_str), Some("f1"));
        assert_eq!(snapshot.collection_name("c1").as_deref(), Some("Shared"));
        assert_eq!(snapshot.collection_name("c2"), None);
    }
}
