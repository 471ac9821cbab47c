//! Optional JSON config file and the merged run settings.
//!
//! Command-line flags always win over the file. Secrets are never read from
//! the file; see [`crate::prompt`].

use std::path::{Path, PathBuf};

use kp2bw_bitwarden::bitwarden::BitwardenConfig;
use kp2bw_convert::convert::{CollectionMode, ConvertConfig, FolderMode};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::AppError;

/// Collection value that selects one collection per top-level folder.
pub const AUTO_COLLECTION: &str = "auto";

/// Contents of `config.json`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileConfig {
    pub keepass_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub organization_id: Option<String>,
    /// Collection id or `auto`.
    pub collection: Option<String>,
    pub nested_collections: bool,
    pub title_prefix: Option<bool>,
    pub prefix_skip_depth: Option<usize>,
    pub folder_mode: Option<FolderMode>,
    pub import_tags: Option<Vec<String>>,
    pub bw_path: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    BitwardenConfig::default().timeout_secs
}

/// Everything a run needs apart from secrets.
#[derive(Debug, Clone)]
pub struct Settings {
    pub keepass_file: PathBuf,
    pub key_file: Option<PathBuf>,
    pub convert: ConvertConfig,
    pub bitwarden: BitwardenConfig,
    pub dry_run: bool,
    pub skip_confirm: bool,
}

/// `<config dir>/kp2bw/config.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kp2bw").join("config.json"))
}

/// Load the config file.
///
/// An explicit `path` must exist. Without one the default location is tried
/// and a missing file yields the defaults.
pub fn load_file_config(path: Option<&Path>) -> Result<FileConfig, AppError> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AppError::config(format!("Config file not found: {}", p.display())));
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(FileConfig::default()),
        },
    };

    let raw = std::fs::read_to_string(&path)
        .map_err(|e| AppError::config(format!("Cannot read {}: {}", path.display(), e)))?;
    let config: FileConfig = serde_json::from_str(&raw)
        .map_err(|e| AppError::config(format!("Invalid config {}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// Merge flags over the file config and validate the combination.
pub fn resolve_settings(cli: &Cli, file: FileConfig) -> Result<Settings, AppError> {
    let keepass_file = cli
        .keepass_file
        .clone()
        .or(file.keepass_file)
        .ok_or_else(|| AppError::usage("No KeePass file given"))?;

    let organization_id = cli.bw_org.clone().or(file.organization_id);
    let collection_arg = cli.bw_coll.clone().or(file.collection);
    let nested = cli.nested_collections || file.nested_collections;

    if collection_arg.is_some() && organization_id.is_none() {
        return Err(AppError::usage("--bw-coll requires --bw-org"));
    }

    let collection = match (collection_arg, nested) {
        (Some(c), true) if c == AUTO_COLLECTION => {
            return Err(AppError::usage(
                "--nested-collections needs a parent collection id, not 'auto'",
            ))
        }
        (Some(c), true) => CollectionMode::Nested(c),
        (None, true) => {
            return Err(AppError::usage("--nested-collections requires --bw-coll and --bw-org"))
        }
        (Some(c), false) if c == AUTO_COLLECTION => CollectionMode::Auto,
        (Some(c), false) => CollectionMode::Fixed(c),
        (None, false) => CollectionMode::None,
    };

    let required_tags = match cli.import_tags.clone().or(file.import_tags) {
        Some(tags) => {
            let tags: Vec<String> = tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if tags.is_empty() {
                return Err(AppError::usage("--import-tags needs at least one tag"));
            }
            Some(tags)
        }
        None => None,
    };

    let defaults = ConvertConfig::default();
    let convert = ConvertConfig {
        organization_id: organization_id.clone(),
        collection,
        title_prefix: if cli.no_path_to_name {
            false
        } else {
            file.title_prefix.unwrap_or(defaults.title_prefix)
        },
        prefix_skip_depth: cli
            .path_to_name_skip
            .or(file.prefix_skip_depth)
            .unwrap_or(defaults.prefix_skip_depth),
        folder_mode: cli.folder_mode.or(file.folder_mode).unwrap_or_default(),
        required_tags,
    };

    let bitwarden = BitwardenConfig {
        cli_path: cli.bw_path.clone().or(file.bw_path),
        timeout_secs: file.timeout_secs,
        organization_id,
    };

    Ok(Settings {
        keepass_file,
        key_file: cli.kp_keyfile.clone().or(file.key_file),
        convert,
        bitwarden,
        dry_run: cli.dry_run,
        skip_confirm: cli.yes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppErrorKind;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["kp2bw"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn defaults_without_file() {
        let s = resolve_settings(&cli(&["db.kdbx"]), FileConfig::default()).unwrap();
        assert_eq!(s.keepass_file, PathBuf::from("db.kdbx"));
        assert_eq!(s.convert.collection, CollectionMode::None);
        assert!(s.convert.title_prefix);
        assert_eq!(s.convert.prefix_skip_depth, 1);
        assert_eq!(s.bitwarden.timeout_secs, 120);
        assert!(!s.dry_run);
    }

    #[test]
    fn flags_override_file() {
        let file = FileConfig {
            keepass_file: Some("file.kdbx".into()),
            organization_id: Some("org-file".into()),
            prefix_skip_depth: Some(3),
            title_prefix: Some(true),
            bw_path: Some("/opt/bw".into()),
            ..Default::default()
        };
        let s = resolve_settings(
            &cli(&["cli.kdbx", "--bw-org", "org-cli", "--path-to-name-skip", "0", "--no-path-to-name"]),
            file,
        )
        .unwrap();
        assert_eq!(s.keepass_file, PathBuf::from("cli.kdbx"));
        assert_eq!(s.convert.organization_id.as_deref(), Some("org-cli"));
        assert_eq!(s.bitwarden.organization_id.as_deref(), Some("org-cli"));
        assert_eq!(s.convert.prefix_skip_depth, 0);
        assert!(!s.convert.title_prefix);
        assert_eq!(s.bitwarden.cli_path.as_deref(), Some("/opt/bw"));
    }

    #[test]
    fn collection_modes() {
        let auto = resolve_settings(&cli(&["db", "--bworg", "o", "--bwcoll", "auto"]), FileConfig::default()).unwrap();
        assert_eq!(auto.convert.collection, CollectionMode::Auto);

        let fixed = resolve_settings(&cli(&["db", "--bworg", "o", "--bwcoll", "c1"]), FileConfig::default()).unwrap();
        assert_eq!(fixed.convert.collection, CollectionMode::Fixed("c1".into()));

        let nested = resolve_settings(
            &cli(&["db", "--bworg", "o", "--bwcoll", "c1", "--nestcoll"]),
            FileConfig::default(),
        )
        .unwrap();
        assert_eq!(nested.convert.collection, CollectionMode::Nested("c1".into()));
        assert!(nested.convert.is_nested());
    }

    #[test]
    fn invalid_combinations_are_usage_errors() {
        for args in [
            vec!["db", "--bwcoll", "c1"],
            vec!["db", "--bworg", "o", "--nestcoll"],
            vec!["db", "--bworg", "o", "--bwcoll", "auto", "--nestcoll"],
            vec![],
        ] {
            let err = resolve_settings(&cli(&args), FileConfig::default()).unwrap_err();
            assert_eq!(err.kind, AppErrorKind::Usage, "{:?}", args);
            assert_eq!(err.exit_code(), 2);
        }
    }

    #[test]
    fn blank_tags_from_file_are_rejected() {
        let file = FileConfig { import_tags: Some(vec![" ".into()]), ..Default::default() };
        let err = resolve_settings(&cli(&["db"]), file).unwrap_err();
        assert_eq!(err.kind, AppErrorKind::Usage);
    }

    #[test]
    fn file_config_parses_camel_case() {
        let config: FileConfig = serde_json::from_str(
            r#"{"keepassFile": "db.kdbx", "collection": "auto", "folderMode": "full-path", "importTags": ["a"]}"#,
        )
        .unwrap();
        assert_eq!(config.keepass_file, Some(PathBuf::from("db.kdbx")));
        assert_eq!(config.folder_mode, Some(FolderMode::FullPath));
        assert_eq!(config.timeout_secs, 120);
        assert!(!config.nested_collections);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let err = load_file_config(Some(Path::new("/nonexistent/kp2bw.json"))).unwrap_err();
        assert_eq!(err.kind, AppErrorKind::Config);
    }
}
