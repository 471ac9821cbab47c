use clap::Parser;
use kp2bw::*;
use kp2bw_convert::convert::{ConvertConfig, LogSink, MigrationReport, Migrator};
use kp2bw_keepass::keepass::{EntrySource, XmlExportReader};
use std::path::{Path, PathBuf};

const EXPORT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<KeePassFile>
  <Root>
    <Group>
      <Name>Root</Name>
      <Entry>
        <UUID>z8AUEGjoNUe87q8MGtq64A==</UUID>
        <String><Key>Title</Key><Value>Router</Value></String>
        <String><Key>UserName</Key><Value>admin</Value></String>
        <String><Key>Password</Key><Value ProtectedInMemory="True">pw</Value></String>
        <String><Key>URL</Key><Value>http://192.168.1.1</Value></String>
        <Tags>infra</Tags>
      </Entry>
      <Group>
        <Name>Mail</Name>
        <Entry>
          <UUID>EBAQEBAQEBAQEBAQEBAQEA==</UUID>
          <String><Key>Title</Key><Value>Gmail</Value></String>
          <String><Key>UserName</Key><Value>alice</Value></String>
          <String><Key>Password</Key><Value ProtectedInMemory="True">secret</Value></String>
          <String><Key>Recovery</Key><Value ProtectedInMemory="True">code</Value></String>
          <Tags>mail</Tags>
        </Entry>
        <Entry>
          <UUID>ICAgICAgICAgICAgICAgIA==</UUID>
          <String><Key>Title</Key><Value>Gmail alias</Value></String>
          <String><Key>UserName</Key><Value>{REF:U@I:10101010101010101010101010101010}</Value></String>
          <String><Key>Password</Key><Value>{REF:P@I:10101010101010101010101010101010}</Value></String>
          <String><Key>URL</Key><Value>https://accounts.google.com</Value></String>
          <Tags>mail</Tags>
        </Entry>
      </Group>
    </Group>
  </Root>
</KeePassFile>"#;

fn write_fixture(dir: &Path) -> (PathBuf, PathBuf) {
    let export = dir.join("export.xml");
    std::fs::write(&export, EXPORT).unwrap();
    let config = dir.join("config.json");
    std::fs::write(&config, "{}").unwrap();
    (export, config)
}

fn dry_run(export: &Path, config: &Path, extra: &[&str]) -> Result<MigrationReport, AppError> {
    let mut args = vec![
        "kp2bw".to_string(),
        export.display().to_string(),
        "--config".to_string(),
        config.display().to_string(),
        "--dry-run".to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    let cli = Cli::try_parse_from(args).unwrap();
    tokio_test::block_on(run(&cli))
}

#[test]
fn dry_run_resolves_without_touching_bitwarden() {
    let dir = tempfile::tempdir().unwrap();
    let (export, config) = write_fixture(dir.path());

    let report = dry_run(&export, &config, &[]).unwrap();
    assert_eq!(report.entries_read, 3);
    assert_eq!(report.aliases_merged, 1);
    assert_eq!(report.items_planned, 2);
    assert_eq!(report.items_created, 0);
    assert!(!report.has_failures());
}

#[test]
fn dry_run_applies_tag_filter() {
    let dir = tempfile::tempdir().unwrap();
    let (export, config) = write_fixture(dir.path());

    let report = dry_run(&export, &config, &["--import-tags", "infra"]).unwrap();
    assert_eq!(report.filtered_by_tag, 2);
    assert_eq!(report.items_planned, 1);
}

#[test]
fn missing_database_is_a_source_error() {
    let dir = tempfile::tempdir().unwrap();
    let (_, config) = write_fixture(dir.path());

    let err = dry_run(&dir.path().join("missing.xml"), &config, &[]).unwrap_err();
    assert_eq!(err.kind, AppErrorKind::Source);
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn collection_without_org_fails_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let (export, config) = write_fixture(dir.path());

    let err = dry_run(&export, &config, &["--bwcoll", "c1"]).unwrap_err();
    assert_eq!(err.kind, AppErrorKind::Usage);
}

#[test]
fn config_file_supplies_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let (export, _) = write_fixture(dir.path());
    let config = dir.path().join("tags.json");
    std::fs::write(&config, r#"{"importTags": ["mail"], "folderMode": "full-path"}"#).unwrap();

    let report = dry_run(&export, &config, &[]).unwrap();
    assert_eq!(report.filtered_by_tag, 1);
    assert_eq!(report.aliases_merged, 1);
    assert_eq!(report.items_planned, 1);
}

#[test]
fn plan_lines_describe_items() {
    let dir = tempfile::tempdir().unwrap();
    let (export, _) = write_fixture(dir.path());

    let entries = XmlExportReader::new(&export).list_entries().unwrap();
    let mut migrator = Migrator::new(ConvertConfig::default(), LogSink);
    let index = migrator.plan(entries);

    let lines = plan_lines(&index);
    assert_eq!(lines, vec!["(no folder) / Router (1 uris)", "Mail / Gmail (1 uris, 1 fields)"]);
}
