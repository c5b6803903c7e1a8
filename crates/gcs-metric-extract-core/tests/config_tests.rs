use gcs_metric_extract_core::{Config, CsvQuoting, OutputFormat, ReportOptions};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn defaults_match_cli_defaults() {
    let options = ReportOptions::default();
    assert_eq!(options.format, OutputFormat::Json);
    assert_eq!(options.lookback_seconds, 660);
    assert_eq!(options.max_points, 1);
    assert_eq!(options.csv_quoting, CsvQuoting::Legacy);
}

#[test]
fn format_parsing_is_case_insensitive() {
    assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
    assert_eq!("LdJson".parse::<OutputFormat>().unwrap(), OutputFormat::Ldjson);
    assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
    assert_eq!("".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
    let err = "xml".parse::<OutputFormat>().unwrap_err();
    assert_eq!(err.to_string(), "Unsupported format: xml");
}

#[test]
fn loads_partial_file() {
    let mut tmp = NamedTempFile::new().unwrap();
    writeln!(
        tmp,
        r#"
[report]
format = "ldjson"
points = -1

[client]
endpoint = "http://localhost:8080"
timeout = "5s"

[logging]
file = "~/gcs-metric-extract.log"
"#
    )
    .unwrap();

    let cfg = Config::load(Some(tmp.path())).expect("load config");
    let options = ReportOptions::from(cfg.report.clone());
    assert_eq!(options.format, OutputFormat::Ldjson);
    assert_eq!(options.max_points, -1);
    assert_eq!(options.lookback_seconds, 660);
    assert_eq!(cfg.client.endpoint, "http://localhost:8080");
    assert_eq!(cfg.client.timeout, Some(Duration::from_secs(5)));
    assert_eq!(cfg.logging.level, "warn");
    assert!(
        !cfg.logging.file.unwrap().to_string_lossy().contains('~'),
        "log path should be expanded"
    );
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    assert!(Config::load(Some(&path)).is_err());
}

#[test]
fn rejects_unknown_format_in_file() {
    let mut tmp = NamedTempFile::new().unwrap();
    writeln!(tmp, "[report]\nformat = \"xml\"").unwrap();
    assert!(Config::load(Some(tmp.path())).is_err());
}
