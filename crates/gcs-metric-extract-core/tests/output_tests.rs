use gcs_metric_extract_core::output::{render_csv, render_json, render_ldjson};
use gcs_metric_extract_core::{
    render, CsvQuoting, OutputError, OutputFormat, PointEntry, PointValue, ProjectReport, Report,
    ReportOptions,
};

fn sample_report() -> Report {
    let mut project = ProjectReport::new();
    project.entry("bucket-a".into()).or_default().insert(
        "STANDARD".into(),
        vec![PointEntry::new("2022-01-01 00:00:00", PointValue::Int64(5))],
    );
    let mut report = Report::new();
    report.insert("project".into(), project);
    report
}

fn rendered(report: &Report, format: OutputFormat, quoting: CsvQuoting) -> String {
    let options = ReportOptions {
        format,
        csv_quoting: quoting,
        ..ReportOptions::default()
    };
    let mut buf = Vec::new();
    render(report, &options, &mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

#[test]
fn empty_report_renderings() {
    let empty = Report::new();
    assert_eq!(rendered(&empty, OutputFormat::Json, CsvQuoting::Legacy), "{}\n");
    assert_eq!(rendered(&empty, OutputFormat::Ldjson, CsvQuoting::Legacy), "");
    assert_eq!(
        rendered(&empty, OutputFormat::Csv, CsvQuoting::Legacy),
        "project,resource,metric,end_time,value\n"
    );
}

#[test]
fn ldjson_line_per_triple() {
    let out = rendered(&sample_report(), OutputFormat::Ldjson, CsvQuoting::Legacy);
    assert_eq!(
        out,
        "{\"project\": \"project\", \"resource\": \"bucket-a\", \"metric\": \"STANDARD\", \
         \"values\": [{\"2022-01-01 00:00:00\": 5}]}\n"
    );
}

#[test]
fn csv_row_per_point_with_quoted_metric() {
    let out = rendered(&sample_report(), OutputFormat::Csv, CsvQuoting::Legacy);
    assert_eq!(
        out,
        "project,resource,metric,end_time,value\n\
         project,bucket-a,\"STANDARD\",2022-01-01 00:00:00,5\n"
    );
}

#[test]
fn csv_multiple_points_yield_multiple_rows() {
    let mut report = sample_report();
    report
        .get_mut("project")
        .unwrap()
        .get_mut("bucket-a")
        .unwrap()
        .insert(
            "GetObject,OK".into(),
            vec![
                PointEntry::new("2022-01-01 00:00:00", PointValue::Double(2.0)),
                PointEntry::new("2021-12-31 23:59:00", PointValue::Double(0.25)),
            ],
        );
    let out = rendered(&report, OutputFormat::Csv, CsvQuoting::Legacy);
    let lines: Vec<_> = out.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1], "project,bucket-a,\"STANDARD\",2022-01-01 00:00:00,5");
    assert_eq!(lines[2], "project,bucket-a,\"GetObject,OK\",2022-01-01 00:00:00,2.0");
    assert_eq!(lines[3], "project,bucket-a,\"GetObject,OK\",2021-12-31 23:59:00,0.25");
}

#[test]
fn strict_csv_escapes_text_fields() {
    let mut project = ProjectReport::new();
    project.entry("odd,\"bucket\"".into()).or_default().insert(
        "STANDARD".into(),
        vec![PointEntry::new("2022-01-01 00:00:00", PointValue::Int64(5))],
    );
    let mut report = Report::new();
    report.insert("p1".into(), project);

    let out = rendered(&report, OutputFormat::Csv, CsvQuoting::Strict);
    let lines: Vec<_> = out.lines().collect();
    assert_eq!(
        lines[0],
        "\"project\",\"resource\",\"metric\",\"end_time\",\"value\""
    );
    assert_eq!(
        lines[1],
        "\"p1\",\"odd,\"\"bucket\"\"\",\"STANDARD\",\"2022-01-01 00:00:00\",5"
    );
}

#[test]
fn json_nests_projects_as_siblings() {
    let mut report = sample_report();
    let mut other = ProjectReport::new();
    other.entry("bucket-z".into()).or_default().insert(
        "COLDLINE".into(),
        vec![PointEntry::new("2022-01-01 00:00:00", PointValue::Double(1.5))],
    );
    report.insert("other".into(), other);

    let mut buf = Vec::new();
    render_json(&report, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("\n  \"other\": {"), "two-space indent: {text}");

    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["project"]["bucket-a"]["STANDARD"][0]["2022-01-01 00:00:00"], 5);
    assert_eq!(parsed["other"]["bucket-z"]["COLDLINE"][0]["2022-01-01 00:00:00"], 1.5);
    assert!(parsed["project"].get("bucket-z").is_none());
}

#[test]
fn json_output_reads_back_as_report() {
    let mut buf = Vec::new();
    render_json(&sample_report(), &mut buf).unwrap();
    let parsed: Report = serde_json::from_slice(&buf).unwrap();
    assert_eq!(parsed, sample_report());
}

#[test]
fn csv_rejects_point_with_several_timestamps() {
    let report: Report = serde_json::from_str(
        r#"{"p1": {"bucket-a": {"STANDARD": [
            {"2022-01-01 00:00:00": 1},
            {"2022-01-01 00:01:00": 2, "2022-01-01 00:02:00": 3}
        ]}}}"#,
    )
    .unwrap();

    let mut buf = Vec::new();
    let err = render_csv(&report, CsvQuoting::Legacy, &mut buf).unwrap_err();
    assert!(matches!(err, OutputError::MalformedPoint { pairs: 2, .. }));
    assert!(err.to_string().contains("Please file a GitHub issue"));

    let written = String::from_utf8(buf).unwrap();
    assert_eq!(written.lines().count(), 2, "rows before the failure stay written");
}

#[test]
fn ldjson_does_not_check_point_shape() {
    let report: Report =
        serde_json::from_str(r#"{"p1": {"b": {"m": [{"t1": 1, "t2": 2}]}}}"#).unwrap();
    let mut buf = Vec::new();
    render_ldjson(&report, &mut buf).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
}
