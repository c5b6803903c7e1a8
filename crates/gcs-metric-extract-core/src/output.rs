use serde::Serialize;
use std::io::{self, Write};

use crate::config::{CsvQuoting, OutputFormat, ReportOptions};
use crate::error::OutputError;
use crate::models::{PointEntry, PointValue, Report};

pub const CSV_HEADER: [&str; 5] = ["project", "resource", "metric", "end_time", "value"];

/// Writes `report` to `writer` in the format selected by `options`.
pub fn render<W: Write>(
    report: &Report,
    options: &ReportOptions,
    writer: W,
) -> Result<(), OutputError> {
    match options.format {
        OutputFormat::Json => render_json(report, writer),
        OutputFormat::Ldjson => render_ldjson(report, writer),
        OutputFormat::Csv => render_csv(report, options.csv_quoting, writer),
    }
}

pub fn render_json<W: Write>(report: &Report, mut writer: W) -> Result<(), OutputError> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct LdjsonRecord<'a> {
    project: &'a str,
    resource: &'a str,
    metric: &'a str,
    values: &'a [PointEntry],
}

pub fn render_ldjson<W: Write>(report: &Report, mut writer: W) -> Result<(), OutputError> {
    for (project, resource, metric, values) in triples(report) {
        let record = LdjsonRecord {
            project,
            resource,
            metric,
            values,
        };
        let mut ser = serde_json::Serializer::with_formatter(&mut writer, SpacedFormatter);
        record.serialize(&mut ser)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn render_csv<W: Write>(
    report: &Report,
    quoting: CsvQuoting,
    writer: W,
) -> Result<(), OutputError> {
    match quoting {
        CsvQuoting::Legacy => render_csv_legacy(report, writer),
        CsvQuoting::Strict => render_csv_strict(report, writer),
    }
}

fn render_csv_legacy<W: Write>(report: &Report, mut writer: W) -> Result<(), OutputError> {
    writeln!(writer, "{}", CSV_HEADER.join(","))?;
    for (project, resource, metric, values) in triples(report) {
        for entry in values {
            let (end_time, value) = single_point(entry, project, resource, metric)?;
            writeln!(writer, "{project},{resource},\"{metric}\",{end_time},{value}")?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn render_csv_strict<W: Write>(report: &Report, writer: W) -> Result<(), OutputError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::NonNumeric)
        .from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;
    for (project, resource, metric, values) in triples(report) {
        for entry in values {
            let (end_time, value) = single_point(entry, project, resource, metric)?;
            let value = value.to_string();
            csv_writer.write_record([project, resource, metric, end_time, value.as_str()])?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}

fn single_point<'a>(
    entry: &'a PointEntry,
    project: &str,
    resource: &str,
    metric: &str,
) -> Result<(&'a str, PointValue), OutputError> {
    entry.single().ok_or_else(|| OutputError::MalformedPoint {
        project: project.to_string(),
        resource: resource.to_string(),
        metric: metric.to_string(),
        pairs: entry.len(),
    })
}

fn triples<'a>(
    report: &'a Report,
) -> impl Iterator<Item = (&'a str, &'a str, &'a str, &'a [PointEntry])> + 'a {
    report.iter().flat_map(|(project, resources)| {
        resources.iter().flat_map(move |(resource, metrics)| {
            metrics.iter().map(move |(metric, values)| {
                (
                    project.as_str(),
                    resource.as_str(),
                    metric.as_str(),
                    values.as_slice(),
                )
            })
        })
    })
}

/// Single-line JSON with a space after `,` and `:`.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}
