//! Folds paginated time series into per-project reports.

use itertools::Itertools;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::client::MonitoringClient;
use crate::config::ReportOptions;
use crate::error::ReportError;
use crate::metrics::MetricDescriptor;
use crate::models::{
    ListTimeSeriesPage, ListTimeSeriesRequest, PointEntry, ProjectReport, Report, TimeSeries,
    TimeSeriesView, ValueType,
};
use crate::timeutils::{format_end_time, lookback_interval, now_utc};

/// Separator between metric label values in a report key.
pub const LABEL_SEPARATOR: &str = ",";

/// Queries every project in order and collects the results under their ids.
pub fn build_report<C, I, P>(
    client: &mut C,
    project_ids: I,
    descriptor: &MetricDescriptor,
    options: &ReportOptions,
) -> Result<Report, ReportError>
where
    C: MonitoringClient + ?Sized,
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    let mut report = Report::new();
    for project_id in project_ids {
        let project_id = project_id.as_ref();
        let project = build_project_report(client, project_id, descriptor, options)?;
        report.insert(project_id.to_string(), project);
    }
    Ok(report)
}

/// Fetches every page for one project and folds it into a fresh report.
pub fn build_project_report<C>(
    client: &mut C,
    project_id: &str,
    descriptor: &MetricDescriptor,
    options: &ReportOptions,
) -> Result<ProjectReport, ReportError>
where
    C: MonitoringClient + ?Sized,
{
    let interval = lookback_interval(now_utc(), options.lookback_seconds);
    let mut request = ListTimeSeriesRequest {
        name: format!("projects/{project_id}"),
        filter: descriptor.filter(),
        interval,
        view: TimeSeriesView::Full,
        page_token: None,
    };
    debug!(
        project = project_id,
        metric = descriptor.metric_type,
        lookback = %humantime::format_duration(Duration::from_secs(options.lookback_seconds)),
        "querying time series"
    );

    let mut report = ProjectReport::new();
    let mut pages = 0usize;
    let mut series = 0usize;
    loop {
        let page = client.list_time_series(&request)?;
        pages += 1;
        series += page.time_series.len();
        debug!(project = project_id, page = pages, series = page.time_series.len(), "received page");

        fold_page(&page, descriptor, options.max_points, &mut report)?;

        if page.next_page_token.is_empty() {
            break;
        }
        request.page_token = Some(page.next_page_token);
    }

    info!(
        project = project_id,
        pages,
        series,
        resources = report.len(),
        "collected {}",
        descriptor.metric_type
    );
    Ok(report)
}

/// Adds one page of series to `report`.
///
/// Each series lands under `[resource label value][joined metric label
/// values]` and replaces whatever an earlier series or page stored there.
/// Only the first `max_points` points are kept; zero or less keeps all.
pub fn fold_page(
    page: &ListTimeSeriesPage,
    descriptor: &MetricDescriptor,
    max_points: i64,
    report: &mut ProjectReport,
) -> Result<(), ReportError> {
    for series in &page.time_series {
        let resource = series.resource_label(descriptor.resource_label).to_string();
        let labels = label_key(series, descriptor.metric_labels);
        let points = last_n_points(series, max_points)?;
        trace!(%resource, %labels, points = points.len(), "folding series");
        report.entry(resource).or_default().insert(labels, points);
    }
    Ok(())
}

pub fn label_key(series: &TimeSeries, metric_labels: &[&str]) -> String {
    metric_labels
        .iter()
        .map(|label| series.metric_label(label))
        .join(LABEL_SEPARATOR)
}

/// The leading `n` points of the series (newest first), or all of them when
/// `n` is zero or negative.
pub fn last_n_points(series: &TimeSeries, n: i64) -> Result<Vec<PointEntry>, ReportError> {
    let value_type = ValueType::from_code(series.value_type)?;
    let limit = usize::try_from(n)
        .ok()
        .filter(|n| *n > 0)
        .unwrap_or(usize::MAX);
    Ok(series
        .points
        .iter()
        .take(limit)
        .map(|point| {
            PointEntry::new(
                format_end_time(point.interval.end_time.seconds),
                value_type.read(&point.value),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Point, PointValue, TimeInterval, Timestamp, TypedValue};
    use std::collections::HashMap;

    fn series(labels: &[(&str, &str)], points: usize) -> TimeSeries {
        TimeSeries {
            metric_labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            value_type: 2,
            points: (0..points)
                .map(|i| Point {
                    interval: TimeInterval {
                        start_time: Timestamp::default(),
                        end_time: Timestamp {
                            seconds: 1_640_995_200 - 60 * i as i64,
                            nanos: 0,
                        },
                    },
                    value: TypedValue {
                        int64_value: Some(i as i64),
                        double_value: None,
                    },
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn label_key_joins_in_declared_order() {
        let s = series(&[("response_code", "OK"), ("method", "GetObject")], 0);
        assert_eq!(label_key(&s, &["method", "response_code"]), "GetObject,OK");
    }

    #[test]
    fn missing_label_renders_empty() {
        let s = series(&[("method", "GetObject")], 0);
        assert_eq!(label_key(&s, &["method", "response_code"]), "GetObject,");
    }

    #[test]
    fn keeps_leading_points() {
        let s = series(&[], 5);
        let points = last_n_points(&s, 2).unwrap();
        assert_eq!(
            points,
            vec![
                PointEntry::new("2022-01-01 00:00:00", PointValue::Int64(0)),
                PointEntry::new("2021-12-31 23:59:00", PointValue::Int64(1)),
            ]
        );
    }

    #[test]
    fn non_positive_limit_keeps_everything() {
        let s = series(&[], 5);
        assert_eq!(last_n_points(&s, 0).unwrap().len(), 5);
        assert_eq!(last_n_points(&s, -1).unwrap().len(), 5);
        assert_eq!(last_n_points(&s, 50).unwrap().len(), 5);
    }
}
