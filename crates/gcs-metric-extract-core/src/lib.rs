pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod output;
pub mod report;
pub mod timeutils;

pub use client::{HttpMonitoringClient, MonitoringClient};
pub use config::{
    ClientConfig, Config, CsvQuoting, LoggingConfig, OutputFormat, ReportConfig, ReportOptions,
};
pub use error::{ClientError, OutputError, ReportError};
pub use metrics::{MetricDescriptor, MetricKind};
pub use models::{
    ListTimeSeriesPage, ListTimeSeriesRequest, Point, PointEntry, PointValue, ProjectReport,
    Report, TimeInterval, TimeSeries, TimeSeriesView, Timestamp, TypedValue, ValueType,
};
pub use output::render;
pub use report::{build_project_report, build_report, fold_page};
pub use timeutils::{format_end_time, lookback_interval, now_utc};
