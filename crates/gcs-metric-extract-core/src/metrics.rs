use std::fmt;

/// The Cloud Storage metrics this tool knows how to report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    ApiRequestCount,
    ObjectCount,
    TotalByteSeconds,
    TotalBytes,
}

impl MetricKind {
    pub fn descriptor(self) -> MetricDescriptor {
        match self {
            MetricKind::ApiRequestCount => MetricDescriptor::new(
                "storage.googleapis.com/api/request_count",
                "bucket_name",
                &["method", "response_code"],
            ),
            MetricKind::ObjectCount => MetricDescriptor::new(
                "storage.googleapis.com/storage/object_count",
                "bucket_name",
                &["storage_class"],
            ),
            MetricKind::TotalByteSeconds => MetricDescriptor::new(
                "storage.googleapis.com/storage/total_byte_seconds",
                "bucket_name",
                &["storage_class"],
            ),
            MetricKind::TotalBytes => MetricDescriptor::new(
                "storage.googleapis.com/storage/total_bytes",
                "bucket_name",
                &["storage_class"],
            ),
        }
    }

    pub fn command_name(self) -> &'static str {
        match self {
            MetricKind::ApiRequestCount => "api-request-count",
            MetricKind::ObjectCount => "object-count",
            MetricKind::TotalByteSeconds => "total-byte-seconds",
            MetricKind::TotalBytes => "total-bytes",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command_name())
    }
}

/// What to query and how to group the returned series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub metric_type: &'static str,
    /// Resource label used as the first grouping key, e.g. `bucket_name`.
    pub resource_label: &'static str,
    /// Metric labels whose values are joined into the second grouping key.
    pub metric_labels: &'static [&'static str],
}

impl MetricDescriptor {
    pub const fn new(
        metric_type: &'static str,
        resource_label: &'static str,
        metric_labels: &'static [&'static str],
    ) -> Self {
        Self {
            metric_type,
            resource_label,
            metric_labels,
        }
    }

    pub fn filter(&self) -> String {
        format!("metric.type = \"{}\"", self.metric_type)
    }
}
