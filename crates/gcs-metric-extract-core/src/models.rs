use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::ReportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeInterval {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

/// Detail level requested from the API. Reports always need the points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSeriesView {
    /// Labels and points.
    Full,
}

impl TimeSeriesView {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeSeriesView::Full => "FULL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTimeSeriesRequest {
    /// `projects/<project id>`
    pub name: String,
    pub filter: String,
    pub interval: TimeInterval,
    pub view: TimeSeriesView,
    pub page_token: Option<String>,
}

/// Raw value type code as reported by the monitoring API.
pub type ValueTypeCode = i32;

pub const VALUE_TYPE_UNSPECIFIED: ValueTypeCode = 0;
pub const VALUE_TYPE_BOOL: ValueTypeCode = 1;
pub const VALUE_TYPE_INT64: ValueTypeCode = 2;
pub const VALUE_TYPE_DOUBLE: ValueTypeCode = 3;
pub const VALUE_TYPE_STRING: ValueTypeCode = 4;
pub const VALUE_TYPE_DISTRIBUTION: ValueTypeCode = 5;
pub const VALUE_TYPE_MONEY: ValueTypeCode = 6;

/// The value types a report can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Int64,
    Double,
}

impl ValueType {
    pub fn from_code(code: ValueTypeCode) -> Result<Self, ReportError> {
        match code {
            VALUE_TYPE_INT64 => Ok(ValueType::Int64),
            VALUE_TYPE_DOUBLE => Ok(ValueType::Double),
            other => Err(ReportError::UnsupportedValueType(other)),
        }
    }

    /// Pulls the field matching this type out of a raw point value.
    /// Absent fields read as zero, like unset proto3 scalars.
    pub fn read(self, value: &TypedValue) -> PointValue {
        match self {
            ValueType::Int64 => PointValue::Int64(value.int64_value.unwrap_or_default()),
            ValueType::Double => PointValue::Double(value.double_value.unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TypedValue {
    pub int64_value: Option<i64>,
    pub double_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub interval: TimeInterval,
    pub value: TypedValue,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    pub metric_type: String,
    pub metric_labels: HashMap<String, String>,
    pub resource_type: String,
    pub resource_labels: HashMap<String, String>,
    pub value_type: ValueTypeCode,
    /// Newest first.
    pub points: Vec<Point>,
}

impl TimeSeries {
    pub fn resource_label(&self, name: &str) -> &str {
        self.resource_labels
            .get(name)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn metric_label(&self, name: &str) -> &str {
        self.metric_labels
            .get(name)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListTimeSeriesPage {
    pub time_series: Vec<TimeSeries>,
    /// Empty on the last page.
    pub next_page_token: String,
}

/// A point's value, serialized as a bare JSON number.
///
/// serde_json has no encoding for non-finite numbers, so NaN and infinite
/// doubles come out as `null` in json and ldjson output. CSV prints them as
/// `nan`, `inf` and `-inf`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    Int64(i64),
    Double(f64),
}

impl fmt::Display for PointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointValue::Int64(v) => write!(f, "{v}"),
            PointValue::Double(v) => f.write_str(&format_double(*v)),
        }
    }
}

/// Shortest round-trip digits, fixed notation for decimal exponents in
/// `-4..16` (always with a fractional part) and `1.5e+20` / `1e-05` style
/// outside of it.
pub fn format_double(v: f64) -> String {
    if v.is_nan() {
        return "nan".into();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.into();
    }

    let sci = format!("{v:e}");
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    if (-4..16).contains(&exp) {
        if exp < 0 {
            let zeros = "0".repeat((-exp - 1) as usize);
            format!("{sign}0.{zeros}{digits}")
        } else {
            let int_len = exp as usize + 1;
            if digits.len() <= int_len {
                let zeros = "0".repeat(int_len - digits.len());
                format!("{sign}{digits}{zeros}.0")
            } else {
                let (int, frac) = digits.split_at(int_len);
                format!("{sign}{int}.{frac}")
            }
        }
    } else {
        let (lead, frac) = digits.split_at(1);
        let exp_sign = if exp < 0 { '-' } else { '+' };
        if frac.is_empty() {
            format!("{sign}{lead}e{exp_sign}{:02}", exp.abs())
        } else {
            format!("{sign}{lead}.{frac}e{exp_sign}{:02}", exp.abs())
        }
    }
}

/// A single `end time -> value` pair, serialized as a one-key JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointEntry(BTreeMap<String, PointValue>);

impl PointEntry {
    pub fn new(end_time: impl Into<String>, value: PointValue) -> Self {
        let mut map = BTreeMap::new();
        map.insert(end_time.into(), value);
        Self(map)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The pair when the entry holds exactly one, `None` otherwise.
    pub fn single(&self) -> Option<(&str, PointValue)> {
        let mut iter = self.0.iter();
        match (iter.next(), iter.next()) {
            (Some((end_time, value)), None) => Some((end_time.as_str(), *value)),
            _ => None,
        }
    }
}

// Every level keeps insertion order: projects as requested, resources and
// label keys as the API returned them. Re-inserting a key keeps its slot.

/// Metric label key (comma-joined label values) to points, newest first.
pub type ResourceReport = IndexMap<String, Vec<PointEntry>>;

/// Resource label value to its per-label-combination points.
pub type ProjectReport = IndexMap<String, ResourceReport>;

/// Project id to its report.
pub type Report = IndexMap<String, ProjectReport>;
