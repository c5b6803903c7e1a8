use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::process::Command;
use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{
    ListTimeSeriesPage, ListTimeSeriesRequest, Point, TimeInterval, TimeSeries, Timestamp,
    TypedValue, ValueTypeCode, VALUE_TYPE_BOOL, VALUE_TYPE_DISTRIBUTION, VALUE_TYPE_DOUBLE,
    VALUE_TYPE_INT64, VALUE_TYPE_MONEY, VALUE_TYPE_STRING, VALUE_TYPE_UNSPECIFIED,
};
use crate::timeutils::{parse_rfc3339, to_rfc3339};

/// Source of time series pages. One call fetches one page.
pub trait MonitoringClient {
    fn list_time_series(
        &mut self,
        request: &ListTimeSeriesRequest,
    ) -> Result<ListTimeSeriesPage, ClientError>;
}

/// Cloud Monitoring v3 REST client.
pub struct HttpMonitoringClient {
    http: Client,
    endpoint: String,
    token: String,
}

impl HttpMonitoringClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let token = match &config.access_token {
            Some(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => gcloud_access_token()?,
        };
        Self::with_token(config, token)
    }

    pub fn with_token(config: &ClientConfig, token: String) -> Result<Self, ClientError> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn query(request: &ListTimeSeriesRequest) -> Result<Vec<(&'static str, String)>, ClientError> {
        let mut query = vec![
            ("filter", request.filter.clone()),
            ("interval.startTime", rfc3339(request.interval.start_time)?),
            ("interval.endTime", rfc3339(request.interval.end_time)?),
            ("view", request.view.as_str().to_string()),
        ];
        if let Some(token) = request.page_token.as_deref().filter(|t| !t.is_empty()) {
            query.push(("pageToken", token.to_string()));
        }
        Ok(query)
    }
}

impl MonitoringClient for HttpMonitoringClient {
    fn list_time_series(
        &mut self,
        request: &ListTimeSeriesRequest,
    ) -> Result<ListTimeSeriesPage, ClientError> {
        let url = format!("{}/v3/{}/timeSeries", self.endpoint, request.name);
        debug!(%url, filter = %request.filter, "listing time series");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&Self::query(request)?)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_else(|e| e.to_string());
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let body: ApiListResponse = response.json()?;
        trace!(series = body.time_series.len(), "decoded page");
        body.try_into()
    }
}

fn rfc3339(ts: Timestamp) -> Result<String, ClientError> {
    to_rfc3339(ts).ok_or_else(|| ClientError::Decode(format!("timestamp out of range: {ts:?}")))
}

fn gcloud_access_token() -> Result<String, ClientError> {
    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .map_err(|e| ClientError::Auth(format!("running gcloud: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ClientError::Auth(format!(
            "gcloud exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ClientError::Auth("gcloud printed an empty token".into()));
    }
    Ok(token)
}

/// Maps the API's value type names onto their numeric codes.
pub fn value_type_code(name: &str) -> ValueTypeCode {
    match name {
        "BOOL" => VALUE_TYPE_BOOL,
        "INT64" => VALUE_TYPE_INT64,
        "DOUBLE" => VALUE_TYPE_DOUBLE,
        "STRING" => VALUE_TYPE_STRING,
        "DISTRIBUTION" => VALUE_TYPE_DISTRIBUTION,
        "MONEY" => VALUE_TYPE_MONEY,
        _ => VALUE_TYPE_UNSPECIFIED,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiListResponse {
    #[serde(default)]
    time_series: Vec<ApiTimeSeries>,
    #[serde(default)]
    next_page_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiLabeled {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    labels: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTimeSeries {
    #[serde(default)]
    metric: ApiLabeled,
    #[serde(default)]
    resource: ApiLabeled,
    #[serde(default)]
    value_type: String,
    #[serde(default)]
    points: Vec<ApiPoint>,
}

#[derive(Debug, Deserialize)]
struct ApiPoint {
    interval: ApiInterval,
    #[serde(default)]
    value: ApiTypedValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiInterval {
    #[serde(default)]
    start_time: Option<String>,
    end_time: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTypedValue {
    int64_value: Option<NumberOrString>,
    double_value: Option<NumberOrString>,
}

// int64 travels as a JSON string; doubles may be "NaN" or "Infinity".
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumberOrString {
    fn as_i64(&self) -> Result<i64, ClientError> {
        match self {
            NumberOrString::Int(v) => Ok(*v),
            NumberOrString::Float(v) => Ok(*v as i64),
            NumberOrString::Text(s) => s
                .parse()
                .map_err(|_| ClientError::Decode(format!("invalid int64 value: {s:?}"))),
        }
    }

    fn as_f64(&self) -> Result<f64, ClientError> {
        match self {
            NumberOrString::Int(v) => Ok(*v as f64),
            NumberOrString::Float(v) => Ok(*v),
            NumberOrString::Text(s) => s
                .parse()
                .map_err(|_| ClientError::Decode(format!("invalid double value: {s:?}"))),
        }
    }
}

impl TryFrom<ApiListResponse> for ListTimeSeriesPage {
    type Error = ClientError;

    fn try_from(body: ApiListResponse) -> Result<Self, Self::Error> {
        let time_series = body
            .time_series
            .into_iter()
            .map(TimeSeries::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ListTimeSeriesPage {
            time_series,
            next_page_token: body.next_page_token,
        })
    }
}

impl TryFrom<ApiTimeSeries> for TimeSeries {
    type Error = ClientError;

    fn try_from(series: ApiTimeSeries) -> Result<Self, Self::Error> {
        let points = series
            .points
            .into_iter()
            .map(Point::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TimeSeries {
            metric_type: series.metric.kind,
            metric_labels: series.metric.labels,
            resource_type: series.resource.kind,
            resource_labels: series.resource.labels,
            value_type: value_type_code(&series.value_type),
            points,
        })
    }
}

impl TryFrom<ApiPoint> for Point {
    type Error = ClientError;

    fn try_from(point: ApiPoint) -> Result<Self, Self::Error> {
        let end_time = parse_timestamp(&point.interval.end_time)?;
        let start_time = match &point.interval.start_time {
            Some(start) => parse_timestamp(start)?,
            None => end_time,
        };
        let value = TypedValue {
            int64_value: point
                .value
                .int64_value
                .as_ref()
                .map(NumberOrString::as_i64)
                .transpose()?,
            double_value: point
                .value
                .double_value
                .as_ref()
                .map(NumberOrString::as_f64)
                .transpose()?,
        };
        Ok(Point {
            interval: TimeInterval {
                start_time,
                end_time,
            },
            value,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<Timestamp, ClientError> {
    parse_rfc3339(value).ok_or_else(|| ClientError::Decode(format!("invalid timestamp: {value:?}")))
}
