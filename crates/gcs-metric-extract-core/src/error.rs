use thiserror::Error;

use crate::models::ValueTypeCode;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("monitoring API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("monitoring API returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unable to obtain an access token: {0}")]
    Auth(String),
    #[error("unexpected monitoring API response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unsupported metric value type: {0}")]
    UnsupportedValueType(ValueTypeCode),
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error(
        "internal error occurred: point for {project}/{resource}/{metric} holds {pairs} \
         values instead of one. Please file a GitHub issue with this message."
    )]
    MalformedPoint {
        project: String,
        resource: String,
        metric: String,
        pairs: usize,
    },
    #[error("writing output: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("encoding csv: {0}")]
    Csv(#[from] csv::Error),
}
