use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_LOOKBACK_SECONDS: u64 = 660;
pub const DEFAULT_POINTS: i64 = 1;
pub const DEFAULT_ENDPOINT: &str = "https://monitoring.googleapis.com";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "gcs-metric-extract", "gcs-metric-extract")
            .context("cannot locate config directory")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Loads `path`, or the default location when `None`. A missing file
    /// yields the defaults; an explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path.is_some();
        let path = path.map(PathBuf::from).unwrap_or_else(|| {
            Config::default_path().unwrap_or_else(|_| PathBuf::from("./config.toml"))
        });
        let mut cfg = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading config at {:?}", path))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("parsing config at {:?}", path))?
        } else if explicit {
            anyhow::bail!("config file {:?} does not exist", path);
        } else {
            Config::default()
        };
        cfg.expand_paths();
        Ok(cfg)
    }

    pub fn expand_paths(&mut self) {
        if let Some(file) = &self.logging.file {
            self.logging.file = Some(expand_tilde(file));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Ldjson,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" | "json" => Ok(OutputFormat::Json),
            "ldjson" => Ok(OutputFormat::Ldjson),
            "csv" => Ok(OutputFormat::Csv),
            _ => anyhow::bail!("Unsupported format: {s}"),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Json => "json",
            OutputFormat::Ldjson => "ldjson",
            OutputFormat::Csv => "csv",
        })
    }
}

/// How CSV fields are quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvQuoting {
    /// `project,resource,"metric",end_time,value` with no escaping beyond
    /// the quotes around the metric. Values containing commas or quotes
    /// produce ambiguous rows.
    #[default]
    Legacy,
    /// Every text field quoted with RFC 4180 escaping; values stay bare.
    Strict,
}

impl FromStr for CsvQuoting {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(CsvQuoting::Legacy),
            "strict" => Ok(CsvQuoting::Strict),
            _ => anyhow::bail!("Unsupported csv quoting: {s}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "ReportConfig::default_lookback")]
    pub lookback: u64,
    #[serde(default = "ReportConfig::default_points")]
    pub points: i64,
    #[serde(default)]
    pub csv_quoting: CsvQuoting,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            lookback: Self::default_lookback(),
            points: Self::default_points(),
            csv_quoting: CsvQuoting::default(),
        }
    }
}

impl ReportConfig {
    fn default_lookback() -> u64 {
        DEFAULT_LOOKBACK_SECONDS
    }

    fn default_points() -> i64 {
        DEFAULT_POINTS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "ClientConfig::default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            access_token: None,
            timeout: None,
        }
    }
}

impl ClientConfig {
    fn default_endpoint() -> String {
        DEFAULT_ENDPOINT.into()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            file: None,
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "warn".into()
    }
}

/// Everything the report builder and formatter need for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub format: OutputFormat,
    pub lookback_seconds: u64,
    /// Points kept per series; zero or negative keeps all of them.
    pub max_points: i64,
    pub csv_quoting: CsvQuoting,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportConfig::default().into()
    }
}

impl From<ReportConfig> for ReportOptions {
    fn from(cfg: ReportConfig) -> Self {
        Self {
            format: cfg.format,
            lookback_seconds: cfg.lookback,
            max_points: cfg.points,
            csv_quoting: cfg.csv_quoting,
        }
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if !path_str.starts_with('~') {
        return path.to_path_buf();
    }

    let home = BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    if path_str == "~" {
        home
    } else {
        let mut expanded = home;
        expanded.push(path_str.trim_start_matches("~/"));
        expanded
    }
}
