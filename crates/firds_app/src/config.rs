use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use firds_engine::FetchSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Optional configuration file, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "firds_harvester.ron";

/// Search-endpoint query parameters. Defaults reproduce the register
/// query the harvester was built against: the FIRDS file registry,
/// three days of publications, up to 100 result rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedQuery {
    pub endpoint: String,
    pub from_date: String,
    pub to_date: String,
    pub rows: u32,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            endpoint: "https://registers.esma.europa.eu/solr/esma_registers_firds_files/select"
                .to_string(),
            from_date: "2021-01-17".to_string(),
            to_date: "2021-01-19".to_string(),
            rows: 100,
        }
    }
}

/// HTTP tuning knobs, mirrored into [`FetchSettings`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchTuning {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
}

impl Default for FetchTuning {
    fn default() -> Self {
        let defaults = FetchSettings::default();
        Self {
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            request_timeout_secs: defaults.request_timeout.as_secs(),
            redirect_limit: defaults.redirect_limit,
            max_bytes: defaults.max_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub feed: FeedQuery,
    pub fetch: FetchTuning,
    /// Where input.xml and output.csv land; current directory if unset.
    pub working_dir: Option<PathBuf>,
    pub log_to_terminal: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed: FeedQuery::default(),
            fetch: FetchTuning::default(),
            working_dir: None,
            log_to_terminal: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("invalid publication date {value}: {source}")]
    Date {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("invalid feed endpoint {value}: {source}")]
    Endpoint {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

impl AppConfig {
    /// Load `{dir}/firds_harvester.ron`. A missing file yields the
    /// defaults; a malformed file is a startup error.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILENAME);
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => return Err(ConfigError::Read { path, source: err }),
        };
        ron::from_str(&content).map_err(|err| ConfigError::Parse { path, source: err })
    }

    /// Assemble the search query URL: `q=*`, a `publication_date` range
    /// filter over whole days, XML response writer, and the row limit.
    pub fn query_url(&self) -> Result<String, ConfigError> {
        let from = parse_date(&self.feed.from_date)?;
        let to = parse_date(&self.feed.to_date)?;
        let mut url =
            Url::parse(&self.feed.endpoint).map_err(|err| ConfigError::Endpoint {
                value: self.feed.endpoint.clone(),
                source: err,
            })?;
        let range = format!(
            "publication_date:[{}T00:00:00Z TO {}T23:59:59Z]",
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );
        url.query_pairs_mut()
            .append_pair("q", "*")
            .append_pair("fq", &range)
            .append_pair("wt", "xml")
            .append_pair("indent", "true")
            .append_pair("start", "0")
            .append_pair("rows", &self.feed.rows.to_string());
        Ok(url.into())
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.fetch.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.fetch.request_timeout_secs),
            redirect_limit: self.fetch.redirect_limit,
            max_bytes: self.fetch.max_bytes,
        }
    }

    pub fn working_dir(&self) -> PathBuf {
        self.working_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|err| ConfigError::Date {
        value: value.to_string(),
        source: err,
    })
}
