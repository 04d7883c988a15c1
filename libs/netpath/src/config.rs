use std::path::{Path, PathBuf};
use std::time::Duration;

use nrql::{FilterSelection, TimeRange, TimeWindow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{DEFAULT_TIMEOUT, NerdGraphClient, Region};
use crate::Error;

pub const CONFIG_ENV: &str = "NETPATH_CONFIG";
pub const API_KEY_ENV: &str = "NEW_RELIC_API_KEY";
pub const ACCOUNT_ENV: &str = "NEW_RELIC_ACCOUNT_ID";

/// `netpath.toml`.
///
/// ```toml
/// api_key = "NRAK-..."
/// account_id = 1234567
/// region = "eu"
/// filter_cache_capacity = 64
///
/// [time_range]
/// duration = 3600000
///
/// [[filters]]
/// key = "protocol"
/// operator = "IN"
/// values = ["TCP", "UDP"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub account_id: Option<i64>,
    pub region: Region,
    /// Overrides the region endpoint.
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Unbounded when unset.
    pub filter_cache_capacity: Option<usize>,
    pub time_range: Option<TimeRange>,
    pub filters: Vec<FilterSelection>,
}

impl Config {
    /// Candidate config files, most specific first.
    pub fn search_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = explicit.map(Path::to_path_buf).into_iter().collect();
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            paths.push(path.into());
        }
        if let Some(dirs) = directories::ProjectDirs::from("com", "newrelic", "netpath") {
            paths.push(dirs.config_dir().join("netpath.toml"));
        }
        paths.push("./netpath.toml".into());
        paths
    }

    /// Loads the first config file found, or the defaults when there is none.
    /// An explicitly named file has to exist.
    pub fn parse(explicit: Option<&Path>) -> Result<Self, Error> {
        if explicit.is_some_and(|path| !path.exists()) {
            return Err(Error::ConfigNotFound);
        }
        for path in Self::search_paths(explicit) {
            let config = match std::fs::read_to_string(&path) {
                Ok(config) => config,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            debug!(path = %path.display(), "loaded config");
            return Self::from_toml(&config);
        }
        Ok(Self::default())
    }

    pub fn from_toml(s: &str) -> Result<Self, Error> {
        Ok(toml::from_str(s)?)
    }

    /// Applies `NEW_RELIC_API_KEY` and `NEW_RELIC_ACCOUNT_ID` from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), Error> {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(account) = lookup(ACCOUNT_ENV) {
            self.account_id = Some(parse_account(&account)?);
        }
        Ok(())
    }

    pub fn api_key(&self) -> Result<&str, Error> {
        self.api_key.as_deref().ok_or(Error::MissingApiKey)
    }

    pub fn account(&self) -> Result<i64, Error> {
        self.account_id.ok_or(Error::MissingAccount)
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(self.region.endpoint())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn time_window(&self) -> TimeWindow {
        TimeWindow::from_range(self.time_range.as_ref())
    }

    pub fn client(&self) -> Result<NerdGraphClient, Error> {
        NerdGraphClient::new(self.api_key()?, self.endpoint(), self.timeout())
    }
}

pub fn parse_account(s: &str) -> Result<i64, Error> {
    s.trim()
        .parse()
        .map_err(|_| Error::InvalidAccount(s.to_string()))
}
