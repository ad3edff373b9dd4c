//! Coupler configuration
//!
//! Loaded from a TOML file with four sections: `[coupler]` (process
//! behaviour), `[elasticsearch]` (index connection), `[pa]` (PA API
//! credentials and sync filters) and `[tagdb]` (enrichment service).
//! Command-line flags override a subset of the `[coupler]` keys.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pacoupler_client::{DEFAULT_PA_URL, DEFAULT_PAGE_SIZE, DEFAULT_TAGDB_URL};
use pacoupler_core::Watermark;
use serde::Deserialize;
use thiserror::Error;

/// Longest accepted poll period: one week, in minutes
const MAX_POLL_PERIOD: u64 = 7 * 24 * 60;

/// Configuration errors; always fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't open configuration file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("couldn't parse configuration file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// How the coupler runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Take the lock, sync once, exit
    Once,
    /// Stay resident and sync every poll period
    Poll,
}

/// Full coupler configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub coupler: CouplerConfig,
    pub elasticsearch: ElasticsearchConfig,
    pub pa: PaConfig,
    #[serde(default)]
    pub tagdb: TagDbConfig,
}

/// `[coupler]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CouplerConfig {
    /// Log file to append to; stderr when unset
    pub logfile: Option<PathBuf>,
    /// `ERROR`, `WARNING`, `INFO` or `DEBUG`
    pub loglevel: String,
    pub lockfile: PathBuf,
    pub mode: RunMode,
    /// Polling period in minutes
    pub poll_period: u64,
    pub lock_timeout_secs: u64,
    pub http_timeout_secs: u64,
}

impl Default for CouplerConfig {
    fn default() -> Self {
        Self {
            logfile: None,
            loglevel: "WARNING".to_string(),
            lockfile: PathBuf::from("/var/lock/pa-es-coupler.lock"),
            mode: RunMode::Once,
            poll_period: 10,
            lock_timeout_secs: 5,
            http_timeout_secs: 30,
        }
    }
}

impl CouplerConfig {
    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.poll_period.saturating_mul(60))
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// `[elasticsearch]` section
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElasticsearchConfig {
    pub hosts: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_testrun_index")]
    pub testrun_index: String,
    #[serde(default = "default_pageobject_index")]
    pub pageobject_index: String,
}

impl std::fmt::Debug for ElasticsearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchConfig")
            .field("hosts", &self.hosts)
            .field("username", &self.username)
            .field("testrun_index", &self.testrun_index)
            .field("pageobject_index", &self.pageobject_index)
            .finish_non_exhaustive()
    }
}

fn default_testrun_index() -> String {
    "pa-testruns".to_string()
}

fn default_pageobject_index() -> String {
    "pa-objects".to_string()
}

/// `[pa]` section
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaConfig {
    #[serde(default = "default_pa_endpoint")]
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub basic_auth: String,
    pub realm: String,
    /// Job template types to sync; empty syncs every type
    #[serde(default)]
    pub jobtemplates: Vec<String>,
    /// Watermark used when the index holds no data (`2017-01-30T00:00+0000`)
    pub since: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_pa_endpoint() -> String {
    DEFAULT_PA_URL.to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl std::fmt::Debug for PaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("realm", &self.realm)
            .field("jobtemplates", &self.jobtemplates)
            .field("since", &self.since)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl PaConfig {
    /// The configured fallback watermark, if any
    pub fn since(&self) -> Result<Option<Watermark>, ConfigError> {
        match self.since.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Watermark::parse_since(raw).map(Some).map_err(|_| {
                ConfigError::Invalid(format!(
                    "couldn't parse pa.since '{}', expected YYYY-MM-DDTHH:MM+HHMM",
                    raw
                ))
            }),
        }
    }
}

/// `[tagdb]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagDbConfig {
    pub endpoint: String,
}

impl Default for TagDbConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_TAGDB_URL.to_string(),
        }
    }
}

/// Command-line overrides applied on top of the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub logfile: Option<PathBuf>,
    pub loglevel: Option<String>,
    pub lockfile: Option<PathBuf>,
    pub mode: Option<RunMode>,
}

impl ConfigOverrides {
    pub fn apply(&self, coupler: &mut CouplerConfig) {
        if let Some(logfile) = &self.logfile {
            coupler.logfile = Some(logfile.clone());
        }
        if let Some(loglevel) = &self.loglevel {
            coupler.loglevel = loglevel.clone();
        }
        if let Some(lockfile) = &self.lockfile {
            coupler.lockfile = lockfile.clone();
        }
        if let Some(mode) = self.mode {
            coupler.mode = mode;
        }
    }
}

impl Config {
    /// Reads, parses and validates a configuration file
    pub fn load(path: &Path, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        overrides.apply(&mut config.coupler);
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let es = &self.elasticsearch;
        if es.hosts.is_empty() {
            return Err(invalid("elasticsearch.hosts cannot be empty"));
        }
        for host in &es.hosts {
            require_http_url("elasticsearch.hosts", host)?;
        }
        if es.username.is_some() != es.password.is_some() {
            return Err(invalid(
                "elasticsearch.username and elasticsearch.password must be set together",
            ));
        }
        if es.testrun_index.is_empty() || es.pageobject_index.is_empty() {
            return Err(invalid("elasticsearch index names cannot be empty"));
        }

        let pa = &self.pa;
        require_http_url("pa.endpoint", &pa.endpoint)?;
        for (key, value) in [
            ("pa.username", &pa.username),
            ("pa.password", &pa.password),
            ("pa.basic_auth", &pa.basic_auth),
            ("pa.realm", &pa.realm),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(&format!("{} cannot be empty", key)));
            }
        }
        if pa.page_size == 0 {
            return Err(invalid("pa.page_size must be greater than 0"));
        }
        pa.since()?;

        require_http_url("tagdb.endpoint", &self.tagdb.endpoint)?;

        let coupler = &self.coupler;
        if coupler.poll_period == 0 {
            return Err(invalid("coupler.poll_period must be greater than 0"));
        }
        if coupler.poll_period > MAX_POLL_PERIOD {
            return Err(ConfigError::Invalid(format!(
                "coupler.poll_period must be at most {} minutes",
                MAX_POLL_PERIOD
            )));
        }
        if coupler.http_timeout_secs == 0 {
            return Err(invalid("coupler.http_timeout_secs must be greater than 0"));
        }
        if coupler.lockfile.as_os_str().is_empty() {
            return Err(invalid("coupler.lockfile cannot be empty"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

fn require_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Invalid(format!(
            "{} must start with http:// or https:// (got '{}')",
            key, value
        )));
    }
    Ok(())
}

/// Sample configuration printed by `--example-config`
pub const EXAMPLE_CONFIG: &str = r#"[coupler]
# Leave logfile out to log to stderr
logfile = "/var/log/coupler.log"
loglevel = "WARNING"
lockfile = "/var/lock/pa-es-coupler.lock"
# "once" syncs and exits (run it from cron), "poll" stays resident
mode = "once"
# Polling period in minutes
poll_period = 10

[elasticsearch]
# A simple config:
hosts = ["http://localhost:9200"]

# A more complex set up:
# hosts = ["http://server1.local:9200", "https://server2.local:9243"]
# username = "foo"
# password = "bar"

[pa]
username = "foo"
password = "bar123!!"
basic_auth = "abcdef1=="
realm = "12345"
# jobtemplates = ["Single", "Multi", "Crawl", "Scripted"]
# Below is the only supported date format!
# since = "2017-01-30T00:00+0000"
"#;
