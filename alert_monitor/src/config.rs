//! Monitor configuration: parsing, validation and loading.
//!
//! The monitor is configured by one TOML file. Every section has defaults, so
//! an empty file is a valid configuration that polls the public search API
//! with the public key and keeps its data under `./data`.
//!
//! ```toml
//! data_dir = "/var/lib/alert-monitor"
//!
//! [api]
//! timeout_secs = 30
//!
//! [polling]
//! tick_secs = 60
//! page_concurrency = 10
//! enrich_concurrency = 20
//!
//! [notify]
//! subject_prefix = "New results"
//! ```
//!
//! A few values can be overridden from the environment (see
//! [`MonitorConfig::apply_env_overrides`]); the API key in particular is
//! usually supplied that way.
//!
//! Entrypoints:
//! - Parse + validate from a TOML string: [`load_config_str`]
//! - Parse + validate from a file path: [`load_config_path`]

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, bail};
use search_client::{
    RetryPolicy,
    models::request_params::DEFAULT_PAGE_SIZE,
    providers::ec_rest::{DEFAULT_FACET_URL, DEFAULT_SEARCH_URL, EcProviderConfig},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use shared_utils::env::{get_env_var, parse_env_var};

use crate::{
    facets::FacetKeys, fetcher::FetchLimits, models::alert::DEFAULT_INTERVAL_MINUTES,
    scheduler::SchedulerSettings, store::AlertPaths,
};

/// Overrides `api.api_key`.
pub const ENV_API_KEY: &str = "SEARCH_API_KEY";
/// Overrides `data_dir`.
pub const ENV_DATA_DIR: &str = "ALERT_MONITOR_DATA_DIR";
/// Overrides `api.timeout_secs`.
pub const ENV_TIMEOUT_SECS: &str = "SEARCH_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Root directory of the JSON store.
    pub data_dir: PathBuf,
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub files: FilesConfig,
    pub notify: NotifyConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            api: ApiConfig::default(),
            polling: PollingConfig::default(),
            files: FilesConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

/// Search API endpoints and credentials.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub search_url: String,
    pub facet_url: String,
    pub api_key: String,
    /// Free-text parameter sent with every request.
    pub text: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            facet_url: DEFAULT_FACET_URL.to_string(),
            api_key: "SEDIA".to_string(),
            text: "***".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Cadence, concurrency and retry settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingConfig {
    pub tick_secs: u64,
    pub facet_refresh_secs: u64,
    pub page_size: u32,
    pub page_concurrency: usize,
    pub enrich_concurrency: usize,
    /// Total attempts per request, the first included.
    pub max_attempts: u32,
    /// Delay after failed attempt `n` is `n × retry_base_delay_ms`.
    pub retry_base_delay_ms: u64,
    pub batch_pause_ms: u64,
    /// Detail records kept per alert.
    pub history_cap: usize,
    /// Interval for alerts that do not set one.
    pub default_interval_minutes: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            tick_secs: 60,
            facet_refresh_secs: 7 * 24 * 60 * 60,
            page_size: DEFAULT_PAGE_SIZE,
            page_concurrency: 10,
            enrich_concurrency: 20,
            max_attempts: 3,
            retry_base_delay_ms: 2_000,
            batch_pause_ms: 1_000,
            history_cap: 1_000,
            default_interval_minutes: DEFAULT_INTERVAL_MINUTES,
        }
    }
}

/// Store keys, relative to `data_dir`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesConfig {
    pub alerts: String,
    pub facets: String,
    pub languages: String,
    pub sort: String,
    pub facet_query: String,
    /// Directory holding snapshots, query mirrors and temporary queries.
    pub alerts_dir: String,
    pub outbox: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            alerts: "config/alerts.json".to_string(),
            facets: "facet.json".to_string(),
            languages: "config/languages.json".to_string(),
            sort: "config/sort.json".to_string(),
            facet_query: "config/facet.json".to_string(),
            alerts_dir: "alerts".to_string(),
            outbox: "outbox".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifyConfig {
    pub subject_prefix: String,
    /// Body size, in characters, past which remaining records are replaced by a notice.
    pub max_body_chars: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            subject_prefix: "New results".to_string(),
            max_body_chars: 10_000,
        }
    }
}

impl MonitorConfig {
    /// Applies environment overrides; empty variables are ignored.
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Ok(key) = get_env_var(ENV_API_KEY) {
            self.api.api_key = key;
        }
        if let Ok(dir) = get_env_var(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(secs) = parse_env_var::<u64>(ENV_TIMEOUT_SECS)? {
            self.api.timeout_secs = secs;
        }
        Ok(())
    }

    /// Trims string settings and rejects values the monitor cannot run with.
    pub fn validate(&mut self) -> anyhow::Result<()> {
        for value in [
            &mut self.api.search_url,
            &mut self.api.facet_url,
            &mut self.api.api_key,
            &mut self.api.text,
            &mut self.files.alerts,
            &mut self.files.facets,
            &mut self.files.languages,
            &mut self.files.sort,
            &mut self.files.facet_query,
            &mut self.files.alerts_dir,
            &mut self.files.outbox,
        ] {
            *value = value.trim().to_string();
        }

        let p = &self.polling;
        let zeros = [
            ("api.timeout_secs", self.api.timeout_secs == 0),
            ("polling.tick_secs", p.tick_secs == 0),
            ("polling.facet_refresh_secs", p.facet_refresh_secs == 0),
            ("polling.page_size", p.page_size == 0),
            ("polling.page_concurrency", p.page_concurrency == 0),
            ("polling.enrich_concurrency", p.enrich_concurrency == 0),
            ("polling.max_attempts", p.max_attempts == 0),
            ("polling.default_interval_minutes", p.default_interval_minutes == 0),
            ("notify.max_body_chars", self.notify.max_body_chars == 0),
        ];
        if let Some((name, _)) = zeros.iter().find(|(_, zero)| *zero) {
            bail!("{name} must be greater than zero");
        }

        if self.api.api_key.is_empty() {
            bail!("api.api_key must not be empty (set it in the file or via {ENV_API_KEY})");
        }
        if self.api.search_url.is_empty() || self.api.facet_url.is_empty() {
            bail!("api.search_url and api.facet_url must not be empty");
        }
        let files = &self.files;
        for (name, key) in [
            ("files.alerts", &files.alerts),
            ("files.facets", &files.facets),
            ("files.languages", &files.languages),
            ("files.sort", &files.sort),
            ("files.facet_query", &files.facet_query),
            ("files.alerts_dir", &files.alerts_dir),
            ("files.outbox", &files.outbox),
        ] {
            if key.is_empty() || key.starts_with('/') || key.split('/').any(|s| s == "..") {
                bail!("{name} must be a relative path inside data_dir, got {key:?}");
            }
        }
        Ok(())
    }

    pub fn provider_config(&self) -> EcProviderConfig {
        EcProviderConfig {
            search_url: self.api.search_url.clone(),
            facet_url: self.api.facet_url.clone(),
            api_key: SecretString::from(self.api.api_key.clone()),
            text: self.api.text.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.polling.max_attempts,
            base_delay: Duration::from_millis(self.polling.retry_base_delay_ms),
        }
    }

    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            page_size: self.polling.page_size,
            page_concurrency: self.polling.page_concurrency,
            batch_pause: Duration::from_millis(self.polling.batch_pause_ms),
        }
    }

    pub fn alert_paths(&self) -> AlertPaths {
        AlertPaths::new(self.files.alerts_dir.clone())
    }

    pub fn facet_keys(&self) -> FacetKeys {
        FacetKeys {
            query: self.files.facet_query.clone(),
            languages: self.files.languages.clone(),
            table: self.files.facets.clone(),
        }
    }

    pub fn facet_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.polling.facet_refresh_secs)
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            tick: Duration::from_secs(self.polling.tick_secs),
            default_interval_minutes: self.polling.default_interval_minutes,
            history_cap: self.polling.history_cap,
            subject_prefix: self.notify.subject_prefix.clone(),
            max_body_chars: self.notify.max_body_chars,
            alerts_key: self.files.alerts.clone(),
            languages_key: self.files.languages.clone(),
            sort_key: self.files.sort.clone(),
        }
    }
}

/// Parse + validate a configuration from a TOML string.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<MonitorConfig> {
    let mut config: MonitorConfig = toml::from_str(toml_str).context("failed to parse config TOML")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Read, parse and validate a configuration file.
pub fn load_config_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<MonitorConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_file_is_the_default_config() {
        let config = load_config_str("").unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.polling.page_concurrency, 10);
        assert_eq!(config.polling.enrich_concurrency, 20);
        assert_eq!(config.retry_policy().delay_after(2), Duration::from_secs(4));
        assert_eq!(config.alert_paths().snapshot("a"), "alerts/snapshots/a.json");
    }

    #[test]
    fn sections_override_defaults() {
        let config = load_config_str(
            r#"
            data_dir = "/srv/monitor"

            [polling]
            tick_secs = 5
            max_attempts = 5

            [files]
            alerts = " alerts.json "
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/monitor"));
        assert_eq!(config.polling.tick_secs, 5);
        assert_eq!(config.polling.page_size, 100);
        assert_eq!(config.files.alerts, "alerts.json");
        assert_eq!(config.scheduler_settings().alerts_key, "alerts.json");
    }

    #[test]
    fn zero_limits_are_rejected() {
        let err = load_config_str("[polling]\npage_concurrency = 0\n").unwrap_err();
        assert!(format!("{err:#}").contains("polling.page_concurrency must be greater than zero"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(load_config_str("[polling]\ntick = 5\n").is_err());
    }

    #[test]
    fn escaping_store_keys_are_rejected() {
        let err = load_config_str("[files]\noutbox = \"../mail\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("files.outbox"));
    }

    #[test]
    fn loads_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[notify]\nsubject_prefix = \"Nouveaux résultats\"").unwrap();
        let config = load_config_path(file.path()).unwrap();
        assert_eq!(config.notify.subject_prefix, "Nouveaux résultats");
        assert!(load_config_path("/definitely/not/here.toml").is_err());
    }
}
