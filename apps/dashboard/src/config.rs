use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use dashboard_core::{gateway, ApiEndpoints, DashboardSettings};
use serde::Deserialize;
use shared::domain::CountryCode;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub countries_api_url: String,
    pub covid_api_url: String,
    pub request_timeout_secs: u64,
    pub freshness_hours: i64,
    pub prefetch_concurrency: usize,
    pub prefetch_exclusions: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/dashboard.db".into(),
            countries_api_url: gateway::DEFAULT_COUNTRIES_API_URL.into(),
            covid_api_url: gateway::DEFAULT_COVID_API_URL.into(),
            request_timeout_secs: gateway::DEFAULT_REQUEST_TIMEOUT.as_secs(),
            freshness_hours: 24,
            prefetch_concurrency: 8,
            prefetch_exclusions: vec!["XK".into()],
        }
    }
}

/// Optional overrides read from `dashboard.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    database_url: Option<String>,
    countries_api_url: Option<String>,
    covid_api_url: Option<String>,
    request_timeout_secs: Option<u64>,
    freshness_hours: Option<i64>,
    prefetch_concurrency: Option<usize>,
    prefetch_exclusions: Option<Vec<String>>,
}

/// Defaults, then the config file if it exists, then environment variables.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        settings.apply_file(file_cfg);
    }

    settings.apply_env(|name| std::env::var(name).ok())?;
    Ok(settings)
}

impl Settings {
    fn apply_file(&mut self, file_cfg: FileSettings) {
        if let Some(v) = file_cfg.database_url {
            self.database_url = v;
        }
        if let Some(v) = file_cfg.countries_api_url {
            self.countries_api_url = v;
        }
        if let Some(v) = file_cfg.covid_api_url {
            self.covid_api_url = v;
        }
        if let Some(v) = file_cfg.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = file_cfg.freshness_hours {
            self.freshness_hours = v;
        }
        if let Some(v) = file_cfg.prefetch_concurrency {
            self.prefetch_concurrency = v;
        }
        if let Some(v) = file_cfg.prefetch_exclusions {
            self.prefetch_exclusions = v;
        }
    }

    /// `DASHBOARD_<NAME>` wins over `APP__<NAME>`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        let var = |name: &str| {
            lookup(&format!("DASHBOARD_{name}")).or_else(|| lookup(&format!("APP__{name}")))
        };

        if let Some(v) = var("DATABASE_URL") {
            self.database_url = v;
        }
        if let Some(v) = var("COUNTRIES_API_URL") {
            self.countries_api_url = v;
        }
        if let Some(v) = var("COVID_API_URL") {
            self.covid_api_url = v;
        }
        if let Some(v) = var("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = v
                .parse()
                .with_context(|| format!("REQUEST_TIMEOUT_SECS must be an integer, got '{v}'"))?;
        }
        if let Some(v) = var("FRESHNESS_HOURS") {
            self.freshness_hours = v
                .parse()
                .with_context(|| format!("FRESHNESS_HOURS must be an integer, got '{v}'"))?;
        }
        if let Some(v) = var("PREFETCH_CONCURRENCY") {
            self.prefetch_concurrency = v
                .parse()
                .with_context(|| format!("PREFETCH_CONCURRENCY must be an integer, got '{v}'"))?;
        }
        if let Some(v) = var("PREFETCH_EXCLUSIONS") {
            self.prefetch_exclusions = v
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(())
    }

    pub fn endpoints(&self) -> anyhow::Result<ApiEndpoints> {
        ApiEndpoints::new(&self.countries_api_url, &self.covid_api_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn dashboard_settings(&self) -> anyhow::Result<DashboardSettings> {
        anyhow::ensure!(
            self.freshness_hours > 0,
            "freshness_hours must be positive, got {}",
            self.freshness_hours
        );
        Ok(DashboardSettings {
            freshness: chrono::Duration::hours(self.freshness_hours),
            prefetch_concurrency: self.prefetch_concurrency.max(1),
            prefetch_exclusions: self
                .prefetch_exclusions
                .iter()
                .map(|code| CountryCode::new(code.to_ascii_uppercase()))
                .collect(),
        })
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("dashboard.toml")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
