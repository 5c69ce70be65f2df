use crate::health::HealthRules;
use crate::metrics::{DEFAULT_BENCHMARK_FACTOR, DEFAULT_CHANGE_LABEL, DescriptionTable, FormatterConfig};
use crate::trends::ChartSettings;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SETTINGS_FILE: &str = "idxratio";
pub const ENV_PREFIX: &str = "IDXRATIO";
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings")]
    Load(#[from] ConfigError),
    #[error("api.base_url must be an http(s) URL, got {0:?}")]
    BaseUrl(String),
    #[error("metrics.benchmark_factor must be a finite number, got {0}")]
    BenchmarkFactor(f64),
}

/// Root settings: an optional `idxratio.{toml,yaml,json}` file overlaid by
/// `IDXRATIO__SECTION__KEY` environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub health: HealthRules,
    pub metrics: MetricSettings,
    pub chart: ChartSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub backoff_base_ms: u64,
    pub user_agent: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 20,
            max_retries: 3,
            backoff_base_ms: 1000,
            user_agent: concat!("idxratio/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ApiSettings {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub const fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricSettings {
    pub benchmark_factor: f64,
    pub change_label: String,
    /// Extra or replacement metric descriptions, keyed by raw metric key.
    pub descriptions: BTreeMap<String, String>,
}

impl Default for MetricSettings {
    fn default() -> Self {
        Self {
            benchmark_factor: DEFAULT_BENCHMARK_FACTOR,
            change_label: DEFAULT_CHANGE_LABEL.to_string(),
            descriptions: BTreeMap::new(),
        }
    }
}

impl MetricSettings {
    pub fn formatter_config(&self) -> FormatterConfig {
        FormatterConfig {
            benchmark_factor: self.benchmark_factor,
            change_label: self.change_label.clone(),
            descriptions: DescriptionTable::builtin().with_overrides(
                self.descriptions
                    .iter()
                    .map(|(key, text)| (key.clone(), text.clone())),
            ),
        }
    }
}

impl Settings {
    /// Reads `path` when given, otherwise the optional `idxratio` file in the
    /// working directory, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_SETTINGS_FILE).required(false),
        };
        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, SettingsError> {
        let settings: Self = config.try_deserialize()?;
        settings.validated()
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(base_url) = base_url {
            self.api.base_url = base_url;
        }
        self
    }

    pub fn validated(self) -> Result<Self, SettingsError> {
        let base_url = self.api.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(SettingsError::BaseUrl(self.api.base_url));
        }
        if !self.metrics.benchmark_factor.is_finite() {
            return Err(SettingsError::BenchmarkFactor(self.metrics.benchmark_factor));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::Comparison;
    use config::FileFormat;

    fn from_toml(source: &str) -> Result<Settings, SettingsError> {
        let config = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;
        Settings::from_config(config)
    }

    #[test]
    fn empty_source_gives_defaults() {
        let settings = from_toml("").unwrap();
        assert_eq!(settings.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.api.max_retries, 3);
        assert_eq!(settings.health, HealthRules::default());
        assert_eq!(settings.chart.max_periods, 6);
        assert!((settings.metrics.benchmark_factor - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn sections_override_defaults() {
        let settings = from_toml(
            r#"
            [api]
            base_url = "https://ratios.example.id/api"
            timeout_secs = 5

            [chart]
            max_periods = 8

            [metrics]
            change_label = "vs last quarter"

            [health]
            base = 40

            [[health.rules]]
            category = "leverage"
            metric = "der"
            comparison = "above"
            threshold = 1.5
            delta = -25
            "#,
        )
        .unwrap();

        assert_eq!(settings.api.base_url, "https://ratios.example.id/api");
        assert_eq!(settings.api.timeout(), Duration::from_secs(5));
        assert_eq!(settings.api.max_retries, 3);
        assert_eq!(settings.chart.max_periods, 8);
        assert_eq!(settings.chart.max_primary_series, 4);
        assert_eq!(settings.metrics.formatter_config().change_label, "vs last quarter");
        assert_eq!(settings.health.base, 40);
        assert_eq!(settings.health.max, 100);
        assert_eq!(settings.health.rules.len(), 1);
        assert_eq!(settings.health.rules[0].comparison, Comparison::Above);
        assert_eq!(settings.health.rules[0].delta, -25);
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = from_toml("[api]\nbase_url = \"localhost:5000\"").unwrap_err();
        assert!(matches!(err, SettingsError::BaseUrl(_)));
    }

    #[test]
    fn cli_base_url_wins() {
        let settings = Settings::default()
            .with_base_url(Some("http://10.0.0.2:5000/api".to_string()))
            .validated()
            .unwrap();
        assert_eq!(settings.api.base_url, "http://10.0.0.2:5000/api");
        let untouched = Settings::default().with_base_url(None);
        assert_eq!(untouched.api.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn description_overrides_reach_formatter() {
        let mut metrics = MetricSettings::default();
        metrics
            .descriptions
            .insert("roe".to_string(), "Return on equity".to_string());
        let config = metrics.formatter_config();
        assert_eq!(config.descriptions.describe("roe"), "Return on equity");
        assert_eq!(
            config.descriptions.describe("roa"),
            "Net income divided by total assets"
        );
    }
}
