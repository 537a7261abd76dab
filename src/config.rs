use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::Style;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub table_path: PathBuf,
    pub analysis_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            table_path: PathBuf::from("output/historical_data.csv"),
            analysis_path: PathBuf::from("output/asp_analysis.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    /// Path between the host and the category slug, e.g. `us/en-us`.
    pub locale_path: String,
    /// Category slug to the style its products default to.
    pub categories: BTreeMap<String, Style>,
    pub start_date: NaiveDate,
    /// Defaults to the run date.
    pub end_date: Option<NaiveDate>,
    pub request_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub user_agents: Vec<String>,
    pub cdx_endpoint: String,
    pub archive_prefix: String,
    pub include_current: bool,
    pub wholesale_markers: Vec<String>,
    pub dtc_markers: Vec<String>,
    pub output: OutputConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let categories = [
            ("sandals", Style::OpenToe),
            ("clogs", Style::ClosedToe),
            ("boots", Style::ClosedToe),
            ("shoes", Style::ClosedToe),
        ]
        .into_iter()
        .map(|(name, style)| (name.to_string(), style))
        .collect();

        Self {
            base_url: "https://www.birkenstock.com".into(),
            locale_path: "us/en-us".into(),
            categories,
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            end_date: None,
            request_delay_ms: 2000,
            request_timeout_secs: 15,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".into(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0 Safari/605.1.15".into(),
            ],
            cdx_endpoint: "https://web.archive.org/cdx/search/cdx".into(),
            archive_prefix: "https://web.archive.org/web".into(),
            include_current: true,
            wholesale_markers: vec![
                "wholesale".into(),
                "retailer".into(),
                "dealer".into(),
                "stockist".into(),
            ],
            dtc_markers: vec![
                "add to cart".into(),
                "add-to-cart".into(),
                "buy now".into(),
            ],
            output: OutputConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn category_url(&self, category: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let locale = self.locale_path.trim_matches('/');
        if locale.is_empty() {
            format!("{}/{}", base, category)
        } else {
            format!("{}/{}/{}", base, locale, category)
        }
    }

    /// Host of `base_url`, used to recognise the retailer's own store pages.
    pub fn store_host(&self) -> Option<String> {
        reqwest::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.categories.is_empty() {
            return Err(ConfigError::Invalid("no categories configured".into()));
        }
        if self.user_agents.is_empty() {
            return Err(ConfigError::Invalid("user_agents must not be empty".into()));
        }
        if let Some(end) = self.end_date {
            if self.start_date > end {
                return Err(ConfigError::Invalid(format!(
                    "start_date {} is after end_date {}",
                    self.start_date, end
                )));
            }
        }
        Ok(())
    }
}

/// Loads `path` if it exists, otherwise falls back to the built-in defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let config = if path.exists() {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)?
    } else {
        AppConfig::default()
    };
    config.validate()?;
    Ok(config)
}
