use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::Thresholds;
use crate::error::SurveyError;

pub const DEFAULT_CONFIG_FILE: &str = "mg-survey.json";
pub const DEFAULT_API_URL: &str = "http://api.metagenomics.anl.gov/";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub page_size: Option<u64>,
    #[serde(default)]
    pub export: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default)]
    pub report: Option<String>,
    #[serde(default)]
    pub verify_limit: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub thresholds: Option<Thresholds>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurveyConfig {
    pub api_url: String,
    pub page_size: u64,
    pub export: Utf8PathBuf,
    pub cache_dir: Utf8PathBuf,
    pub report: Utf8PathBuf,
    pub verify_limit: usize,
    pub timeout_secs: u64,
    pub thresholds: Thresholds,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            page_size: 10_000,
            export: Utf8PathBuf::from("web_table.tsv"),
            cache_dir: Utf8PathBuf::from("metagenomes"),
            report: Utf8PathBuf::from("report.html"),
            verify_limit: 10,
            timeout_secs: 300,
            thresholds: Thresholds::default(),
        }
    }
}

impl SurveyConfig {
    pub fn override_thresholds(
        &mut self,
        min_len: Option<f64>,
        max_len: Option<f64>,
        min_bps: Option<f64>,
    ) -> Result<(), SurveyError> {
        let mut thresholds = self.thresholds;
        if let Some(value) = min_len {
            thresholds.min_avg_seq_length = value;
        }
        if let Some(value) = max_len {
            thresholds.max_avg_seq_length = value;
        }
        if let Some(value) = min_bps {
            thresholds.min_bps = value;
        }
        thresholds.validate()?;
        self.thresholds = thresholds;
        Ok(())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<SurveyConfig, SurveyError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if !config_path.exists() {
            if path.is_some() {
                return Err(SurveyError::MissingConfig(config_path));
            }
            tracing::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| SurveyError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| SurveyError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<SurveyConfig, SurveyError> {
        let defaults = SurveyConfig::default();

        let page_size = config.page_size.unwrap_or(defaults.page_size);
        if page_size == 0 {
            return Err(SurveyError::InvalidPageSize);
        }

        let thresholds = config.thresholds.unwrap_or(defaults.thresholds);
        thresholds.validate()?;

        Ok(SurveyConfig {
            api_url: config.api_url.map(normalize_api_url).unwrap_or(defaults.api_url),
            page_size,
            export: config.export.map(Utf8PathBuf::from).unwrap_or(defaults.export),
            cache_dir: config
                .cache_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            report: config.report.map(Utf8PathBuf::from).unwrap_or(defaults.report),
            verify_limit: config.verify_limit.unwrap_or(defaults.verify_limit),
            timeout_secs: config.timeout_secs.unwrap_or(defaults.timeout_secs),
            thresholds,
        })
    }
}

fn normalize_api_url(url: String) -> String {
    if url.ends_with('/') {
        url
    } else {
        format!("{url}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved, SurveyConfig::default());
        assert_eq!(resolved.thresholds.min_bps, 1e8);
    }

    #[test]
    fn api_url_gets_trailing_slash() {
        let config = Config {
            api_url: Some("http://localhost:8080/1".to_string()),
            ..Config::default()
        };
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.api_url, "http://localhost:8080/1/");
    }
}
