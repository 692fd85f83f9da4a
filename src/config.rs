use crate::equity::DEFAULT_CATEGORY_FIELD;
use crate::infrastructure::DEFAULT_INFRASTRUCTURE_ATTRIBUTES;
use crate::nutrition::BASELINE_YEAR;
use crate::ranking::DEFAULT_TOP_N;
use crate::types::{FilterCriteria, GroupBy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings for one reporting run. Every field has a default, so a config
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    #[serde(default)]
    pub filter: FilterCriteria,
    #[serde(default = "default_group_by")]
    pub group_by: GroupBy,
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_baseline_year")]
    pub baseline_year: i32,
    #[serde(default = "default_compare_year")]
    pub compare_year: i32,
    #[serde(default = "default_category_field")]
    pub category_field: String,
    #[serde(default = "default_attributes")]
    pub infrastructure_attributes: Vec<String>,
}

fn default_group_by() -> GroupBy {
    GroupBy::District
}

fn default_metric() -> String {
    "Total Enrolled".to_string()
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_baseline_year() -> i32 {
    BASELINE_YEAR
}

fn default_compare_year() -> i32 {
    BASELINE_YEAR + 1
}

fn default_category_field() -> String {
    DEFAULT_CATEGORY_FIELD.to_string()
}

fn default_attributes() -> Vec<String> {
    DEFAULT_INFRASTRUCTURE_ATTRIBUTES.iter().map(|s| s.to_string()).collect()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            filter: FilterCriteria::default(),
            group_by: default_group_by(),
            metric: default_metric(),
            top_n: default_top_n(),
            baseline_year: default_baseline_year(),
            compare_year: default_compare_year(),
            category_field: default_category_field(),
            infrastructure_attributes: default_attributes(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loaded analysis config");
        Ok(config)
    }

    pub fn attributes(&self) -> Vec<&str> {
        self.infrastructure_attributes.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"topN": 5, "groupBy": "state", "filter": {"region": "North"}}"#).unwrap();
        assert_eq!(config.top_n, 5);
        assert_eq!(config.group_by, GroupBy::State);
        assert_eq!(config.filter.region.as_deref(), Some("North"));
        assert_eq!(config.baseline_year, 2023);
        assert_eq!(config.compare_year, 2024);
        assert_eq!(config.category_field, "Location Type");
        assert_eq!(config.attributes().len(), DEFAULT_INFRASTRUCTURE_ATTRIBUTES.len());
    }

    #[test]
    fn empty_config_matches_default() {
        let config: AnalysisConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = AnalysisConfig::from_file(Path::new("/nonexistent/analysis.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
