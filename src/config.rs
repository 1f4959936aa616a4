use crate::reconcile::MergeOptions;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default cutoff year for "since" metric columns when the config does not
/// set one; matches the Scholar profile's rolling window at the time the
/// site was built.
pub const DEFAULT_CUTOFF_YEAR: i32 = 2020;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing required config keys: {}", .0.join(", "))]
    Missing(Vec<String>),
}

/// Credentials and tuning knobs, loaded once from `keys.json` and passed
/// explicitly into the pipeline. There is no global configuration state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github_username: Option<String>,
    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default)]
    pub scholar_author_id: Option<String>,
    #[serde(default)]
    pub serpapi_api_key: Option<String>,
    #[serde(default)]
    pub serpapi_api_key2: Option<String>,
    #[serde(default)]
    pub orcid_id: Option<String>,
    #[serde(default)]
    pub scopus_author_id: Option<String>,
    #[serde(default)]
    pub scopus_api_key: Option<String>,
    #[serde(default)]
    pub wos_author_id: Option<String>,
    #[serde(default)]
    pub wos_api_key: Option<String>,
    /// Cutoff year for "since" metric columns
    #[serde(default)]
    pub cutoff_year: Option<i32>,
    /// Override for the fuzzy-match minimum key length
    #[serde(default)]
    pub fuzzy_min_len: Option<usize>,
    /// Override for the materially-longer-title margin
    #[serde(default)]
    pub title_margin: Option<usize>,
}

impl Config {
    /// Load and validate a config file, failing fast with the complete list
    /// of missing required keys rather than the first one found.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Required: GitHub username, Scholar author id, ORCID id, and at least
    /// one usable SerpApi key. Scopus and Web of Science are optional and
    /// their fetchers are skipped when unconfigured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if is_blank(&self.github_username) {
            missing.push("github_username".to_string());
        }
        if is_blank(&self.scholar_author_id) {
            missing.push("scholar_author_id".to_string());
        }
        if is_blank(&self.orcid_id) {
            missing.push("orcid_id".to_string());
        }
        if self.serpapi_keys().is_empty() {
            missing.push("serpapi_api_key".to_string());
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }

    /// Usable SerpApi keys in rotation order, with empty and placeholder
    /// values filtered out.
    pub fn serpapi_keys(&self) -> Vec<&str> {
        [&self.serpapi_api_key, &self.serpapi_api_key2]
            .into_iter()
            .filter_map(|k| k.as_deref())
            .map(str::trim)
            .filter(|k| !k.is_empty() && !is_placeholder(k))
            .collect()
    }

    pub fn scopus_enabled(&self) -> bool {
        !is_blank(&self.scopus_author_id) && !is_blank(&self.scopus_api_key)
    }

    pub fn wos_enabled(&self) -> bool {
        !is_blank(&self.wos_author_id) && !is_blank(&self.wos_api_key)
    }

    pub fn cutoff_year(&self) -> i32 {
        self.cutoff_year.unwrap_or(DEFAULT_CUTOFF_YEAR)
    }

    pub fn merge_options(&self) -> MergeOptions {
        let defaults = MergeOptions::default();
        MergeOptions {
            min_fuzzy_len: self.fuzzy_min_len.unwrap_or(defaults.min_fuzzy_len),
            title_margin: self.title_margin.unwrap_or(defaults.title_margin),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Keys that still hold the template text shipped with the site are not
/// real credentials.
fn is_placeholder(key: &str) -> bool {
    let upper = key.to_uppercase();
    upper.contains("CHAVE") || upper.contains("YOUR_") || upper.contains("API_KEY_HERE")
}
