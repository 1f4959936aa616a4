use crate::article::ArticleRecord;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The persisted fallback document consumed by the site front end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub github_repos: Vec<RepoRecord>,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub academic_data: AcademicData,
}

/// One GitHub repository, shaped like the REST API response fields the front
/// end consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRecord {
    pub name: String,
    pub html_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Per-source academic data plus the reconciled aggregate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcademicData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_scholar: Option<SourceData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopus: Option<SourceData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_of_science: Option<SourceData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orcid: Option<SourceData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximized: Option<SourceData>,
}

impl AcademicData {
    /// Tracked source entries in their fixed reporting order, paired with
    /// their persisted key names.
    pub fn sources(&self) -> [(&'static str, Option<&SourceData>); 5] {
        [
            ("google_scholar", self.google_scholar.as_ref()),
            ("scopus", self.scopus.as_ref()),
            ("web_of_science", self.web_of_science.as_ref()),
            ("orcid", self.orcid.as_ref()),
            ("maximized", self.maximized.as_ref()),
        ]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceData {
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub articles: Vec<ArticleRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub cited_by: CitedBy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CitedBy {
    #[serde(default)]
    pub table: CitationTable,
    #[serde(default)]
    pub graph: Vec<YearlyStat>,
}

/// Aggregate citation metrics, all-time plus an optional since-cutoff column.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CitationTable {
    #[serde(default)]
    pub citations: MetricValue,
    #[serde(default)]
    pub h_index: MetricValue,
    #[serde(default)]
    pub i10_index: MetricValue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricValue {
    #[serde(default)]
    pub all: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<u32>,
}

/// One point in the per-year citations/publications series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearlyStat {
    pub year: i32,
    #[serde(default)]
    pub citations: u32,
    #[serde(default)]
    pub publications: u32,
}

/// Load the previously persisted dataset for diffing. Any failure (missing
/// file, bad JSON) is treated as "no previous dataset", never as fatal.
pub fn load_previous(path: &Path) -> Option<Dataset> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!("no previous dataset at {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(dataset) => Some(dataset),
        Err(e) => {
            tracing::warn!("previous dataset at {} is unreadable: {}", path.display(), e);
            None
        }
    }
}

/// Serialize the dataset to a sibling temporary file, force it durable, then
/// atomically replace `path`. On any failure the temporary file is removed
/// and the original file is left untouched.
pub fn write_atomic(dataset: &Dataset, path: &Path) -> Result<(), PersistError> {
    let tmp = tmp_path(path);
    match write_tmp(dataset, &tmp) {
        Ok(()) => match fs::rename(&tmp, path) {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                Err(e.into())
            }
        },
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_tmp(dataset: &Dataset, tmp: &Path) -> Result<(), PersistError> {
    let payload = serde_json::to_vec_pretty(dataset)?;
    let mut file = File::create(tmp)?;
    file.write_all(&payload)?;
    file.flush()?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Dataset {
        let mut dataset = Dataset::default();
        dataset.last_updated = "2025-01-01T00:00:00Z".to_string();
        dataset.github_repos.push(RepoRecord {
            name: "scholarsync".to_string(),
            html_url: "https://github.com/u/scholarsync".to_string(),
            homepage: None,
            description: Some("pipeline".to_string()),
            language: Some("Rust".to_string()),
            stargazers_count: 3,
            forks_count: 1,
            updated_at: "2025-01-01T00:00:00Z".to_string(),
            topics: vec!["automation".to_string()],
        });
        dataset
    }

    #[test]
    fn write_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fallback-data.json");

        write_atomic(&sample(), &path).unwrap();
        let loaded = load_previous(&path).unwrap();
        assert_eq!(loaded.github_repos.len(), 1);
        assert_eq!(loaded.github_repos[0].name, "scholarsync");
        // no stray temp file
        assert!(!path.with_file_name("fallback-data.json.tmp").exists());
    }

    #[test]
    fn failed_write_leaves_original_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fallback-data.json");
        write_atomic(&sample(), &path).unwrap();

        // Target inside a directory that does not exist: the temp-file write
        // fails before the original is ever touched.
        let bad = dir.path().join("missing").join("fallback-data.json");
        assert!(write_atomic(&sample(), &bad).is_err());

        let still = load_previous(&path).unwrap();
        assert_eq!(still.github_repos[0].name, "scholarsync");
    }

    #[test]
    fn unreadable_previous_dataset_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fallback-data.json");
        std::fs::write(&path, "window.fallbackData = {not json").unwrap();
        assert!(load_previous(&path).is_none());
        assert!(load_previous(&dir.path().join("absent.json")).is_none());
    }

    #[test]
    fn dataset_tolerates_partial_json() {
        let parsed: Dataset =
            serde_json::from_str(r#"{"githubRepos":[{"name":"x","html_url":"u"}]}"#).unwrap();
        assert_eq!(parsed.github_repos[0].name, "x");
        assert!(parsed.academic_data.google_scholar.is_none());
        assert!(parsed.last_updated.is_empty());
    }
}
