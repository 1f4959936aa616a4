use super::{async_trait, FetchError, SourceFetcher};
use crate::article::{clean_doi, clean_journal, parse_year, ArticleRecord, ORCID};
use crate::dataset::{Profile, SourceData};
use reqwest::Client;
use serde::Deserialize;

const ORCID_API_BASE: &str = "https://pub.orcid.org/v3.0";

/// ORCID public API works fetcher. ORCID knows titles, DOIs, and journals
/// but nothing about citations, so every record arrives with a count of 0.
pub struct OrcidClient {
    client: Client,
    orcid_id: String,
}

// The ORCID payload nests nearly everything behind nullable wrappers;
// optionals all the way down keeps one absent field from dropping the
// whole works list.

#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    group: Vec<WorkGroup>,
}

#[derive(Debug, Deserialize)]
struct WorkGroup {
    #[serde(rename = "work-summary", default)]
    work_summary: Vec<WorkSummary>,
}

#[derive(Debug, Deserialize)]
struct WorkSummary {
    title: Option<TitleWrapper>,
    #[serde(rename = "external-ids")]
    external_ids: Option<ExternalIds>,
    url: Option<ValueWrapper>,
    #[serde(rename = "publication-date")]
    publication_date: Option<PublicationDate>,
    #[serde(rename = "journal-title")]
    journal_title: Option<ValueWrapper>,
}

#[derive(Debug, Deserialize)]
struct TitleWrapper {
    title: Option<ValueWrapper>,
}

#[derive(Debug, Deserialize)]
struct ValueWrapper {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    #[serde(rename = "external-id", default)]
    external_id: Vec<ExternalId>,
}

#[derive(Debug, Deserialize)]
struct ExternalId {
    #[serde(rename = "external-id-type")]
    id_type: Option<String>,
    #[serde(rename = "external-id-value")]
    id_value: Option<String>,
    #[serde(rename = "external-id-url")]
    id_url: Option<ValueWrapper>,
}

#[derive(Debug, Deserialize)]
struct PublicationDate {
    year: Option<ValueWrapper>,
}

impl WorkSummary {
    fn to_record(&self) -> Option<ArticleRecord> {
        let title = self
            .title
            .as_ref()?
            .title
            .as_ref()?
            .value
            .as_deref()?
            .trim();
        if title.is_empty() {
            return None;
        }

        let mut record = ArticleRecord::new(title);

        let doi_id = self.external_ids.as_ref().and_then(|ids| {
            ids.external_id
                .iter()
                .find(|id| id.id_type.as_deref() == Some("doi"))
        });
        if let Some(doi_id) = doi_id {
            record.doi = clean_doi(doi_id.id_value.as_deref());
            record.link = doi_id
                .id_url
                .as_ref()
                .and_then(|u| u.value.clone())
                .filter(|u| !u.is_empty());
        }

        if let Some(url) = self.url.as_ref().and_then(|u| u.value.clone()) {
            if record.link.is_none() && !url.is_empty() {
                record.link = Some(url);
            }
        }

        record.year = self
            .publication_date
            .as_ref()
            .and_then(|d| d.year.as_ref())
            .and_then(|y| y.value.as_deref())
            .and_then(parse_year);

        record.journal_title = clean_journal(
            self.journal_title
                .as_ref()
                .and_then(|j| j.value.as_deref()),
        );

        record.synthesize_link();
        Some(record)
    }
}

impl OrcidClient {
    pub fn new(orcid_id: &str) -> Self {
        let client = Client::builder()
            .user_agent("scholarsync/0.1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            orcid_id: orcid_id.to_string(),
        }
    }
}

#[async_trait]
impl SourceFetcher for OrcidClient {
    async fn fetch(&self) -> Result<SourceData, FetchError> {
        let url = format!("{}/{}/works", ORCID_API_BASE, self.orcid_id);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(FetchError::Api(format!(
                "ORCID returned status {}",
                response.status()
            )));
        }

        let parsed: WorksResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(format!("ORCID response: {}", e)))?;

        let articles: Vec<ArticleRecord> = parsed
            .group
            .iter()
            .filter_map(|g| g.work_summary.first())
            .filter_map(WorkSummary::to_record)
            .collect();

        Ok(SourceData {
            profile: Profile::default(),
            articles,
        })
    }

    fn name(&self) -> &'static str {
        ORCID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_conversion_handles_nested_nulls() {
        let summary: WorkSummary = serde_json::from_str(
            r#"{
                "title": {"title": {"value": "Selection indexes via genomic kernels"}},
                "external-ids": {"external-id": [
                    {"external-id-type": "eid", "external-id-value": "2-s2.0-1"},
                    {"external-id-type": "doi", "external-id-value": "10.1111/pbr.1",
                     "external-id-url": {"value": "https://doi.org/10.1111/pbr.1"}}
                ]},
                "url": null,
                "publication-date": {"year": {"value": "2020"}},
                "journal-title": {"value": "Plant Breeding"}
            }"#,
        )
        .unwrap();

        let record = summary.to_record().unwrap();
        assert_eq!(record.doi.as_deref(), Some("10.1111/pbr.1"));
        assert_eq!(record.year, Some(2020));
        assert_eq!(record.journal_title.as_deref(), Some("Plant Breeding"));
        assert_eq!(record.cited_by, 0);
    }

    #[test]
    fn missing_title_value_is_dropped() {
        let summary: WorkSummary =
            serde_json::from_str(r#"{"title": {"title": null}}"#).unwrap();
        assert!(summary.to_record().is_none());
    }
}
