use super::{async_trait, FetchError, SourceFetcher};
use crate::article::{clean_doi, clean_journal, parse_year, ArticleRecord, SCOPUS};
use crate::dataset::{CitedBy, Profile, SourceData};
use crate::metrics::table_from_articles;
use reqwest::Client;
use serde::Deserialize;

const SCOPUS_API_BASE: &str = "https://api.elsevier.com/content/search/scopus";
const PAGE_SIZE: usize = 25;

/// Elsevier Scopus search fetcher. Premium source: its structured metadata
/// overwrites less-structured sources during reconciliation.
pub struct ScopusClient {
    client: Client,
    author_id: String,
    api_key: String,
    cutoff_year: i32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "search-results")]
    search_results: SearchResults,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(rename = "opensearch:totalResults", default)]
    total_results: Option<String>,
    #[serde(default)]
    entry: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "dc:title")]
    title: Option<String>,
    #[serde(rename = "prism:publicationName")]
    publication_name: Option<String>,
    #[serde(rename = "prism:coverDate")]
    cover_date: Option<String>,
    #[serde(rename = "prism:doi")]
    doi: Option<String>,
    #[serde(rename = "citedby-count")]
    cited_by_count: Option<String>,
}

impl RawEntry {
    fn to_record(&self) -> Option<ArticleRecord> {
        let title = self.title.as_deref()?.trim();
        if title.is_empty() {
            return None;
        }
        let mut record = ArticleRecord::new(title);
        record.doi = clean_doi(self.doi.as_deref());
        record.journal_title = clean_journal(self.publication_name.as_deref());
        record.year = self.cover_date.as_deref().and_then(parse_year);
        record.cited_by = self
            .cited_by_count
            .as_deref()
            .and_then(|c| c.trim().parse().ok())
            .unwrap_or(0);
        record.synthesize_link();
        Some(record)
    }
}

impl ScopusClient {
    pub fn new(author_id: &str, api_key: &str, cutoff_year: i32) -> Self {
        let client = Client::builder()
            .user_agent("scholarsync/0.1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            author_id: author_id.to_string(),
            api_key: api_key.to_string(),
            cutoff_year,
        }
    }

    async fn query(&self, start: usize) -> Result<SearchResults, FetchError> {
        let query = format!("AU-ID({})", self.author_id);
        let url = format!(
            "{}?query={}&count={}&start={}",
            SCOPUS_API_BASE,
            urlencoding::encode(&query),
            PAGE_SIZE,
            start
        );

        let response = self
            .client
            .get(&url)
            .header("X-ELS-APIKey", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::TOO_MANY_REQUESTS => return Err(FetchError::RateLimited),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(FetchError::Api("Scopus rejected the API key".to_string()))
            }
            status if !status.is_success() => {
                return Err(FetchError::Api(format!("Scopus returned status {}", status)))
            }
            _ => {}
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(format!("Scopus response: {}", e)))?;
        Ok(parsed.search_results)
    }
}

#[async_trait]
impl SourceFetcher for ScopusClient {
    async fn fetch(&self) -> Result<SourceData, FetchError> {
        let mut articles = Vec::new();
        let mut start = 0;

        loop {
            let results = self.query(start).await?;
            let total: usize = results
                .total_results
                .as_deref()
                .and_then(|t| t.parse().ok())
                .unwrap_or(0);

            let batch_len = results.entry.len();
            articles.extend(results.entry.iter().filter_map(RawEntry::to_record));

            start += batch_len;
            if batch_len == 0 || start >= total {
                break;
            }
        }

        // Scopus reports per-article counts but no author profile; the
        // citation table is recomputed from its own articles.
        let table = table_from_articles(&articles, self.cutoff_year);
        Ok(SourceData {
            profile: Profile {
                cited_by: CitedBy {
                    table,
                    graph: Vec::new(),
                },
            },
            articles,
        })
    }

    fn name(&self) -> &'static str {
        SCOPUS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_conversion() {
        let raw: RawEntry = serde_json::from_str(
            r#"{
                "dc:title": "Multi-trait selection index for cassava",
                "prism:publicationName": "Euphytica",
                "prism:coverDate": "2022-06-15",
                "prism:doi": "10.1007/s10681-022-01234-5",
                "citedby-count": "8"
            }"#,
        )
        .unwrap();

        let record = raw.to_record().unwrap();
        assert_eq!(record.year, Some(2022));
        assert_eq!(record.cited_by, 8);
        assert_eq!(record.journal_title.as_deref(), Some("Euphytica"));
        assert_eq!(
            record.link.as_deref(),
            Some("https://doi.org/10.1007/s10681-022-01234-5")
        );
    }

    #[test]
    fn malformed_counts_degrade_to_zero() {
        let raw: RawEntry = serde_json::from_str(
            r#"{"dc:title": "Some work", "citedby-count": "many"}"#,
        )
        .unwrap();
        assert_eq!(raw.to_record().unwrap().cited_by, 0);
    }
}
