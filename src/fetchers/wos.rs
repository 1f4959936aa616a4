use super::{async_trait, FetchError, SourceFetcher};
use crate::article::{clean_doi, clean_journal, ArticleRecord, WEB_OF_SCIENCE};
use crate::dataset::{CitedBy, Profile, SourceData};
use crate::metrics::table_from_articles;
use reqwest::Client;
use serde::Deserialize;

const WOS_API_BASE: &str = "https://api.clarivate.com/apis/wos-starter/v1/documents";
const PAGE_SIZE: usize = 50;

/// Clarivate Web of Science Starter fetcher. Premium source, like Scopus.
pub struct WosClient {
    client: Client,
    researcher_id: String,
    api_key: String,
    cutoff_year: i32,
}

#[derive(Debug, Deserialize)]
struct DocumentsResponse {
    #[serde(default)]
    metadata: ResponseMetadata,
    #[serde(default)]
    hits: Vec<RawDocument>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    total: usize,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    title: Option<String>,
    source: Option<RawSource>,
    identifiers: Option<RawIdentifiers>,
    #[serde(default)]
    citations: Vec<RawCitation>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(rename = "sourceTitle")]
    source_title: Option<String>,
    #[serde(rename = "publishYear")]
    publish_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct RawIdentifiers {
    doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCitation {
    db: Option<String>,
    #[serde(default)]
    count: u32,
}

impl RawDocument {
    fn to_record(&self) -> Option<ArticleRecord> {
        let title = self.title.as_deref()?.trim();
        if title.is_empty() {
            return None;
        }
        let mut record = ArticleRecord::new(title);
        record.doi = clean_doi(self.identifiers.as_ref().and_then(|i| i.doi.as_deref()));
        if let Some(source) = &self.source {
            record.journal_title = clean_journal(source.source_title.as_deref());
            record.year = source.publish_year;
        }
        record.cited_by = self
            .citations
            .iter()
            .find(|c| c.db.as_deref() == Some("WOS"))
            .or_else(|| self.citations.first())
            .map(|c| c.count)
            .unwrap_or(0);
        record.synthesize_link();
        Some(record)
    }
}

impl WosClient {
    pub fn new(researcher_id: &str, api_key: &str, cutoff_year: i32) -> Self {
        let client = Client::builder()
            .user_agent("scholarsync/0.1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            researcher_id: researcher_id.to_string(),
            api_key: api_key.to_string(),
            cutoff_year,
        }
    }

    async fn query(&self, page: usize) -> Result<DocumentsResponse, FetchError> {
        let query = format!("AI=({})", self.researcher_id);
        let url = format!(
            "{}?db=WOS&q={}&limit={}&page={}",
            WOS_API_BASE,
            urlencoding::encode(&query),
            PAGE_SIZE,
            page
        );

        let response = self
            .client
            .get(&url)
            .header("X-ApiKey", &self.api_key)
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::TOO_MANY_REQUESTS => return Err(FetchError::RateLimited),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(FetchError::Api(
                    "Web of Science rejected the API key".to_string(),
                ))
            }
            status if !status.is_success() => {
                return Err(FetchError::Api(format!(
                    "Web of Science returned status {}",
                    status
                )))
            }
            _ => {}
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Parse(format!("Web of Science response: {}", e)))
    }
}

#[async_trait]
impl SourceFetcher for WosClient {
    async fn fetch(&self) -> Result<SourceData, FetchError> {
        let mut articles = Vec::new();
        let mut page = 1;
        let mut seen = 0;

        loop {
            let response = self.query(page).await?;
            let batch_len = response.hits.len();
            seen += batch_len;
            articles.extend(response.hits.iter().filter_map(RawDocument::to_record));

            if batch_len == 0 || seen >= response.metadata.total {
                break;
            }
            page += 1;
        }

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
        WEB_OF_SCIENCE
    }
}
