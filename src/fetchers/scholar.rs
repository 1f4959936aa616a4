use super::{async_trait, FetchError, SourceFetcher};
use crate::article::{clean_journal, parse_year, ArticleRecord, GOOGLE_SCHOLAR};
use crate::dataset::{CitationTable, CitedBy, MetricValue, Profile, SourceData, YearlyStat};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

const SERPAPI_BASE: &str = "https://serpapi.com/search.json";
const PAGE_SIZE: usize = 20;

/// The citation graph is rendered from this year onward; years the API
/// omits are backfilled with zeros so the series has no holes.
const GRAPH_START_YEAR: i32 = 2017;

/// Google Scholar author fetcher via the SerpApi proxy, with rotation
/// across the configured API keys.
pub struct ScholarClient {
    client: Client,
    author_id: String,
    api_keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorResponse {
    error: Option<String>,
    cited_by: Option<RawCitedBy>,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawCitedBy {
    #[serde(default)]
    table: Vec<RawTableRow>,
    #[serde(default)]
    graph: Vec<RawGraphPoint>,
}

/// SerpApi returns the metric table as a list of singleton objects, with
/// key names localized by the `hl` parameter. The aliases cover the
/// Portuguese profile this site was originally scraped with.
#[derive(Debug, Deserialize)]
struct RawTableRow {
    #[serde(default, alias = "citações")]
    citations: Option<RawMetric>,
    #[serde(default, alias = "Índice_h")]
    h_index: Option<RawMetric>,
    #[serde(default, alias = "Índice_i10")]
    i10_index: Option<RawMetric>,
}

#[derive(Debug, Deserialize)]
struct RawMetric {
    #[serde(default)]
    all: Option<u32>,
    #[serde(flatten)]
    extra: HashMap<String, u32>,
}

impl RawMetric {
    fn to_value(&self) -> MetricValue {
        // "since_2020" in English profiles, "desde_2020" in Portuguese ones
        let since = self
            .extra
            .iter()
            .find(|(k, _)| k.starts_with("since_") || k.starts_with("desde_"))
            .map(|(_, v)| *v);
        MetricValue {
            all: self.all.unwrap_or(0),
            since,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawGraphPoint {
    year: i32,
    #[serde(default)]
    citations: u32,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    title: Option<String>,
    link: Option<String>,
    publication: Option<String>,
    year: Option<String>,
    cited_by: Option<RawArticleCitations>,
}

#[derive(Debug, Deserialize)]
struct RawArticleCitations {
    #[serde(default)]
    value: Option<u32>,
}

impl RawArticle {
    fn to_record(&self) -> Option<ArticleRecord> {
        let title = self.title.as_deref()?.trim();
        if title.is_empty() {
            return None;
        }
        let mut record = ArticleRecord::new(title);
        record.link = self.link.clone().filter(|l| !l.is_empty());
        record.journal_title = clean_journal(self.publication.as_deref());
        record.year = self
            .year
            .as_deref()
            .and_then(parse_year)
            .or_else(|| self.publication.as_deref().and_then(parse_year));
        record.cited_by = self
            .cited_by
            .as_ref()
            .and_then(|c| c.value)
            .unwrap_or(0);
        Some(record)
    }
}

impl ScholarClient {
    pub fn new(author_id: &str, api_keys: Vec<String>) -> Self {
        let client = Client::builder()
            .user_agent("scholarsync/0.1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            author_id: author_id.to_string(),
            api_keys,
        }
    }

    async fn query(&self, api_key: &str, start: usize) -> Result<AuthorResponse, FetchError> {
        let url = format!(
            "{}?engine=google_scholar_author&author_id={}&hl=en&start={}&num={}&api_key={}",
            SERPAPI_BASE,
            urlencoding::encode(&self.author_id),
            start,
            PAGE_SIZE,
            urlencoding::encode(api_key)
        );

        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }

        let parsed: AuthorResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(format!("SerpApi response: {}", e)))?;

        if let Some(error) = parsed.error {
            return Err(FetchError::Api(error));
        }
        Ok(parsed)
    }

    /// Profile plus all article pages with one key. The first page carries
    /// the citation table and graph; later pages only add articles.
    async fn fetch_with_key(&self, api_key: &str) -> Result<SourceData, FetchError> {
        let first = self.query(api_key, 0).await?;
        let profile = convert_profile(first.cited_by.as_ref());

        let mut articles: Vec<ArticleRecord> =
            first.articles.iter().filter_map(RawArticle::to_record).collect();
        let mut fetched = first.articles.len();

        while fetched > 0 && fetched % PAGE_SIZE == 0 {
            let page = self.query(api_key, fetched).await?;
            if page.articles.is_empty() {
                break;
            }
            fetched += page.articles.len();
            articles.extend(page.articles.iter().filter_map(RawArticle::to_record));
            if page.articles.len() < PAGE_SIZE {
                break;
            }
        }

        Ok(SourceData { profile, articles })
    }
}

fn convert_profile(cited_by: Option<&RawCitedBy>) -> Profile {
    let cited_by = match cited_by {
        Some(c) => c,
        None => return Profile::default(),
    };

    let mut table = CitationTable::default();
    for row in &cited_by.table {
        if let Some(metric) = &row.citations {
            table.citations = metric.to_value();
        }
        if let Some(metric) = &row.h_index {
            table.h_index = metric.to_value();
        }
        if let Some(metric) = &row.i10_index {
            table.i10_index = metric.to_value();
        }
    }

    let mut graph: Vec<YearlyStat> = cited_by
        .graph
        .iter()
        .map(|p| YearlyStat {
            year: p.year,
            citations: p.citations,
            publications: 0,
        })
        .collect();
    graph.sort_by_key(|s| s.year);

    if let Some(first_year) = graph.first().map(|s| s.year) {
        let mut backfilled: Vec<YearlyStat> = (GRAPH_START_YEAR..first_year)
            .map(|year| YearlyStat {
                year,
                citations: 0,
                publications: 0,
            })
            .collect();
        backfilled.extend(graph);
        graph = backfilled;
    }

    Profile {
        cited_by: CitedBy {
            table,
            graph,
        },
    }
}

#[async_trait]
impl SourceFetcher for ScholarClient {
    async fn fetch(&self) -> Result<SourceData, FetchError> {
        let total = self.api_keys.len();
        for (i, key) in self.api_keys.iter().enumerate() {
            tracing::debug!("trying SerpApi key {}/{}", i + 1, total);
            match self.fetch_with_key(key).await {
                Ok(data) => return Ok(data),
                Err(e) => {
                    tracing::warn!("SerpApi key {}/{} failed: {}", i + 1, total, e);
                }
            }
        }
        Err(FetchError::KeysExhausted)
    }

    fn name(&self) -> &'static str {
        GOOGLE_SCHOLAR
    }
}
