pub use async_trait::async_trait;

pub mod github;
pub mod orcid;
pub mod scholar;
pub mod scopus;
pub mod wos;

use crate::dataset::SourceData;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("Rate limited, try again later")]
    RateLimited,
    #[error("API error: {0}")]
    Api(String),
    #[error("All configured API keys failed")]
    KeysExhausted,
}

/// One fetcher per bibliographic source, behind a common interface. Each
/// returns its own normalized profile + article list; a failure means "no
/// contribution from this source" to the pipeline, never a fatal error.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch and normalize everything this source knows about the author.
    async fn fetch(&self) -> Result<SourceData, FetchError>;

    /// Name of this source as recorded in `ArticleRecord::sources`.
    fn name(&self) -> &'static str;
}
