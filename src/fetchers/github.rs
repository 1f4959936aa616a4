use super::FetchError;
use crate::dataset::RepoRecord;
use reqwest::Client;
use serde::Deserialize;

const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "scholarsync/0.1.0 (https://github.com/wevertoncosta/scholarsync)";
const PER_PAGE: usize = 100;

/// GitHub REST client for the public repository listing.
pub struct GithubClient {
    client: Client,
    username: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRepo {
    name: String,
    html_url: String,
    homepage: Option<String>,
    description: Option<String>,
    language: Option<String>,
    #[serde(default)]
    stargazers_count: u32,
    #[serde(default)]
    forks_count: u32,
    #[serde(default)]
    updated_at: String,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    has_pages: bool,
}

impl GithubClient {
    pub fn new(username: &str, token: Option<&str>) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            username: username.to_string(),
            token: token.map(str::to_string),
        }
    }

    /// Fetch all public repositories, paginated, sorted by stars.
    pub async fn fetch_repos(&self) -> Result<Vec<RepoRecord>, FetchError> {
        let mut repos = Vec::new();
        let mut page = 1;

        loop {
            let url = format!(
                "{}/users/{}/repos?sort=pushed&per_page={}&page={}",
                GITHUB_API_BASE, self.username, PER_PAGE, page
            );
            let mut request = self
                .client
                .get(&url)
                .header("Accept", "application/vnd.github.v3+json");
            if let Some(token) = &self.token {
                request = request.header("Authorization", format!("token {}", token));
            }

            let response = request.send().await?;
            if response.status() == reqwest::StatusCode::FORBIDDEN {
                return Err(FetchError::RateLimited);
            }
            if !response.status().is_success() {
                return Err(FetchError::Api(format!(
                    "GitHub returned status {}",
                    response.status()
                )));
            }

            let batch: Vec<RawRepo> = response.json().await?;
            let batch_len = batch.len();
            repos.extend(batch.into_iter().map(|r| self.to_record(r)));

            if batch_len < PER_PAGE {
                break;
            }
            page += 1;
        }

        repos.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));
        Ok(repos)
    }

    fn to_record(&self, raw: RawRepo) -> RepoRecord {
        // Repos with GitHub Pages but no explicit homepage get the
        // conventional pages URL.
        let homepage = match raw.homepage.filter(|h| !h.trim().is_empty()) {
            Some(h) => Some(h),
            None if raw.has_pages => Some(format!(
                "https://{}.github.io/{}/",
                self.username, raw.name
            )),
            None => None,
        };

        RepoRecord {
            name: raw.name,
            html_url: raw.html_url,
            homepage,
            description: raw.description,
            language: raw.language,
            stargazers_count: raw.stargazers_count,
            forks_count: raw.forks_count,
            updated_at: raw.updated_at,
            topics: raw.topics,
        }
    }
}
