pub mod article;
pub mod config;
pub mod dataset;
pub mod fetchers;
pub mod metrics;
pub mod reconcile;
pub mod report;
pub mod sitemap;

use chrono::Datelike;
use config::Config;
use dataset::{AcademicData, CitedBy, Dataset, Profile, RepoRecord, SourceData};
use fetchers::github::GithubClient;
use fetchers::orcid::OrcidClient;
use fetchers::scholar::ScholarClient;
use fetchers::scopus::ScopusClient;
use fetchers::wos::WosClient;
use fetchers::SourceFetcher;
use indicatif::{ProgressBar, ProgressStyle};
use reconcile::{merge_all, ArticleIndex, MergeOptions};

/// Which sources to contact on this run. All on by default; the CLI can
/// switch individual sources off.
pub struct SourceToggles {
    pub use_github: bool,
    pub use_scholar: bool,
    pub use_scopus: bool,
    pub use_wos: bool,
    pub use_orcid: bool,
}

impl Default for SourceToggles {
    fn default() -> Self {
        Self {
            use_github: true,
            use_scholar: true,
            use_scopus: true,
            use_wos: true,
            use_orcid: true,
        }
    }
}

/// Per-source fetch results feeding the assembly step. `None` means the
/// source was disabled or failed; it contributes nothing either way.
#[derive(Default)]
pub struct FetchedSources {
    pub scholar: Option<SourceData>,
    pub scopus: Option<SourceData>,
    pub wos: Option<SourceData>,
    pub orcid: Option<SourceData>,
}

/// Batch pipeline coordinator. Owns one client per configured source and
/// runs them strictly in sequence; there is no parallel fetching, to stay
/// inside each service's own rate limits.
pub struct Pipeline {
    github: Option<GithubClient>,
    scholar: Option<ScholarClient>,
    scopus: Option<ScopusClient>,
    wos: Option<WosClient>,
    orcid: Option<OrcidClient>,
    merge_opts: MergeOptions,
}

impl Pipeline {
    pub fn new(config: &Config, toggles: &SourceToggles) -> Self {
        let cutoff = config.cutoff_year();

        let github = toggles
            .use_github
            .then(|| {
                config
                    .github_username
                    .as_deref()
                    .map(|user| GithubClient::new(user, config.github_token.as_deref()))
            })
            .flatten();

        let scholar = toggles
            .use_scholar
            .then(|| {
                config.scholar_author_id.as_deref().map(|id| {
                    let keys = config
                        .serpapi_keys()
                        .into_iter()
                        .map(str::to_string)
                        .collect();
                    ScholarClient::new(id, keys)
                })
            })
            .flatten();

        let scopus = (toggles.use_scopus && config.scopus_enabled())
            .then(|| {
                match (
                    config.scopus_author_id.as_deref(),
                    config.scopus_api_key.as_deref(),
                ) {
                    (Some(id), Some(key)) => Some(ScopusClient::new(id, key, cutoff)),
                    _ => None,
                }
            })
            .flatten();

        let wos = (toggles.use_wos && config.wos_enabled())
            .then(|| {
                match (config.wos_author_id.as_deref(), config.wos_api_key.as_deref()) {
                    (Some(id), Some(key)) => Some(WosClient::new(id, key, cutoff)),
                    _ => None,
                }
            })
            .flatten();

        let orcid = toggles
            .use_orcid
            .then(|| config.orcid_id.as_deref().map(OrcidClient::new))
            .flatten();

        Self {
            github,
            scholar,
            scopus,
            wos,
            orcid,
            merge_opts: config.merge_options(),
        }
    }

    /// Fetch everything and assemble the new dataset. Source failures
    /// degrade to "no contribution"; the run itself never fails here.
    pub async fn run(&self) -> Dataset {
        let pb = ProgressBar::new(5);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );

        pb.set_message("GitHub");
        let repos = self.fetch_repos().await;
        pb.inc(1);

        pb.set_message("Google Scholar");
        let scholar = fetch_source(self.scholar.as_ref().map(|c| c as &dyn SourceFetcher)).await;
        pb.inc(1);

        pb.set_message("Scopus");
        let scopus = fetch_source(self.scopus.as_ref().map(|c| c as &dyn SourceFetcher)).await;
        pb.inc(1);

        pb.set_message("Web of Science");
        let wos = fetch_source(self.wos.as_ref().map(|c| c as &dyn SourceFetcher)).await;
        pb.inc(1);

        pb.set_message("ORCID");
        let orcid = fetch_source(self.orcid.as_ref().map(|c| c as &dyn SourceFetcher)).await;
        pb.inc(1);
        pb.finish_with_message("done");

        let now = chrono::Local::now();
        let sources = FetchedSources {
            scholar,
            scopus,
            wos,
            orcid,
        };
        assemble(repos, sources, &self.merge_opts, now.year(), now.to_rfc3339())
    }

    async fn fetch_repos(&self) -> Vec<RepoRecord> {
        let client = match &self.github {
            Some(client) => client,
            None => return Vec::new(),
        };
        match client.fetch_repos().await {
            Ok(repos) => {
                tracing::info!("fetched {} GitHub repositories", repos.len());
                repos
            }
            Err(e) => {
                tracing::warn!("GitHub fetch failed: {}", e);
                Vec::new()
            }
        }
    }
}

async fn fetch_source(fetcher: Option<&dyn SourceFetcher>) -> Option<SourceData> {
    let fetcher = fetcher?;
    match fetcher.fetch().await {
        Ok(data) => {
            tracing::info!("{}: {} articles", fetcher.name(), data.articles.len());
            Some(data)
        }
        Err(e) => {
            tracing::warn!("{} fetch failed: {}", fetcher.name(), e);
            None
        }
    }
}

/// Pure assembly step: reconcile the per-source article lists, derive the
/// maximized aggregate, and build the final document. Split out from the
/// fetch phase so it can be exercised without any network.
pub fn assemble(
    github_repos: Vec<RepoRecord>,
    sources: FetchedSources,
    merge_opts: &MergeOptions,
    current_year: i32,
    generated_at: String,
) -> Dataset {
    let mut index = ArticleIndex::new();
    let contributions = [
        (article::GOOGLE_SCHOLAR, &sources.scholar),
        (article::SCOPUS, &sources.scopus),
        (article::WEB_OF_SCIENCE, &sources.wos),
        (article::ORCID, &sources.orcid),
    ];
    for (name, data) in &contributions {
        if let Some(data) = data {
            merge_all(&mut index, data.articles.clone(), name, merge_opts);
        }
    }

    let mut articles: Vec<article::ArticleRecord> = index.into_values().collect();
    articles.sort_by(|a, b| {
        b.cited_by
            .cmp(&a.cited_by)
            .then(b.year.unwrap_or(0).cmp(&a.year.unwrap_or(0)))
            .then(a.title.cmp(&b.title))
    });

    let source_tables: Vec<_> = contributions
        .iter()
        .filter_map(|(_, data)| data.as_ref())
        .map(|d| d.profile.cited_by.table)
        .collect();
    let table = metrics::maximized_table(&articles, &source_tables);

    let source_graphs: Vec<&[dataset::YearlyStat]> = contributions
        .iter()
        .filter_map(|(_, data)| data.as_ref())
        .map(|d| d.profile.cited_by.graph.as_slice())
        .collect();
    let graph = metrics::combine_yearly_graph(&source_graphs, &articles, current_year);

    let maximized = SourceData {
        profile: Profile {
            cited_by: CitedBy { table, graph },
        },
        articles,
    };

    Dataset {
        github_repos,
        last_updated: generated_at,
        academic_data: AcademicData {
            google_scholar: sources.scholar,
            scopus: sources.scopus,
            web_of_science: sources.wos,
            orcid: sources.orcid,
            maximized: Some(maximized),
        },
    }
}
