use crate::article::ArticleRecord;
use crate::dataset::Dataset;
use colored::Colorize;
use std::collections::{BTreeMap, BTreeSet};

/// How many article titles a preview section lists before eliding.
const PREVIEW_LIMIT: usize = 5;

/// Result of diffing the new dataset against the previously persisted one.
/// `lines` are human-readable; `tags` are short structured change markers
/// suitable for a generated-file header or commit message.
#[derive(Debug, Default)]
pub struct ChangeReport {
    pub lines: Vec<String>,
    pub tags: Vec<String>,
}

impl ChangeReport {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Print the report to stdout in the usual sectioned style.
    pub fn print(&self) {
        println!();
        println!("{}", "Change Report".bold());
        println!("{}", "=".repeat(50));
        if self.lines.is_empty() {
            println!("  {}", "No changes detected.".green());
        } else {
            for line in &self.lines {
                println!("{}", line);
            }
        }
        println!("{}", "=".repeat(50));
    }
}

/// Compare the old and new datasets. Pure: no side effects, and missing or
/// partial structures on either side default to zero/empty rather than
/// erroring.
pub fn diff(old: Option<&Dataset>, new: &Dataset) -> ChangeReport {
    let mut report = ChangeReport::default();

    let old = match old {
        Some(old) => old,
        None => {
            report
                .lines
                .push("  [!] No previous dataset found. Creating a new one.".to_string());
            report.tags.push("initial data generation".to_string());
            return report;
        }
    };

    diff_repos(old, new, &mut report);
    diff_metrics(old, new, &mut report);
    diff_articles(old, new, &mut report);

    report
}

fn diff_repos(old: &Dataset, new: &Dataset, report: &mut ChangeReport) {
    let old_names: BTreeSet<&str> = old.github_repos.iter().map(|r| r.name.as_str()).collect();
    let new_names: BTreeSet<&str> = new.github_repos.iter().map(|r| r.name.as_str()).collect();
    let added: Vec<&str> = new_names.difference(&old_names).copied().collect();

    if !added.is_empty() {
        report.lines.push(format!(
            "  [+] New repositories ({}): {}",
            added.len(),
            added.join(", ")
        ));
        for name in added {
            report.tags.push(format!("new repository: {}", name));
        }
    }
}

/// Per tracked source and for the reconciled aggregate: report citation and
/// h-index deltas, staying silent when nothing changed.
fn diff_metrics(old: &Dataset, new: &Dataset, report: &mut ChangeReport) {
    let old_sources: BTreeMap<&str, (u32, u32)> = old
        .academic_data
        .sources()
        .into_iter()
        .filter_map(|(name, data)| data.map(|d| (name, metric_pair(d))))
        .collect();

    for (name, data) in new.academic_data.sources() {
        let data = match data {
            Some(data) => data,
            None => continue,
        };
        let (new_citations, new_h) = metric_pair(data);
        let (old_citations, old_h) = old_sources.get(name).copied().unwrap_or((0, 0));

        if new_citations != old_citations {
            report.lines.push(format!(
                "  [*] {} citations: {} -> {}",
                name, old_citations, new_citations
            ));
            report.tags.push(format!(
                "{} citations {} to {}",
                name, old_citations, new_citations
            ));
        }
        if new_h != old_h {
            report
                .lines
                .push(format!("  [*] {} h-index: {} -> {}", name, old_h, new_h));
            report
                .tags
                .push(format!("{} h-index {} to {}", name, old_h, new_h));
        }
    }
}

fn metric_pair(data: &crate::dataset::SourceData) -> (u32, u32) {
    let table = &data.profile.cited_by.table;
    (table.citations.all, table.h_index.all)
}

fn diff_articles(old: &Dataset, new: &Dataset, report: &mut ChangeReport) {
    let old_articles = article_map(old);
    let new_articles = article_map(new);

    let added: Vec<&ArticleRecord> = new_articles
        .iter()
        .filter(|(key, _)| !old_articles.contains_key(*key))
        .map(|(_, art)| *art)
        .collect();

    if !added.is_empty() {
        report
            .lines
            .push(format!("\n--- New publications ({}) ---", added.len()));
        for art in added.iter().take(PREVIEW_LIMIT) {
            report
                .lines
                .push(format!("    - {}", truncate(&art.title, 80)));
        }
        if added.len() > PREVIEW_LIMIT {
            report
                .lines
                .push(format!("    ... and {} more", added.len() - PREVIEW_LIMIT));
        }
        for art in &added {
            report
                .tags
                .push(format!("new publication: {}", truncate(&art.title, 50)));
        }
    }

    let mut increased = Vec::new();
    for (key, new_art) in &new_articles {
        if let Some(old_art) = old_articles.get(key) {
            if new_art.cited_by > old_art.cited_by {
                increased.push((old_art.cited_by, *new_art));
            }
        }
    }

    if !increased.is_empty() {
        report
            .lines
            .push(format!("\n--- Citation updates ({}) ---", increased.len()));
        for (old_count, art) in increased.iter().take(PREVIEW_LIMIT) {
            report.lines.push(format!(
                "    - '{}': {} -> {} (+{})",
                truncate(&art.title, 50),
                old_count,
                art.cited_by,
                art.cited_by - old_count
            ));
        }
        if increased.len() > PREVIEW_LIMIT {
            report.lines.push(format!(
                "    ... and {} more",
                increased.len() - PREVIEW_LIMIT
            ));
        }
        for (old_count, art) in &increased {
            report.tags.push(format!(
                "citation '{}' {} to {}",
                truncate(&art.title, 30),
                old_count,
                art.cited_by
            ));
        }
    }
}

/// Key articles the same way the reconciler does: DOI when present, else
/// normalized title plus year.
fn article_key(article: &ArticleRecord) -> String {
    match article.doi_key() {
        Some(doi) => format!("doi:{}", doi),
        None => format!(
            "title:{}#{}",
            article.normalized_title(),
            article.year.map(|y| y.to_string()).unwrap_or_default()
        ),
    }
}

fn article_map(dataset: &Dataset) -> BTreeMap<String, &ArticleRecord> {
    dataset
        .academic_data
        .maximized
        .as_ref()
        .map(|data| {
            data.articles
                .iter()
                .map(|a| (article_key(a), a))
                .collect()
        })
        .unwrap_or_default()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{
        AcademicData, CitationTable, CitedBy, MetricValue, Profile, RepoRecord, SourceData,
    };

    fn repo(name: &str) -> RepoRecord {
        RepoRecord {
            name: name.to_string(),
            html_url: format!("https://github.com/u/{}", name),
            homepage: None,
            description: None,
            language: None,
            stargazers_count: 0,
            forks_count: 0,
            updated_at: String::new(),
            topics: Vec::new(),
        }
    }

    fn with_maximized(articles: Vec<ArticleRecord>, citations_all: u32) -> Dataset {
        let mut dataset = Dataset::default();
        dataset.academic_data = AcademicData {
            maximized: Some(SourceData {
                profile: Profile {
                    cited_by: CitedBy {
                        table: CitationTable {
                            citations: MetricValue {
                                all: citations_all,
                                since: None,
                            },
                            ..Default::default()
                        },
                        graph: Vec::new(),
                    },
                },
                articles,
            }),
            ..Default::default()
        };
        dataset
    }

    #[test]
    fn no_old_dataset_yields_initial_notice_only() {
        let report = diff(None, &Dataset::default());
        assert_eq!(report.lines.len(), 1);
        assert!(report.lines[0].contains("Creating a new one"));
        assert_eq!(report.tags, vec!["initial data generation"]);
    }

    #[test]
    fn unchanged_datasets_produce_no_lines() {
        let old = with_maximized(Vec::new(), 10);
        let new = with_maximized(Vec::new(), 10);
        let report = diff(Some(&old), &new);
        assert!(report.is_empty());
    }

    #[test]
    fn added_repositories_are_counted() {
        let mut old = Dataset::default();
        old.github_repos.push(repo("alpha"));
        let mut new = Dataset::default();
        new.github_repos.push(repo("alpha"));
        new.github_repos.push(repo("beta"));
        new.github_repos.push(repo("gamma"));

        let report = diff(Some(&old), &new);
        assert!(report.lines[0].contains("New repositories (2)"));
        assert!(report.tags.contains(&"new repository: beta".to_string()));
    }

    #[test]
    fn citation_increase_reports_delta() {
        let mut art_old = ArticleRecord::new("Genomic Selection for Drought Tolerance");
        art_old.doi = Some("10.1/X".to_string());
        art_old.cited_by = 10;

        let mut art_new = art_old.clone();
        art_new.cited_by = 15;

        let old = with_maximized(vec![art_old], 10);
        let new = with_maximized(vec![art_new], 15);

        let report = diff(Some(&old), &new);
        assert!(
            report.lines.iter().any(|l| l.contains("10 -> 15 (+5)")),
            "missing +5 line: {:?}",
            report.lines
        );
        assert!(report
            .lines
            .iter()
            .any(|l| l.contains("citations: 10 -> 15")));
    }

    #[test]
    fn doi_keying_survives_title_change() {
        let mut art_old = ArticleRecord::new("Short Title");
        art_old.doi = Some("10.9/z".to_string());
        art_old.cited_by = 2;

        let mut art_new = ArticleRecord::new("Short Title, Now Expanded By A Premium Source");
        art_new.doi = Some("10.9/Z".to_string());
        art_new.cited_by = 2;

        let old = with_maximized(vec![art_old], 2);
        let new = with_maximized(vec![art_new], 2);

        let report = diff(Some(&old), &new);
        // same DOI: not a new publication
        assert!(!report.lines.iter().any(|l| l.contains("New publications")));
    }

    #[test]
    fn tolerates_partial_old_dataset() {
        let old = Dataset::default();
        let mut art = ArticleRecord::new("Fresh Publication About Cassava");
        art.cited_by = 1;
        let new = with_maximized(vec![art], 1);

        let report = diff(Some(&old), &new);
        assert!(report
            .lines
            .iter()
            .any(|l| l.contains("New publications (1)")));
        assert!(report
            .tags
            .iter()
            .any(|t| t.starts_with("new publication: Fresh Publication")));
    }

    #[test]
    fn preview_is_capped() {
        let old = with_maximized(Vec::new(), 0);
        let articles: Vec<ArticleRecord> = (0..8)
            .map(|i| ArticleRecord::new(format!("Publication Number {}", i)))
            .collect();
        let new = with_maximized(articles, 0);

        let report = diff(Some(&old), &new);
        assert!(report.lines.iter().any(|l| l.contains("and 3 more")));
        // one tag per article regardless of the preview cap
        assert_eq!(
            report
                .tags
                .iter()
                .filter(|t| t.starts_with("new publication"))
                .count(),
            8
        );
    }
}
