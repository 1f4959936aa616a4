use crate::article::ArticleRecord;
use crate::dataset::{CitationTable, MetricValue, YearlyStat};
use std::collections::HashMap;

/// Years outside this window are treated as parsing noise and discarded.
pub const MIN_SANE_YEAR: i32 = 1990;

/// Aggregate numbers derived from a set of citation counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub total_citations: u32,
    pub h_index: u32,
    pub i10_index: u32,
}

/// Compute total citations, h-index, and i10-index over a citation-count
/// sequence. An empty sequence yields all zeros.
pub fn compute_metrics(counts: &[u32]) -> Metrics {
    let mut sorted: Vec<u32> = counts.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    let mut h_index = 0u32;
    for (i, &count) in sorted.iter().enumerate() {
        if count as usize >= i + 1 {
            h_index = (i + 1) as u32;
        } else {
            break;
        }
    }

    Metrics {
        total_citations: sorted.iter().sum(),
        h_index,
        i10_index: sorted.iter().filter(|&&c| c >= 10).count() as u32,
    }
}

/// Citation table for the reconciled aggregate.
///
/// The `all` columns are recomputed from the reconciled articles and then
/// maxed against every source-reported value, so the aggregate never shows
/// less than any contributing source. The `since` columns cannot be derived
/// from per-article data and are the max across source-reported values.
pub fn maximized_table(articles: &[ArticleRecord], source_tables: &[CitationTable]) -> CitationTable {
    let counts: Vec<u32> = articles.iter().map(|a| a.cited_by).collect();
    let computed = compute_metrics(&counts);

    let mut table = CitationTable {
        citations: MetricValue {
            all: computed.total_citations,
            since: None,
        },
        h_index: MetricValue {
            all: computed.h_index,
            since: None,
        },
        i10_index: MetricValue {
            all: computed.i10_index,
            since: None,
        },
    };

    for source in source_tables {
        max_into(&mut table.citations, &source.citations);
        max_into(&mut table.h_index, &source.h_index);
        max_into(&mut table.i10_index, &source.i10_index);
    }

    table
}

fn max_into(target: &mut MetricValue, source: &MetricValue) {
    target.all = target.all.max(source.all);
    target.since = match (target.since, source.since) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };
}

/// Build the combined per-year series.
///
/// Citations per year are the max reported by any one source (multiple
/// sources describe the same underlying citations, so they are never
/// summed). Publications per year are the max of any source-reported count
/// and the count derived by grouping the reconciled articles by year. Years
/// before `MIN_SANE_YEAR` or more than one year past `current_year` are
/// discarded as noise.
pub fn combine_yearly_graph(
    source_graphs: &[&[YearlyStat]],
    articles: &[ArticleRecord],
    current_year: i32,
) -> Vec<YearlyStat> {
    let mut by_year: HashMap<i32, YearlyStat> = HashMap::new();

    for graph in source_graphs {
        for stat in *graph {
            let entry = by_year.entry(stat.year).or_insert(YearlyStat {
                year: stat.year,
                citations: 0,
                publications: 0,
            });
            entry.citations = entry.citations.max(stat.citations);
            entry.publications = entry.publications.max(stat.publications);
        }
    }

    let mut pubs_per_year: HashMap<i32, u32> = HashMap::new();
    for article in articles {
        if let Some(year) = article.year {
            *pubs_per_year.entry(year).or_insert(0) += 1;
        }
    }
    for (year, count) in pubs_per_year {
        let entry = by_year.entry(year).or_insert(YearlyStat {
            year,
            citations: 0,
            publications: 0,
        });
        entry.publications = entry.publications.max(count);
    }

    let mut combined: Vec<YearlyStat> = by_year
        .into_values()
        .filter(|s| s.year >= MIN_SANE_YEAR && s.year <= current_year + 1)
        .collect();
    combined.sort_by_key(|s| s.year);
    combined
}

/// Build a per-source citation table from that source's own article counts.
/// Used by fetchers whose API reports per-article citations but no profile
/// metrics. The `since` column is computed over articles published at or
/// after `cutoff_year`.
pub fn table_from_articles(articles: &[ArticleRecord], cutoff_year: i32) -> CitationTable {
    let all: Vec<u32> = articles.iter().map(|a| a.cited_by).collect();
    let recent: Vec<u32> = articles
        .iter()
        .filter(|a| a.year.map_or(false, |y| y >= cutoff_year))
        .map(|a| a.cited_by)
        .collect();

    let computed = compute_metrics(&all);
    let since = compute_metrics(&recent);

    CitationTable {
        citations: MetricValue {
            all: computed.total_citations,
            since: Some(since.total_citations),
        },
        h_index: MetricValue {
            all: computed.h_index,
            since: Some(since.h_index),
        },
        i10_index: MetricValue {
            all: computed.i10_index,
            since: Some(since.i10_index),
        },
    }
}
