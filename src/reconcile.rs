use crate::article::{clean_doi, clean_journal, ArticleRecord, SCOPUS, WEB_OF_SCIENCE};
use std::collections::BTreeMap;

/// Minimum normalized-title length before the substring fuzzy pass applies.
/// Short keys collide too easily ("on maize" vs "notes on maize").
pub const MIN_FUZZY_KEY_LEN: usize = 20;

/// A non-premium title only replaces the current one when it is longer by
/// more than this margin, implying the current title was truncated.
pub const TITLE_LONGER_MARGIN: usize = 12;

/// Sources whose structured metadata (title, journal, DOI) is trusted to
/// overwrite less-structured sources.
pub const PREMIUM_SOURCES: &[&str] = &[SCOPUS, WEB_OF_SCIENCE];

/// Heuristic thresholds for the merge. The defaults come from the constants
/// above; both can be overridden from the configuration file.
#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    pub min_fuzzy_len: usize,
    pub title_margin: usize,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            min_fuzzy_len: MIN_FUZZY_KEY_LEN,
            title_margin: TITLE_LONGER_MARGIN,
        }
    }
}

/// Reconciled article collection, keyed by normalized title. BTreeMap keeps
/// iteration deterministic across runs.
pub type ArticleIndex = BTreeMap<String, ArticleRecord>;

pub fn is_premium(source: &str) -> bool {
    PREMIUM_SOURCES.contains(&source)
}

/// Merge one incoming record from `source` into the index, deduplicating
/// against existing entries and fusing fields by source priority.
///
/// Records without a usable title are dropped silently; a corrupt source
/// record never aborts reconciliation.
pub fn merge_article(
    index: &mut ArticleIndex,
    mut incoming: ArticleRecord,
    source: &str,
    opts: &MergeOptions,
) {
    let norm = incoming.normalized_title();
    if norm.is_empty() {
        return;
    }
    // placeholder DOIs and journals never participate in matching or fusion
    incoming.doi = clean_doi(incoming.doi.as_deref());
    incoming.journal_title = clean_journal(incoming.journal_title.as_deref());

    match find_match(index, &incoming, &norm, opts) {
        Some(key) => fuse(index, &key, incoming, source, opts),
        None => {
            let mut record = incoming;
            record.add_source(source);
            record.synthesize_link();
            index.insert(norm, record);
        }
    }
}

/// Matching priority: case-insensitive DOI, then exact normalized title,
/// then a bounded substring pass gated on year agreement.
fn find_match(
    index: &ArticleIndex,
    incoming: &ArticleRecord,
    norm: &str,
    opts: &MergeOptions,
) -> Option<String> {
    if let Some(doi_key) = incoming.doi_key() {
        for (key, existing) in index.iter() {
            if existing.doi_key().as_deref() == Some(doi_key.as_str()) {
                return Some(key.clone());
            }
        }
    }

    if index.contains_key(norm) {
        return Some(norm.to_string());
    }

    for (key, existing) in index.iter() {
        if key.len() < opts.min_fuzzy_len || norm.len() < opts.min_fuzzy_len {
            continue;
        }
        let contained = key.contains(norm) || norm.contains(key);
        if contained && years_compatible(existing.year, incoming.year) {
            return Some(key.clone());
        }
    }

    None
}

fn years_compatible(a: Option<i32>, b: Option<i32>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// Field-selection rules on a match. Premium sources overwrite structured
/// metadata; everything else only fills gaps or maximizes known information.
fn fuse(
    index: &mut ArticleIndex,
    key: &str,
    incoming: ArticleRecord,
    source: &str,
    opts: &MergeOptions,
) {
    let premium = is_premium(source);
    let mut title_changed = false;

    {
        let current = match index.get_mut(key) {
            Some(record) => record,
            None => return,
        };

        if incoming.cited_by > current.cited_by {
            current.cited_by = incoming.cited_by;
        }

        if let Some(doi) = &incoming.doi {
            if current.doi.is_none() || premium {
                current.doi = Some(doi.clone());
            }
        }

        if let Some(journal) = &incoming.journal_title {
            if premium || current.journal_title.is_none() {
                current.journal_title = Some(journal.clone());
            }
        }

        if premium {
            if current.title != incoming.title {
                current.title = incoming.title.clone();
                title_changed = true;
            }
            if incoming.year.is_some() {
                current.year = incoming.year;
            }
        } else {
            // A materially longer title implies the stored one was truncated.
            if incoming.title.len() > current.title.len() + opts.title_margin {
                current.title = incoming.title.clone();
                title_changed = true;
            }
            if current.year.is_none() {
                current.year = incoming.year;
            }
        }

        if current.link.is_none() {
            current.link = incoming.link.clone();
        }

        current.add_source(source);
        current.synthesize_link();
    }

    // Keep the key aligned with the (possibly replaced) title so later exact
    // lookups of the new title still hit this record.
    if title_changed {
        let new_key = match index.get(key) {
            Some(record) => record.normalized_title(),
            None => return,
        };
        if !new_key.is_empty() && new_key != key && !index.contains_key(&new_key) {
            if let Some(record) = index.remove(key) {
                index.insert(new_key, record);
            }
        }
    }
}

/// Merge a whole source list into the index.
pub fn merge_all(
    index: &mut ArticleIndex,
    articles: Vec<ArticleRecord>,
    source: &str,
    opts: &MergeOptions,
) {
    for article in articles {
        merge_article(index, article, source, opts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{GOOGLE_SCHOLAR, ORCID};

    fn record(title: &str) -> ArticleRecord {
        ArticleRecord::new(title)
    }

    #[test]
    fn doi_match_is_case_insensitive() {
        let mut index = ArticleIndex::new();
        let opts = MergeOptions::default();

        let mut a = record("A Study On Cassava Selection");
        a.doi = Some("10.1/AB".to_string());
        merge_article(&mut index, a, ORCID, &opts);

        let mut b = record("Completely Different Title For The Same Work");
        b.doi = Some("10.1/ab".to_string());
        b.cited_by = 4;
        merge_article(&mut index, b, GOOGLE_SCHOLAR, &opts);

        assert_eq!(index.len(), 1);
        let merged = index.values().next().unwrap();
        assert_eq!(merged.cited_by, 4);
        assert_eq!(merged.sources, vec![GOOGLE_SCHOLAR, ORCID]);
    }

    #[test]
    fn merging_same_record_twice_is_idempotent() {
        let mut index = ArticleIndex::new();
        let opts = MergeOptions::default();

        let mut a = record("Genomic Selection for Drought Tolerance");
        a.cited_by = 7;
        merge_article(&mut index, a.clone(), GOOGLE_SCHOLAR, &opts);
        merge_article(&mut index, a, GOOGLE_SCHOLAR, &opts);

        assert_eq!(index.len(), 1);
        let merged = index.values().next().unwrap();
        assert_eq!(merged.cited_by, 7);
        assert_eq!(merged.sources, vec![GOOGLE_SCHOLAR]);
    }

    #[test]
    fn cited_by_is_maxed_never_decreased() {
        let mut index = ArticleIndex::new();
        let opts = MergeOptions::default();

        let mut a = record("Mixed Models in Plant Breeding Trials");
        a.cited_by = 15;
        merge_article(&mut index, a, GOOGLE_SCHOLAR, &opts);

        let mut b = record("Mixed Models in Plant Breeding Trials");
        b.cited_by = 12;
        merge_article(&mut index, b, SCOPUS, &opts);

        let merged = index.values().next().unwrap();
        assert_eq!(merged.cited_by, 15);
    }

    #[test]
    fn fuzzy_substring_match_requires_year_agreement() {
        let mut index = ArticleIndex::new();
        let opts = MergeOptions::default();

        let mut a = record("A Study On Multi Trait Genomic Prediction");
        a.year = Some(2021);
        merge_article(&mut index, a, SCOPUS, &opts);

        // Clean prefix of the stored title, same year: merges.
        let mut b = record("A Study On Multi Trait Genomic Prediction (preprint)");
        b.year = Some(2021);
        merge_article(&mut index, b, GOOGLE_SCHOLAR, &opts);
        assert_eq!(index.len(), 1);

        // Same containment but conflicting year: stays separate.
        let mut c = record("A Study On Multi Trait Genomic Prediction extended");
        c.year = Some(2018);
        merge_article(&mut index, c, GOOGLE_SCHOLAR, &opts);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn short_titles_never_fuzzy_match() {
        let mut index = ArticleIndex::new();
        let opts = MergeOptions::default();

        merge_article(&mut index, record("maize notes"), ORCID, &opts);
        merge_article(&mut index, record("maize"), GOOGLE_SCHOLAR, &opts);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn premium_source_overwrites_structured_fields() {
        let mut index = ArticleIndex::new();
        let opts = MergeOptions::default();

        let mut a = record("Truncated Title Of A Longer Publication Name");
        a.journal_title = Some("unknown".to_string());
        a.year = Some(2019);
        merge_article(&mut index, a, GOOGLE_SCHOLAR, &opts);

        let mut b = record("Truncated Title Of A Longer Publication Name");
        b.doi = Some("10.5/xy".to_string());
        b.journal_title = Some("Crop Science".to_string());
        b.year = Some(2020);
        merge_article(&mut index, b, SCOPUS, &opts);

        let merged = index.values().next().unwrap();
        assert_eq!(merged.doi.as_deref(), Some("10.5/xy"));
        assert_eq!(merged.journal_title.as_deref(), Some("Crop Science"));
        assert_eq!(merged.year, Some(2020));
    }

    #[test]
    fn non_premium_only_fills_gaps() {
        let mut index = ArticleIndex::new();
        let opts = MergeOptions::default();

        let mut a = record("Phenotypic Prediction With Spectral Kernels");
        a.journal_title = Some("Field Crops Research".to_string());
        a.year = Some(2022);
        merge_article(&mut index, a, WEB_OF_SCIENCE, &opts);

        let mut b = record("Phenotypic Prediction With Spectral Kernels");
        b.journal_title = Some("some aggregator venue".to_string());
        b.year = Some(2023);
        b.link = Some("https://example.org/paper".to_string());
        merge_article(&mut index, b, GOOGLE_SCHOLAR, &opts);

        let merged = index.values().next().unwrap();
        assert_eq!(merged.journal_title.as_deref(), Some("Field Crops Research"));
        assert_eq!(merged.year, Some(2022));
        assert_eq!(merged.link.as_deref(), Some("https://example.org/paper"));
    }

    #[test]
    fn materially_longer_title_replaces_truncated_one() {
        let mut index = ArticleIndex::new();
        let opts = MergeOptions::default();

        merge_article(
            &mut index,
            record("Genetic diversity and interaction between maint"),
            ORCID,
            &opts,
        );

        let longer = "Genetic diversity and interaction between maintainers of commercial soybean cultivars";
        let mut b = record(longer);
        b.year = None;
        merge_article(&mut index, b, GOOGLE_SCHOLAR, &opts);

        assert_eq!(index.len(), 1);
        let merged = index.values().next().unwrap();
        assert_eq!(merged.title, longer);
        // index key follows the replaced title
        assert!(index.contains_key(&crate::article::normalize_title(longer)));
    }

    #[test]
    fn link_is_never_overwritten() {
        let mut index = ArticleIndex::new();
        let opts = MergeOptions::default();

        let mut a = record("Some Long Enough Title For Matching Purposes");
        a.link = Some("https://first.example".to_string());
        merge_article(&mut index, a, ORCID, &opts);

        let mut b = record("Some Long Enough Title For Matching Purposes");
        b.link = Some("https://second.example".to_string());
        merge_article(&mut index, b, SCOPUS, &opts);

        let merged = index.values().next().unwrap();
        assert_eq!(merged.link.as_deref(), Some("https://first.example"));
    }

    #[test]
    fn empty_titles_are_dropped_silently() {
        let mut index = ArticleIndex::new();
        let opts = MergeOptions::default();
        merge_article(&mut index, record(""), GOOGLE_SCHOLAR, &opts);
        merge_article(&mut index, record("<i></i>"), GOOGLE_SCHOLAR, &opts);
        assert!(index.is_empty());
    }
}
