use serde::{Deserialize, Serialize};

/// Source system names as they appear in `sources` and in the persisted
/// `academicData` keys.
pub const GOOGLE_SCHOLAR: &str = "Google Scholar";
pub const SCOPUS: &str = "Scopus";
pub const WEB_OF_SCIENCE: &str = "Web of Science";
pub const ORCID: &str = "ORCID";

/// A unit of scholarly output, normalized across the bibliographic sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    /// Display title as reported by the best source so far
    pub title: String,
    /// DOI, lowercase-insensitive identity key when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    /// Publication year
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Journal or venue title; placeholders like "N/A" are never stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal_title: Option<String>,
    /// Canonical URL; synthesized from the DOI when no source supplies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Citation count, maxed across sources, never decreased
    #[serde(default)]
    pub cited_by: u32,
    /// Contributing source systems, sorted and deduplicated
    #[serde(default)]
    pub sources: Vec<String>,
}

impl ArticleRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            doi: None,
            year: None,
            journal_title: None,
            link: None,
            cited_by: 0,
            sources: Vec::new(),
        }
    }

    /// Matching key when no DOI is available. Derived, never stored.
    pub fn normalized_title(&self) -> String {
        normalize_title(&self.title)
    }

    /// Lowercased DOI for case-insensitive identity comparison.
    pub fn doi_key(&self) -> Option<String> {
        self.doi.as_deref().map(|d| d.to_lowercase())
    }

    /// Record that `source` contributed to this article, keeping the list
    /// sorted and free of duplicates.
    pub fn add_source(&mut self, source: &str) {
        if !self.sources.iter().any(|s| s == source) {
            self.sources.push(source.to_string());
            self.sources.sort();
        }
    }

    /// Fill the link from the DOI if no source supplied one.
    pub fn synthesize_link(&mut self) {
        if self.link.is_none() {
            if let Some(doi) = &self.doi {
                self.link = Some(format!("https://doi.org/{}", doi));
            }
        }
    }
}

/// Normalize a title for matching: strip HTML tags, fold accents to ASCII,
/// drop punctuation, collapse whitespace, lowercase, trim.
///
/// Idempotent: `normalize_title(normalize_title(x)) == normalize_title(x)`.
pub fn normalize_title(title: &str) -> String {
    let stripped = strip_tags(title);
    let mut out = String::with_capacity(stripped.len());
    let mut pending_space = false;
    for c in stripped.chars() {
        for folded in fold_ascii(c) {
            if folded.is_whitespace() {
                pending_space = true;
            } else if folded.is_ascii_alphanumeric() || folded == '_' {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(folded.to_ascii_lowercase());
            }
            // everything else is punctuation: dropped
        }
    }
    out
}

/// Remove complete `<...>` tag spans. A `<` with no closing `>` is ordinary
/// text (think "P < 0.05" in a title), left for the punctuation filter.
fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        match rest[start..].find('>') {
            Some(end) => rest = &rest[start + end + 1..],
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Fold common Latin accented characters to their ASCII base letters.
/// Characters outside the table that are not ASCII are dropped entirely,
/// matching an NFKD-decompose-then-strip pass over Latin text.
fn fold_ascii(c: char) -> impl Iterator<Item = char> {
    let folded: &'static str = match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'Å' => "A",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'É' | 'È' | 'Ê' | 'Ë' => "E",
        'í' | 'ì' | 'î' | 'ï' => "i",
        'Í' | 'Ì' | 'Î' | 'Ï' => "I",
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => "o",
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => "O",
        'ú' | 'ù' | 'û' | 'ü' => "u",
        'Ú' | 'Ù' | 'Û' | 'Ü' => "U",
        'ç' => "c",
        'Ç' => "C",
        'ñ' => "n",
        'Ñ' => "N",
        'ý' | 'ÿ' => "y",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        'ß' => "ss",
        _ if c.is_ascii() => return Folded::Single(c),
        _ if c.is_whitespace() => return Folded::Single(' '),
        _ => return Folded::None,
    };
    Folded::Str(folded.chars())
}

enum Folded {
    None,
    Single(char),
    Str(std::str::Chars<'static>),
}

impl Iterator for Folded {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        match self {
            Folded::None => None,
            Folded::Single(c) => {
                let c = *c;
                *self = Folded::None;
                Some(c)
            }
            Folded::Str(chars) => chars.next(),
        }
    }
}

/// Clean a raw DOI string. Placeholders and values that do not look like a
/// DOI degrade to `None` rather than erroring.
pub fn clean_doi(raw: Option<&str>) -> Option<String> {
    let doi = raw?.trim();
    if doi.is_empty() {
        return None;
    }
    match doi.to_lowercase().as_str() {
        "n/a" | "na" | "none" | "null" | "-" => return None,
        _ => {}
    }
    if !doi.starts_with("10.") {
        return None;
    }
    Some(doi.to_string())
}

/// Clean a journal/venue title, treating placeholder values as absent.
pub fn clean_journal(raw: Option<&str>) -> Option<String> {
    let journal = raw?.trim();
    if journal.is_empty() {
        return None;
    }
    match journal.to_lowercase().as_str() {
        "n/a" | "na" | "none" | "null" | "-" => None,
        _ => Some(journal.to_string()),
    }
}

/// Extract a year from a possibly messy source string: the first run of four
/// ASCII digits. Parse failures degrade to `None`.
pub fn parse_year(raw: &str) -> Option<i32> {
    let mut digits = String::new();
    for c in raw.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            if digits.len() == 4 {
                return digits.parse().ok();
            }
        } else {
            digits.clear();
        }
    }
    None
}
