//! Structured paper metadata and author-name normalization.

use tracing::warn;

use crate::provider::ProviderKind;

/// Authors, title and year of a paper, any of which may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperMetadata {
    /// Ordered author names, each as "Firstname Lastname".
    pub authors: Vec<String>,
    /// Paper title, whitespace-collapsed.
    pub title: Option<String>,
    /// Publication year.
    pub year: Option<i32>,
    /// Provider identifier (arXiv id, PMCID, DOI, OpenReview note id).
    pub identifier: Option<String>,
}

impl PaperMetadata {
    /// Builds metadata from raw scraped values, normalizing each field.
    ///
    /// Author strings are normalized with [`normalize_author_name`] and blank
    /// ones dropped. Repeated names are kept, since co-authors can share one.
    /// Empty titles become `None`.
    #[must_use]
    pub fn from_raw<I, S>(authors: I, title: Option<&str>, year: Option<i32>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            authors: authors
                .into_iter()
                .filter_map(|author| normalize_author_name(author.as_ref()))
                .collect(),
            title: title.map(collapse_whitespace).filter(|t| !t.is_empty()),
            year: year.filter(|y| (1000..=9999).contains(y)),
            identifier: None,
        }
    }

    /// Attaches a provider identifier.
    #[must_use]
    pub fn with_identifier(mut self, identifier: Option<String>) -> Self {
        self.identifier = identifier.filter(|id| !id.trim().is_empty());
        self
    }

    /// True when at least one of authors, title or year is present.
    #[must_use]
    pub fn has_usable_fields(&self) -> bool {
        !self.authors.is_empty() || self.title.is_some() || self.year.is_some()
    }

    /// True when a title or at least one author is present.
    #[must_use]
    pub fn has_naming_fields(&self) -> bool {
        !self.authors.is_empty() || self.title.is_some()
    }

    /// Fills fields that are missing here from `other`.
    #[must_use]
    pub fn or_fill_from(mut self, other: PaperMetadata) -> Self {
        if self.authors.is_empty() {
            self.authors = other.authors;
        }
        if self.title.is_none() {
            self.title = other.title;
        }
        if self.year.is_none() {
            self.year = other.year;
        }
        if self.identifier.is_none() {
            self.identifier = other.identifier;
        }
        self
    }

    /// Emits a `warn!` diagnostic for each missing field.
    pub fn warn_on_missing_fields(&self, provider: ProviderKind) {
        if provider.metadata_from_document() {
            return;
        }
        if self.authors.is_empty() {
            warn!(provider = %provider, "No authors found; filename will use 'Unknown'");
        }
        if self.title.is_none() {
            warn!(provider = %provider, "No title found; filename will use 'Untitled'");
        }
        if self.year.is_none() {
            warn!(provider = %provider, "No publication year found; filename will omit it");
        }
    }
}

/// Normalizes a raw author string to "Firstname Lastname".
///
/// Handles "Last, First" ordering, stray whitespace and a trailing
/// affiliation in parentheses. Returns `None` for blank input.
#[must_use]
pub fn normalize_author_name(raw: &str) -> Option<String> {
    let without_affiliation = match raw.find('(') {
        Some(idx) if idx > 0 => &raw[..idx],
        _ => raw,
    };
    let cleaned = collapse_whitespace(without_affiliation);
    let cleaned = cleaned.trim_matches(|c: char| c == ',' || c == ';' || c.is_whitespace());
    if cleaned.is_empty() {
        return None;
    }

    let name = match cleaned.split_once(',') {
        Some((last, first)) if !is_name_suffix(first.trim()) => {
            let (last, first) = (last.trim(), first.trim());
            if first.is_empty() {
                last.to_string()
            } else {
                format!("{first} {last}")
            }
        }
        _ => cleaned.to_string(),
    };

    Some(name)
}

/// Last name of a normalized "Firstname Lastname" string.
///
/// Generational suffixes ("Jr.", "III") are skipped so "Martin Luther King Jr."
/// yields "King".
#[must_use]
pub fn last_name(name: &str) -> String {
    let tokens: Vec<&str> = name
        .split_whitespace()
        .map(|t| t.trim_matches(','))
        .filter(|t| !t.is_empty())
        .collect();

    tokens
        .iter()
        .rev()
        .find(|t| !is_name_suffix(t))
        .or_else(|| tokens.last())
        .map(|t| (*t).to_string())
        .unwrap_or_default()
}

fn is_name_suffix(token: &str) -> bool {
    matches!(
        token.trim_end_matches('.').to_ascii_lowercase().as_str(),
        "jr" | "sr" | "ii" | "iii" | "iv"
    )
}

/// Collapses internal whitespace runs (including newlines) to single spaces.
#[must_use]
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
