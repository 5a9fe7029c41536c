//! Shared scraping helpers: meta tags, entity decoding, years, hosts and URLs.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::metadata::PaperMetadata;

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?is)<meta\s+[^>]*>"));
static META_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
});
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));"));
static YEAR_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"\b(?:19|20)\d{2}\b"));

/// DOI anywhere in a string (`10.<registrant>/<suffix>`).
pub(crate) static DOI_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"\b(10\.\d{4,9}/[^\s"'<>?#]+)"#));

/// A `<meta name|property=... content=...>` pair, name lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MetaTag {
    pub name: String,
    pub content: String,
}

/// All named meta tags of an HTML document, in document order.
#[derive(Debug, Clone, Default)]
pub(crate) struct MetaTags {
    tags: Vec<MetaTag>,
}

impl MetaTags {
    /// Collects every meta tag that has both a name and non-empty content.
    pub(crate) fn parse(html: &str) -> Self {
        let mut tags = Vec::new();

        for tag_match in META_TAG_RE.find_iter(html) {
            let mut tag_name: Option<String> = None;
            let mut content: Option<String> = None;

            for attr in META_ATTR_RE.captures_iter(tag_match.as_str()) {
                let key = attr
                    .get(1)
                    .map_or("", |m| m.as_str())
                    .trim()
                    .to_ascii_lowercase();
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .map_or("", |m| m.as_str())
                    .trim()
                    .to_string();

                if value.is_empty() {
                    continue;
                }

                if key == "name" || key == "property" {
                    tag_name = Some(value.to_ascii_lowercase());
                } else if key == "content" {
                    content = Some(value);
                }
            }

            if let (Some(name), Some(content)) = (tag_name, content) {
                tags.push(MetaTag { name, content });
            }
        }

        Self { tags }
    }

    /// First decoded value among `keys`, in document order.
    pub(crate) fn first(&self, keys: &[&str]) -> Option<String> {
        self.tags.iter().find_map(|tag| {
            keys.iter()
                .any(|key| tag.name.eq_ignore_ascii_case(key))
                .then(|| html_unescape(&tag.content))
                .filter(|value| !value.is_empty())
        })
    }

    /// First value of the first key (in priority order) that is present.
    pub(crate) fn first_by_priority(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.first(&[*key]))
    }

    /// All distinct decoded values of the first key (in priority order) present.
    pub(crate) fn all_by_priority(&self, keys: &[&str]) -> Vec<String> {
        for key in keys {
            let values = self.all(&[*key]);
            if !values.is_empty() {
                return values;
            }
        }
        Vec::new()
    }

    /// All distinct decoded values among `keys`, in document order.
    pub(crate) fn all(&self, keys: &[&str]) -> Vec<String> {
        let mut values = Vec::new();
        for tag in &self.tags {
            if keys.iter().any(|key| tag.name.eq_ignore_ascii_case(key)) {
                let value = html_unescape(&tag.content);
                if !value.is_empty() && !values.contains(&value) {
                    values.push(value);
                }
            }
        }
        values
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Meta-tag names to consult for each metadata field, in priority order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MetaKeys {
    pub title: &'static [&'static str],
    pub authors: &'static [&'static str],
    pub date: &'static [&'static str],
}

/// Highwire Press `citation_*` tags, used by most publishers.
pub(crate) const CITATION_KEYS: MetaKeys = MetaKeys {
    title: &["citation_title", "dc.title"],
    authors: &["citation_author", "dc.creator"],
    date: &[
        "citation_publication_date",
        "citation_date",
        "citation_online_date",
        "dc.date",
    ],
};

/// Builds metadata from the first present key of each field.
pub(crate) fn metadata_from_meta(tags: &MetaTags, keys: &MetaKeys) -> PaperMetadata {
    let title = tags.first_by_priority(keys.title);
    let authors = tags.all_by_priority(keys.authors);
    let year = keys
        .date
        .iter()
        .filter_map(|key| tags.first(&[*key]))
        .find_map(|date| extract_year(&date));
    PaperMetadata::from_raw(authors, title.as_deref(), year)
}

/// Decodes the handful of named entities publishers emit, plus numeric ones.
pub(crate) fn html_unescape(value: &str) -> String {
    let named = value
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&ndash;", "\u{2013}")
        .replace("&mdash;", "\u{2014}")
        .replace("&nbsp;", " ");

    let numeric = NUMERIC_ENTITY_RE.replace_all(&named, |caps: &regex::Captures<'_>| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            (None, None) => None,
        };
        code.and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), |c| c.to_string())
    });

    // Last, so "&amp;lt;" decodes to "&lt;" and not "<".
    numeric.replace("&amp;", "&").trim().to_string()
}

/// Returns the first year-like number (19xx or 20xx) in `value`.
pub(crate) fn extract_year(value: &str) -> Option<i32> {
    YEAR_VALUE_RE
        .find(value)
        .and_then(|m| m.as_str().parse().ok())
}

/// Normalizes a host string: trim, strip leading "www.", trailing '.', and lowercases.
pub(crate) fn canonical_host(host: &str) -> String {
    host.trim()
        .trim_start_matches("www.")
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

/// Resolves a possibly relative URL string against a base URL.
///
/// Returns the value as-is if it already starts with `http://` or `https://`;
/// normalizes `//...` to the base scheme; otherwise joins with `base_url`.
pub(crate) fn absolutize_url(value: &str, base_url: &Url) -> Option<String> {
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    if value.starts_with("//") {
        return Some(format!("{}:{value}", base_url.scheme()));
    }
    base_url.join(value).ok().map(|url| url.to_string())
}

/// Returns the first DOI found in `value`, without trailing punctuation.
pub(crate) fn find_doi(value: &str) -> Option<String> {
    DOI_RE.captures(value).and_then(|caps| {
        let doi = caps
            .get(1)?
            .as_str()
            .trim_end_matches(['.', ',', ';', ')', '/']);
        (!doi.is_empty()).then(|| doi.to_string())
    })
}
