//! arXiv: Atom export API for metadata, `/pdf/<id>` for the document.

use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use tracing::debug;
use url::Url;

use super::html::compile_static_regex;
use super::{PdfLocation, ProviderContext, ProviderKind, fetch_landing_page, join_base};
use crate::error::PipelineError;
use crate::metadata::PaperMetadata;
use crate::reference::{Reference, strip_pdf_extension};

const KIND: ProviderKind = ProviderKind::PreprintServer;
const ATOM_ACCEPT: &str = "application/atom+xml,application/xml;q=0.9,*/*;q=0.5";

static ARXIV_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?i)^(?:\d{4}\.\d{4,5}|[a-z\-]+(?:\.[a-z]{2})?/\d{7})(?:v\d+)?$")
});
static VERSION_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?i)v\d+$"));

pub(super) fn matches_path(url: &Url) -> bool {
    arxiv_id_from_url(url).is_some()
}

/// arXiv id (with any version suffix) from an `/abs/` or `/pdf/` URL.
pub(super) fn arxiv_id_from_url(url: &Url) -> Option<String> {
    let path = url.path().trim();
    if let Some(id) = path.strip_prefix("/abs/") {
        return normalize_arxiv_id(id);
    }
    if let Some(id) = path.strip_prefix("/pdf/") {
        return normalize_arxiv_id(strip_pdf_extension(id));
    }
    None
}

fn normalize_arxiv_id(candidate: &str) -> Option<String> {
    let trimmed = candidate.trim().trim_matches('/');
    ARXIV_ID_RE
        .is_match(trimmed)
        .then(|| trimmed.to_string())
}

/// Id without its `vN` suffix, used for cross-checking.
pub(super) fn unversioned(id: &str) -> String {
    VERSION_SUFFIX_RE.replace(id, "").into_owned()
}

fn require_id(reference: &Reference) -> Result<String, PipelineError> {
    reference
        .web_url()
        .and_then(arxiv_id_from_url)
        .ok_or_else(|| {
            PipelineError::extraction(KIND, reference.as_str(), "not an arXiv abstract or PDF URL")
        })
}

pub(super) async fn extract(
    ctx: &ProviderContext<'_>,
    reference: &Reference,
) -> Result<PaperMetadata, PipelineError> {
    let id = require_id(reference)?;
    let api_url = format!(
        "{}?id_list={}",
        ctx.endpoints.arxiv_api.trim_end_matches('/'),
        urlencoding::encode(&id)
    );
    debug!(api_url = %api_url, "Querying arXiv export API");

    let page = fetch_landing_page(ctx, KIND, reference, &api_url, ATOM_ACCEPT).await?;
    parse_atom_entry(&page.body)
        .map_err(|reason| PipelineError::extraction(KIND, reference.as_str(), reason))
}

pub(super) fn locate(
    ctx: &ProviderContext<'_>,
    reference: &Reference,
) -> Result<PdfLocation, PipelineError> {
    let id = require_id(reference)?;
    let url = join_base(&ctx.endpoints.arxiv, &format!("pdf/{id}"));
    Ok(PdfLocation::remote(url, Some(unversioned(&id))))
}

#[derive(Debug, Default)]
struct AtomEntry {
    id: String,
    title: String,
    published: String,
    authors: Vec<String>,
}

/// Parses the first `<entry>` of an arXiv Atom feed.
fn parse_atom_entry(xml: &str) -> Result<PaperMetadata, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut entry: Option<AtomEntry> = None;
    let mut current_author = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == "entry" && entry.is_none() {
                    entry = Some(AtomEntry::default());
                }
                path.push(name);
            }
            Ok(Event::Text(e)) => {
                let Some(entry) = entry.as_mut() else {
                    continue;
                };
                let Ok(text) = e.unescape() else {
                    continue;
                };
                append_entry_text(entry, &mut current_author, &path, &text);
            }
            Ok(Event::CData(e)) => {
                if let Some(entry) = entry.as_mut() {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    append_entry_text(entry, &mut current_author, &path, &text);
                }
            }
            Ok(Event::End(e)) => {
                let local = e.local_name();
                let name = local.as_ref();
                if name == b"author"
                    && let Some(entry) = entry.as_mut()
                {
                    let author = std::mem::take(&mut current_author);
                    if !author.trim().is_empty() {
                        entry.authors.push(author);
                    }
                }
                path.pop();
                if name == b"entry" && entry.is_some() {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("malformed Atom feed: {e}")),
        }
    }

    let entry = entry.ok_or_else(|| "Atom feed contains no entry".to_string())?;
    if entry.id.contains("/api/errors") {
        return Err(format!("arXiv API error: {}", entry.title.trim()));
    }

    let identifier = entry
        .id
        .rsplit_once("/abs/")
        .map(|(_, id)| unversioned(id.trim()));
    let year = entry
        .published
        .get(..4)
        .and_then(|y| y.parse::<i32>().ok());

    Ok(PaperMetadata::from_raw(&entry.authors, Some(&entry.title), year).with_identifier(identifier))
}

fn append_entry_text(entry: &mut AtomEntry, author: &mut String, path: &[String], text: &str) {
    // Only direct children of <entry> (and <author><name>) are of interest.
    let Some(pos) = path.iter().rposition(|p| p == "entry") else {
        return;
    };
    let target = match &path[pos + 1..] {
        [leaf] if leaf == "id" => &mut entry.id,
        [leaf] if leaf == "title" => &mut entry.title,
        [leaf] if leaf == "published" => &mut entry.published,
        [parent, leaf] if parent == "author" && leaf == "name" => author,
        _ => return,
    };
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query: search_query=&amp;id_list=1811.11242</title>
  <id>http://arxiv.org/api/abc</id>
  <entry>
    <id>http://arxiv.org/abs/1811.11242v1</id>
    <updated>2018-11-27T18:45:55Z</updated>
    <published>2018-11-27T18:45:55Z</published>
    <title>Wrangling Messy CSV Files by Detecting Row and Type
  Patterns</title>
    <summary>It is well known that data scientists spend the majority of their time.</summary>
    <author>
      <name>A. Burg</name>
    </author>
    <author>
      <name>V. Naz&#225;bal</name>
      <arxiv:affiliation>The Alan Turing Institute</arxiv:affiliation>
    </author>
    <author>
      <name>C. Sutton</name>
    </author>
    <link href="http://arxiv.org/abs/1811.11242v1" rel="alternate" type="text/html"/>
    <arxiv:primary_category term="cs.DB" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_atom_entry_fields() {
        let meta = parse_atom_entry(FEED).unwrap();
        assert_eq!(meta.authors, vec!["A. Burg", "V. Nazábal", "C. Sutton"]);
        assert_eq!(
            meta.title.as_deref(),
            Some("Wrangling Messy CSV Files by Detecting Row and Type Patterns")
        );
        assert_eq!(meta.year, Some(2018));
        assert_eq!(meta.identifier.as_deref(), Some("1811.11242"));
    }

    #[test]
    fn test_parse_atom_error_entry() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
            <id>http://arxiv.org/api/errors#incorrect_id_format_for_1811.1124</id>
            <title>Error</title>
            <summary>incorrect id format for 1811.1124</summary>
        </entry></feed>"#;
        let err = parse_atom_entry(xml).unwrap_err();
        assert!(err.contains("arXiv API error"), "{err}");
    }

    #[test]
    fn test_parse_atom_without_entry() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>empty</title></feed>"#;
        assert!(parse_atom_entry(xml).is_err());
    }

    #[test]
    fn test_arxiv_id_from_url_forms() {
        let id = |s: &str| arxiv_id_from_url(&Url::parse(s).unwrap());
        assert_eq!(id("https://arxiv.org/abs/1811.11242").as_deref(), Some("1811.11242"));
        assert_eq!(id("https://arxiv.org/abs/1811.11242v2").as_deref(), Some("1811.11242v2"));
        assert_eq!(id("https://arxiv.org/pdf/1811.11242.pdf").as_deref(), Some("1811.11242"));
        assert_eq!(id("https://arxiv.org/pdf/1811.11242").as_deref(), Some("1811.11242"));
        assert_eq!(id("https://arxiv.org/abs/math/0309285").as_deref(), Some("math/0309285"));
        assert_eq!(id("https://arxiv.org/list/cs.LG/recent"), None);
        assert_eq!(id("https://arxiv.org/abs/not-an-id"), None);
    }

    #[test]
    fn test_unversioned() {
        assert_eq!(unversioned("1811.11242v3"), "1811.11242");
        assert_eq!(unversioned("1811.11242"), "1811.11242");
    }
}
