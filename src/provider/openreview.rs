//! OpenReview: JSON notes API for metadata, `/pdf?id=<id>` for the document.

use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{PdfLocation, ProviderContext, ProviderKind, fetch_landing_page, join_base};
use crate::error::PipelineError;
use crate::metadata::PaperMetadata;
use crate::reference::Reference;

const KIND: ProviderKind = ProviderKind::ReviewPlatform;
const JSON_ACCEPT: &str = "application/json";

/// Note fields are plain in API v1 and wrapped in `{"value": ...}` in v2.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Field<T> {
    Plain(T),
    Wrapped { value: T },
}

impl<T> Field<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Plain(value) | Self::Wrapped { value } => value,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct NoteContent {
    title: Option<Field<String>>,
    authors: Option<Field<Vec<String>>>,
}

#[derive(Debug, Deserialize)]
struct Note {
    id: String,
    #[serde(default)]
    content: NoteContent,
    /// Publication date, epoch milliseconds.
    pdate: Option<i64>,
    /// Creation date, epoch milliseconds.
    cdate: Option<i64>,
    /// True creation date, epoch milliseconds.
    tcdate: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct NotesResponse {
    #[serde(default)]
    notes: Vec<Note>,
}

pub(super) fn matches_path(url: &Url) -> bool {
    note_id_from_url(url).is_some()
}

/// Note id from `/forum?id=` or `/pdf?id=`.
pub(super) fn note_id_from_url(url: &Url) -> Option<String> {
    if !matches!(url.path().trim_end_matches('/'), "/forum" | "/pdf") {
        return None;
    }
    url.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.trim().to_string())
        .filter(|id| !id.is_empty())
}

fn require_id(reference: &Reference) -> Result<String, PipelineError> {
    reference
        .web_url()
        .and_then(note_id_from_url)
        .ok_or_else(|| {
            PipelineError::extraction(KIND, reference.as_str(), "no OpenReview note id in URL")
        })
}

pub(super) async fn extract(
    ctx: &ProviderContext<'_>,
    reference: &Reference,
) -> Result<PaperMetadata, PipelineError> {
    let id = require_id(reference)?;
    let api_url = join_base(
        &ctx.endpoints.openreview_api,
        &format!("notes?id={}", urlencoding::encode(&id)),
    );
    debug!(api_url = %api_url, "Querying OpenReview notes API");

    let page = fetch_landing_page(ctx, KIND, reference, &api_url, JSON_ACCEPT).await?;
    parse_notes(&page.body, &id)
        .map_err(|reason| PipelineError::extraction(KIND, reference.as_str(), reason))
}

pub(super) fn locate(
    ctx: &ProviderContext<'_>,
    reference: &Reference,
) -> Result<PdfLocation, PipelineError> {
    let id = require_id(reference)?;
    let url = join_base(
        &ctx.endpoints.openreview,
        &format!("pdf?id={}", urlencoding::encode(&id)),
    );
    Ok(PdfLocation::remote(url, Some(id)))
}

fn parse_notes(body: &str, requested_id: &str) -> Result<PaperMetadata, String> {
    let response: NotesResponse =
        serde_json::from_str(body).map_err(|e| format!("malformed notes response: {e}"))?;
    let note = response
        .notes
        .into_iter()
        .next()
        .ok_or_else(|| format!("no note with id {requested_id}"))?;

    let year = [note.pdate, note.cdate, note.tcdate]
        .into_iter()
        .flatten()
        .find_map(DateTime::<Utc>::from_timestamp_millis)
        .map(|date| date.year());
    let title = note.content.title.map(Field::into_inner);
    let authors = note
        .content
        .authors
        .map(Field::into_inner)
        .unwrap_or_default();

    Ok(PaperMetadata::from_raw(authors, title.as_deref(), year).with_identifier(Some(note.id)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_note_id_from_url() {
        let id = |s: &str| note_id_from_url(&Url::parse(s).unwrap());
        assert_eq!(id("https://openreview.net/forum?id=S1x4ghC9tQ").as_deref(), Some("S1x4ghC9tQ"));
        assert_eq!(id("https://openreview.net/pdf?id=S1x4ghC9tQ").as_deref(), Some("S1x4ghC9tQ"));
        assert_eq!(id("https://openreview.net/forum?id="), None);
        assert_eq!(id("https://openreview.net/group?id=ICLR.cc/2019"), None);
    }

    #[test]
    fn test_parse_notes_v1_shape() {
        let body = r#"{"notes":[{"id":"S1x4ghC9tQ","cdate":1538087803000,
            "content":{"title":"Temporal Difference Variational Auto-Encoder",
            "authors":["Karol Gregor","George Papamakarios","Frederic Besse","Lars Buesing","Theophane Weber"]}}]}"#;
        let meta = parse_notes(body, "S1x4ghC9tQ").unwrap();
        assert_eq!(meta.authors.len(), 5);
        assert_eq!(meta.authors[0], "Karol Gregor");
        assert_eq!(
            meta.title.as_deref(),
            Some("Temporal Difference Variational Auto-Encoder")
        );
        assert_eq!(meta.year, Some(2018));
        assert_eq!(meta.identifier.as_deref(), Some("S1x4ghC9tQ"));
    }

    #[test]
    fn test_parse_notes_v2_wrapped_values_and_pdate() {
        let body = r#"{"notes":[{"id":"abc","cdate":1538087803000,"pdate":1556668800000,
            "content":{"title":{"value":"A Title"},"authors":{"value":["Ada Lovelace"]}}}]}"#;
        let meta = parse_notes(body, "abc").unwrap();
        assert_eq!(meta.title.as_deref(), Some("A Title"));
        assert_eq!(meta.authors, vec!["Ada Lovelace"]);
        assert_eq!(meta.year, Some(2019));
    }

    #[test]
    fn test_parse_notes_empty_is_error() {
        let err = parse_notes(r#"{"notes":[]}"#, "missing").unwrap_err();
        assert!(err.contains("missing"), "{err}");
        assert!(parse_notes("<html>", "x").is_err());
    }
}
