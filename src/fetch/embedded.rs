//! Metadata from the PDF document-information dictionary.
//!
//! Used for raw PDF URLs and local files, which have no landing page. Any
//! parse problem degrades to empty metadata: a PDF that passed the magic-header
//! check is still a valid artifact even if its trailer is unreadable.

use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object};
use tracing::debug;

use crate::metadata::PaperMetadata;
use crate::provider::html::extract_year;

/// Reads Title, Author and CreationDate from `path` on the blocking pool.
pub async fn embedded_metadata(path: &Path) -> PaperMetadata {
    let owned: PathBuf = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || read_document_info(&owned)).await;

    match result {
        Ok(Ok(metadata)) => metadata,
        Ok(Err(error)) => {
            debug!(path = %path.display(), error = %error, "No readable document info");
            PaperMetadata::default()
        }
        Err(join_error) => {
            debug!(error = %join_error, "Document info task failed");
            PaperMetadata::default()
        }
    }
}

/// Parses the document and returns whatever the Info dictionary provides.
///
/// # Errors
///
/// Returns the `lopdf` error when the file cannot be parsed as a PDF.
pub fn read_document_info(path: &Path) -> Result<PaperMetadata, lopdf::Error> {
    let doc = Document::load(path)?;

    let Some(info) = info_dictionary(&doc) else {
        return Ok(PaperMetadata::default());
    };

    let title = text_entry(info, b"Title");
    let authors = text_entry(info, b"Author")
        .map(|raw| split_authors(&raw))
        .unwrap_or_default();
    let year = text_entry(info, b"CreationDate").and_then(|date| parse_pdf_date_year(&date));

    Ok(PaperMetadata::from_raw(authors, title.as_deref(), year))
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_object(*id).and_then(Object::as_dict).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn text_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let bytes = dict.get(key).ok()?.as_str().ok()?;
    let text = decode_pdf_text(bytes);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Decodes a PDF text string: UTF-16BE with BOM, else UTF-8, else Latin-1.
#[must_use]
pub fn decode_pdf_text(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        return char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Splits an Author entry on `;`, `&` and the word `and`.
#[must_use]
pub fn split_authors(raw: &str) -> Vec<String> {
    raw.split([';', '&'])
        .flat_map(|part| part.split(" and "))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Year of a PDF date string such as `D:20180102120000Z`.
#[must_use]
pub fn parse_pdf_date_year(value: &str) -> Option<i32> {
    let digits = value.trim().trim_start_matches("D:");
    match digits.get(..4).and_then(|y| y.parse::<i32>().ok()) {
        Some(year) => Some(year),
        None => extract_year(value),
    }
}
