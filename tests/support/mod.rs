//! Shared fixtures for integration tests: mock-server guard, PDF bytes, and
//! a pipeline config pointed at a mock server.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

pub mod socket_guard;

use std::path::Path;
use std::time::Duration;

use lopdf::{Dictionary, Document, Object, dictionary};
use paperfetch_core::fetch::RetryPolicy;
use paperfetch_core::{Endpoints, PipelineConfig};

/// A small but structurally plausible PDF (well over the 64-byte minimum).
pub fn minimal_pdf() -> Vec<u8> {
    let mut pdf = b"%PDF-1.1\n".to_vec();
    pdf.extend_from_slice(
        b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n\
          2 0 obj << /Type /Pages /Kids [] /Count 0 >> endobj\n\
          trailer << /Root 1 0 R >>\n%%EOF\n",
    );
    pdf
}

/// A one-page PDF whose trailer carries `info` as its document Info dictionary.
pub fn pdf_with_info(info: Dictionary) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(info);
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Retries quickly so failure tests stay fast.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(
        max_attempts,
        Duration::from_millis(1),
        Duration::from_millis(5),
        2.0,
    )
    .with_max_jitter(Duration::ZERO)
}

/// Dry-run config placing into `output_dir`, with every provider at `base`.
pub fn test_config(base: &str, output_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        output_dir: output_dir.to_path_buf(),
        dry_run: true,
        retry: fast_retry(2),
        endpoints: Endpoints::all_at(base),
        ..PipelineConfig::default()
    }
}

/// Names of the entries directly inside `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
