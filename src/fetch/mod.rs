//! PDF location, download/copy, validation and hashing.
//!
//! # Overview
//!
//! [`fetch`] asks the provider where the PDF lives, streams it (or copies a
//! local file) into a temporary file inside the run's working directory,
//! retrying transient failures with [`RetryPolicy`], and then verifies it is
//! a PDF. The returned [`FetchedArtifact`] owns the temporary file: dropping
//! it without placing it deletes the bytes.

mod download;
pub mod embedded;
mod retry;
pub mod validate;

pub use embedded::embedded_metadata;
pub use retry::{
    AttemptsExhausted, DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy,
    classify_cause, classify_http_status, parse_retry_after, with_retry,
};
pub use validate::{DEFAULT_MIN_PDF_BYTES, PDF_MAGIC, verify_pdf};

use std::path::Path;

use tempfile::TempPath;
use tracing::info;

use crate::error::PipelineError;
use crate::provider::{self, PdfSource, ProviderContext, ProviderKind};
use crate::reference::Reference;

/// Where and how strictly to fetch.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions<'a> {
    /// Directory that receives the temporary download.
    pub work_dir: &'a Path,
    /// Smallest accepted PDF, in bytes.
    pub min_pdf_bytes: u64,
}

/// A verified PDF sitting in the working directory.
#[derive(Debug)]
pub struct FetchedArtifact {
    path: TempPath,
    byte_size: u64,
    content_hash: String,
    origin: String,
    identifier: Option<String>,
}

impl FetchedArtifact {
    /// Path of the temporary file holding the bytes.
    #[must_use]
    pub fn local_path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// Lowercase hex SHA-256 of the content.
    #[must_use]
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// URL or source path the bytes came from.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Provider identifier the locator derived the PDF location from.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }
}

/// Locates and fetches the PDF for `reference`.
///
/// # Errors
///
/// - [`PipelineError::Fetch`] when the download exhausts its retries or the
///   local source cannot be copied
/// - [`PipelineError::InvalidPdf`] when the bytes fail validation
/// - [`PipelineError::MetadataExtraction`] when a landing page has no PDF link
/// - [`PipelineError::Io`] when the temporary file cannot be created
#[tracing::instrument(skip(ctx, options), fields(provider = %kind, reference = %reference))]
pub async fn fetch(
    ctx: &ProviderContext<'_>,
    options: FetchOptions<'_>,
    reference: &Reference,
    kind: ProviderKind,
) -> Result<FetchedArtifact, PipelineError> {
    let location = provider::locate(ctx, kind, reference).await?;
    let origin = location.display();

    let temp = tempfile::Builder::new()
        .prefix("download-")
        .suffix(".pdf")
        .tempfile_in(options.work_dir)
        .map_err(|e| PipelineError::io(options.work_dir, e))?
        .into_temp_path();

    match &location.source {
        PdfSource::Remote(url) => {
            info!(url = %url, "Downloading PDF");
            with_retry(ctx.retry, url, || download::download_to(ctx.client, url, &temp))
                .await
                .map_err(|exhausted| {
                    PipelineError::fetch(url.as_str(), exhausted.attempts, exhausted.last)
                })?;
        }
        PdfSource::Local(path) => {
            info!(path = %path.display(), "Copying local PDF");
            download::copy_local(path, &temp)
                .await
                .map_err(|cause| PipelineError::fetch(origin.as_str(), 1, cause))?;
        }
    }

    let verified = verify_pdf(&temp, &origin, options.min_pdf_bytes).await?;
    info!(
        bytes = verified.byte_size,
        sha256 = %verified.content_hash,
        "Fetched PDF"
    );

    Ok(FetchedArtifact {
        path: temp,
        byte_size: verified.byte_size,
        content_hash: verified.content_hash,
        origin,
        identifier: location.identifier,
    })
}
