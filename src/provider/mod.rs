//! Source providers: reference resolution, metadata extraction and PDF location.
//!
//! Providers form a closed set ([`ProviderKind`]). Resolution picks exactly one
//! kind for a [`Reference`] through the static signature table in
//! [`signature`]; extraction and location are then dispatched with a plain
//! `match`, and every provider keeps its scraping rules in its own module so an
//! upstream HTML change in one site cannot break another.
//!
//! # Architecture
//!
//! - [`resolve`] - signature table, `.pdf` suffix, then local existence
//! - [`extract`] - provider-specific metadata retrieval
//! - [`locate`] - provider-specific PDF location
//! - [`ProviderContext`] - shared HTTP client, endpoints and retry policy

mod acm;
mod arxiv;
pub(crate) mod html;
mod local;
mod openreview;
mod pdf_url;
mod pmc;
pub mod signature;
mod springer;

pub use signature::{ProviderSignature, SIGNATURES, resolve};

use std::fmt;
use std::path::PathBuf;

use reqwest::Client;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use url::Url;

use crate::config::Endpoints;
use crate::error::{FetchCause, PipelineError};
use crate::fetch::{AttemptsExhausted, RetryPolicy, with_retry};
use crate::metadata::PaperMetadata;
use crate::reference::Reference;

/// The closed set of provider families a reference can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Preprint server (arXiv).
    PreprintServer,
    /// Life-sciences full-text repository (PubMed Central).
    LifeSciencesRepository,
    /// Digital library (ACM DL).
    DigitalLibrary,
    /// Peer-review platform (OpenReview).
    ReviewPlatform,
    /// Publisher site (Springer Link).
    PublisherSite,
    /// Any other URL pointing straight at a PDF.
    RawPdfUrl,
    /// A PDF on the local filesystem.
    LocalFile,
}

impl ProviderKind {
    /// All variants, in resolution priority order.
    pub const ALL: [ProviderKind; 7] = [
        ProviderKind::PreprintServer,
        ProviderKind::LifeSciencesRepository,
        ProviderKind::DigitalLibrary,
        ProviderKind::ReviewPlatform,
        ProviderKind::PublisherSite,
        ProviderKind::RawPdfUrl,
        ProviderKind::LocalFile,
    ];

    /// Short label of the concrete provider behind the variant.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::PreprintServer => "arXiv",
            Self::LifeSciencesRepository => "PubMed Central",
            Self::DigitalLibrary => "ACM Digital Library",
            Self::ReviewPlatform => "OpenReview",
            Self::PublisherSite => "Springer",
            Self::RawPdfUrl => "PDF URL",
            Self::LocalFile => "local file",
        }
    }

    /// Whether extraction for this kind is allowed to come back empty.
    ///
    /// Raw PDF URLs and local files have no page to scrape; their metadata is
    /// read from the fetched document during naming instead.
    #[must_use]
    pub fn metadata_from_document(self) -> bool {
        matches!(self, Self::RawPdfUrl | Self::LocalFile)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shared, read-only resources a provider needs for one run.
#[derive(Debug, Clone, Copy)]
pub struct ProviderContext<'a> {
    /// HTTP client with project timeouts and user agent.
    pub client: &'a Client,
    /// Base URLs for every provider.
    pub endpoints: &'a Endpoints,
    /// Retry policy for page and API requests.
    pub retry: &'a RetryPolicy,
}

/// Where the binary PDF for a reference lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfSource {
    /// Download from this URL.
    Remote(String),
    /// Copy from this local path.
    Local(PathBuf),
}

/// Result of PDF location: the source plus the identifier it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfLocation {
    /// Where to fetch the bytes from.
    pub source: PdfSource,
    /// Provider identifier (arXiv id, PMCID, DOI, note id) when known.
    pub identifier: Option<String>,
}

impl PdfLocation {
    /// Remote location with an identifier.
    #[must_use]
    pub fn remote(url: impl Into<String>, identifier: Option<String>) -> Self {
        Self {
            source: PdfSource::Remote(url.into()),
            identifier,
        }
    }

    /// Local file location.
    #[must_use]
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            source: PdfSource::Local(path.into()),
            identifier: None,
        }
    }

    /// Human-readable location for logs and errors.
    #[must_use]
    pub fn display(&self) -> String {
        match &self.source {
            PdfSource::Remote(url) => url.clone(),
            PdfSource::Local(path) => path.display().to_string(),
        }
    }
}

/// Retrieves structured metadata for `reference` from the provider `kind`.
///
/// Missing fields degrade the result instead of failing; an error is returned
/// only when the source is unreachable or yields no usable field at all.
///
/// # Errors
///
/// Returns [`PipelineError::MetadataExtraction`] on unreachable pages, HTTP
/// errors, or pages that do not describe a paper.
#[tracing::instrument(skip(ctx), fields(provider = %kind, reference = %reference))]
pub async fn extract(
    ctx: &ProviderContext<'_>,
    kind: ProviderKind,
    reference: &Reference,
) -> Result<PaperMetadata, PipelineError> {
    let metadata = match kind {
        ProviderKind::PreprintServer => arxiv::extract(ctx, reference).await?,
        ProviderKind::LifeSciencesRepository => pmc::extract(ctx, reference).await?,
        ProviderKind::DigitalLibrary => acm::extract(ctx, reference).await?,
        ProviderKind::ReviewPlatform => openreview::extract(ctx, reference).await?,
        ProviderKind::PublisherSite => springer::extract(ctx, reference).await?,
        ProviderKind::RawPdfUrl => pdf_url::extract(reference)?,
        ProviderKind::LocalFile => local::extract(reference).await?,
    };

    if !kind.metadata_from_document() && !metadata.has_usable_fields() {
        return Err(PipelineError::extraction(
            kind,
            reference.as_str(),
            "page did not yield any usable metadata field",
        ));
    }

    metadata.warn_on_missing_fields(kind);
    Ok(metadata)
}

/// Resolves the binary PDF location for `reference`.
///
/// # Errors
///
/// Returns [`PipelineError::MetadataExtraction`] when the reference does not
/// carry the provider's identifier, or a legacy ACM page cannot be mapped to
/// a DOI. Landing pages that fail to load fall back to the provider's
/// conventional PDF path.
#[tracing::instrument(skip(ctx), fields(provider = %kind, reference = %reference))]
pub async fn locate(
    ctx: &ProviderContext<'_>,
    kind: ProviderKind,
    reference: &Reference,
) -> Result<PdfLocation, PipelineError> {
    match kind {
        ProviderKind::PreprintServer => arxiv::locate(ctx, reference),
        ProviderKind::LifeSciencesRepository => pmc::locate(ctx, reference).await,
        ProviderKind::DigitalLibrary => acm::locate(ctx, reference).await,
        ProviderKind::ReviewPlatform => openreview::locate(ctx, reference),
        ProviderKind::PublisherSite => springer::locate(ctx, reference).await,
        ProviderKind::RawPdfUrl => pdf_url::locate(reference),
        ProviderKind::LocalFile => local::locate(reference),
    }
}

/// A fetched HTML page or API document.
#[derive(Debug, Clone)]
pub(crate) struct Page {
    /// URL after redirects.
    pub final_url: Url,
    /// Response body.
    pub body: String,
}

/// GETs `url` as text with the shared retry policy.
pub(crate) async fn fetch_page(
    ctx: &ProviderContext<'_>,
    url: &str,
    accept: &str,
) -> Result<Page, AttemptsExhausted> {
    with_retry(ctx.retry, url, || async move {
        let response = ctx
            .client
            .get(url)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| FetchCause::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(std::string::ToString::to_string);
            return Err(FetchCause::http_status(url, status.as_u16(), retry_after));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| FetchCause::network(url, e))?;
        Ok(Page { final_url, body })
    })
    .await
}

pub(crate) const HTML_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Fetches a landing page, mapping exhaustion to a metadata extraction error.
pub(crate) async fn fetch_landing_page(
    ctx: &ProviderContext<'_>,
    kind: ProviderKind,
    reference: &Reference,
    url: &str,
    accept: &str,
) -> Result<Page, PipelineError> {
    fetch_page(ctx, url, accept).await.map_err(|exhausted| {
        PipelineError::extraction(
            kind,
            reference.as_str(),
            format!(
                "could not retrieve {url} after {} attempt(s): {}",
                exhausted.attempts, exhausted.last
            ),
        )
    })
}

/// Joins a provider base URL and a path without doubling slashes.
pub(crate) fn join_base(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
