//! Error types for the fetch pipeline.
//!
//! Every fatal condition of a run maps to exactly one [`PipelineError`]
//! variant, so callers get a single error class and message per run.
//! Network-level causes are kept in [`FetchCause`] and attached as the
//! `#[source]` of the variant that surfaced them.

use std::path::PathBuf;

use thiserror::Error;

use crate::provider::ProviderKind;

/// Underlying cause of a failed HTTP or filesystem operation.
///
/// This mirrors the shape of the download engine's per-attempt errors: each
/// variant carries the URL or path it failed on, and [`crate::fetch::classify_cause`]
/// decides whether it is worth another attempt.
#[derive(Debug, Error)]
pub enum FetchCause {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The Retry-After header value, if present.
        retry_after: Option<String>,
    },

    /// File system error while writing or copying.
    #[error("IO error at {shown}: {source}", shown = .path.display())]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The URL is malformed or uses an unsupported scheme.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl FetchCause {
    /// Creates a network cause, promoting reqwest timeouts to [`FetchCause::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status cause.
    pub fn http_status(url: impl Into<String>, status: u16, retry_after: Option<String>) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after,
        }
    }

    /// Creates a timeout cause.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO cause.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL cause.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}

/// Errors that end a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No provider signature, file extension, or local file matched the reference.
    #[error(
        "no provider can handle '{reference}'\n  Suggestion: pass an arXiv, PMC, ACM, OpenReview or Springer URL, a URL ending in .pdf, or an existing local file"
    )]
    UnresolvedProvider {
        /// The reference that could not be resolved.
        reference: String,
    },

    /// The provider page or API was unreachable or did not describe a paper.
    #[error("metadata extraction failed for '{reference}' ({provider}): {reason}")]
    MetadataExtraction {
        /// Provider that attempted the extraction.
        provider: ProviderKind,
        /// The reference being processed.
        reference: String,
        /// Why extraction failed.
        reason: String,
    },

    /// Fetched bytes are not an acceptable PDF.
    #[error("invalid PDF from {location}: {reason}")]
    InvalidPdf {
        /// URL or path the bytes came from.
        location: String,
        /// Which validation failed.
        reason: String,
    },

    /// Network failure that exhausted the retry budget.
    #[error("failed to fetch {url} after {attempts} attempt(s): {source}")]
    Fetch {
        /// The URL or path being fetched.
        url: String,
        /// How many attempts were made.
        attempts: u32,
        /// The last underlying cause.
        #[source]
        source: FetchCause,
    },

    /// Every disambiguated filename candidate was already taken.
    #[error(
        "no free filename for '{stem}' in {dir} after {attempts} candidates",
        dir = .directory.display()
    )]
    FilenameCollisionExhausted {
        /// Destination directory.
        directory: PathBuf,
        /// Filename stem that kept colliding.
        stem: String,
        /// Number of candidates tried.
        attempts: usize,
    },

    /// Local filesystem failure outside of fetching (work dir, placement).
    #[error("IO error at {shown}: {source}", shown = .path.display())]
    Io {
        /// Path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration or caller input.
    #[error("invalid configuration: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },
}

impl PipelineError {
    /// Creates an `UnresolvedProvider` error.
    #[must_use]
    pub fn unresolved(reference: &str) -> Self {
        Self::UnresolvedProvider {
            reference: reference.to_string(),
        }
    }

    /// Creates a `MetadataExtraction` error.
    #[must_use]
    pub fn extraction(provider: ProviderKind, reference: &str, reason: impl Into<String>) -> Self {
        Self::MetadataExtraction {
            provider,
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidPdf` error.
    #[must_use]
    pub fn invalid_pdf(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPdf {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Fetch` error from the last cause.
    #[must_use]
    pub fn fetch(url: impl Into<String>, attempts: u32, source: FetchCause) -> Self {
        Self::Fetch {
            url: url.into(),
            attempts,
            source,
        }
    }

    /// Creates an `Io` error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a `Config` error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Stable short label for the error class, used in logs and the CLI summary.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnresolvedProvider { .. } => "UnresolvedProviderError",
            Self::MetadataExtraction { .. } => "MetadataExtractionError",
            Self::InvalidPdf { .. } => "InvalidPdfError",
            Self::Fetch { .. } => "FetchError",
            Self::FilenameCollisionExhausted { .. } => "FilenameCollisionExhaustedError",
            Self::Io { .. } => "IoError",
            Self::Config { .. } => "ConfigError",
        }
    }
}
