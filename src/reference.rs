//! The user-supplied input reference: a URL or a local path.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::PipelineError;

/// Shape of a parsed reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceKind {
    /// An absolute URL (`http`, `https` or `file`).
    Url(Url),
    /// Anything without a recognised scheme is treated as a filesystem path.
    Path(PathBuf),
}

/// An immutable, validated input reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    raw: String,
    kind: ReferenceKind,
}

impl Reference {
    /// Classifies `input` as a URL or a path.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnresolvedProvider`] for empty input and for
    /// URLs whose scheme no provider understands (`ftp:`, `mailto:` ...).
    pub fn parse(input: &str) -> Result<Self, PipelineError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(PipelineError::unresolved(input));
        }

        let kind = match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https" | "file") => ReferenceKind::Url(url),
            // Windows drive letters parse as a one-letter scheme.
            Ok(url) if url.scheme().len() == 1 => ReferenceKind::Path(PathBuf::from(raw)),
            Ok(_) => return Err(PipelineError::unresolved(raw)),
            Err(_) => ReferenceKind::Path(PathBuf::from(raw)),
        };

        Ok(Self {
            raw: raw.to_string(),
            kind,
        })
    }

    /// The reference exactly as given (trimmed).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn kind(&self) -> &ReferenceKind {
        &self.kind
    }

    /// The parsed URL, for `http(s)` and `file` references.
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        match &self.kind {
            ReferenceKind::Url(url) => Some(url),
            ReferenceKind::Path(_) => None,
        }
    }

    /// The parsed URL when its scheme is `http` or `https`.
    #[must_use]
    pub fn web_url(&self) -> Option<&Url> {
        self.url()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
    }

    /// Filesystem path for plain paths and `file://` URLs.
    #[must_use]
    pub fn local_path(&self) -> Option<PathBuf> {
        match &self.kind {
            ReferenceKind::Path(path) => Some(path.clone()),
            ReferenceKind::Url(url) if url.scheme() == "file" => url.to_file_path().ok(),
            ReferenceKind::Url(_) => None,
        }
    }

    /// Whether the path component ends in `.pdf` (case-insensitive).
    #[must_use]
    pub fn has_pdf_suffix(&self) -> bool {
        let tail = match &self.kind {
            ReferenceKind::Url(url) => url.path().to_string(),
            ReferenceKind::Path(path) => path.to_string_lossy().into_owned(),
        };
        tail.to_ascii_lowercase().ends_with(".pdf")
    }

    /// Stem used for naming when no metadata is available.
    ///
    /// For local files this is the file stem; for URLs the last non-empty
    /// path segment, percent-decoded, without a `.pdf` extension.
    #[must_use]
    pub fn file_stem(&self) -> Option<String> {
        if let Some(path) = self.local_path() {
            return path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .filter(|stem| !stem.is_empty());
        }

        let url = self.url()?;
        let segment = url
            .path_segments()?
            .filter(|segment| !segment.is_empty())
            .next_back()?;
        let decoded = urlencoding::decode(segment)
            .map_or_else(|_| segment.to_string(), std::borrow::Cow::into_owned);
        let stem = strip_pdf_extension(&decoded);
        (!stem.is_empty()).then(|| stem.to_string())
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Strips a trailing `.pdf` (any case) from `value`.
#[must_use]
pub fn strip_pdf_extension(value: &str) -> &str {
    let len = value.len();
    if len >= 4 && value.is_char_boundary(len - 4) && value[len - 4..].eq_ignore_ascii_case(".pdf")
    {
        &value[..len - 4]
    } else {
        value
    }
}

/// Returns true if `path` exists and is a regular file.
#[must_use]
pub fn is_existing_file(path: &Path) -> bool {
    path.is_file()
}
