//! Static provider signature table and reference resolution.

use tracing::debug;
use url::Url;

use super::ProviderKind;
use super::html::canonical_host;
use super::{acm, arxiv, openreview, pmc, springer};
use crate::error::PipelineError;
use crate::reference::{Reference, is_existing_file};

/// One row of the signature table: a provider, its hosts, and a path check.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSignature {
    /// Provider the row resolves to.
    pub kind: ProviderKind,
    /// Canonical hosts (no `www.`) served by the provider.
    pub hosts: &'static [&'static str],
    /// Whether the URL path (and query) has the shape of a paper reference.
    pub matches_path: fn(&Url) -> bool,
}

impl ProviderSignature {
    /// Returns true when `url` is served by one of the hosts and the path matches.
    #[must_use]
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = canonical_host(host);
        self.hosts.iter().any(|h| *h == host) && (self.matches_path)(url)
    }
}

/// Domain and path patterns, checked in order before any suffix heuristics.
pub static SIGNATURES: &[ProviderSignature] = &[
    ProviderSignature {
        kind: ProviderKind::PreprintServer,
        hosts: &["arxiv.org", "export.arxiv.org"],
        matches_path: arxiv::matches_path,
    },
    ProviderSignature {
        kind: ProviderKind::LifeSciencesRepository,
        hosts: &["ncbi.nlm.nih.gov", "pmc.ncbi.nlm.nih.gov"],
        matches_path: pmc::matches_path,
    },
    ProviderSignature {
        kind: ProviderKind::DigitalLibrary,
        hosts: &["dl.acm.org"],
        matches_path: acm::matches_path,
    },
    ProviderSignature {
        kind: ProviderKind::ReviewPlatform,
        hosts: &["openreview.net"],
        matches_path: openreview::matches_path,
    },
    ProviderSignature {
        kind: ProviderKind::PublisherSite,
        hosts: &["link.springer.com"],
        matches_path: springer::matches_path,
    },
];

/// Maps `reference` to exactly one provider.
///
/// Priority: signature table, then a `.pdf` suffix (remote URL or local path),
/// then existence on the local filesystem. Nothing else is guessed.
///
/// # Errors
///
/// Returns [`PipelineError::UnresolvedProvider`] when no rule applies.
pub fn resolve(reference: &Reference) -> Result<ProviderKind, PipelineError> {
    if let Some(url) = reference.web_url()
        && let Some(signature) = SIGNATURES.iter().find(|s| s.matches(url))
    {
        debug!(provider = %signature.kind, "Matched provider signature");
        return Ok(signature.kind);
    }

    let local = reference.local_path();

    if reference.has_pdf_suffix() {
        let kind = if local.is_some() {
            ProviderKind::LocalFile
        } else {
            ProviderKind::RawPdfUrl
        };
        debug!(provider = %kind, "Resolved by .pdf suffix");
        return Ok(kind);
    }

    if let Some(path) = local
        && is_existing_file(&path)
    {
        debug!(path = %path.display(), "Resolved to existing local file");
        return Ok(ProviderKind::LocalFile);
    }

    Err(PipelineError::unresolved(reference.as_str()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn resolve_str(input: &str) -> Result<ProviderKind, PipelineError> {
        resolve(&Reference::parse(input).unwrap())
    }

    #[test]
    fn test_resolve_known_provider_urls() {
        let cases = [
            ("https://arxiv.org/abs/1811.11242", ProviderKind::PreprintServer),
            ("https://arxiv.org/abs/1811.11242v1", ProviderKind::PreprintServer),
            ("https://arxiv.org/pdf/1811.11242.pdf", ProviderKind::PreprintServer),
            ("http://arxiv.org/abs/math/0309285", ProviderKind::PreprintServer),
            (
                "https://www.ncbi.nlm.nih.gov/pmc/articles/PMC3474301/",
                ProviderKind::LifeSciencesRepository,
            ),
            (
                "https://pmc.ncbi.nlm.nih.gov/articles/PMC3474301/",
                ProviderKind::LifeSciencesRepository,
            ),
            (
                "https://dl.acm.org/doi/10.1145/3025453.3025626",
                ProviderKind::DigitalLibrary,
            ),
            (
                "https://dl.acm.org/citation.cfm?id=3025626",
                ProviderKind::DigitalLibrary,
            ),
            (
                "https://openreview.net/forum?id=S1x4ghC9tQ",
                ProviderKind::ReviewPlatform,
            ),
            (
                "https://openreview.net/pdf?id=S1x4ghC9tQ",
                ProviderKind::ReviewPlatform,
            ),
            (
                "https://link.springer.com/article/10.1007/s10618-018-0599-y",
                ProviderKind::PublisherSite,
            ),
            (
                "https://link.springer.com/chapter/10.1007/978-3-030-01234-2_1",
                ProviderKind::PublisherSite,
            ),
        ];

        for (input, expected) in cases {
            assert_eq!(resolve_str(input).unwrap(), expected, "{input}");
        }
    }

    #[test]
    fn test_resolve_pdf_suffix_urls_and_paths() {
        assert_eq!(
            resolve_str("https://example.com/papers/foo.pdf").unwrap(),
            ProviderKind::RawPdfUrl
        );
        assert_eq!(
            resolve_str("https://example.com/papers/FOO.PDF").unwrap(),
            ProviderKind::RawPdfUrl
        );
        assert_eq!(
            resolve_str("./does-not-exist/test.pdf").unwrap(),
            ProviderKind::LocalFile
        );
        assert_eq!(
            resolve_str("file:///tmp/test.pdf").unwrap(),
            ProviderKind::LocalFile
        );
    }

    #[test]
    fn test_resolve_existing_file_without_pdf_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        assert_eq!(
            resolve_str(path.to_str().unwrap()).unwrap(),
            ProviderKind::LocalFile
        );
    }

    #[test]
    fn test_resolve_rejects_unmatched_references() {
        for input in [
            "https://example.com/article/123",
            "https://arxiv.org/list/cs.LG/recent",
            "https://openreview.net/group?id=ICLR.cc",
            "https://dl.acm.org/action/doSearch?AllField=csv",
            "no/such/local/thing",
        ] {
            assert!(
                matches!(
                    resolve_str(input),
                    Err(PipelineError::UnresolvedProvider { .. })
                ),
                "{input}"
            );
        }
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let reference = Reference::parse("https://arxiv.org/abs/1811.11242").unwrap();
        let first = resolve(&reference).unwrap();
        for _ in 0..10 {
            assert_eq!(resolve(&reference).unwrap(), first);
        }
    }

    #[test]
    fn test_signature_table_covers_each_page_provider_once() {
        let mut kinds: Vec<ProviderKind> = SIGNATURES.iter().map(|s| s.kind).collect();
        let before = kinds.len();
        kinds.dedup();
        assert_eq!(kinds.len(), before);
        assert!(!kinds.contains(&ProviderKind::RawPdfUrl));
        assert!(!kinds.contains(&ProviderKind::LocalFile));
    }
}
