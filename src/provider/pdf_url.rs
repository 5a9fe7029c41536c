//! Raw PDF URLs: the reference is the document.

use super::{PdfLocation, ProviderKind};
use crate::error::PipelineError;
use crate::metadata::PaperMetadata;
use crate::reference::Reference;

const KIND: ProviderKind = ProviderKind::RawPdfUrl;

fn require_url(reference: &Reference) -> Result<&url::Url, PipelineError> {
    reference.web_url().ok_or_else(|| {
        PipelineError::extraction(KIND, reference.as_str(), "not an http(s) URL")
    })
}

/// No landing page; document metadata is read after the fetch.
pub(super) fn extract(reference: &Reference) -> Result<PaperMetadata, PipelineError> {
    require_url(reference)?;
    Ok(PaperMetadata::default())
}

pub(super) fn locate(reference: &Reference) -> Result<PdfLocation, PipelineError> {
    let url = require_url(reference)?;
    Ok(PdfLocation::remote(url.as_str(), None))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::provider::PdfSource;

    #[test]
    fn test_locate_is_the_url_itself() {
        let reference = Reference::parse("https://example.com/papers/foo.pdf").unwrap();
        let location = locate(&reference).unwrap();
        assert_eq!(
            location.source,
            PdfSource::Remote("https://example.com/papers/foo.pdf".to_string())
        );
        assert_eq!(location.identifier, None);
        assert_eq!(extract(&reference).unwrap(), PaperMetadata::default());
    }

    #[test]
    fn test_rejects_local_paths() {
        let reference = Reference::parse("/tmp/foo.pdf").unwrap();
        assert!(locate(&reference).is_err());
    }
}
