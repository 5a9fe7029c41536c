//! Local files: copied, never modified.

use super::{PdfLocation, ProviderKind};
use crate::error::PipelineError;
use crate::metadata::PaperMetadata;
use crate::reference::Reference;

const KIND: ProviderKind = ProviderKind::LocalFile;

fn require_path(reference: &Reference) -> Result<std::path::PathBuf, PipelineError> {
    reference.local_path().ok_or_else(|| {
        PipelineError::extraction(KIND, reference.as_str(), "not a local path")
    })
}

/// Checks the source is readable; document metadata is read after the copy.
pub(super) async fn extract(reference: &Reference) -> Result<PaperMetadata, PipelineError> {
    let path = require_path(reference)?;
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(PaperMetadata::default()),
        Ok(_) => Err(PipelineError::extraction(
            KIND,
            reference.as_str(),
            "not a regular file",
        )),
        Err(e) => Err(PipelineError::extraction(
            KIND,
            reference.as_str(),
            format!("cannot read source file: {e}"),
        )),
    }
}

pub(super) fn locate(reference: &Reference) -> Result<PdfLocation, PipelineError> {
    Ok(PdfLocation::local(require_path(reference)?))
}
