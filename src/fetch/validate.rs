//! PDF integrity checks and content hashing.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::error::PipelineError;

/// Magic bytes every accepted PDF starts with.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Default lower bound on an acceptable PDF, in bytes.
pub const DEFAULT_MIN_PDF_BYTES: u64 = 64;

const READ_CHUNK: usize = 64 * 1024;

/// Size and SHA-256 of a file that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub byte_size: u64,
    pub content_hash: String,
}

/// Checks size and magic header of `path`, hashing it in the same pass.
///
/// `location` is the URL or source path reported in errors.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidPdf`] when the file is smaller than
/// `min_bytes` or does not start with `%PDF-`, and [`PipelineError::Io`] when
/// it cannot be read.
pub async fn verify_pdf(
    path: &Path,
    location: &str,
    min_bytes: u64,
) -> Result<Verified, PipelineError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| PipelineError::io(path, e))?;

    let mut hasher = Sha256::new();
    let mut header: Vec<u8> = Vec::with_capacity(PDF_MAGIC.len());
    let mut byte_size: u64 = 0;
    let mut buffer = vec![0_u8; READ_CHUNK];

    loop {
        let read = file
            .read(&mut buffer)
            .await
            .map_err(|e| PipelineError::io(path, e))?;
        if read == 0 {
            break;
        }
        let chunk = &buffer[..read];
        if header.len() < PDF_MAGIC.len() {
            let needed = (PDF_MAGIC.len() - header.len()).min(chunk.len());
            header.extend_from_slice(&chunk[..needed]);
        }
        hasher.update(chunk);
        byte_size += read as u64;
    }

    if byte_size < min_bytes {
        return Err(PipelineError::invalid_pdf(
            location,
            format!("{byte_size} bytes is below the {min_bytes}-byte minimum"),
        ));
    }
    if header != PDF_MAGIC {
        return Err(PipelineError::invalid_pdf(
            location,
            format!(
                "missing %PDF- header (starts with {:?})",
                String::from_utf8_lossy(&header)
            ),
        ));
    }

    Ok(Verified {
        byte_size,
        content_hash: format!("{:x}", hasher.finalize()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn test_verify_accepts_pdf_and_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = b"%PDF-1.1\n".to_vec();
        bytes.resize(128, b' ');
        let path = write(&dir, "ok.pdf", &bytes);

        let verified = verify_pdf(&path, "ok.pdf", DEFAULT_MIN_PDF_BYTES)
            .await
            .unwrap();
        assert_eq!(verified.byte_size, 128);
        assert_eq!(verified.content_hash.len(), 64);
        assert_eq!(
            verified.content_hash,
            format!("{:x}", Sha256::digest(&bytes))
        );
    }

    #[tokio::test]
    async fn test_verify_rejects_html() {
        let dir = tempfile::tempdir().unwrap();
        let body = "<!DOCTYPE html><html><body>Access denied</body></html>".repeat(4);
        let path = write(&dir, "page.pdf", body.as_bytes());

        let err = verify_pdf(&path, "https://example.com/page.pdf", 64)
            .await
            .unwrap_err();
        match err {
            PipelineError::InvalidPdf { location, reason } => {
                assert_eq!(location, "https://example.com/page.pdf");
                assert!(reason.contains("%PDF-"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_rejects_tiny_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "tiny.pdf", b"%PDF-1.4");
        let err = verify_pdf(&path, "tiny.pdf", 64).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPdf { .. }));
        assert!(err.to_string().contains("8 bytes"));
    }

    #[tokio::test]
    async fn test_verify_min_bytes_is_configurable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "tiny.pdf", b"%PDF-1.4");
        assert!(verify_pdf(&path, "tiny.pdf", 5).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_missing_file_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = verify_pdf(&dir.path().join("nope.pdf"), "nope.pdf", 64)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
