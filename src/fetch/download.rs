//! Single-attempt streaming download and local copy into the work directory.

use std::path::Path;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;
use url::Url;

use crate::error::FetchCause;

const PDF_ACCEPT: &str = "application/pdf,application/octet-stream;q=0.9,*/*;q=0.5";

/// Downloads `url` into `dest`, truncating any bytes from earlier attempts.
///
/// Returns the number of bytes written. A partially written file is left for
/// the caller's temp-path guard to remove.
pub(crate) async fn download_to(client: &Client, url: &str, dest: &Path) -> Result<u64, FetchCause> {
    let parsed = Url::parse(url).map_err(|_| FetchCause::invalid_url(url))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchCause::invalid_url(url));
    }

    let response = client
        .get(parsed)
        .header(ACCEPT, PDF_ACCEPT)
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

    debug!(
        status = status.as_u16(),
        content_length = response.content_length(),
        "Streaming response body"
    );

    let mut file = File::create(dest)
        .await
        .map_err(|e| FetchCause::io(dest, e))?;
    stream_to_file(&mut file, response, url, dest).await
}

async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, FetchCause> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchCause::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchCause::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchCause::io(file_path, e))?;

    Ok(bytes_written)
}

/// Copies a local source into `dest`; the source is only ever read.
pub(crate) async fn copy_local(source: &Path, dest: &Path) -> Result<u64, FetchCause> {
    let metadata = tokio::fs::metadata(source)
        .await
        .map_err(|e| FetchCause::io(source, e))?;
    if !metadata.is_file() {
        return Err(FetchCause::io(
            source,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }

    tokio::fs::copy(source, dest)
        .await
        .map_err(|e| FetchCause::io(dest, e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_download_rejects_non_http_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let err = download_to(&Client::new(), "file:///etc/passwd", &dir.path().join("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchCause::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_copy_local_leaves_source_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("paper.pdf");
        std::fs::write(&source, b"%PDF-1.1 original").unwrap();
        let dest = dir.path().join("copy.pdf");

        let written = copy_local(&source, &dest).await.unwrap();
        assert_eq!(written, 17);
        assert_eq!(std::fs::read(&source).unwrap(), b"%PDF-1.1 original");
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.1 original");
    }

    #[tokio::test]
    async fn test_copy_local_missing_source_is_io_cause() {
        let dir = tempfile::tempdir().unwrap();
        let err = copy_local(&dir.path().join("missing.pdf"), &dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchCause::Io { .. }));
    }

    #[tokio::test]
    async fn test_copy_local_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = copy_local(dir.path(), &dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchCause::Io { .. }));
    }
}
