//! Upload sink seam and the command-based uploader.
//!
//! The pipeline hands a placed PDF to an [`UploadSink`] as its last step. The
//! device protocol lives outside this crate; [`CommandSink`] shells out to a
//! configured program (by default `rmapi put <path> [<remote_dir>]`).

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::UploadConfig;

/// Errors raised by an upload sink.
///
/// Never turns a successful placement into a pipeline failure.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The uploader program could not be started.
    #[error("could not start uploader '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The uploader ran but reported failure.
    #[error("uploader '{program}' exited with {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Outcome of the upload step as reported in a pipeline outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    /// Dry-run, or no sink configured.
    Skipped,
    /// The sink accepted the PDF.
    Delivered,
    /// The sink failed; the placed PDF is kept.
    Failed(String),
}

impl UploadStatus {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Receives a completed local PDF and the name to show on the target.
///
/// Uses `async_trait` so pipelines can hold an `Arc<dyn UploadSink>`.
#[async_trait]
pub trait UploadSink: Send + Sync {
    /// Short name for logs (e.g. "rmapi").
    fn name(&self) -> &str;

    /// Delivers `path` under `display_name`.
    async fn upload(&self, path: &Path, display_name: &str) -> Result<(), UploadError>;
}

/// Runs `<program> <args…> <path> [<remote_dir>]`.
#[derive(Debug, Clone)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
    remote_dir: Option<String>,
}

impl CommandSink {
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>, remote_dir: Option<String>) -> Self {
        Self {
            program: program.into(),
            args,
            remote_dir,
        }
    }

    #[must_use]
    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(
            config.program.clone(),
            config.args.clone(),
            config.remote_dir.clone(),
        )
    }

    fn command_args(&self, path: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = self.args.iter().map(Into::into).collect();
        args.push(path.as_os_str().to_os_string());
        if let Some(remote_dir) = &self.remote_dir {
            args.push(remote_dir.into());
        }
        args
    }
}

#[async_trait]
impl UploadSink for CommandSink {
    fn name(&self) -> &str {
        &self.program
    }

    #[tracing::instrument(skip(self), fields(uploader = %self.program, path = %path.display()))]
    async fn upload(&self, path: &Path, display_name: &str) -> Result<(), UploadError> {
        let args = self.command_args(path);
        debug!(?args, "Running uploader");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| UploadError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(UploadError::ExitStatus {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr,
            });
        }

        info!(display_name, "Uploaded");
        Ok(())
    }
}
