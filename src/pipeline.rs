//! Pipeline orchestrator: resolve, extract, fetch, name, place, upload.
//!
//! One [`Pipeline`] holds an immutable [`PipelineConfig`] and a cloneable HTTP
//! client; [`Pipeline::run`] processes one reference end to end. Each run owns
//! its own temporary working directory, so runs share no mutable state and a
//! failed run leaves nothing behind except what was already placed.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::fetch::{self, FetchOptions, FetchedArtifact, embedded_metadata};
use crate::http_client::build_http_client;
use crate::metadata::PaperMetadata;
use crate::naming::{self, CandidateFilename, MAX_COLLISION_ATTEMPTS};
use crate::provider::{self, ProviderContext, ProviderKind};
use crate::reference::Reference;
use crate::upload::{UploadSink, UploadStatus};

/// A step of a pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Extracting,
    Fetching,
    Naming,
    Placing,
}

impl Stage {
    /// Returns the log representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolving => "resolving",
            Self::Extracting => "extracting",
            Self::Fetching => "fetching",
            Self::Naming => "naming",
            Self::Placing => "placing",
        }
    }

    /// The stage that follows this one; `None` after placement.
    #[must_use]
    pub fn next(self) -> Option<Stage> {
        match self {
            Self::Resolving => Some(Self::Extracting),
            Self::Extracting => Some(Self::Fetching),
            Self::Fetching => Some(Self::Naming),
            Self::Naming => Some(Self::Placing),
            Self::Placing => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Working on a stage.
    Running(Stage),
    /// PDF placed under its final name.
    Done,
    /// Terminal failure during `at`.
    Failed { at: Stage },
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running(stage) => write!(f, "{stage}"),
            Self::Done => f.write_str("done"),
            Self::Failed { at } => write!(f, "failed at {at}"),
        }
    }
}

/// Records and logs state transitions of one run.
#[derive(Debug)]
struct RunTracker {
    history: Vec<PipelineState>,
}

impl RunTracker {
    fn start() -> Self {
        let initial = PipelineState::Running(Stage::Resolving);
        debug!(state = %initial, "Pipeline state");
        Self {
            history: vec![initial],
        }
    }

    fn current(&self) -> PipelineState {
        self.history
            .last()
            .copied()
            .unwrap_or(PipelineState::Running(Stage::Resolving))
    }

    fn current_stage(&self) -> Stage {
        match self.current() {
            PipelineState::Running(stage) | PipelineState::Failed { at: stage } => stage,
            PipelineState::Done => Stage::Placing,
        }
    }

    /// Moves to the next stage, or to `Done` after placement.
    fn advance(&mut self) {
        let next = match self.current() {
            PipelineState::Running(stage) => {
                stage.next().map_or(PipelineState::Done, PipelineState::Running)
            }
            terminal => terminal,
        };
        debug!(from = %self.current(), to = %next, "Pipeline transition");
        self.history.push(next);
    }

    fn fail(&mut self, error: &PipelineError) {
        let state = PipelineState::Failed {
            at: self.current_stage(),
        };
        warn!(state = %state, error_kind = error.kind(), error = %error, "Pipeline failed");
        self.history.push(state);
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Final location of the PDF.
    pub path: PathBuf,
    /// Name handed to the upload sink (the final file stem).
    pub display_name: String,
    pub provider: ProviderKind,
    /// Metadata used for naming (provider metadata, filled from the document).
    pub metadata: PaperMetadata,
    pub byte_size: u64,
    /// SHA-256 of the PDF, lowercase hex.
    pub content_hash: String,
    pub upload: UploadStatus,
    /// Every state the run passed through, ending in `Done`.
    pub states: Vec<PipelineState>,
}

/// Fetches one paper per [`Pipeline::run`] call.
pub struct Pipeline {
    config: PipelineConfig,
    client: Client,
    sink: Option<Arc<dyn UploadSink>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("sink", &self.sink.as_ref().map(|s| s.name().to_string()))
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Validates `config` and builds the shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] for invalid configuration or when the
    /// HTTP client cannot be built.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let client = build_http_client(config.timeouts, &config.user_agent)?;
        Ok(Self {
            config,
            client,
            sink: None,
        })
    }

    /// Hands placed PDFs to `sink` unless the config is a dry run.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn UploadSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the full pipeline for one reference.
    ///
    /// Upload failures are reported in [`PipelineOutcome::upload`] and never
    /// fail the run.
    ///
    /// # Errors
    ///
    /// Any [`PipelineError`]; on error nothing is left at a final name and the
    /// working directory is removed.
    #[tracing::instrument(skip_all, fields(reference = %input))]
    pub async fn run(&self, input: &str) -> Result<PipelineOutcome, PipelineError> {
        let mut tracker = RunTracker::start();
        match self.run_stages(input, &mut tracker).await {
            Ok(mut outcome) => {
                outcome.states = tracker.history;
                Ok(outcome)
            }
            Err(error) => {
                tracker.fail(&error);
                Err(error)
            }
        }
    }

    async fn run_stages(
        &self,
        input: &str,
        tracker: &mut RunTracker,
    ) -> Result<PipelineOutcome, PipelineError> {
        let ctx = ProviderContext {
            client: &self.client,
            endpoints: &self.config.endpoints,
            retry: &self.config.retry,
        };

        // Resolving
        let reference = Reference::parse(input)?;
        let kind = provider::resolve(&reference)?;
        info!(provider = %kind, "Resolved provider");
        tracker.advance();

        // Extracting
        let metadata = provider::extract(&ctx, kind, &reference).await?;
        debug!(?metadata, "Extracted metadata");
        tracker.advance();

        // Fetching
        let work_dir = self.create_work_dir()?;
        let artifact = fetch::fetch(
            &ctx,
            FetchOptions {
                work_dir: work_dir.path(),
                min_pdf_bytes: self.config.min_pdf_bytes,
            },
            &reference,
            kind,
        )
        .await?;
        cross_check_identifiers(kind, &reference, &metadata, &artifact)?;
        tracker.advance();

        // Naming
        let metadata = if kind.metadata_from_document() {
            metadata.or_fill_from(embedded_metadata(artifact.local_path()).await)
        } else {
            metadata
        };
        let file_name = self.choose_file_name(kind, &reference, &metadata);
        debug!(file_name = %file_name, "Chose filename");
        tracker.advance();

        // Placing
        let output_dir = &self.config.output_dir;
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| PipelineError::io(output_dir, e))?;
        let path = place(&artifact, output_dir, &file_name)?;
        tracker.advance();
        info!(path = %path.display(), bytes = artifact.byte_size(), "Placed PDF");

        let byte_size = artifact.byte_size();
        let content_hash = artifact.content_hash().to_string();
        // Deletes the temporary copy before the work dir goes away.
        drop(artifact);
        drop(work_dir);

        let display_name = path
            .file_stem()
            .map_or_else(|| file_name.clone(), |stem| stem.to_string_lossy().into_owned());
        let upload = self.deliver(&path, &display_name).await;

        Ok(PipelineOutcome {
            path,
            display_name,
            provider: kind,
            metadata,
            byte_size,
            content_hash,
            upload,
            states: Vec::new(),
        })
    }

    fn create_work_dir(&self) -> Result<TempDir, PipelineError> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("paperfetch-");
            builder
        };
        match &self.config.work_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
                builder
                    .tempdir_in(parent)
                    .map_err(|e| PipelineError::io(parent, e))
            }
            None => builder
                .tempdir()
                .map_err(|e| PipelineError::io(std::env::temp_dir(), e)),
        }
    }

    /// Explicit name, then metadata, then the reference's own stem.
    ///
    /// Document Info dictionaries nearly always carry a creation date, so for
    /// document-derived metadata only a title or an author counts.
    fn choose_file_name(
        &self,
        kind: ProviderKind,
        reference: &Reference,
        metadata: &PaperMetadata,
    ) -> String {
        if let Some(explicit) = &self.config.filename {
            return explicit.clone();
        }
        let names_paper = if kind.metadata_from_document() {
            metadata.has_naming_fields()
        } else {
            metadata.has_usable_fields()
        };
        if names_paper {
            return naming::normalize(metadata).file_name();
        }
        match reference.file_stem() {
            Some(stem) => CandidateFilename::from_stem(&stem).file_name(),
            None => naming::normalize(&PaperMetadata::default()).file_name(),
        }
    }

    async fn deliver(&self, path: &Path, display_name: &str) -> UploadStatus {
        if self.config.dry_run {
            debug!("Dry run; skipping upload");
            return UploadStatus::Skipped;
        }
        let Some(sink) = &self.sink else {
            return UploadStatus::Skipped;
        };
        match sink.upload(path, display_name).await {
            Ok(()) => UploadStatus::Delivered,
            Err(e) => {
                warn!(sink = sink.name(), error = %e, "Upload failed; PDF kept in place");
                UploadStatus::Failed(e.to_string())
            }
        }
    }
}

/// Fails when extractor and locator name different papers.
fn cross_check_identifiers(
    kind: ProviderKind,
    reference: &Reference,
    metadata: &PaperMetadata,
    artifact: &FetchedArtifact,
) -> Result<(), PipelineError> {
    let (Some(extracted), Some(located)) = (metadata.identifier.as_deref(), artifact.identifier())
    else {
        return Ok(());
    };
    if identifiers_agree(extracted, located) {
        return Ok(());
    }
    Err(PipelineError::extraction(
        kind,
        reference.as_str(),
        format!("metadata describes '{extracted}' but the PDF was located for '{located}'"),
    ))
}

fn identifiers_agree(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Stages the artifact inside `output_dir`, then moves it to the first free
/// collision candidate of `file_name` without replacing anything.
///
/// Filesystems without hard links or no-replace renames (exFAT, some FUSE and
/// network mounts) get an exclusive-create copy instead. That copy is not
/// atomic: a crash mid-copy can leave a truncated file under the final name.
fn place(
    artifact: &FetchedArtifact,
    output_dir: &Path,
    file_name: &str,
) -> Result<PathBuf, PipelineError> {
    let staged = tempfile::Builder::new()
        .prefix(".paperfetch-")
        .suffix(".part")
        .tempfile_in(output_dir)
        .map_err(|e| PipelineError::io(output_dir, e))?
        .into_temp_path();
    std::fs::copy(artifact.local_path(), &staged).map_err(|e| PipelineError::io(&*staged, e))?;

    let mut staged = staged;
    let mut copy_fallback = false;
    for candidate in naming::collision_candidates(file_name) {
        let target = output_dir.join(&candidate);
        if !copy_fallback {
            match staged.persist_noclobber(&target) {
                Ok(()) => return Ok(target),
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    debug!(candidate = %candidate, "Filename taken; trying next candidate");
                    staged = e.path;
                    continue;
                }
                Err(e) if links_unsupported(&e.error) => {
                    warn!(
                        directory = %output_dir.display(),
                        error = %e.error,
                        "No-clobber rename unsupported here; copying instead"
                    );
                    staged = e.path;
                    copy_fallback = true;
                }
                Err(e) => return Err(PipelineError::io(target, e.error)),
            }
        }
        match copy_noclobber(&staged, &target) {
            Ok(()) => return Ok(target),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(candidate = %candidate, "Filename taken; trying next candidate");
            }
            Err(e) => return Err(PipelineError::io(target, e)),
        }
    }

    let (stem, _) = naming::split_extension(file_name);
    error!(
        directory = %output_dir.display(),
        stem,
        attempts = MAX_COLLISION_ATTEMPTS,
        "Every filename candidate is taken"
    );
    Err(PipelineError::FilenameCollisionExhausted {
        directory: output_dir.to_path_buf(),
        stem: stem.to_string(),
        attempts: MAX_COLLISION_ATTEMPTS,
    })
}

fn links_unsupported(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::Unsupported | ErrorKind::PermissionDenied
    )
}

/// Copies `source` to `target`, failing with `AlreadyExists` if `target` exists.
fn copy_noclobber(source: &Path, target: &Path) -> std::io::Result<()> {
    let mut output = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)?;
    let copied = std::fs::File::open(source)
        .and_then(|mut input| std::io::copy(&mut input, &mut output))
        .and_then(|_| output.sync_all());
    if let Err(e) = copied {
        drop(output);
        let _ = std::fs::remove_file(target);
        return Err(e);
    }
    Ok(())
}
