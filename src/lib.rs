//! Paperfetch Core Library
//!
//! Fetches one scholarly paper's PDF from a supported provider, names it from
//! its author/title/year metadata, places it atomically in an output
//! directory, and optionally hands it to an upload sink.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`reference`] - Input classification (URL or local path)
//! - [`provider`] - Provider resolution, metadata extraction, PDF location
//! - [`fetch`] - Download/copy with retry, PDF validation, hashing
//! - [`naming`] - Deterministic, filesystem-safe filenames
//! - [`pipeline`] - The resolve → extract → fetch → name → place orchestrator
//! - [`upload`] - Upload sink seam and the command-based uploader
//! - [`config`] - Pipeline configuration and the TOML config file

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod fetch;
pub mod http_client;
pub mod metadata;
pub mod naming;
pub mod pipeline;
pub mod provider;
pub mod reference;
pub mod upload;
pub mod user_agent;

// Re-export commonly used types
pub use config::{Endpoints, FileConfig, HttpTimeouts, PipelineConfig, UploadConfig};
pub use error::{FetchCause, PipelineError};
pub use fetch::{FetchedArtifact, RetryPolicy};
pub use metadata::PaperMetadata;
pub use naming::{CandidateFilename, normalize};
pub use pipeline::{Pipeline, PipelineOutcome, PipelineState, Stage};
pub use provider::{ProviderKind, resolve};
pub use reference::Reference;
pub use upload::{CommandSink, UploadError, UploadSink, UploadStatus};
