//! Pipeline configuration: defaults, TOML config file, and validation.
//!
//! A [`PipelineConfig`] is built once (defaults, then the optional config file,
//! then CLI flags) and handed to [`crate::Pipeline::new`]. Nothing reads
//! configuration from global state after that.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::PipelineError;
use crate::fetch::{DEFAULT_MIN_PDF_BYTES, RetryPolicy};
use crate::user_agent::default_user_agent;

/// Default connect timeout for every request.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default whole-request timeout (PDFs can be large).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default uploader program.
pub const DEFAULT_UPLOADER: &str = "rmapi";

/// Accepted range for `max_retries` (attempts, including the first).
pub const MAX_RETRIES_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

const TIMEOUT_SECS_RANGE: std::ops::RangeInclusive<u64> = 1..=3600;
const MIN_PDF_BYTES_RANGE: std::ops::RangeInclusive<u64> = 1..=10 * 1024 * 1024;

/// Connect and whole-request timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Base URLs of every provider; overridable so tests can use a mock server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Endpoints {
    /// arXiv site (PDFs under `/pdf/<id>`).
    pub arxiv: String,
    /// arXiv Atom export API query endpoint.
    pub arxiv_api: String,
    /// PubMed Central site (articles under `/articles/<PMCID>/`).
    pub pmc: String,
    /// ACM Digital Library site.
    pub acm: String,
    /// OpenReview site (PDFs under `/pdf?id=`).
    pub openreview: String,
    /// OpenReview API (notes under `/notes?id=`).
    pub openreview_api: String,
    /// Springer Link site.
    pub springer: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            arxiv: "https://arxiv.org".to_string(),
            arxiv_api: "https://export.arxiv.org/api/query".to_string(),
            pmc: "https://pmc.ncbi.nlm.nih.gov".to_string(),
            acm: "https://dl.acm.org".to_string(),
            openreview: "https://openreview.net".to_string(),
            openreview_api: "https://api.openreview.net".to_string(),
            springer: "https://link.springer.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Points every provider at `base` (for example a local mock server).
    ///
    /// The arXiv API lands on `<base>/api/query`, everything else on `<base>`.
    #[must_use]
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            arxiv: base.clone(),
            arxiv_api: format!("{base}/api/query"),
            pmc: base.clone(),
            acm: base.clone(),
            openreview: base.clone(),
            openreview_api: base.clone(),
            springer: base,
        }
    }

    fn validate(&self) -> Result<(), PipelineError> {
        for (field, value) in [
            ("arxiv", &self.arxiv),
            ("arxiv_api", &self.arxiv_api),
            ("pmc", &self.pmc),
            ("acm", &self.acm),
            ("openreview", &self.openreview),
            ("openreview_api", &self.openreview_api),
            ("springer", &self.springer),
        ] {
            let parsed = url::Url::parse(value).map_err(|e| {
                PipelineError::config(format!("endpoint `{field}` is not a URL ({value}): {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(PipelineError::config(format!(
                    "endpoint `{field}` must use http or https: {value}"
                )));
            }
        }
        Ok(())
    }
}

/// How to hand the placed PDF to the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Uploader program.
    pub program: String,
    /// Arguments placed before the PDF path.
    pub args: Vec<String>,
    /// Remote directory appended after the PDF path.
    pub remote_dir: Option<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_UPLOADER.to_string(),
            args: vec!["put".to_string()],
            remote_dir: None,
        }
    }
}

/// Everything one pipeline needs; immutable once built.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory the final PDF is placed in.
    pub output_dir: PathBuf,
    /// Parent for per-run temp directories (system temp dir if unset).
    pub work_dir: Option<PathBuf>,
    /// Explicit output filename, used verbatim.
    pub filename: Option<String>,
    /// Place the PDF but skip the upload sink.
    pub dry_run: bool,
    pub upload: UploadConfig,
    pub retry: RetryPolicy,
    pub timeouts: HttpTimeouts,
    /// Smallest accepted PDF, in bytes.
    pub min_pdf_bytes: u64,
    pub endpoints: Endpoints,
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            work_dir: None,
            filename: None,
            dry_run: false,
            upload: UploadConfig::default(),
            retry: RetryPolicy::default(),
            timeouts: HttpTimeouts::default(),
            min_pdf_bytes: DEFAULT_MIN_PDF_BYTES,
            endpoints: Endpoints::default(),
            user_agent: default_user_agent(),
        }
    }
}

impl PipelineConfig {
    /// Overlays values present in `file` onto this config.
    pub fn apply_file(&mut self, file: &FileConfig) {
        if let Some(dir) = &file.output_dir {
            self.output_dir.clone_from(dir);
        }
        if let Some(dir) = &file.work_dir {
            self.work_dir = Some(dir.clone());
        }
        if let Some(attempts) = file.max_retries {
            self.retry = RetryPolicy::with_max_attempts(attempts);
        }
        if let Some(secs) = file.connect_timeout_secs {
            self.timeouts.connect = Duration::from_secs(secs);
        }
        if let Some(secs) = file.request_timeout_secs {
            self.timeouts.request = Duration::from_secs(secs);
        }
        if let Some(bytes) = file.min_pdf_bytes {
            self.min_pdf_bytes = bytes;
        }
        if let Some(upload) = &file.upload {
            if let Some(program) = &upload.program {
                self.upload.program.clone_from(program);
            }
            if let Some(args) = &upload.args {
                self.upload.args.clone_from(args);
            }
            if upload.remote_dir.is_some() {
                self.upload.remote_dir.clone_from(&upload.remote_dir);
            }
            if let Some(enabled) = upload.enabled {
                self.dry_run = !enabled;
            }
        }
        if let Some(endpoints) = &file.endpoints {
            self.endpoints = endpoints.clone();
        }
    }

    /// Checks invariants that can't be expressed in the types.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] naming the first invalid value.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if let Some(name) = &self.filename
            && !crate::naming::is_single_segment(name)
        {
            return Err(PipelineError::config(format!(
                "filename must be a single path segment, got '{name}'"
            )));
        }
        if !MIN_PDF_BYTES_RANGE.contains(&self.min_pdf_bytes) {
            return Err(PipelineError::config(format!(
                "min_pdf_bytes {} outside {}..={}",
                self.min_pdf_bytes,
                MIN_PDF_BYTES_RANGE.start(),
                MIN_PDF_BYTES_RANGE.end()
            )));
        }
        if self.timeouts.connect.is_zero() || self.timeouts.request.is_zero() {
            return Err(PipelineError::config("HTTP timeouts must be non-zero"));
        }
        if self.upload.program.trim().is_empty() {
            return Err(PipelineError::config("uploader program must not be empty"));
        }
        self.endpoints.validate()
    }
}

/// `[upload]` table of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileUploadConfig {
    pub enabled: Option<bool>,
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
    pub remote_dir: Option<String>,
}

/// TOML-backed file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Default output directory.
    pub output_dir: Option<PathBuf>,
    /// Parent for per-run temp directories.
    pub work_dir: Option<PathBuf>,
    /// Fetch attempts, including the first (same range as CLI).
    pub max_retries: Option<u32>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub min_pdf_bytes: Option<u64>,
    pub upload: Option<FileUploadConfig>,
    pub endpoints: Option<Endpoints>,
}

impl FileConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] on syntax errors, unknown keys, or
    /// out-of-range values.
    pub fn from_toml(text: &str) -> Result<Self, PipelineError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| PipelineError::config(format!("config file is not valid: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the file cannot be read and
    /// [`PipelineError::Config`] if it is invalid.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_toml(&text).map_err(|e| match e {
            PipelineError::Config { message } => {
                PipelineError::config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Validates values against runtime and CLI constraints.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] naming the offending key.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if let Some(attempts) = self.max_retries
            && !MAX_RETRIES_RANGE.contains(&attempts)
        {
            return Err(out_of_range("max_retries", attempts, &MAX_RETRIES_RANGE));
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("request_timeout_secs", self.request_timeout_secs)?;
        if let Some(bytes) = self.min_pdf_bytes
            && !MIN_PDF_BYTES_RANGE.contains(&bytes)
        {
            return Err(out_of_range("min_pdf_bytes", bytes, &MIN_PDF_BYTES_RANGE));
        }
        if let Some(endpoints) = &self.endpoints {
            endpoints.validate()?;
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<(), PipelineError> {
    match value {
        Some(secs) if !TIMEOUT_SECS_RANGE.contains(&secs) => {
            Err(out_of_range(field, secs, &TIMEOUT_SECS_RANGE))
        }
        _ => Ok(()),
    }
}

fn out_of_range<T: std::fmt::Display>(
    field: &str,
    value: T,
    range: &std::ops::RangeInclusive<T>,
) -> PipelineError {
    PipelineError::config(format!(
        "invalid config value for `{field}`: {value}. Expected range: {}..={}",
        range.start(),
        range.end()
    ))
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/paperfetch/config.toml`
/// 2. `$HOME/.config/paperfetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("paperfetch")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("paperfetch")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file at `explicit`, or the default path if it exists.
///
/// An explicit path must exist; a missing default file is not an error.
///
/// # Errors
///
/// Propagates [`FileConfig::load`] errors.
pub fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>, PipelineError> {
    if let Some(path) = explicit {
        return FileConfig::load(path).map(Some);
    }
    match resolve_default_config_path() {
        Some(path) if path.is_file() => FileConfig::load(&path).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_attempts(), 3);
        assert_eq!(config.min_pdf_bytes, 64);
        assert_eq!(config.upload.program, "rmapi");
        assert!(!config.dry_run);
    }

    #[test]
    fn test_file_config_parses_and_applies() {
        let text = r#"
            output_dir = "/tmp/papers"
            max_retries = 5
            connect_timeout_secs = 3
            min_pdf_bytes = 128

            [upload]
            enabled = false
            program = "my-uploader"
            args = ["push", "--quiet"]
            remote_dir = "/Papers"

            [endpoints]
            arxiv = "http://127.0.0.1:9000"
        "#;
        let file = FileConfig::from_toml(text).unwrap();
        let mut config = PipelineConfig::default();
        config.apply_file(&file);

        assert_eq!(config.output_dir, PathBuf::from("/tmp/papers"));
        assert_eq!(config.retry.max_attempts(), 5);
        assert_eq!(config.timeouts.connect, Duration::from_secs(3));
        assert_eq!(config.min_pdf_bytes, 128);
        assert!(config.dry_run);
        assert_eq!(config.upload.program, "my-uploader");
        assert_eq!(config.upload.args, vec!["push", "--quiet"]);
        assert_eq!(config.upload.remote_dir.as_deref(), Some("/Papers"));
        assert_eq!(config.endpoints.arxiv, "http://127.0.0.1:9000");
        // Unspecified endpoints keep their defaults.
        assert_eq!(config.endpoints.pmc, "https://pmc.ncbi.nlm.nih.gov");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_config_rejects_out_of_range() {
        let err = FileConfig::from_toml("max_retries = 11").unwrap_err();
        assert!(err.to_string().contains("max_retries"), "{err}");
        let err = FileConfig::from_toml("request_timeout_secs = 0").unwrap_err();
        assert!(err.to_string().contains("request_timeout_secs"), "{err}");
    }

    #[test]
    fn test_file_config_rejects_unknown_keys() {
        assert!(FileConfig::from_toml("concurrency = 4").is_err());
    }

    #[test]
    fn test_file_config_rejects_bad_endpoint() {
        let err = FileConfig::from_toml("[endpoints]\narxiv = \"ftp://x\"").unwrap_err();
        assert!(err.to_string().contains("arxiv"), "{err}");
    }

    #[test]
    fn test_validate_rejects_multi_segment_filename() {
        let config = PipelineConfig {
            filename: Some("../up.pdf".to_string()),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Config { .. })
        ));
    }

    #[test]
    fn test_endpoints_all_at() {
        let endpoints = Endpoints::all_at("http://127.0.0.1:4000/");
        assert_eq!(endpoints.arxiv, "http://127.0.0.1:4000");
        assert_eq!(endpoints.arxiv_api, "http://127.0.0.1:4000/api/query");
        assert!(endpoints.validate().is_ok());
    }

    #[test]
    fn test_load_file_config_explicit_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_file_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[test]
    fn test_load_file_config_reports_path_on_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_retries = \"three\"").unwrap();
        let err = load_file_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("config.toml"), "{err}");
    }
}
