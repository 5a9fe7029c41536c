//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use paperfetch_core::PipelineConfig;
use paperfetch_core::fetch::RetryPolicy;

/// Fetch a paper's PDF, name it from its metadata, and upload it.
///
/// Accepts arXiv, PubMed Central, ACM Digital Library, OpenReview and
/// Springer Link URLs, any URL ending in .pdf, or a local PDF file.
#[derive(Parser, Debug)]
#[command(name = "paperfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Paper URL or local PDF path
    pub reference: String,

    /// Directory the PDF is placed in [default: .]
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Explicit output filename, used verbatim
    #[arg(short = 'f', long)]
    pub filename: Option<String>,

    /// Place the PDF but skip the upload
    #[arg(short = 'n', long)]
    pub no_upload: bool,

    /// Uploader program [default: rmapi]
    #[arg(short = 'u', long)]
    pub uploader: Option<String>,

    /// Remote directory passed to the uploader
    #[arg(short = 'r', long)]
    pub remote_dir: Option<String>,

    /// Fetch attempts for transient failures (1-10) [default: 3]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_retries: Option<u32>,

    /// Config file (default: $XDG_CONFIG_HOME/paperfetch/config.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Overlays flags that were given onto `config`.
    pub fn apply_to(&self, config: &mut PipelineConfig) {
        if let Some(dir) = &self.output_dir {
            config.output_dir.clone_from(dir);
        }
        if self.filename.is_some() {
            config.filename.clone_from(&self.filename);
        }
        if self.no_upload {
            config.dry_run = true;
        }
        if let Some(program) = &self.uploader {
            config.upload.program.clone_from(program);
        }
        if self.remote_dir.is_some() {
            config.upload.remote_dir.clone_from(&self.remote_dir);
        }
        if let Some(attempts) = self.max_retries {
            config.retry = RetryPolicy::with_max_attempts(attempts);
        }
    }

    /// Default log level when `RUST_LOG` is unset.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const REF: &str = "https://arxiv.org/abs/1811.11242";

    #[test]
    fn test_cli_reference_only_parses_successfully() {
        let args = Args::try_parse_from(["paperfetch", REF]).unwrap();
        assert_eq!(args.reference, REF);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.no_upload);
        assert!(args.output_dir.is_none());
        assert!(args.max_retries.is_none());
    }

    #[test]
    fn test_cli_missing_reference_is_error() {
        let err = Args::try_parse_from(["paperfetch"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["paperfetch", "-vv", REF]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.default_log_level(), "trace");

        let args = Args::try_parse_from(["paperfetch", "--verbose", REF]).unwrap();
        assert_eq!(args.default_log_level(), "debug");
    }

    #[test]
    fn test_cli_quiet_wins_over_verbose() {
        let args = Args::try_parse_from(["paperfetch", "-q", "-v", REF]).unwrap();
        assert_eq!(args.default_log_level(), "error");
    }

    #[test]
    fn test_cli_max_retries_range() {
        let args = Args::try_parse_from(["paperfetch", "--max-retries", "10", REF]).unwrap();
        assert_eq!(args.max_retries, Some(10));

        for bad in ["0", "11"] {
            let err = Args::try_parse_from(["paperfetch", "--max-retries", bad, REF]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn test_cli_flags_override_config() {
        let args = Args::try_parse_from([
            "paperfetch",
            "-o",
            "/tmp/out",
            "-f",
            "paper.pdf",
            "-n",
            "-u",
            "my-uploader",
            "-r",
            "/Papers",
            "--max-retries",
            "5",
            REF,
        ])
        .unwrap();

        let mut config = PipelineConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.filename.as_deref(), Some("paper.pdf"));
        assert!(config.dry_run);
        assert_eq!(config.upload.program, "my-uploader");
        assert_eq!(config.upload.remote_dir.as_deref(), Some("/Papers"));
        assert_eq!(config.retry.max_attempts(), 5);
    }

    #[test]
    fn test_cli_absent_flags_keep_config_values() {
        let args = Args::try_parse_from(["paperfetch", REF]).unwrap();
        let mut config = PipelineConfig {
            output_dir: PathBuf::from("/srv/papers"),
            ..PipelineConfig::default()
        };
        config.upload.remote_dir = Some("/Inbox".to_string());
        args.apply_to(&mut config);
        assert_eq!(config.output_dir, PathBuf::from("/srv/papers"));
        assert_eq!(config.upload.remote_dir.as_deref(), Some("/Inbox"));
        assert!(!config.dry_run);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["paperfetch", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
