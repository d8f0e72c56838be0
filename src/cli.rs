//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use fdroidswh::{DEFAULT_CONCURRENCY, DEFAULT_INDEX_URL};

/// Validate F-Droid source repositories and submit them to Software Heritage.
///
/// fdroidswh reads the F-Droid package index, probes each referenced source
/// repository for git smart-HTTP reachability, and asks the Software
/// Heritage archive to save the reachable ones. Successes are recorded so a
/// rerun skips them.
#[derive(Parser, Debug)]
#[command(name = "fdroidswh")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Redownload the package index even if the cached copy looks current
    #[arg(long)]
    pub refresh: bool,

    /// Only write the worklist file; do not submit anything
    #[arg(long)]
    pub list_only: bool,

    /// Software Heritage API bearer token (falls back to SWH_TOKEN)
    #[arg(long, value_name = "TOKEN")]
    pub swh_token: Option<String>,

    /// Maximum concurrent submissions (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Progress ledger recording successfully submitted repository URLs
    #[arg(long, default_value = "success_repos.txt")]
    pub ledger: PathBuf,

    /// Package index URL
    #[arg(long, default_value = DEFAULT_INDEX_URL)]
    pub index_url: String,

    /// Local cache path for the package index
    #[arg(long, default_value = "index-v2.json")]
    pub index_cache: PathBuf,

    /// Output path for the extracted worklist
    #[arg(long, default_value = "sourceCodes.txt")]
    pub worklist_out: PathBuf,
}

impl Args {
    /// Resolves the bearer token from the flag or the SWH_TOKEN environment
    /// variable; blank values count as absent.
    #[must_use]
    pub fn resolve_token(&self) -> Option<String> {
        self.swh_token
            .clone()
            .or_else(|| std::env::var("SWH_TOKEN").ok())
            .filter(|token| !token.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["fdroidswh"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.refresh);
        assert!(!args.list_only);
        assert_eq!(args.concurrency, 10); // DEFAULT_CONCURRENCY
        assert_eq!(args.ledger, PathBuf::from("success_repos.txt"));
        assert_eq!(args.index_cache, PathBuf::from("index-v2.json"));
        assert_eq!(args.worklist_out, PathBuf::from("sourceCodes.txt"));
        assert_eq!(args.index_url, DEFAULT_INDEX_URL);
        assert!(args.swh_token.is_none());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["fdroidswh", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["fdroidswh", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["fdroidswh", "-q"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_refresh_and_list_only_flags() {
        let args = Args::try_parse_from(["fdroidswh", "--refresh", "--list-only"]).unwrap();
        assert!(args.refresh);
        assert!(args.list_only);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        // --help causes early exit, so we check it returns an error with Help kind
        let result = Args::try_parse_from(["fdroidswh", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let result = Args::try_parse_from(["fdroidswh", "--invalid-flag"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    // ==================== Concurrency Tests ====================

    #[test]
    fn test_cli_concurrency_short_flag() {
        let args = Args::try_parse_from(["fdroidswh", "-c", "5"]).unwrap();
        assert_eq!(args.concurrency, 5);
    }

    #[test]
    fn test_cli_concurrency_long_flag() {
        let args = Args::try_parse_from(["fdroidswh", "--concurrency", "20"]).unwrap();
        assert_eq!(args.concurrency, 20);
    }

    #[test]
    fn test_cli_concurrency_zero_rejected() {
        let result = Args::try_parse_from(["fdroidswh", "-c", "0"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_concurrency_over_max_rejected() {
        let result = Args::try_parse_from(["fdroidswh", "-c", "101"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    // ==================== Token Tests ====================

    #[test]
    fn test_cli_token_flag_wins() {
        let args = Args::try_parse_from(["fdroidswh", "--swh-token", "abc123"]).unwrap();
        assert_eq!(args.resolve_token().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_cli_blank_token_counts_as_absent() {
        let args = Args::try_parse_from(["fdroidswh", "--swh-token", "   "]).unwrap();
        assert_eq!(args.resolve_token(), None);
    }

    // ==================== Path Tests ====================

    #[test]
    fn test_cli_path_overrides() {
        let args = Args::try_parse_from([
            "fdroidswh",
            "--ledger",
            "/tmp/ledger.txt",
            "--index-cache",
            "/tmp/index.json",
            "--worklist-out",
            "/tmp/repos.txt",
            "--index-url",
            "http://127.0.0.1:9999/index-v2.json",
        ])
        .unwrap();
        assert_eq!(args.ledger, PathBuf::from("/tmp/ledger.txt"));
        assert_eq!(args.index_cache, PathBuf::from("/tmp/index.json"));
        assert_eq!(args.worklist_out, PathBuf::from("/tmp/repos.txt"));
        assert_eq!(args.index_url, "http://127.0.0.1:9999/index-v2.json");
    }
}
