//! Daemon configuration: CLI flags with environment fallbacks.

use crate::table::PageSize;
use clap::Parser;
use std::time::Duration;

/// rosterd - view-model daemon for the school administration console
///
/// Reads one JSON request per line on stdin and answers on stdout.
#[derive(Parser, Debug, Clone)]
#[command(name = "rosterd")]
#[command(about = "Paginated CRUD screens for the school administration console, over stdin/stdout")]
pub struct Args {
    /// Base URL of the REST backend, including the API prefix
    #[arg(long, env = "ROSTERD_BASE_URL", default_value = "http://localhost:5000/api")]
    pub base_url: String,

    /// Per-request timeout in milliseconds
    #[arg(long, env = "ROSTERD_TIMEOUT_MS", default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Rows per page when a screen opens
    #[arg(long, env = "ROSTERD_PAGE_SIZE", default_value_t = 5)]
    pub page_size: usize,

    /// Post an activity-log entry after confirmed changes on resources that keep one
    #[arg(long, env = "ROSTERD_ACTIVITY_LOG", default_value_t = true, action = clap::ArgAction::Set)]
    pub activity_log: bool,

    /// Log level used when RUST_LOG is not set (logs go to stderr)
    #[arg(long, env = "ROSTERD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn validate(&self) -> Result<(), String> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("ROSTERD_BASE_URL must be an http(s) URL, got {url:?}"));
        }
        if self.page_size == 0 {
            return Err("ROSTERD_PAGE_SIZE must be greater than zero".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("ROSTERD_TIMEOUT_MS must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn default_page_size(&self) -> PageSize {
        PageSize::rows(self.page_size).unwrap_or(PageSize::All)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let args = Args::parse_from(["rosterd"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.timeout(), Duration::from_secs(30));
        assert_eq!(args.default_page_size(), PageSize::rows(5).expect("five"));
        assert!(args.activity_log);
    }

    #[test]
    fn rejects_bad_values() {
        let args = Args::parse_from(["rosterd", "--base-url", "ftp://x", "--page-size", "3"]);
        assert!(args.validate().is_err());
        let args = Args::parse_from(["rosterd", "--page-size", "0"]);
        assert!(args.validate().is_err());
        let args = Args::parse_from(["rosterd", "--activity-log", "false"]);
        assert!(!args.activity_log);
    }
}
