//! Command-line interface definitions for News Harvest.
//!
//! All limits have defaults, so a bare `news_harvest` processes the default
//! sites file with the default fan-out.

use crate::config::{DEFAULT_USER_AGENT, HttpConfig, RunLimits};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the News Harvest application.
///
/// # Examples
///
/// ```sh
/// # Default limits, default sites file
/// news_harvest
///
/// # Wider fan-out and a YAML site list
/// news_harvest -s conf/sites.yaml -c 20 --site-concurrency 8
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Feed or sitemap URLs processed per site
    #[arg(short, long, default_value_t = 2)]
    pub feeds_per_site: usize,

    /// Candidate articles kept per feed, sitemap or listing page
    #[arg(short, long, default_value_t = 3)]
    pub articles_per_feed: usize,

    /// Articles extracted concurrently within one site
    #[arg(short, long, default_value_t = 10)]
    pub concurrency: usize,

    /// Sites processed concurrently
    #[arg(long, default_value_t = 4)]
    pub site_concurrency: usize,

    /// Site list (.json, .yaml or .yml)
    #[arg(short, long, env = "NEWS_HARVEST_SITES", default_value = "feed/conf/sites.json")]
    pub sites_file: PathBuf,

    /// JSON file the articles are stored in
    #[arg(short, long, default_value = "data/articles.json")]
    pub output: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[arg(long, env = "NEWS_HARVEST_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Harvest into memory only; the output file is neither read nor written
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    pub fn limits(&self) -> RunLimits {
        RunLimits {
            feeds_per_site: self.feeds_per_site,
            articles_per_feed: self.articles_per_feed,
            concurrency: self.concurrency,
            site_concurrency: self.site_concurrency,
        }
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            ..HttpConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["news_harvest"]);

        assert_eq!(cli.feeds_per_site, 2);
        assert_eq!(cli.articles_per_feed, 3);
        assert_eq!(cli.concurrency, 10);
        assert_eq!(cli.site_concurrency, 4);
        assert_eq!(cli.output, PathBuf::from("data/articles.json"));
        assert_eq!(cli.timeout_secs, 30);
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "news_harvest",
            "--feeds-per-site",
            "5",
            "--articles-per-feed",
            "7",
            "--sites-file",
            "conf/sites.yaml",
            "--timeout-secs",
            "5",
            "--dry-run",
        ]);

        assert_eq!(cli.limits().feeds_per_site, 5);
        assert_eq!(cli.limits().articles_per_feed, 7);
        assert_eq!(cli.sites_file, PathBuf::from("conf/sites.yaml"));
        assert_eq!(cli.http_config().timeout, Duration::from_secs(5));
        assert!(cli.dry_run);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "news_harvest",
            "-f",
            "1",
            "-a",
            "2",
            "-c",
            "3",
            "-o",
            "/tmp/out.json",
        ]);

        assert_eq!(cli.feeds_per_site, 1);
        assert_eq!(cli.articles_per_feed, 2);
        assert_eq!(cli.concurrency, 3);
        assert_eq!(cli.output, PathBuf::from("/tmp/out.json"));
    }
}
