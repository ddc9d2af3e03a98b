use crate::config::{MirrorConfig, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT};
use clap::builder::TypedValueParser;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "page-mirror",
    about = "Mirror a single web page into an offline copy",
    version,
    long_about = "Downloads one page, consolidates its stylesheets into style.css, downloads every referenced image, font and script into assets/, and rewrites all references to local paths."
)]
pub struct MirrorCommand {
    /// The URL of the page to mirror (https:// is assumed when missing)
    #[arg(required = true)]
    pub url: String,

    /// Output directory; defaults to the site's hostname. A numeric suffix is added if it exists
    #[arg(short, long)]
    pub outdir: Option<PathBuf>,

    /// User agent string to use for requests
    #[arg(long = "ua", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Timeout for each request in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout: u64,

    /// Maximum concurrent asset downloads
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY, value_parser = clap::value_parser!(u16).range(1..).map(usize::from))]
    pub concurrency: usize,

    /// Log every request
    #[arg(short, long)]
    pub verbose: bool,

    /// Show a progress bar while downloading assets
    #[arg(long)]
    pub progress: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl From<&MirrorCommand> for MirrorConfig {
    fn from(args: &MirrorCommand) -> Self {
        MirrorConfig {
            url: args.url.clone(),
            outdir: args.outdir.clone(),
            user_agent: args.user_agent.clone(),
            timeout_ms: args.timeout,
            concurrency: args.concurrency,
            verbose: args.verbose,
            show_progress: args.progress && !args.json,
            ..MirrorConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_args() {
        let args = MirrorCommand::try_parse_from(["page-mirror", "example.com"]).unwrap();

        assert_eq!(args.url, "example.com");
        assert_eq!(args.outdir, None);
        assert_eq!(args.timeout, 20_000);
        assert_eq!(args.concurrency, 8);
        assert_eq!(args.user_agent, DEFAULT_USER_AGENT);
        assert!(!args.verbose);
        assert!(!args.json);
    }

    #[test]
    fn test_parse_all_args() {
        let args = MirrorCommand::try_parse_from([
            "page-mirror",
            "https://example.com",
            "-o",
            "./output",
            "--ua",
            "TestAgent/1.0",
            "--timeout",
            "5000",
            "-c",
            "3",
            "-v",
            "--json",
        ])
        .unwrap();

        assert_eq!(args.outdir, Some(PathBuf::from("./output")));
        assert_eq!(args.user_agent, "TestAgent/1.0");
        assert_eq!(args.timeout, 5000);
        assert_eq!(args.concurrency, 3);
        assert!(args.verbose);
        assert!(args.json);
    }

    #[test]
    fn test_parse_missing_url() {
        let result = MirrorCommand::try_parse_from(["page-mirror", "-o", "./output"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_invalid_concurrency() {
        let result = MirrorCommand::try_parse_from(["page-mirror", "https://example.com", "-c", "0"]);
        assert!(result.is_err());
        let result = MirrorCommand::try_parse_from(["page-mirror", "https://example.com", "-c", "many"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_into_config() {
        let args = MirrorCommand::try_parse_from([
            "page-mirror",
            "example.com",
            "--timeout",
            "1500",
            "--progress",
        ])
        .unwrap();
        let config = MirrorConfig::from(&args);
        assert_eq!(config.url, "example.com");
        assert_eq!(config.timeout_ms, 1500);
        assert_eq!(config.external_import_depth, 2);
        assert!(config.show_progress);
    }
}
