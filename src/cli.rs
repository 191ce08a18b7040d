//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Scrape short video clips from configured web sources.
///
/// Clip scraper walks HTML galleries, JSON feeds and video search backends
/// defined in a JSON config file, filters the discovered media and downloads
/// it into a local collection, with an optional upscaling pass afterwards.
#[derive(Parser, Debug)]
#[command(name = "clipscraper")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Directory where downloaded clips are stored
    #[arg(short, long, default_value = "downloads")]
    pub output: PathBuf,

    /// Path to the JSON config file (created with defaults if missing)
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Subdirectory under the output directory for this run
    #[arg(long)]
    pub category: Option<String>,

    /// Maximum downloads for this run (0 for unlimited), overriding the config
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Override the video-search query (a search source is added if none is configured)
    #[arg(short, long)]
    pub search: Option<String>,

    /// Reject images and GIFs outright instead of capping them
    #[arg(long)]
    pub prefer_video: bool,

    /// Run the enhancement pass over this run's downloads
    #[arg(short, long)]
    pub enhance: bool,

    /// Only enhance existing clips in the given directory, skipping scraping
    #[arg(long, value_name = "DIR")]
    pub enhance_only: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["clipscraper"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.output, PathBuf::from("downloads"));
        assert_eq!(args.config, PathBuf::from("config.json"));
        assert_eq!(args.limit, None);
        assert!(!args.prefer_video);
        assert!(!args.enhance);
        assert!(args.enhance_only.is_none());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["clipscraper", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["clipscraper", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["clipscraper", "-q"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_output_and_config_flags() {
        let args =
            Args::try_parse_from(["clipscraper", "-o", "clips", "-c", "my.json"]).unwrap();
        assert_eq!(args.output, PathBuf::from("clips"));
        assert_eq!(args.config, PathBuf::from("my.json"));
    }

    #[test]
    fn test_cli_limit_flag() {
        let args = Args::try_parse_from(["clipscraper", "-l", "25"]).unwrap();
        assert_eq!(args.limit, Some(25));

        let args = Args::try_parse_from(["clipscraper", "--limit", "0"]).unwrap();
        assert_eq!(args.limit, Some(0));
    }

    #[test]
    fn test_cli_search_flag() {
        let args = Args::try_parse_from(["clipscraper", "-s", "mecha fight scenes"]).unwrap();
        assert_eq!(args.search.as_deref(), Some("mecha fight scenes"));
    }

    #[test]
    fn test_cli_category_flag() {
        let args = Args::try_parse_from(["clipscraper", "--category", "action"]).unwrap();
        assert_eq!(args.category.as_deref(), Some("action"));
    }

    #[test]
    fn test_cli_enhance_flags() {
        let args = Args::try_parse_from(["clipscraper", "-e"]).unwrap();
        assert!(args.enhance);

        let args =
            Args::try_parse_from(["clipscraper", "--enhance-only", "downloads"]).unwrap();
        assert_eq!(args.enhance_only, Some(PathBuf::from("downloads")));
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        // --help causes early exit, so we check it returns an error with Help kind
        let result = Args::try_parse_from(["clipscraper", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let result = Args::try_parse_from(["clipscraper", "--invalid-flag"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
