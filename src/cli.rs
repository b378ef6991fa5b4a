use chrono::{NaiveDate, Utc};
use chronoscrape_core::config::read_list_file;
use chronoscrape_core::{
    parse_date, ConfigError, CoreError, DateRange, FieldWhitelist, SortDirection,
};
use clap::{ArgGroup, Parser};
use reddit_client::PUSHSHIFT_API_BASE;
use std::collections::HashSet;
use std::path::PathBuf;

/// Start date used when none is given; predates the archive.
const EARLIEST_DATE: (i32, u32, u32) = (2000, 1, 1);

#[derive(Parser, Debug)]
#[command(name = "chronoscrape")]
#[command(about = "Chronologically scrape reddit submissions from the Pushshift archive")]
#[command(version)]
#[command(group(ArgGroup::new("target").required(true).args(["sub", "sub_list"])))]
pub struct Cli {
    /// Subreddit to scrape (e.g. "me_irl")
    #[arg(long)]
    pub sub: Option<String>,

    /// File with one subreddit name per line to scrape
    #[arg(long, alias = "sub_list")]
    pub sub_list: Option<PathBuf>,

    /// File with one field per line to keep from posts. Keeps all fields if omitted.
    #[arg(long, alias = "field_list")]
    pub field_list: Option<PathBuf>,

    /// Start date in YYYY-MM-DD format (starts at 00:00:00 UTC)
    #[arg(long, alias = "start_date", value_parser = parse_date_arg)]
    pub start_date: Option<NaiveDate>,

    /// End date in YYYY-MM-DD format (ends at 23:59:59 UTC)
    #[arg(long, alias = "end_date", value_parser = parse_date_arg)]
    pub end_date: Option<NaiveDate>,

    /// Number of posts to download per subreddit. Whole pages are kept, so
    /// the result can be slightly larger.
    #[arg(long, default_value_t = 1000, conflicts_with = "unlimited")]
    pub count: usize,

    /// Download every post in the date range
    #[arg(long)]
    pub unlimited: bool,

    /// Walk the range newest first (desc) or oldest first (asc)
    #[arg(long, default_value = "desc")]
    pub sort: SortDirection,

    /// Refresh volatile fields (score, comments, locks) from the live Reddit API
    #[arg(long)]
    pub update: bool,

    /// TOML file with Reddit API credentials, used with --update
    #[arg(long, default_value = "reddit.toml")]
    pub credentials: PathBuf,

    /// Directory the JSON files are written to
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Replace output files that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Base URL of the archive API
    #[arg(long, env = "ARCHIVE_BASE_URL", default_value = PUSHSHIFT_API_BASE)]
    pub archive_url: String,
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).map_err(|e| e.to_string())
}

impl Cli {
    pub fn subreddits(&self) -> Result<Vec<String>, CoreError> {
        let subreddits = match (&self.sub_list, &self.sub) {
            (Some(path), _) => read_list_file(path)?,
            (None, Some(sub)) => vec![sub.trim().to_string()],
            (None, None) => Vec::new(),
        };

        // Subreddit names are case-insensitive and each one maps to a single
        // output file, so repeats are dropped.
        let mut seen = HashSet::new();
        let subreddits: Vec<String> = subreddits
            .into_iter()
            .map(|s| s.trim_start_matches("r/").to_string())
            .filter(|s| !s.is_empty())
            .filter(|s| {
                let fresh = seen.insert(s.to_lowercase());
                if !fresh {
                    tracing::warn!("Skipping repeated subreddit {}", s);
                }
                fresh
            })
            .collect();

        if subreddits.is_empty() {
            return Err(CoreError::InvalidInput {
                message: "You must provide either --sub or --sub-list.".to_string(),
            });
        }
        Ok(subreddits)
    }

    pub fn whitelist(&self) -> Result<Option<FieldWhitelist>, CoreError> {
        match &self.field_list {
            Some(path) => {
                let whitelist = FieldWhitelist::new(read_list_file(path)?);
                if whitelist.is_empty() {
                    return Err(ConfigError::ValidationFailed {
                        reason: format!("{} does not list any fields", path.display()),
                    }
                    .into());
                }
                Ok(Some(whitelist))
            }
            None => Ok(None),
        }
    }

    pub fn date_range(&self) -> Result<DateRange, ConfigError> {
        let (y, m, d) = EARLIEST_DATE;
        let start = self
            .start_date
            .or_else(|| NaiveDate::from_ymd_opt(y, m, d))
            .unwrap_or_default();
        let end = self.end_date.unwrap_or_else(|| Utc::now().date_naive());
        DateRange::from_dates(start, end)
    }

    pub fn count(&self) -> Option<usize> {
        if self.unlimited {
            None
        } else {
            Some(self.count)
        }
    }
}
