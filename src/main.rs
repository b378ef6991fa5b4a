mod cli;

use chronoscrape_core::config::default_user_agent;
use chronoscrape_core::output::{ensure_writable, output_path, write_items};
use chronoscrape_core::{
    scrape_subreddit, CoreError, DateRange, ErrorExt, ErrorReporter, FieldWhitelist,
    RedditCredentials, ScrapeRequest,
};
use clap::Parser;
use cli::Cli;
use reddit_client::{PushshiftClient, RedditApiClient};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "chronoscrape=info,chronoscrape_core=info,reddit_client=info";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let reporter = ErrorReporter::new();

    match run(&cli, &reporter).await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            eprintln!("{} subreddit(s) could not be scraped.", failed);
            ExitCode::FAILURE
        }
        Err(e) => {
            reporter.report_error(&e);
            eprintln!("{}", e.user_friendly_message());
            ExitCode::FAILURE
        }
    }
}

/// Validates everything that can be checked offline, then scrapes each
/// subreddit in turn. Returns the number of subreddits that failed.
async fn run(cli: &Cli, reporter: &ErrorReporter) -> Result<usize, CoreError> {
    let range = cli.date_range()?;
    let subreddits = cli.subreddits()?;
    let whitelist = cli.whitelist()?;

    let mut targets = Vec::with_capacity(subreddits.len());
    for subreddit in subreddits {
        let path = output_path(&cli.output_dir, &subreddit, &range)?;
        ensure_writable(&path, cli.overwrite)?;
        targets.push((subreddit, path));
    }

    let credentials = if cli.update {
        Some(RedditCredentials::load(&cli.credentials)?)
    } else {
        None
    };
    let user_agent = credentials
        .as_ref()
        .map(RedditCredentials::user_agent)
        .unwrap_or_else(default_user_agent);

    let archive = PushshiftClient::with_base_url(&cli.archive_url, &user_agent)?;
    tracing::debug!(endpoint = %archive.search_url(), "Archive client ready");

    let mut failed = 0;
    for (subreddit, path) in &targets {
        let result = scrape_to_file(
            cli,
            &archive,
            credentials.as_ref(),
            subreddit,
            range,
            whitelist.as_ref(),
            path,
        )
        .await;

        if let Err(e) = result {
            reporter.report_error(&e);
            eprintln!("Failed to scrape r/{}: {}", subreddit, e.user_friendly_message());
            failed += 1;
        }
    }

    Ok(failed)
}

async fn scrape_to_file(
    cli: &Cli,
    archive: &PushshiftClient,
    credentials: Option<&RedditCredentials>,
    subreddit: &str,
    range: DateRange,
    whitelist: Option<&FieldWhitelist>,
    path: &Path,
) -> Result<(), CoreError> {
    tracing::info!("Scraping {}", subreddit);

    // A fresh session per subreddit so long runs don't outlive the token
    let live = match credentials {
        Some(credentials) => Some(RedditApiClient::login(credentials.clone()).await?),
        None => None,
    };

    let request = ScrapeRequest::new(subreddit, range)
        .with_count(cli.count())
        .with_sort(cli.sort)
        .with_enrichment(live.is_some())
        .with_whitelist(whitelist.cloned());

    let outcome = scrape_subreddit(archive, live.as_ref(), &request).await?;
    write_items(path, &outcome.items)?;

    tracing::info!(
        cursor = outcome.cursor,
        "Downloaded {} posts from {}.",
        outcome.items.len(),
        subreddit
    );
    Ok(())
}
