pub mod config;
pub mod cursor;
pub mod error;
pub mod error_utils;
pub mod merge;
pub mod output;
pub mod source;
pub mod types;

pub use config::RedditCredentials;
pub use cursor::{scrape_subreddit, PageCursor, ScrapeOutcome, ScrapeRequest};
pub use error::*;
pub use error_utils::*;
pub use source::{fullname, ArchiveSource, LiveLookup, PageRequest, SUBMISSION_KIND};
pub use types::*;
