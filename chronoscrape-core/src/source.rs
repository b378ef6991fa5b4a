//! Seams between the page cursor and the services it reads from.

use crate::error::Result;
use crate::types::{DateRange, Item, LiveIndex, SortDirection};
use async_trait::async_trait;

/// Kind prefix Reddit uses for links/submissions.
pub const SUBMISSION_KIND: &str = "t3";

pub fn fullname(id: &str) -> String {
    format!("{}_{}", SUBMISSION_KIND, id)
}

/// One archive search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub subreddit: String,
    pub sort: SortDirection,
    pub size: usize,
    pub before: i64,
    pub after: i64,
}

impl PageRequest {
    /// Anchors the moving edge of the window at `cursor`. The other edge stays
    /// at the far boundary of `range`.
    pub fn for_cursor(
        subreddit: &str,
        range: &DateRange,
        sort: SortDirection,
        size: usize,
        cursor: i64,
    ) -> Self {
        let (before, after) = match sort {
            SortDirection::Desc => (cursor, range.start),
            SortDirection::Asc => (range.end, cursor),
        };
        Self {
            subreddit: subreddit.to_string(),
            sort,
            size,
            before,
            after,
        }
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("subreddit", self.subreddit.clone()),
            ("sort", self.sort.to_string()),
            ("size", self.size.to_string()),
            ("before", self.before.to_string()),
            ("after", self.after.to_string()),
            ("sort_type", "created_utc".to_string()),
        ]
    }
}

/// A time-ordered archive of submissions.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Returns the page for `request`. An empty page means the window is exhausted.
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<Item>>;
}

/// The platform's live API.
#[async_trait]
pub trait LiveLookup: Send + Sync {
    /// Looks up submissions by fullname. Unresolvable names are simply absent
    /// from the returned index.
    async fn lookup(&self, fullnames: &[String]) -> Result<LiveIndex>;
}
