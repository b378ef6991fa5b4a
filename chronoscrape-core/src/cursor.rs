//! Chronological page cursor.
//!
//! The archive paginates by time window with a fixed page size and no
//! continuation token, so the window is re-anchored at the timestamp of the
//! last item actually seen. Items that share a boundary timestamp can show up
//! on two consecutive pages; they are emitted once, keyed by post id.

use crate::error::{CoreError, Result};
use crate::merge::{apply_live_fields, created_utc, item_id, keep_whitelisted_fields};
use crate::source::{fullname, ArchiveSource, LiveLookup, PageRequest};
use crate::types::{
    DateRange, FieldWhitelist, Item, LiveIndex, SortDirection, VolatileFields, PAGE_SIZE,
};
use std::collections::HashSet;
use tracing::{debug, info, warn};

const PROGRESS_INTERVAL: usize = 500;

#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub subreddit: String,
    pub range: DateRange,
    /// Advisory target. Checked between pages, so the last page may overshoot.
    pub count: Option<usize>,
    pub page_size: usize,
    pub sort: SortDirection,
    pub enrich: bool,
    pub whitelist: Option<FieldWhitelist>,
    pub volatile_fields: VolatileFields,
}

impl ScrapeRequest {
    pub fn new(subreddit: impl Into<String>, range: DateRange) -> Self {
        Self {
            subreddit: subreddit.into(),
            range,
            count: None,
            page_size: PAGE_SIZE,
            sort: SortDirection::default(),
            enrich: false,
            whitelist: None,
            volatile_fields: VolatileFields::default(),
        }
    }

    pub fn with_count(mut self, count: Option<usize>) -> Self {
        self.count = count;
        self
    }

    pub fn with_sort(mut self, sort: SortDirection) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_enrichment(mut self, enrich: bool) -> Self {
        self.enrich = enrich;
        self
    }

    pub fn with_whitelist(mut self, whitelist: Option<FieldWhitelist>) -> Self {
        self.whitelist = whitelist;
        self
    }

    pub fn with_volatile_fields(mut self, fields: VolatileFields) -> Self {
        self.volatile_fields = fields;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub items: Vec<Item>,
    /// Timestamp of the last item seen, or the seed boundary if none were.
    pub cursor: i64,
    pub pages: usize,
    pub duplicates_skipped: usize,
    /// Items the live API did not return; they keep their archived values.
    pub unresolved: usize,
}

/// The moving edge of the request window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    position: i64,
    sort: SortDirection,
}

impl PageCursor {
    /// Descending scrapes start at the newest edge and walk back in time,
    /// ascending scrapes start at the oldest edge and walk forward.
    pub fn seed(range: &DateRange, sort: SortDirection) -> Self {
        let position = match sort {
            SortDirection::Desc => range.end,
            SortDirection::Asc => range.start,
        };
        Self { position, sort }
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn advance(&mut self, created_utc: i64) {
        self.position = created_utc;
    }

    pub fn request(&self, subreddit: &str, range: &DateRange, size: usize) -> PageRequest {
        PageRequest::for_cursor(subreddit, range, self.sort, size, self.position)
    }
}

/// Pages through the archive for one subreddit, merging live fields when
/// `request.enrich` is set. Any source failure aborts the scrape.
pub async fn scrape_subreddit<A, L>(
    archive: &A,
    live: Option<&L>,
    request: &ScrapeRequest,
) -> Result<ScrapeOutcome>
where
    A: ArchiveSource + ?Sized,
    L: LiveLookup + ?Sized,
{
    let live = match (request.enrich, live) {
        (true, Some(live)) => Some(live),
        (true, None) => {
            return Err(CoreError::InvalidInput {
                message: "enrichment requested without a live API session".to_string(),
            })
        }
        (false, _) => None,
    };

    if request.page_size == 0 {
        return Err(CoreError::InvalidInput {
            message: "page size must be at least 1".to_string(),
        });
    }

    info!(
        subreddit = %request.subreddit,
        start = request.range.start,
        end = request.range.end,
        sort = %request.sort,
        enrich = request.enrich,
        "Scraping subreddit"
    );

    let mut cursor = PageCursor::seed(&request.range, request.sort);
    let mut seen: HashSet<String> = HashSet::new();
    let mut outcome = ScrapeOutcome {
        items: Vec::new(),
        cursor: cursor.position(),
        pages: 0,
        duplicates_skipped: 0,
        unresolved: 0,
    };

    while request.count.map_or(true, |count| outcome.items.len() < count) {
        let page_request = cursor.request(&request.subreddit, &request.range, request.page_size);
        debug!(
            before = page_request.before,
            after = page_request.after,
            "Requesting archive page"
        );

        let page = archive.fetch_page(&page_request).await?;
        if page.is_empty() {
            debug!(subreddit = %request.subreddit, "Archive returned an empty page");
            break;
        }
        outcome.pages += 1;

        let position_before = cursor.position();
        let mut fresh = Vec::with_capacity(page.len());
        for item in page {
            let id = item_id(&item)?;
            cursor.advance(created_utc(&item)?);
            if seen.insert(id.clone()) {
                fresh.push((id, item));
            } else {
                outcome.duplicates_skipped += 1;
            }
        }

        if fresh.is_empty() && cursor.position() == position_before {
            warn!(
                subreddit = %request.subreddit,
                cursor = cursor.position(),
                "Page contained only posts already seen and the cursor did not move, stopping"
            );
            break;
        }

        let live_index = match live {
            Some(live) => {
                let fullnames: Vec<String> = fresh.iter().map(|(id, _)| fullname(id)).collect();
                live.lookup(&fullnames).await?
            }
            None => LiveIndex::new(),
        };

        for (id, item) in fresh {
            let mut item = match &request.whitelist {
                Some(whitelist) => keep_whitelisted_fields(item, whitelist),
                None => item,
            };

            if live.is_some() {
                match live_index.get(&fullname(&id)) {
                    Some(submission) => {
                        let updated =
                            apply_live_fields(&mut item, submission, &request.volatile_fields);
                        debug!(id = %id, updated, "Merged live fields");
                    }
                    None => {
                        debug!(id = %id, "Live API did not return post, keeping archived values");
                        outcome.unresolved += 1;
                    }
                }
            }

            outcome.items.push(item);
            if outcome.items.len() % PROGRESS_INTERVAL == 0 {
                info!("Downloaded {} posts so far", outcome.items.len());
            }
        }

        debug!(
            pages = outcome.pages,
            cursor = cursor.position(),
            total = outcome.items.len(),
            "Processed archive page"
        );
    }

    outcome.cursor = cursor.position();

    if outcome.unresolved > 0 {
        warn!(
            subreddit = %request.subreddit,
            unresolved = outcome.unresolved,
            "Some posts could not be refreshed from the live API"
        );
    }
    info!(
        subreddit = %request.subreddit,
        posts = outcome.items.len(),
        pages = outcome.pages,
        duplicates = outcome.duplicates_skipped,
        "Finished scraping subreddit"
    );

    Ok(outcome)
}
