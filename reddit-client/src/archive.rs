use async_trait::async_trait;
use chronoscrape_core::{ArchiveError, ArchiveSource, CoreError, Item, PageRequest};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

pub const PUSHSHIFT_API_BASE: &str = "https://api.pushshift.io";
const SUBMISSION_SEARCH_PATH: &str = "reddit/search/submission";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<Item>,
}

/// Client for the Pushshift submission search endpoint.
#[derive(Debug, Clone)]
pub struct PushshiftClient {
    http_client: Client,
    search_url: Url,
}

impl PushshiftClient {
    pub fn new(user_agent: &str) -> Result<Self, CoreError> {
        Self::with_base_url(PUSHSHIFT_API_BASE, user_agent)
    }

    pub fn with_base_url(base_url: &str, user_agent: &str) -> Result<Self, CoreError> {
        let search_url = join_path(base_url, SUBMISSION_SEARCH_PATH)?;

        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            search_url,
        })
    }

    pub fn search_url(&self) -> &Url {
        &self.search_url
    }

    pub async fn search_submissions(&self, request: &PageRequest) -> Result<Vec<Item>, CoreError> {
        debug!(
            subreddit = %request.subreddit,
            before = request.before,
            after = request.after,
            "Querying archive"
        );

        let response = self
            .http_client
            .get(self.search_url.clone())
            .query(&request.query_params())
            .send()
            .await
            .map_err(|e| {
                error!("Network error querying archive for r/{}: {}", request.subreddit, e);
                CoreError::Network(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(
                "Archive search failed with status: {} for r/{}",
                status, request.subreddit
            );
            return Err(ArchiveError::Status {
                status_code: status.as_u16(),
                subreddit: request.subreddit.clone(),
            }
            .into());
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            error!("Failed to parse archive response: {}", e);
            ArchiveError::InvalidResponse {
                details: format!("Failed to parse search results for r/{}: {}", request.subreddit, e),
            }
        })?;

        info!(
            "Retrieved {} posts from the archive for r/{}",
            body.data.len(),
            request.subreddit
        );
        Ok(body.data)
    }
}

#[async_trait]
impl ArchiveSource for PushshiftClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<Item>, CoreError> {
        self.search_submissions(request).await
    }
}

/// Appends `path` to `base`, keeping any path prefix `base` already has.
pub(crate) fn join_path(base: &str, path: &str) -> Result<Url, CoreError> {
    let normalized = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    Url::parse(&normalized)
        .and_then(|url| url.join(path))
        .map_err(|e| CoreError::InvalidInput {
            message: format!("invalid base URL '{}': {}", base, e),
        })
}
