use crate::archive::join_path;
use crate::auth::{RedditAuthenticator, RedditToken};
use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use async_trait::async_trait;
use chronoscrape_core::{
    fullname, CoreError, LiveIndex, LiveLookup, LiveSubmission, RedditApiError, RedditCredentials,
    SUBMISSION_KIND,
};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

/// Largest number of fullnames `/api/info` accepts per call.
pub const INFO_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
    token: RedditToken,
}

impl RedditApiClient {
    pub fn new(user_agent: &str, token: RedditToken) -> Result<Self, CoreError> {
        Self::with_base_url(REDDIT_API_BASE, user_agent, token, RateLimitConfig::reddit_oauth())
    }

    pub fn with_base_url(
        base_url: &str,
        user_agent: &str,
        token: RedditToken,
        rate_config: RateLimitConfig,
    ) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(rate_config)),
            base_url: base_url.to_string(),
            token,
        })
    }

    /// Logs in with `credentials` and returns a client bound to the new token.
    pub async fn login(credentials: RedditCredentials) -> Result<Self, CoreError> {
        let user_agent = credentials.user_agent();
        let token = RedditAuthenticator::new(credentials)?.login().await?;
        Self::new(&user_agent, token)
    }

    pub async fn make_request(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Response, CoreError> {
        let url = join_path(&self.base_url, endpoint.trim_start_matches('/'))?;

        if self.token.is_expired() {
            warn!("Reddit access token has expired, request will likely be rejected");
        }

        let waited = self.rate_limiter.acquire_permit().await;
        if !waited.is_zero() {
            debug!("Waited {:?} for rate limit permit", waited);
        }

        info!("Making Reddit API request: GET {}", endpoint);
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.token.access_token)
            .query(query_params)
            .send()
            .await
            .map_err(|e| {
                error!("Network error for GET {}: {}", endpoint, e);
                CoreError::Network(e)
            })?;

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        let err = match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            401 => RedditApiError::InvalidToken,
            403 => RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            },
            code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
            code => RedditApiError::InvalidResponse {
                details: format!("unexpected status {} from {}", code, endpoint),
            },
        };
        Err(CoreError::RedditApi(err))
    }

    /// Fetches up to [`INFO_BATCH_SIZE`] submissions by fullname.
    pub async fn get_info(&self, fullnames: &[String]) -> Result<Vec<LiveSubmission>, CoreError> {
        let ids = fullnames.join(",");
        let response = self
            .make_request("/api/info", &[("id", ids.as_str()), ("raw_json", "1")])
            .await?;

        let listing: RedditListing<LiveSubmission> = response.json().await.map_err(|e| {
            error!("Failed to parse info listing: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: "Failed to parse submission info".to_string(),
            })
        })?;

        let submissions: Vec<LiveSubmission> = listing
            .data
            .children
            .into_iter()
            .filter(|child| child.kind == SUBMISSION_KIND)
            .map(|child| child.data)
            .collect();

        debug!(
            "Retrieved {} of {} requested submissions",
            submissions.len(),
            fullnames.len()
        );
        Ok(submissions)
    }
}

#[async_trait]
impl LiveLookup for RedditApiClient {
    async fn lookup(&self, fullnames: &[String]) -> Result<LiveIndex, CoreError> {
        let mut index = LiveIndex::with_capacity(fullnames.len());
        for batch in fullnames.chunks(INFO_BATCH_SIZE) {
            for submission in self.get_info(batch).await? {
                let key = if submission.name.is_empty() {
                    fullname(&submission.id)
                } else {
                    submission.name.clone()
                };
                index.insert(key, submission);
            }
        }
        Ok(index)
    }
}
