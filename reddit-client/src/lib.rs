pub mod api;
pub mod archive;
pub mod auth;
pub mod rate_limiter;

#[cfg(test)]
mod tests;

pub use api::{RedditApiClient, REDDIT_API_BASE};
pub use archive::{PushshiftClient, PUSHSHIFT_API_BASE};
pub use auth::{RedditAuthenticator, RedditToken};
pub use rate_limiter::{RateLimitConfig, RateLimiter};
