use chronoscrape_core::{CoreError, RedditApiError, RedditCredentials};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError,
    ResourceOwnerPassword, ResourceOwnerUsername, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info};

pub const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
pub const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Reddit tokens live for a day unless the response says otherwise.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }
}

/// Obtains an OAuth2 token for the live API.
///
/// Script apps with a username and password use the password grant; other
/// apps fall back to an application-only token from the client credentials
/// grant. Both grants are read-only.
pub struct RedditAuthenticator {
    credentials: RedditCredentials,
    oauth_client: BasicClient,
    http_client: reqwest::Client,
}

impl RedditAuthenticator {
    pub fn new(credentials: RedditCredentials) -> Result<Self, CoreError> {
        Self::with_token_url(credentials, REDDIT_TOKEN_URL)
    }

    pub fn with_token_url(credentials: RedditCredentials, token_url: &str) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(|e| invalid_url(REDDIT_AUTH_URL, e))?;
        let token_url = TokenUrl::new(token_url.to_string()).map_err(|e| invalid_url(token_url, e))?;

        let oauth_client = BasicClient::new(
            ClientId::new(credentials.client_id.clone()),
            Some(ClientSecret::new(credentials.client_secret.clone())),
            auth_url,
            Some(token_url),
        );

        // The token endpoint rejects requests without a descriptive user agent
        let http_client = reqwest::Client::builder()
            .user_agent(credentials.user_agent())
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            credentials,
            oauth_client,
            http_client,
        })
    }

    pub fn get_required_scopes() -> Vec<&'static str> {
        vec!["read"]
    }

    pub async fn login(&self) -> Result<RedditToken, CoreError> {
        let scopes = Self::get_required_scopes()
            .into_iter()
            .map(|s| Scope::new(s.to_string()));
        let http_client = self.http_client.clone();
        let send = move |request: HttpRequest| send_token_request(http_client, request);

        let result = match (&self.credentials.username, &self.credentials.password) {
            (Some(username), Some(password)) if self.credentials.uses_password_grant() => {
                debug!("Requesting token with password grant for {}", username);
                let username = ResourceOwnerUsername::new(username.clone());
                let password = ResourceOwnerPassword::new(password.clone());
                self.oauth_client
                    .exchange_password(&username, &password)
                    .add_scopes(scopes)
                    .request_async(send)
                    .await
            }
            _ => {
                debug!("Requesting application-only token");
                self.oauth_client
                    .exchange_client_credentials()
                    .add_scopes(scopes)
                    .request_async(send)
                    .await
            }
        };

        let token_response = result.map_err(|e| {
            let reason = match e {
                RequestTokenError::ServerResponse(response) => response.to_string(),
                RequestTokenError::Request(e) => format!("token request failed: {}", e),
                RequestTokenError::Parse(e, _) => format!("could not parse token response: {}", e),
                RequestTokenError::Other(message) => message,
            };
            error!("Reddit login failed: {}", reason);
            CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })
        })?;

        let expires_in = token_response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let token = RedditToken {
            access_token: token_response.access_token().secret().clone(),
            expires_at: SystemTime::now() + expires_in,
            scope: token_response
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default(),
        };

        info!("Logged in!");
        Ok(token)
    }
}

fn invalid_url(url: &str, e: url::ParseError) -> CoreError {
    CoreError::InvalidInput {
        message: format!("invalid OAuth URL '{}': {}", url, e),
    }
}

async fn send_token_request(
    client: reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().to_owned();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}
