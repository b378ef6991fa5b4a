use crate::{
    api::RedditApiClient, archive::PushshiftClient, auth::RedditAuthenticator,
    rate_limiter::RateLimitConfig, RedditToken,
};
use chronoscrape_core::{
    scrape_subreddit, ArchiveError, ArchiveSource, CoreError, DateRange, FieldWhitelist,
    LiveLookup, PageRequest, RedditApiError, RedditCredentials, ScrapeRequest, SortDirection,
};
use serde_json::{json, Value};
use std::time::{Duration, SystemTime};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_AGENT: &str = "rust:chronoscrape-tests:v0.0.0";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("reddit_client=debug")
        .try_init();
}

fn test_token() -> RedditToken {
    RedditToken {
        access_token: "test_token".to_string(),
        expires_at: SystemTime::now() + Duration::from_secs(3600),
        scope: vec!["read".to_string()],
    }
}

fn live_client(server: &MockServer) -> RedditApiClient {
    RedditApiClient::with_base_url(
        &server.uri(),
        USER_AGENT,
        test_token(),
        RateLimitConfig::unlimited(),
    )
    .unwrap()
}

fn archive_client(server: &MockServer) -> PushshiftClient {
    PushshiftClient::with_base_url(&server.uri(), USER_AGENT).unwrap()
}

fn create_test_credentials(username: Option<&str>) -> RedditCredentials {
    RedditCredentials {
        client_id: "test_client_id".to_string(),
        client_secret: "test_client_secret".to_string(),
        username: username.map(str::to_string),
        password: username.map(|_| "hunter2".to_string()),
        user_agent: Some(USER_AGENT.to_string()),
    }
}

fn page_request(before: i64) -> PageRequest {
    PageRequest {
        subreddit: "rust".to_string(),
        sort: SortDirection::Desc,
        size: 500,
        before,
        after: 1000,
    }
}

fn archive_post(id: &str, created_utc: i64, score: i64) -> Value {
    json!({
        "id": id,
        "created_utc": created_utc,
        "title": format!("Post {}", id),
        "score": score,
        "num_comments": 0,
        "subreddit": "rust",
    })
}

fn info_listing(children: Vec<Value>) -> Value {
    json!({
        "kind": "Listing",
        "data": {
            "children": children,
            "after": null,
            "before": null,
        }
    })
}

fn link(id: &str, score: i64) -> Value {
    json!({
        "kind": "t3",
        "data": {
            "id": id,
            "name": format!("t3_{}", id),
            "score": score,
            "num_comments": 42,
            "locked": true,
            "title": "ignored",
        }
    })
}

// Archive client

#[tokio::test]
async fn test_archive_sends_window_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reddit/search/submission"))
        .and(query_param("subreddit", "rust"))
        .and(query_param("sort", "desc"))
        .and(query_param("size", "500"))
        .and(query_param("before", "5000"))
        .and(query_param("after", "1000"))
        .and(query_param("sort_type", "created_utc"))
        .and(header("User-Agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [archive_post("b", 4000, 3), archive_post("a", 3000, 1)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let items = archive_client(&server)
        .fetch_page(&page_request(5000))
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], json!("b"));
    let keys: Vec<&str> = items[0].keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["id", "created_utc", "title", "score", "num_comments", "subreddit"]
    );
}

#[tokio::test]
async fn test_archive_error_status() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reddit/search/submission"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = archive_client(&server).fetch_page(&page_request(5000)).await;

    match result {
        Err(CoreError::Archive(ArchiveError::Status {
            status_code,
            subreddit,
        })) => {
            assert_eq!(status_code, 503);
            assert_eq!(subreddit, "rust");
        }
        other => panic!("Expected archive status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_archive_invalid_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reddit/search/submission"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = archive_client(&server).fetch_page(&page_request(5000)).await;

    assert!(matches!(
        result,
        Err(CoreError::Archive(ArchiveError::InvalidResponse { .. }))
    ));
}

// Live API client

#[tokio::test]
async fn test_info_lookup_indexes_by_fullname() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .and(query_param("id", "t3_a,t3_b,t3_deleted"))
        .and(header("Authorization", "Bearer test_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(info_listing(vec![link("b", 20), link("a", 10)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let names = vec![
        "t3_a".to_string(),
        "t3_b".to_string(),
        "t3_deleted".to_string(),
    ];
    let index = live_client(&server).lookup(&names).await.unwrap();

    assert_eq!(index.len(), 2);
    assert_eq!(index["t3_a"].score, Some(10));
    assert_eq!(index["t3_b"].score, Some(20));
    assert_eq!(index["t3_b"].locked, Some(true));
    assert!(!index.contains_key("t3_deleted"));
}

#[tokio::test]
async fn test_info_lookup_batches_by_hundred() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(info_listing(vec![])))
        .expect(3)
        .mount(&server)
        .await;

    let names: Vec<String> = (0..250).map(|i| format!("t3_{}", i)).collect();
    let index = live_client(&server).lookup(&names).await.unwrap();

    assert!(index.is_empty());
}

#[tokio::test]
async fn test_info_lookup_skips_request_for_no_names() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let index = live_client(&server).lookup(&[]).await.unwrap();
    assert!(index.is_empty());
}

#[tokio::test]
async fn test_live_status_mapping() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .and(query_param("id", "t3_unauthorized"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .and(query_param("id", "t3_limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .and(query_param("id", "t3_broken"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = live_client(&server);

    let result = client.get_info(&["t3_unauthorized".to_string()]).await;
    assert!(matches!(
        result,
        Err(CoreError::RedditApi(RedditApiError::InvalidToken))
    ));

    let result = client.get_info(&["t3_limited".to_string()]).await;
    assert!(matches!(
        result,
        Err(CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 7 }))
    ));

    let result = client.get_info(&["t3_broken".to_string()]).await;
    assert!(matches!(
        result,
        Err(CoreError::RedditApi(RedditApiError::ServerError { status_code: 502 }))
    ));
}

// Authentication

#[tokio::test]
async fn test_password_grant_login() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=bot"))
        .and(header("User-Agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh_token",
            "token_type": "bearer",
            "expires_in": 3600,
            "scope": "read",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token_url = format!("{}/api/v1/access_token", server.uri());
    let authenticator =
        RedditAuthenticator::with_token_url(create_test_credentials(Some("bot")), &token_url)
            .unwrap();
    let token = authenticator.login().await.unwrap();

    assert_eq!(token.access_token, "fresh_token");
    assert_eq!(token.scope, vec!["read"]);
    assert!(!token.is_expired());
}

#[test]
fn test_client_credentials_login_without_user() {
    let server = tokio_test::block_on(MockServer::start());

    tokio_test::block_on(
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "app_token",
                "token_type": "bearer",
                "expires_in": 86400,
                "scope": "*",
            })))
            .expect(1)
            .mount(&server),
    );

    let token_url = format!("{}/api/v1/access_token", server.uri());
    let authenticator =
        RedditAuthenticator::with_token_url(create_test_credentials(None), &token_url).unwrap();
    let token = tokio_test::block_on(authenticator.login()).unwrap();

    assert_eq!(token.access_token, "app_token");
}

#[tokio::test]
async fn test_rejected_login() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_grant",
        })))
        .mount(&server)
        .await;

    let token_url = format!("{}/api/v1/access_token", server.uri());
    let authenticator =
        RedditAuthenticator::with_token_url(create_test_credentials(Some("bot")), &token_url)
            .unwrap();
    let result = authenticator.login().await;

    assert!(matches!(
        result,
        Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed { .. }))
    ));
}

// End to end through the page cursor

#[tokio::test]
async fn test_scrape_pages_until_empty_and_refreshes_scores() {
    init_tracing();
    let server = MockServer::start().await;
    let range = DateRange {
        start: 1000,
        end: 9999,
    };

    Mock::given(method("GET"))
        .and(path("/reddit/search/submission"))
        .and(query_param("before", "9999"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [archive_post("a", 5000, 1), archive_post("b", 4000, 2)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/reddit/search/submission"))
        .and(query_param("before", "4000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .and(query_param("id", "t3_a,t3_b"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(info_listing(vec![link("a", 100), link("b", 200)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let archive = archive_client(&server);
    let live = live_client(&server);
    let request = ScrapeRequest::new("rust", range)
        .with_count(Some(1000))
        .with_enrichment(true)
        .with_whitelist(Some(FieldWhitelist::new(["id", "score", "title"])));

    let outcome = scrape_subreddit(&archive, Some(&live), &request)
        .await
        .unwrap();

    assert_eq!(outcome.cursor, 4000);
    assert_eq!(outcome.pages, 1);
    assert_eq!(outcome.items.len(), 2);
    assert_eq!(outcome.items[0]["score"], json!(100));
    assert_eq!(outcome.items[1]["score"], json!(200));
    assert!(!outcome.items[0].contains_key("num_comments"));
}
