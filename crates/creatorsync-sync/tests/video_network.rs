//! `VideoNetworkClient` against a `wiremock` token endpoint and data API.

use std::time::Duration;

use chrono::Utc;
use creatorsync_core::Platform;
use creatorsync_sync::{OAuthError, OAuthPlatform, VideoNetworkClient, VideoNetworkConfig};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> VideoNetworkClient {
    VideoNetworkClient::new(VideoNetworkConfig {
        client_id: "cid".to_string(),
        client_secret: "csecret".to_string(),
        token_url: format!("{}/token", server.uri()),
        api_base_url: format!("{}/v3", server.uri()),
        max_results: 5,
        request_timeout: Duration::from_secs(5),
    })
    .expect("client builds")
}

// ---------------------------------------------------------------------------
// Token refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn refresh_posts_form_grant_and_computes_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r-1"))
        .and(body_string_contains("client_id=cid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "a-2",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let before = Utc::now();
    let grant = client(&server).refresh("r-1").await.expect("refresh succeeds");

    assert_eq!(grant.access_token, "a-2");
    assert!(grant.refresh_token.is_none());
    let expires_at = grant.expires_at.expect("expiry present");
    assert!(expires_at >= before + chrono::Duration::seconds(3599));
}

#[tokio::test]
async fn invalid_grant_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
        .mount(&server)
        .await;

    let err = client(&server).refresh("revoked").await.unwrap_err();
    assert!(
        matches!(err, OAuthError::Rejected { status: 400, ref message } if message.contains("invalid_grant")),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn token_endpoint_outage_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server).refresh("r").await.unwrap_err();
    assert!(matches!(err, OAuthError::Api { status: 503, .. }), "got: {err:?}");
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[tokio::test]
async fn snapshot_reads_channel_search_and_videos() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/channels"))
        .and(query_param("mine", "true"))
        .and(header("authorization", "Bearer live"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": "UC1",
                "snippet": {"title": "Studio", "customUrl": "@studio"},
                "statistics": {"subscriberCount": "1000", "videoCount": "2"}
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/search"))
        .and(query_param("forMine", "true"))
        .and(query_param("maxResults", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": {"videoId": "v1"}}, {"id": {"videoId": "v2"}}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/videos"))
        .and(query_param("id", "v1,v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": "v1", "snippet": {"title": "One #cook"}, "statistics": {"likeCount": "100", "commentCount": "20", "viewCount": "5000"}},
                {"id": "v2", "snippet": {"title": "Two #cook"}, "statistics": {"likeCount": "60", "commentCount": "20", "viewCount": "3000"}}
            ]
        })))
        .mount(&server)
        .await;

    let snapshot = client(&server).fetch_snapshot("live").await.expect("snapshot");

    assert_eq!(snapshot.profile.handle, "studio");
    assert_eq!(snapshot.profile.follower_count, 1000);
    assert_eq!(snapshot.posts.len(), 2);
    // (120 + 80) / 2 / 1000 * 100
    assert!((snapshot.engagement_rate - 10.0).abs() < f64::EPSILON);
    assert_eq!(snapshot.top_hashtags, vec!["#cook"]);
    assert_eq!(
        snapshot.posts[0].post_url.as_deref(),
        Some("https://www.youtube.com/watch?v=v1")
    );
}

#[tokio::test]
async fn channel_without_uploads_skips_the_video_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "UC1", "statistics": {"subscriberCount": "10"}}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/videos"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let snapshot = client(&server).fetch_snapshot("live").await.expect("snapshot");
    assert!(snapshot.posts.is_empty());
    assert!(snapshot.engagement_rate.abs() < f64::EPSILON);
}

#[tokio::test]
async fn missing_channel_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    let err = client(&server).fetch_snapshot("live").await.unwrap_err();
    assert!(matches!(err, OAuthError::NoChannel), "got: {err:?}");
}

#[tokio::test]
async fn unauthorized_data_call_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/channels"))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
        .mount(&server)
        .await;

    let err = client(&server).fetch_snapshot("stale").await.unwrap_err();
    assert!(matches!(err, OAuthError::Api { status: 401, .. }), "got: {err:?}");
}

#[test]
fn client_serves_the_video_network() {
    let server_less = VideoNetworkClient::new(VideoNetworkConfig {
        client_id: "c".into(),
        client_secret: "s".into(),
        token_url: "http://localhost/token".into(),
        api_base_url: "http://localhost/v3".into(),
        max_results: 1,
        request_timeout: Duration::from_secs(1),
    })
    .expect("client builds");
    assert_eq!(server_less.platform(), Platform::VideoNetwork);
}
