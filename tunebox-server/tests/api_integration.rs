//! Integration tests for the TuneBox HTTP API
//!
//! Tests the API surface against an in-memory store and a fake media server:
//! - Health checks
//! - Queue management
//! - Playback control
//! - Library browsing and caching

mod helpers;

use axum::http::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use helpers::{session, test_context, track, FakeMediaServer};
use tunebox_common::models::{Track, TrackState};
use tunebox_server::api::create_router;
use tunebox_server::AppContext;

/// Test helper to create a test server
async fn setup_test_server() -> (axum::Router, AppContext, Arc<FakeMediaServer>) {
    let media = Arc::new(FakeMediaServer::new());
    let ctx = test_context(media.clone()).await;
    let router = create_router(ctx.clone());
    (router, ctx, media)
}

/// Helper function to make HTTP requests to the test server
async fn make_request(app: &axum::Router, method: &str, path: &str) -> (StatusCode, Option<Value>) {
    let (status, _, body) = raw_request(app, method, path).await;
    let json_body = if !body.is_empty() {
        Some(serde_json::from_slice(&body).unwrap())
    } else {
        None
    };
    (status, json_body)
}

async fn raw_request(
    app: &axum::Router,
    method: &str,
    path: &str,
) -> (StatusCode, Option<String>, Vec<u8>) {
    use axum::body::Body;
    use http::{Method, Request};
    use tower::ServiceExt;

    let method = match method {
        "GET" => Method::GET,
        "POST" => Method::POST,
        "DELETE" => Method::DELETE,
        _ => panic!("Unsupported method"),
    };

    let request = Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, content_type, body.to_vec())
}

fn detail(body: Option<Value>) -> String {
    body.expect("Expected error body")["detail"]
        .as_str()
        .expect("detail should be a string")
        .to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _, _) = setup_test_server().await;

    let (status, body) = make_request(&app, "GET", "/health").await;

    assert_eq!(status, StatusCode::OK);
    let body = body.expect("Expected response body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "tunebox-server");
    assert!(body["version"].is_string());

    let (status, body) = make_request(&app, "GET", "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["message"], "Welcome to TuneBox");
}

#[tokio::test]
async fn test_enqueue_and_list() {
    let (app, _, media) = setup_test_server().await;
    media.add_track(track("12345", "Test Song", 180));

    let (status, body) = make_request(&app, "POST", "/api/music/queue/12345").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body.unwrap()["message"],
        "Added Test Song to the playback queue."
    );

    let (status, body) = make_request(&app, "GET", "/api/music/queue").await;
    assert_eq!(status, StatusCode::OK);
    let queue = body.unwrap();
    let queue = queue.as_array().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["item_id"], "12345");
    assert_eq!(queue[0]["title"], "Test Song");
    assert_eq!(queue[0]["artist"], "Test Artist");
    assert_eq!(queue[0]["duration"], 180);
}

#[tokio::test]
async fn test_duplicate_enqueue_is_rejected() {
    let (app, ctx, media) = setup_test_server().await;
    media.add_track(track("1", "One", 60));

    make_request(&app, "POST", "/api/music/queue/1").await;
    let (status, body) = make_request(&app, "POST", "/api/music/queue/1").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail(body), "Song One is already in the queue.");
    assert_eq!(ctx.queue.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_enqueue_unknown_item_is_not_found() {
    let (app, ctx, _) = setup_test_server().await;

    let (status, body) = make_request(&app, "POST", "/api/music/queue/999").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.unwrap()["detail"].is_string());
    assert!(ctx.queue.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_enqueue_non_track_is_rejected() {
    let (app, ctx, media) = setup_test_server().await;
    media.add_track(Track {
        kind: "album".to_string(),
        ..track("50", "Whole Album", 0)
    });

    let (status, body) = make_request(&app, "POST", "/api/music/queue/50").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(detail(body).contains("not a track"));
    assert!(ctx.queue.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_non_numeric_ids_are_rejected() {
    let (app, ctx, media) = setup_test_server().await;
    media.add_track(track("1", "One", 60));

    for path in [
        "/api/music/queue/..%2F..%2Fstatus%2Fsessions",
        "/api/music/queue/abc",
    ] {
        let (status, body) = make_request(&app, "POST", path).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", path);
        assert!(detail(body).contains("Invalid item id"));
    }
    assert!(ctx.queue.is_empty().await.unwrap());

    let (status, _) = make_request(&app, "DELETE", "/api/music/queue/1x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for path in [
        "/api/music/artists/..%2F..%2Fclients/albums",
        "/api/music/albums/abc/tracks",
        "/api/music/album-art/..%2Fthumb",
        "/api/music/artist-image/x",
    ] {
        let (status, _, _) = raw_request(&app, "GET", path).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", path);
    }
}

#[tokio::test]
async fn test_dequeue_and_clear() {
    let (app, ctx, media) = setup_test_server().await;
    for (id, title) in [("1", "One"), ("2", "Two"), ("3", "Three")] {
        media.add_track(track(id, title, 60));
        make_request(&app, "POST", &format!("/api/music/queue/{}", id)).await;
    }

    let (status, body) = make_request(&app, "DELETE", "/api/music/queue/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["message"], "Removed Two from the queue.");

    let (status, body) = make_request(&app, "DELETE", "/api/music/queue/2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.unwrap()["detail"].is_string());

    let ids: Vec<String> = ctx
        .queue
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.item_id)
        .collect();
    assert_eq!(ids, vec!["1", "3"]);

    let (status, body) = make_request(&app, "POST", "/api/music/clear-queue").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["message"], "The queue has been cleared.");
    assert!(ctx.queue.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_play_queue_runs_in_background() {
    let (app, ctx, media) = setup_test_server().await;
    media.add_track(track("1", "Short", 1));
    make_request(&app, "POST", "/api/music/queue/1").await;

    let (status, body) = make_request(&app, "POST", "/api/music/play-queue").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body.unwrap()["message"],
        "Playback started in the background."
    );

    assert!(helpers::wait_until(Duration::from_secs(3), || media.played() == vec!["1"]).await);
    let (status, body) = make_request(&app, "GET", "/api/music/playback-status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["state"], "draining");

    let drained = async {
        while !ctx.queue.is_empty().await.unwrap() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(3), drained)
        .await
        .expect("queue should drain");
}

#[tokio::test]
async fn test_stop_queue() {
    let (app, ctx, media) = setup_test_server().await;

    let (status, body) = make_request(&app, "POST", "/api/music/stop-queue").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["message"], "Playback stopped successfully.");
    assert_eq!(media.stop_count(), 1);

    let (status, body) = make_request(&app, "GET", "/api/music/playback-status").await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["state"], "stopped_by_request");
    assert_eq!(body["queue_length"], 0);
    assert!(!ctx.driver.is_draining());
}

#[tokio::test]
async fn test_stop_queue_without_players() {
    let (app, _, media) = setup_test_server().await;
    media.set_players(Vec::new());

    let (status, body) = make_request(&app, "POST", "/api/music/stop-queue").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail(body), "No active player found");
    assert_eq!(media.stop_count(), 0);
}

#[tokio::test]
async fn test_players_endpoints() {
    let (app, _, media) = setup_test_server().await;

    let (status, body) = make_request(&app, "GET", "/api/music/players").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()[0]["name"], "Living Room");

    let (status, body) = make_request(&app, "GET", "/api/music/active-player").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["player_id"], "player-1");

    media.set_players(Vec::new());
    let (status, _) = make_request(&app, "GET", "/api/music/players").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_now_playing() {
    let (app, _, media) = setup_test_server().await;

    let (status, body) = make_request(&app, "GET", "/api/music/now-playing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(detail(body), "No track is currently playing");

    media.set_sessions(vec![session("player-1", "Test Song", 180, TrackState::Playing)]);
    let (status, body) = make_request(&app, "GET", "/api/music/now-playing").await;

    assert_eq!(status, StatusCode::OK);
    let track = &body.unwrap()["current_track"];
    assert_eq!(track["title"], "Test Song");
    assert_eq!(track["artist"], "Test Artist");
    assert_eq!(track["track_state"], "playing");
    assert_eq!(track["total_time"], 180);
}

#[tokio::test]
async fn test_media_server_unavailable() {
    let (app, _, media) = setup_test_server().await;
    media.set_unavailable(true);

    let (status, body) = make_request(&app, "GET", "/api/music/artists").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.unwrap()["detail"].is_string());
}

#[tokio::test]
async fn test_artists_are_cached_until_cleared() {
    let (app, _, media) = setup_test_server().await;

    for _ in 0..2 {
        let (status, body) = make_request(&app, "GET", "/api/music/artists").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap()[0]["name"], "Test Artist");
    }
    assert_eq!(media.artist_calls(), 1);

    let (status, body) = make_request(&app, "POST", "/api/music/clear-cache/all_artists").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["message"], "Cache cleared for key: all_artists");

    make_request(&app, "GET", "/api/music/artists").await;
    assert_eq!(media.artist_calls(), 2);
}

#[tokio::test]
async fn test_albums_and_tracks() {
    let (app, _, media) = setup_test_server().await;
    media.add_track(track("1", "Opening", 120));

    let (status, body) = make_request(&app, "GET", "/api/music/artists/100/albums").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()[0]["album_id"], "200");

    let (status, body) = make_request(&app, "GET", "/api/music/albums/200/tracks").await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["album_title"], "Album 200");
    assert_eq!(body["tracks"][0]["title"], "Opening");
    assert_eq!(body["tracks"][0]["duration"], 120);
}

#[tokio::test]
async fn test_search() {
    let (app, _, media) = setup_test_server().await;
    media.add_track(track("1", "Blue Moon", 200));
    media.add_track(track("2", "Red Sun", 200));

    let (status, body) = make_request(&app, "GET", "/api/music/search?query=moon").await;
    assert_eq!(status, StatusCode::OK);
    let hits = body.unwrap();
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["type"], "track");
    assert_eq!(hits[0]["track_id"], "1");

    let (status, _) = make_request(&app, "GET", "/api/music/search?query=%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_album_art_is_proxied() {
    let (app, _, media) = setup_test_server().await;
    media.add_track(track("7", "Seven", 60));

    let (status, content_type, body) = raw_request(&app, "GET", "/api/music/album-art/7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert_eq!(body, vec![0x89, b'P', b'N', b'G']);

    let (status, _, _) = raw_request(&app, "GET", "/api/music/artist-image/4040").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
