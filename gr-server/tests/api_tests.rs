//! Integration tests for the gr-server HTTP API
//!
//! Uses tower::ServiceExt::oneshot to test routes directly without binding a port.

use axum::body::Body;
use gr_server::{api::create_router, state::AppState};
use http_body_util::BodyExt;
use hyper::Request;
use std::time::Duration;
use tower::ServiceExt;

/// Helper: build a router with AppState returned for further manipulation
fn app_with_state() -> (axum::Router, AppState) {
    let state = AppState::default();
    let router = create_router(state.clone());
    (router, state)
}

/// Helper: collect response body into string
async fn body_string(body: Body) -> String {
    let collected = body.collect().await.unwrap();
    String::from_utf8(collected.to_bytes().to_vec()).unwrap()
}

async fn body_json(body: Body) -> serde_json::Value {
    serde_json::from_str(&body_string(body).await).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, json: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap()
}

fn multipart_upload(file_name: &str, content: &str) -> Request<Body> {
    let boundary = "gridreplay-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/json\r\n\r\n\
         {content}\r\n\
         --{boundary}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/api/replay/upload")
        .header("content-type", format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap()
}

const SMALL_SESSION: &str = r##"{
    "event": {"name": "Test Grand Prix", "round": 1, "year": 2025},
    "track": [{"x": 0.0, "y": 0.0}, {"x": 100.0, "y": 0.0}, {"x": 100.0, "y": 50.0}],
    "drivers": {
        "AAA": {"abbreviation": "AAA", "team": "Alpha", "full_name": "Ann Alpha", "color": "#FF0000"},
        "BBB": {"abbreviation": "BBB", "team": "Beta", "full_name": "Bo Beta"}
    },
    "frames": [
        {"time": 0.0, "lap": 1, "positions": {
            "AAA": {"x": 0.0, "y": 0.0, "position": 2, "lap": 1, "tyre": 0, "speed": 120.0, "gear": 4, "drs": 0},
            "BBB": {"x": 10.0, "y": 0.0, "position": 1, "lap": 1, "tyre": 2, "speed": 125.0, "gear": 5, "drs": 1}
        }},
        {"time": 0.04, "lap": 2, "positions": {}}
    ]
}"##;

async fn load_demo(app: &axum::Router) {
    let response = app
        .clone()
        .oneshot(post_empty("/api/replay/demo?laps=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

// ==================== Loading ====================

#[tokio::test]
async fn test_info_without_replay_returns_404() {
    let (app, _) = app_with_state();
    let response = app.oneshot(get("/api/replay/info")).await.unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(body_string(response.into_body()).await, "No active replay");
}

#[tokio::test]
async fn test_failed_startup_load_reports_unavailable() {
    let (app, state) = app_with_state();
    *state.load_error.write().await = Some("Failed to load session: bad file".to_string());

    let response = app.oneshot(get("/api/replay/info")).await.unwrap();
    assert_eq!(response.status(), 503);
    assert!(body_string(response.into_body()).await.contains("bad file"));
}

#[tokio::test]
async fn test_demo_load_and_conflict() {
    let (app, _) = app_with_state();

    let response = app.clone().oneshot(post_empty("/api/replay/demo?laps=1")).await.unwrap();
    assert_eq!(response.status(), 200);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["info"]["source"], "Demo");
    assert_eq!(json["info"]["total_laps"], 1);
    assert_eq!(json["info"]["state"]["is_playing"], false);
    assert_eq!(json["info"]["state"]["current_frame_index"], 0);

    let response = app.oneshot(post_empty("/api/replay/demo")).await.unwrap();
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn test_demo_rejects_out_of_range_laps() {
    let (app, state) = app_with_state();

    for uri in ["/api/replay/demo?laps=4294967295", "/api/replay/demo?laps=21", "/api/replay/demo?laps=0"] {
        let response = app.clone().oneshot(post_empty(uri)).await.unwrap();
        assert_eq!(response.status(), 400, "{}", uri);
        assert!(body_string(response.into_body()).await.contains("between 1 and 20"));
    }
    assert!(state.replay.read().await.is_none());
}

#[tokio::test]
async fn test_upload_session_document() {
    let (app, _) = app_with_state();

    let response = app
        .clone()
        .oneshot(multipart_upload("race_data.json", SMALL_SESSION))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["info"]["source"], "race_data.json");
    assert_eq!(json["info"]["total_frames"], 2);
    assert_eq!(json["info"]["event"]["name"], "Test Grand Prix");
    assert_eq!(json["info"]["drivers"], serde_json::json!(["AAA", "BBB"]));

    let response = app.oneshot(get("/api/replay/info")).await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_upload_rejects_other_file_types() {
    let (app, _) = app_with_state();
    let response = app
        .oneshot(multipart_upload("session.ibt", SMALL_SESSION))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_upload_rejects_invalid_document() {
    let (app, state) = app_with_state();
    let response = app
        .oneshot(multipart_upload("race_data.json", r#"{"event": {}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert!(body_string(response.into_body())
        .await
        .starts_with("Failed to load session"));
    assert!(state.replay.read().await.is_none());
}

// ==================== Queries ====================

#[tokio::test]
async fn test_frames_window_is_capped() {
    let (app, _) = app_with_state();
    load_demo(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/replay/frames?start=10&count=3"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json = body_json(response.into_body()).await;
    let frames = json.as_array().unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0]["i"], 10);
    assert!(frames[0]["f"]["positions"].is_object());

    let response = app
        .oneshot(get("/api/replay/frames?count=100000"))
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert!(json.as_array().unwrap().len() <= 500);
}

#[tokio::test]
async fn test_leaderboard_orders_by_position() {
    let (app, _) = app_with_state();
    let response = app
        .clone()
        .oneshot(multipart_upload("race_data.json", SMALL_SESSION))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = app.oneshot(get("/api/replay/leaderboard")).await.unwrap();
    assert_eq!(response.status(), 200);
    let rows = body_json(response.into_body()).await;
    assert_eq!(rows[0]["driver_code"], "BBB");
    assert_eq!(rows[1]["driver_code"], "AAA");
    assert_eq!(rows[0]["badge"]["short_label"], "H");
}

// ==================== Control ====================

#[tokio::test]
async fn test_control_without_replay_returns_404() {
    let (app, _) = app_with_state();
    let response = app
        .oneshot(post_json("/api/replay/control", serde_json::json!({"action": "play"})))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_control_commands() {
    let (app, _) = app_with_state();
    load_demo(&app).await;

    let control = |json: serde_json::Value| {
        let app = app.clone();
        async move { app.oneshot(post_json("/api/replay/control", json)).await.unwrap() }
    };

    let response = control(serde_json::json!({"action": "seek_to", "frame": 120})).await;
    assert_eq!(response.status(), 200);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["state"]["current_frame_index"], 120);

    let response = control(serde_json::json!({"action": "seek", "delta": -50})).await;
    let json = body_json(response.into_body()).await;
    assert_eq!(json["state"]["current_frame_index"], 70);

    let response = control(serde_json::json!({"action": "speed", "value": 2.0})).await;
    let json = body_json(response.into_body()).await;
    assert_eq!(json["state"]["speed_multiplier"], 2.0);

    let response = control(serde_json::json!({"action": "select", "driver": "HAR"})).await;
    let json = body_json(response.into_body()).await;
    assert_eq!(json["state"]["selected_driver"], "HAR");

    let response = control(serde_json::json!({"action": "restart"})).await;
    let json = body_json(response.into_body()).await;
    assert_eq!(json["state"]["current_frame_index"], 0);
    assert_eq!(json["state"]["speed_multiplier"], 2.0);
    assert_eq!(json["state"]["selected_driver"], "HAR");
}

#[tokio::test]
async fn test_control_rejects_invalid_commands() {
    let (app, _) = app_with_state();
    load_demo(&app).await;

    let control = |json: serde_json::Value| {
        let app = app.clone();
        async move { app.oneshot(post_json("/api/replay/control", json)).await.unwrap() }
    };

    assert_eq!(control(serde_json::json!({"action": "speed", "value": 0.0})).await.status(), 400);
    assert_eq!(control(serde_json::json!({"action": "lap", "lap": 42})).await.status(), 400);
    assert_eq!(
        control(serde_json::json!({"action": "select", "driver": "NOPE"})).await.status(),
        400
    );
    assert_eq!(
        control(serde_json::json!({"action": "resize", "max_width": 0.0, "max_height": 10.0, "padding": 1.0}))
            .await
            .status(),
        400
    );
    assert_eq!(control(serde_json::json!({"action": "rewind"})).await.status(), 422);
}

#[tokio::test]
async fn test_play_advances_and_pause_holds() {
    let (app, state) = app_with_state();
    load_demo(&app).await;

    let response = app
        .clone()
        .oneshot(post_json("/api/replay/control", serde_json::json!({"action": "play"})))
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json["state"]["is_playing"], true);

    tokio::time::sleep(Duration::from_millis(300)).await;

    let response = app
        .clone()
        .oneshot(post_json("/api/replay/control", serde_json::json!({"action": "pause"})))
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json["state"]["is_playing"], false);
    let paused_at = json["state"]["current_frame_index"].as_u64().unwrap();
    assert!(paused_at > 0, "playback task should have advanced the clock");

    tokio::time::sleep(Duration::from_millis(100)).await;
    let replay = state.replay.read().await;
    assert_eq!(
        replay.as_ref().unwrap().controller().current_index() as u64,
        paused_at
    );
}

// ==================== Stream ====================

#[tokio::test]
async fn test_commands_publish_render_batches() {
    let (app, state) = app_with_state();
    load_demo(&app).await;
    let mut rx = state.subscribe();

    let response = app
        .oneshot(post_json(
            "/api/replay/control",
            serde_json::json!({"action": "seek_to", "frame": 40}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let batch = rx.recv().await.unwrap();
    assert_eq!(batch.status.frame_index, 40);
    assert_eq!(batch.cars.len(), 6);
}

#[tokio::test]
async fn test_stream_sends_full_redraw_on_connect() {
    let (app, _) = app_with_state();
    load_demo(&app).await;

    let response = app.oneshot(get("/api/replay/stream")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let mut body = response.into_body();
    let frame = tokio::time::timeout(Duration::from_secs(2), body.frame())
        .await
        .expect("redraw should arrive")
        .unwrap()
        .unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.starts_with("event: render"), "{}", text);
    assert!(text.contains("\"track\":["));
}

// ==================== DELETE /api/replay ====================

#[tokio::test]
async fn test_delete_replay() {
    let (app, state) = app_with_state();
    load_demo(&app).await;

    let delete = || {
        Request::builder()
            .method("DELETE")
            .uri("/api/replay")
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(delete()).await.unwrap();
    assert_eq!(response.status(), 204);
    assert!(state.replay.read().await.is_none());

    let response = app.clone().oneshot(delete()).await.unwrap();
    assert_eq!(response.status(), 404);

    load_demo(&app).await;
}
