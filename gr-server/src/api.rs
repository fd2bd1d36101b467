//! REST API and SSE routes

use crate::error::ServerError;
use crate::replay::{ReplayCommand, ReplayInfo};
use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt as FuturesStreamExt};
use gr_core::leaderboard::LeaderboardRow;
use gr_core::PlaybackState;
use gr_sources::{DemoSource, JsonSessionSource};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

/// Largest frame window a single `/api/replay/frames` request returns
pub const MAX_FRAMES_PER_REQUEST: usize = 500;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/replay/upload", post(replay_upload)
            .layer(DefaultBodyLimit::max(256 * 1024 * 1024)))
        .route("/api/replay/demo", post(replay_demo))
        .route("/api/replay/info", get(replay_info))
        .route("/api/replay/frames", get(replay_frames))
        .route("/api/replay/leaderboard", get(replay_leaderboard))
        .route("/api/replay/control", post(replay_control))
        .route("/api/replay/stream", get(replay_stream))
        .route("/api/replay", delete(replay_delete))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct LoadedResponse {
    status: &'static str,
    info: ReplayInfo,
}

/// Accept an exported session document as a multipart upload
async fn replay_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<LoadedResponse>, ServerError> {
    if state.replay.read().await.is_some() {
        return Err(ServerError::ReplayActive);
    }

    let field = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Failed to read upload: {}", e)))?
        .ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;

    let file_name = field.file_name().unwrap_or("upload.json").to_string();
    if !file_name.to_lowercase().ends_with(".json") {
        return Err(ServerError::BadRequest(
            "Only .json session files are supported".to_string(),
        ));
    }

    let data = field
        .bytes()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Failed to read file data: {}", e)))?;

    tracing::info!("Received session file: {} ({} bytes)", file_name, data.len());

    let source = JsonSessionSource::from_bytes(file_name, data.to_vec());
    let info = state.load_replay(Box::new(source)).await?;
    Ok(Json(LoadedResponse { status: "ok", info }))
}

#[derive(Deserialize)]
struct DemoQuery {
    laps: Option<u32>,
}

async fn replay_demo(
    State(state): State<AppState>,
    Query(query): Query<DemoQuery>,
) -> Result<Json<LoadedResponse>, ServerError> {
    let laps = query.laps.unwrap_or(state.config.demo_laps);
    if !(1..=DemoSource::MAX_LAPS).contains(&laps) {
        return Err(ServerError::BadRequest(format!(
            "Demo laps must be between 1 and {}",
            DemoSource::MAX_LAPS
        )));
    }
    let info = state
        .load_replay(Box::new(DemoSource::with_laps(laps)))
        .await?;
    Ok(Json(LoadedResponse { status: "ok", info }))
}

async fn replay_info(State(state): State<AppState>) -> Result<Json<ReplayInfo>, ServerError> {
    let replay = state.replay.read().await;
    match &*replay {
        Some(rs) => Ok(Json(rs.info())),
        None => Err(state.missing_replay().await),
    }
}

#[derive(Deserialize)]
struct ReplayFramesQuery {
    #[serde(default)]
    start: usize,
    count: usize,
}

async fn replay_frames(
    State(state): State<AppState>,
    Query(params): Query<ReplayFramesQuery>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let replay = state.replay.read().await;
    let Some(rs) = replay.as_ref() else {
        return Err(state.missing_replay().await);
    };

    let count = params.count.min(MAX_FRAMES_PER_REQUEST);
    let json_frames: Vec<serde_json::Value> = rs
        .frames_range(params.start, count)
        .into_iter()
        .map(|(idx, frame)| {
            serde_json::json!({
                "i": idx,
                "f": frame
            })
        })
        .collect();

    Ok(Json(serde_json::json!(json_frames)))
}

async fn replay_leaderboard(
    State(state): State<AppState>,
) -> Result<Json<Vec<LeaderboardRow>>, ServerError> {
    let replay = state.replay.read().await;
    match &*replay {
        Some(rs) => Ok(Json(rs.controller().leaderboard())),
        None => Err(state.missing_replay().await),
    }
}

#[derive(Serialize)]
struct ControlResponse {
    status: &'static str,
    state: PlaybackState,
}

async fn replay_control(
    State(state): State<AppState>,
    Json(command): Json<ReplayCommand>,
) -> Result<Json<ControlResponse>, ServerError> {
    tracing::debug!("Replay command: {:?}", command);
    let playback_state = state.command(command).await?;
    Ok(Json(ControlResponse {
        status: "ok",
        state: playback_state,
    }))
}

/// Stream render batches as server-sent events.
///
/// Connecting forces a full redraw so the new client receives the track.
async fn replay_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();

    if let Some(rs) = state.replay.write().await.as_mut() {
        rs.controller_mut().redraw();
    }

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(batch) => match serde_json::to_string(&*batch) {
                Ok(json) => Some(Ok(Event::default().event("render").data(json))),
                Err(e) => {
                    tracing::error!("Failed to serialize render batch: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Render stream lagged: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn replay_delete(State(state): State<AppState>) -> Result<StatusCode, ServerError> {
    state.unload_replay().await?;
    Ok(StatusCode::NO_CONTENT)
}
