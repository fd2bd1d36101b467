//! Application state management

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::playback;
use crate::renderer::BroadcastRenderer;
use crate::replay::{ReplayCommand, ReplayInfo, ReplayState};
use gr_core::{PlaybackState, RenderBatch, SessionSource};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,

    /// Render batches for every stream subscriber
    pub render_tx: broadcast::Sender<Arc<RenderBatch>>,

    /// Active replay (None until a session is loaded)
    pub replay: Arc<RwLock<Option<ReplayState>>>,

    /// Cancellation token for the playback task
    pub replay_cancel: Arc<RwLock<Option<CancellationToken>>>,

    /// Why the startup session could not be loaded, if it failed
    pub load_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        // Enough headroom for a few seconds of 25 fps output
        let (render_tx, _) = broadcast::channel(128);

        Self {
            config: Arc::new(config),
            render_tx,
            replay: Arc::new(RwLock::new(None)),
            replay_cancel: Arc::new(RwLock::new(None)),
            load_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Subscribe to render batches
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RenderBatch>> {
        self.render_tx.subscribe()
    }

    /// Load `source` as the active replay. Fails with a conflict if one is
    /// already active.
    pub async fn load_replay(&self, source: Box<dyn SessionSource>) -> Result<ReplayInfo, ServerError> {
        if self.replay.read().await.is_some() {
            return Err(ServerError::ReplayActive);
        }

        let limits = self.config.surface_limits();
        let renderer = BroadcastRenderer::new(self.render_tx.clone());
        let loaded = tokio::task::spawn_blocking(move || {
            let mut source = source;
            ReplayState::load(source.as_mut(), limits, renderer)
        })
        .await?;

        let replay_state = match loaded {
            Ok(replay_state) => replay_state,
            Err(e) => {
                error!("Session load failed: {:#}", e);
                return Err(ServerError::Load(e));
            }
        };

        let info = replay_state.info();
        {
            let mut replay = self.replay.write().await;
            if replay.is_some() {
                return Err(ServerError::ReplayActive);
            }
            *replay = Some(replay_state);
        }
        *self.load_error.write().await = None;

        info!("Replay {} loaded from {}", info.replay_id, info.source);
        Ok(info)
    }

    /// Apply a command to the active replay, starting the playback task when
    /// the clock ends up running
    pub async fn command(&self, command: ReplayCommand) -> Result<PlaybackState, ServerError> {
        let playback_state = {
            let mut replay = self.replay.write().await;
            let rs = replay.as_mut().ok_or(ServerError::NoReplay)?;
            rs.apply(command, Instant::now())?
        };

        if playback_state.is_playing {
            playback::start_playback_task(self.clone()).await;
        }
        Ok(playback_state)
    }

    /// Drop the active replay and stop its playback task
    pub async fn unload_replay(&self) -> Result<(), ServerError> {
        self.cancel_playback().await;

        let mut replay = self.replay.write().await;
        if replay.take().is_none() {
            return Err(ServerError::NoReplay);
        }
        info!("Replay stopped and cleaned up");
        Ok(())
    }

    pub async fn cancel_playback(&self) {
        let mut cancel = self.replay_cancel.write().await;
        if let Some(token) = cancel.take() {
            token.cancel();
        }
    }

    /// The error for "nothing loaded", distinguishing a failed startup load
    pub async fn missing_replay(&self) -> ServerError {
        match self.load_error.read().await.as_ref() {
            Some(reason) => ServerError::Unavailable(reason.clone()),
            None => ServerError::NoReplay,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
