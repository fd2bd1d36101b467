//! Active replay state
//!
//! Wraps a [`ReplayController`] publishing to the render stream, together with
//! the bookkeeping the API reports about it (id, source, load time).

use crate::renderer::BroadcastRenderer;
use anyhow::Result;
use chrono::{DateTime, Utc};
use gr_core::frames::LapInfo;
use gr_core::model::Event;
use gr_core::projector::{SurfaceLimits, SurfaceSize};
use gr_core::{PlaybackState, ReplayController, ReplayError, SessionDocument, SessionSource};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Instant;

/// Commands accepted by `POST /api/replay/control`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReplayCommand {
    Play,
    Pause,
    Toggle,
    Restart,
    Speed { value: f64 },
    Seek { delta: i64 },
    SeekTo { frame: usize },
    Lap { lap: u32 },
    Select { driver: Option<String> },
    Resize(SurfaceLimits),
}

pub struct ReplayState {
    controller: ReplayController<BroadcastRenderer>,
    source: String,
    replay_id: String,
    loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayInfo {
    pub replay_id: String,
    pub source: String,
    pub event: Event,
    pub total_frames: usize,
    pub total_laps: u32,
    pub duration_secs: f64,
    pub drivers: Vec<String>,
    pub laps: Vec<LapInfo>,
    pub surface: SurfaceSize,
    pub limits: SurfaceLimits,
    pub state: PlaybackState,
    pub loaded_at: DateTime<Utc>,
}

impl ReplayState {
    /// Load a session from `source` and prepare a stopped replay at frame 0
    pub fn load(
        source: &mut dyn SessionSource,
        limits: SurfaceLimits,
        renderer: BroadcastRenderer,
    ) -> Result<Self> {
        let document = source.load()?;
        let replay_id = replay_id(&document);
        let controller = ReplayController::new(document, limits, renderer)?;

        Ok(Self {
            controller,
            source: source.name().to_string(),
            replay_id,
            loaded_at: Utc::now(),
        })
    }

    pub fn controller(&self) -> &ReplayController<BroadcastRenderer> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ReplayController<BroadcastRenderer> {
        &mut self.controller
    }

    pub fn replay_id(&self) -> &str {
        &self.replay_id
    }

    pub fn info(&self) -> ReplayInfo {
        let controller = &self.controller;
        let session = controller.session();
        let indexer = controller.indexer();

        ReplayInfo {
            replay_id: self.replay_id.clone(),
            source: self.source.clone(),
            event: session.event.clone(),
            total_frames: indexer.frame_count(),
            total_laps: indexer.total_laps(),
            duration_secs: indexer.duration_secs(),
            drivers: session.drivers.keys().cloned().collect(),
            laps: indexer.laps().to_vec(),
            surface: controller.transform().surface,
            limits: controller.limits(),
            state: controller.state(),
            loaded_at: self.loaded_at,
        }
    }

    /// Frames `start..start + count`, clipped to the session
    pub fn frames_range(&self, start: usize, count: usize) -> Vec<(usize, &gr_core::Frame)> {
        let frames = &self.controller.session().frames;
        let end = start.saturating_add(count).min(frames.len());
        (start.min(end)..end).map(|i| (i, &frames[i])).collect()
    }

    /// Apply a command, returning the playback state afterwards
    pub fn apply(&mut self, command: ReplayCommand, now: Instant) -> Result<PlaybackState, ReplayError> {
        let controller = &mut self.controller;
        match command {
            ReplayCommand::Play => controller.play(now),
            ReplayCommand::Pause => controller.pause(),
            ReplayCommand::Toggle => controller.toggle(now),
            ReplayCommand::Restart => controller.restart(),
            ReplayCommand::Speed { value } => controller.set_speed(value)?,
            ReplayCommand::Seek { delta } => {
                controller.seek(delta);
            }
            ReplayCommand::SeekTo { frame } => {
                controller.seek_to(frame);
            }
            ReplayCommand::Lap { lap } => {
                controller.seek_to_lap(lap)?;
            }
            ReplayCommand::Select { driver } => {
                controller.select_driver(driver.as_deref())?;
            }
            ReplayCommand::Resize(limits) => controller.set_surface(limits)?,
        }
        Ok(controller.state())
    }
}

/// Stable id derived from the session's shape
fn replay_id(document: &SessionDocument) -> String {
    let mut hasher = DefaultHasher::new();
    document.event.to_string().hash(&mut hasher);
    document.track.len().hash(&mut hasher);
    document.frames.len().hash(&mut hasher);
    for code in document.drivers.keys() {
        code.hash(&mut hasher);
    }
    if let Some(last) = document.frames.last() {
        last.time.0.to_bits().hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gr_sources::DemoSource;
    use tokio::sync::broadcast;

    fn demo_replay() -> (ReplayState, broadcast::Receiver<std::sync::Arc<gr_core::RenderBatch>>) {
        let (tx, rx) = broadcast::channel(16);
        let state = ReplayState::load(
            &mut DemoSource::with_laps(1),
            SurfaceLimits::default(),
            BroadcastRenderer::new(tx),
        )
        .unwrap();
        (state, rx)
    }

    #[test]
    fn test_command_json_shapes() {
        let parse = |s: &str| serde_json::from_str::<ReplayCommand>(s).unwrap();
        assert_eq!(parse(r#"{"action":"play"}"#), ReplayCommand::Play);
        assert_eq!(parse(r#"{"action":"speed","value":2.5}"#), ReplayCommand::Speed { value: 2.5 });
        assert_eq!(parse(r#"{"action":"seek","delta":-50}"#), ReplayCommand::Seek { delta: -50 });
        assert_eq!(parse(r#"{"action":"seek_to","frame":10}"#), ReplayCommand::SeekTo { frame: 10 });
        assert_eq!(parse(r#"{"action":"select"}"#), ReplayCommand::Select { driver: None });
        assert_eq!(
            parse(r#"{"action":"resize","max_width":400,"max_height":300,"padding":10}"#),
            ReplayCommand::Resize(SurfaceLimits {
                max_width: 400.0,
                max_height: 300.0,
                padding: 10.0
            })
        );
        assert!(serde_json::from_str::<ReplayCommand>(r#"{"action":"rewind"}"#).is_err());
    }

    #[test]
    fn test_info_describes_loaded_session() {
        let (state, _rx) = demo_replay();
        let info = state.info();
        assert_eq!(info.source, "Demo");
        assert_eq!(info.replay_id.len(), 16);
        assert_eq!(info.total_laps, 1);
        assert_eq!(info.drivers.len(), 6);
        assert_eq!(info.state.current_frame_index, 0);
        assert!(!info.state.is_playing);
    }

    #[test]
    fn test_replay_id_is_stable() {
        let (a, _) = demo_replay();
        let (b, _) = demo_replay();
        assert_eq!(a.replay_id(), b.replay_id());
    }

    #[test]
    fn test_apply_publishes_batches() {
        let (mut state, mut rx) = demo_replay();
        let after = state.apply(ReplayCommand::SeekTo { frame: 30 }, Instant::now()).unwrap();
        assert_eq!(after.current_frame_index, 30);

        let batch = rx.try_recv().expect("seek should publish a batch");
        assert_eq!(batch.status.frame_index, 30);
        assert!(batch.track.is_some());
        assert_eq!(state.controller().renderer().published(), 1);
    }

    #[test]
    fn test_apply_rejects_bad_input() {
        let (mut state, _rx) = demo_replay();
        let now = Instant::now();
        assert_eq!(
            state.apply(ReplayCommand::Speed { value: -1.0 }, now),
            Err(ReplayError::InvalidSpeed(-1.0))
        );
        assert_eq!(
            state.apply(ReplayCommand::Lap { lap: 9 }, now),
            Err(ReplayError::UnknownLap(9))
        );
        assert!(state
            .apply(ReplayCommand::Select { driver: Some("ZZZ".into()) }, now)
            .is_err());
    }

    #[test]
    fn test_frames_range_is_clipped() {
        let (state, _rx) = demo_replay();
        let total = state.info().total_frames;
        assert_eq!(state.frames_range(0, 3).len(), 3);
        assert_eq!(state.frames_range(total - 2, 10).len(), 2);
        assert!(state.frames_range(total + 5, 10).is_empty());
    }
}
