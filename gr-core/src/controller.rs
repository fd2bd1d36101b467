//! Replay controller
//!
//! Owns one replay: the session, the clock, the selection and the renderer.
//! Every command runs synchronously and finishes by rendering the settled
//! state, so a batch never reflects a half-applied command. There is no
//! global instance; construct as many controllers as needed.

use crate::clock::{PlaybackClock, Tick};
use crate::error::ReplayError;
use crate::frames::{self, FrameIndexer};
use crate::leaderboard::{self, DriverDetails, LeaderboardRow};
use crate::model::{Frame, SessionDocument};
use crate::projector::{Bounds, SurfaceLimits, Transform};
use crate::render::{CarMarker, RaceStatus, RenderBatch, Renderer};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Snapshot of the mutable playback state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub current_frame_index: usize,
    pub is_playing: bool,
    pub speed_multiplier: f64,
    pub selected_driver: Option<String>,
}

pub struct ReplayController<R: Renderer> {
    session: Arc<SessionDocument>,
    indexer: FrameIndexer,
    bounds: Bounds,
    limits: SurfaceLimits,
    transform: Transform,
    clock: PlaybackClock,
    selected: Option<String>,
    renderer: R,
    track_dirty: bool,
}

impl<R: Renderer> ReplayController<R> {
    /// Validate the session and prepare a stopped replay at frame 0.
    ///
    /// Nothing is rendered until the first command or [`Self::render`].
    pub fn new(
        session: impl Into<Arc<SessionDocument>>,
        limits: SurfaceLimits,
        renderer: R,
    ) -> Result<Self, ReplayError> {
        let session = session.into();
        session.validate()?;
        limits.validate()?;

        let bounds = Bounds::from_track(&session.track)?;
        let transform = Transform::fit(bounds, limits);
        let indexer = FrameIndexer::new(&session.frames);
        let clock = PlaybackClock::new(indexer.frame_count())?;

        info!(
            "Replay ready: {} ({} frames, {} drivers, {} laps, {} track points)",
            session.event,
            indexer.frame_count(),
            session.drivers.len(),
            indexer.total_laps(),
            session.track.len()
        );

        Ok(Self {
            session,
            indexer,
            bounds,
            limits,
            transform,
            clock,
            selected: None,
            renderer,
            track_dirty: true,
        })
    }

    // === Accessors ===

    pub fn session(&self) -> &Arc<SessionDocument> {
        &self.session
    }

    pub fn indexer(&self) -> &FrameIndexer {
        &self.indexer
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn limits(&self) -> SurfaceLimits {
        self.limits
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn current_index(&self) -> usize {
        self.clock.index()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn speed(&self) -> f64 {
        self.clock.speed()
    }

    pub fn selected_driver(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            current_frame_index: self.clock.index(),
            is_playing: self.clock.is_playing(),
            speed_multiplier: self.clock.speed(),
            selected_driver: self.selected.clone(),
        }
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        frames::frame_at(&self.session.frames, index)
    }

    pub fn current_frame(&self) -> &Frame {
        // The clock clamps its index to the validated, non-empty frame list
        &self.session.frames[self.clock.index()]
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardRow> {
        leaderboard::derive(
            self.current_frame(),
            &self.session.drivers,
            self.selected.as_deref(),
        )
    }

    // === Commands ===

    pub fn play(&mut self, now: Instant) {
        self.clock.play(now);
        self.render();
    }

    pub fn pause(&mut self) {
        self.clock.pause();
        self.render();
    }

    pub fn toggle(&mut self, now: Instant) {
        self.clock.toggle(now);
        self.render();
    }

    pub fn restart(&mut self) {
        self.clock.restart();
        self.render();
    }

    pub fn set_speed(&mut self, speed: f64) -> Result<(), ReplayError> {
        self.clock.set_speed(speed)?;
        debug!("Playback speed set to {}x", speed);
        self.render();
        Ok(())
    }

    pub fn seek(&mut self, delta: i64) -> usize {
        let index = self.clock.seek(delta);
        self.render();
        index
    }

    pub fn seek_to(&mut self, index: usize) -> usize {
        let index = self.clock.seek_to(index);
        self.render();
        index
    }

    /// Jump to the first frame of `lap`
    pub fn seek_to_lap(&mut self, lap: u32) -> Result<usize, ReplayError> {
        let start = self
            .indexer
            .lap_start(lap)
            .ok_or(ReplayError::UnknownLap(lap))?;
        Ok(self.seek_to(start))
    }

    /// Toggle the selection. `None` clears it; selecting the driver that is
    /// already selected also clears it. Unknown codes are rejected.
    pub fn select_driver(&mut self, code: Option<&str>) -> Result<Option<&str>, ReplayError> {
        match code {
            None => self.selected = None,
            Some(code) if !self.session.drivers.contains_key(code) => {
                return Err(ReplayError::UnknownDriver(code.to_string()));
            }
            Some(code) if self.selected.as_deref() == Some(code) => self.selected = None,
            Some(code) => self.selected = Some(code.to_string()),
        }
        debug!("Selected driver: {:?}", self.selected);
        self.render();
        Ok(self.selected.as_deref())
    }

    /// Refit the track to new surface limits. The next batch carries the
    /// re-projected outline.
    pub fn set_surface(&mut self, limits: SurfaceLimits) -> Result<(), ReplayError> {
        limits.validate()?;
        self.limits = limits;
        self.transform = Transform::fit(self.bounds, limits);
        self.track_dirty = true;
        debug!(
            "Surface resized to {:.0}x{:.0} (scale {:.4})",
            self.transform.surface.width, self.transform.surface.height, self.transform.scale
        );
        self.render();
        Ok(())
    }

    /// Render again with the track outline included
    pub fn redraw(&mut self) {
        self.track_dirty = true;
        self.render();
    }

    /// Advance the clock from host time and render if the index moved
    pub fn tick(&mut self, now: Instant) -> Tick {
        let tick = self.clock.tick(now);
        if tick.moved() {
            self.render();
        }
        tick
    }

    /// Compute the batch for the current state and hand it to the renderer
    pub fn render(&mut self) {
        let batch = self.build_batch();
        self.renderer.render(&batch);
        self.track_dirty = false;
    }

    fn build_batch(&self) -> RenderBatch {
        let frame = self.current_frame();
        let selected = self.selected.as_deref();

        let track = self
            .track_dirty
            .then(|| self.transform.project_track(&self.session.track));

        RenderBatch {
            title: self.session.event.to_string(),
            surface: self.transform.surface,
            track,
            cars: self.car_markers(frame, selected),
            status: RaceStatus {
                frame_index: self.clock.index(),
                total_frames: self.indexer.frame_count(),
                lap: frame.lap,
                total_laps: self.indexer.total_laps(),
                lap_text: self.indexer.lap_text(frame),
                elapsed_secs: frame.time.0,
                time_text: frames::format_elapsed(frame.time.0),
                playing: self.clock.is_playing(),
                speed: self.clock.speed(),
            },
            leaderboard: leaderboard::derive(frame, &self.session.drivers, selected),
            details: selected
                .and_then(|code| DriverDetails::derive(code, frame, &self.session.drivers)),
        }
    }

    /// Cars without coordinates or without a roster entry are left out
    fn car_markers(&self, frame: &Frame, selected: Option<&str>) -> Vec<CarMarker> {
        frame
            .positions
            .iter()
            .filter_map(|(code, sample)| {
                let (x, y) = sample.coordinates()?;
                let driver = self.session.drivers.get(code)?;
                let point = self.transform.project(x, y);
                Some(CarMarker {
                    driver_code: code.clone(),
                    x: point.x,
                    y: point.y,
                    color: driver.display_color().to_string(),
                    label: driver.abbreviation.clone(),
                    is_selected: selected == Some(code.as_str()),
                })
            })
            .collect()
    }
}
