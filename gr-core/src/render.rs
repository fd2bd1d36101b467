//! Renderer boundary
//!
//! The controller computes everything a view needs and hands it over as one
//! [`RenderBatch`] per render request. Implementations do the drawing.

use crate::leaderboard::{DriverDetails, LeaderboardRow};
use crate::projector::{SurfacePoint, SurfaceSize};
use serde::Serialize;

/// Trait for render targets
pub trait Renderer {
    /// Draw one batch. Nothing is returned to the controller.
    fn render(&mut self, batch: &RenderBatch);
}

/// Headless renderer that keeps every batch, oldest first
impl Renderer for Vec<RenderBatch> {
    fn render(&mut self, batch: &RenderBatch) {
        self.push(batch.clone());
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render(&mut self, batch: &RenderBatch) {
        (**self).render(batch);
    }
}

/// A visible car, already in surface coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarMarker {
    pub driver_code: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub label: String,
    pub is_selected: bool,
}

/// Race status line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceStatus {
    pub frame_index: usize,
    pub total_frames: usize,
    pub lap: u32,
    pub total_laps: u32,
    pub lap_text: String,
    pub elapsed_secs: f64,
    pub time_text: String,
    pub playing: bool,
    pub speed: f64,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderBatch {
    pub title: String,
    pub surface: SurfaceSize,

    /// Track outline in surface coordinates. Only present when the surface
    /// changed since the previous batch (or a full redraw was requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<Vec<SurfacePoint>>,

    pub cars: Vec<CarMarker>,
    pub status: RaceStatus,
    pub leaderboard: Vec<LeaderboardRow>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<DriverDetails>,
}
