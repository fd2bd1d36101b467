//! Track-space to surface-space projection
//!
//! A single uniform scale plus offset, derived once from the track outline
//! and the drawing-surface limits, and reused for every vertex and car.

use crate::error::ReplayError;
use crate::model::TrackPoint;
use serde::{Deserialize, Serialize};

/// Smallest extent (native units) used when the track is degenerate along an
/// axis, so the scale never divides by zero.
pub const MIN_EXTENT: f64 = 1.0;

/// Axis-aligned bounds of the track outline in native units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Scan the outline once. An empty outline is a configuration error.
    pub fn from_track(track: &[TrackPoint]) -> Result<Self, ReplayError> {
        let first = track.first().ok_or(ReplayError::EmptyTrack)?;
        let mut bounds = Bounds {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };
        for point in &track[1..] {
            bounds.min_x = bounds.min_x.min(point.x);
            bounds.max_x = bounds.max_x.max(point.x);
            bounds.min_y = bounds.min_y.min(point.y);
            bounds.max_y = bounds.max_y.max(point.y);
        }
        Ok(bounds)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Maximum drawing area the track is fitted into
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceLimits {
    pub max_width: f64,
    pub max_height: f64,
    pub padding: f64,
}

impl Default for SurfaceLimits {
    fn default() -> Self {
        Self {
            max_width: 900.0,
            max_height: 700.0,
            padding: 50.0,
        }
    }
}

impl SurfaceLimits {
    pub fn validate(&self) -> Result<(), ReplayError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.max_width) || !positive(self.max_height) {
            return Err(ReplayError::InvalidSurface {
                reason: format!(
                    "maximum size must be positive, got {}x{}",
                    self.max_width, self.max_height
                ),
            });
        }
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(ReplayError::InvalidSurface {
                reason: format!("padding must be non-negative, got {}", self.padding),
            });
        }
        Ok(())
    }
}

/// Resulting drawing-surface size, padding included
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

/// A point in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    pub x: f64,
    pub y: f64,
}

/// Affine native → surface mapping: `surface = native * scale + offset`.
///
/// The offsets already fold in the bounds minimum and the padding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub padding: f64,
    pub surface: SurfaceSize,
    bounds: Bounds,
}

impl Transform {
    /// Fit the bounds into the limits with a uniform scale
    pub fn fit(bounds: Bounds, limits: SurfaceLimits) -> Self {
        let width = bounds.width().max(MIN_EXTENT);
        let height = bounds.height().max(MIN_EXTENT);
        let scale = (limits.max_width / width).min(limits.max_height / height);
        let padding = limits.padding;

        Transform {
            scale,
            offset_x: -bounds.min_x * scale + padding,
            offset_y: -bounds.min_y * scale + padding,
            padding,
            surface: SurfaceSize {
                width: width * scale + padding * 2.0,
                height: height * scale + padding * 2.0,
            },
            bounds,
        }
    }

    /// Convenience for the common case of fitting a whole outline
    pub fn for_track(track: &[TrackPoint], limits: SurfaceLimits) -> Result<Self, ReplayError> {
        Ok(Self::fit(Bounds::from_track(track)?, limits))
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn project(&self, x: f64, y: f64) -> SurfacePoint {
        SurfacePoint {
            x: x * self.scale + self.offset_x,
            y: y * self.scale + self.offset_y,
        }
    }

    pub fn project_point(&self, point: &TrackPoint) -> SurfacePoint {
        self.project(point.x, point.y)
    }

    pub fn project_track(&self, track: &[TrackPoint]) -> Vec<SurfacePoint> {
        track.iter().map(|p| self.project_point(p)).collect()
    }
}
