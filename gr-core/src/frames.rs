//! Frame lookup and session-wide aggregates
//!
//! Aggregates (total laps, lap index, duration) are computed once when the
//! indexer is built and cached, never per render.

use crate::model::Frame;
use crate::units::Seconds;
use serde::Serialize;

/// Bounds-checked frame access
pub fn frame_at(frames: &[Frame], index: usize) -> Option<&Frame> {
    frames.get(index)
}

/// Highest lap number seen in any frame
pub fn total_laps(frames: &[Frame]) -> u32 {
    frames.iter().map(|f| f.lap).max().unwrap_or(0)
}

/// Format elapsed seconds as `HH:MM:SS`, truncating fractional seconds
pub fn format_elapsed(seconds: f64) -> String {
    let total = Seconds(seconds).whole();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Span of frames that share a lap number
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapInfo {
    pub lap: u32,
    pub start_frame: usize,
    pub end_frame: usize,
    pub start_time: f64,
    pub duration_secs: f64,
}

/// Cached aggregates over an immutable frame list
#[derive(Debug, Clone)]
pub struct FrameIndexer {
    frame_count: usize,
    total_laps: u32,
    duration_secs: f64,
    laps: Vec<LapInfo>,
}

impl FrameIndexer {
    pub fn new(frames: &[Frame]) -> Self {
        let duration_secs = match (frames.first(), frames.last()) {
            (Some(first), Some(last)) => (last.time.0 - first.time.0).max(0.0),
            _ => 0.0,
        };

        Self {
            frame_count: frames.len(),
            total_laps: total_laps(frames),
            duration_secs,
            laps: build_lap_index(frames),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn last_index(&self) -> usize {
        self.frame_count.saturating_sub(1)
    }

    pub fn total_laps(&self) -> u32 {
        self.total_laps
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn laps(&self) -> &[LapInfo] {
        &self.laps
    }

    /// First frame of the first run of `lap`
    pub fn lap_start(&self, lap: u32) -> Option<usize> {
        self.laps
            .iter()
            .find(|info| info.lap == lap)
            .map(|info| info.start_frame)
    }

    /// `"{lap} / {total}"` text for the race status line
    pub fn lap_text(&self, frame: &Frame) -> String {
        format!("{} / {}", frame.lap, self.total_laps)
    }
}

/// One entry per contiguous run of equal `frame.lap` values
fn build_lap_index(frames: &[Frame]) -> Vec<LapInfo> {
    let mut laps: Vec<LapInfo> = Vec::new();

    for (index, frame) in frames.iter().enumerate() {
        match laps.last_mut() {
            Some(current) if current.lap == frame.lap => {
                current.end_frame = index;
                current.duration_secs = frame.time.0 - current.start_time;
            }
            _ => laps.push(LapInfo {
                lap: frame.lap,
                start_frame: index,
                end_frame: index,
                start_time: frame.time.0,
                duration_secs: 0.0,
            }),
        }
    }

    // A lap lasts until the next one starts, not until its last sample
    for i in 1..laps.len() {
        let next_start = laps[i].start_time;
        let current = &mut laps[i - 1];
        current.duration_secs = next_start - current.start_time;
    }

    laps
}
