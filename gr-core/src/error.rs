//! Error taxonomy for session validation and replay commands

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    // Structural problems with the session document. These are load-time
    // failures: a replay is never constructed from such a document.
    #[error("track outline is empty")]
    EmptyTrack,
    #[error("track outline needs at least 2 points, got {points}")]
    TrackTooShort { points: usize },
    #[error("track point {index} has a non-finite coordinate")]
    NonFiniteTrackPoint { index: usize },
    #[error("session contains no frames")]
    NoFrames,
    #[error("frame {index} goes back in time ({current}s after {previous}s)")]
    TimeRegression {
        index: usize,
        previous: f64,
        current: f64,
    },

    // Invalid command arguments. Rejected before any state changes.
    #[error("playback speed must be a positive number, got {0}")]
    InvalidSpeed(f64),
    #[error("invalid surface limits: {reason}")]
    InvalidSurface { reason: String },
    #[error("unknown driver: {0}")]
    UnknownDriver(String),
    #[error("lap {0} does not appear in the session")]
    UnknownLap(u32),
}
