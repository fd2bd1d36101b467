//! GridReplay Core Library
//!
//! This crate provides the session data model, the playback clock and the
//! pure derivations (projection, leaderboard, frame lookup) that turn a
//! recorded session into render-ready state.

pub mod clock;
pub mod controller;
pub mod error;
pub mod frames;
pub mod leaderboard;
pub mod model;
pub mod projector;
pub mod render;
pub mod source;
pub mod units;

pub use clock::{PlaybackClock, Tick};
pub use controller::{PlaybackState, ReplayController};
pub use error::ReplayError;
pub use model::{Frame, SessionDocument};
pub use render::{RenderBatch, Renderer};
pub use source::SessionSource;
