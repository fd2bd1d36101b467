//! GridReplay Server Library
//!
//! Exposes server components for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod playback;
pub mod renderer;
pub mod replay;
pub mod state;
