//! Server configuration
//!
//! Every option can come from the command line or a `GRIDREPLAY_*`
//! environment variable. Log filtering stays on `RUST_LOG`.

use clap::Parser;
use gr_core::projector::SurfaceLimits;
use gr_core::SessionSource;
use gr_sources::{DemoSource, JsonSessionSource};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// File name looked up in the platform data directory when no session is given
pub const DEFAULT_SESSION_FILE: &str = "race_data.json";

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Replay a recorded race session", long_about = None)]
pub struct ServerConfig {
    /// Session document (exported race JSON) to load at startup
    #[arg(short, long, env = "GRIDREPLAY_SESSION")]
    pub session: Option<PathBuf>,

    /// Load the generated demo session at startup
    #[arg(long, env = "GRIDREPLAY_DEMO", conflicts_with = "session")]
    pub demo: bool,

    /// Laps raced by the demo session
    #[arg(long, env = "GRIDREPLAY_DEMO_LAPS", default_value_t = DemoSource::DEFAULT_LAPS,
          value_parser = clap::value_parser!(u32).range(1..=DemoSource::MAX_LAPS as i64))]
    pub demo_laps: u32,

    /// Address to listen on
    #[arg(short, long, env = "GRIDREPLAY_BIND", default_value = "0.0.0.0:9200")]
    pub bind: SocketAddr,

    /// Maximum drawing-surface width the track is fitted into
    #[arg(long, env = "GRIDREPLAY_MAX_WIDTH", default_value_t = 900.0)]
    pub max_width: f64,

    /// Maximum drawing-surface height the track is fitted into
    #[arg(long, env = "GRIDREPLAY_MAX_HEIGHT", default_value_t = 700.0)]
    pub max_height: f64,

    /// Padding around the fitted track
    #[arg(long, env = "GRIDREPLAY_PADDING", default_value_t = 50.0)]
    pub padding: f64,

    /// How often the playback task ticks the clock
    #[arg(long, env = "GRIDREPLAY_TICK_HZ", default_value_t = 60,
          value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub tick_hz: u32,

    /// Start playing as soon as the startup session is loaded
    #[arg(long, env = "GRIDREPLAY_AUTOPLAY")]
    pub autoplay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::parse_from(["gr-server"])
    }
}

impl ServerConfig {
    pub fn surface_limits(&self) -> SurfaceLimits {
        SurfaceLimits {
            max_width: self.max_width,
            max_height: self.max_height,
            padding: self.padding,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz.max(1) as f64)
    }

    /// Pick the source to load at startup: explicit file, then demo, then
    /// `race_data.json` in the platform data directory if it exists.
    pub fn startup_source(&self) -> Option<Box<dyn SessionSource>> {
        if let Some(path) = &self.session {
            return Some(Box::new(JsonSessionSource::from_path(path)));
        }
        if self.demo {
            return Some(Box::new(DemoSource::with_laps(self.demo_laps)));
        }

        let fallback = dirs::data_dir()?.join("gridreplay").join(DEFAULT_SESSION_FILE);
        if fallback.is_file() {
            info!("Using session from {}", fallback.display());
            Some(Box::new(JsonSessionSource::from_path(fallback)))
        } else {
            None
        }
    }
}
