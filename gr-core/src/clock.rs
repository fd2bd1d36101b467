//! Playback clock
//!
//! Advances the frame index from elapsed wall-clock time and a speed
//! multiplier. The clock never schedules anything itself: the host calls
//! [`PlaybackClock::tick`] as often as it likes and the frame rate of the
//! host does not change the simulated time.
//!
//! Sub-frame remainders are dropped: a tick that yields zero frames leaves
//! the reference time untouched, a tick that yields frames discards the
//! fractional part when it moves the reference to `now`.

use crate::error::ReplayError;
use std::time::{Duration, Instant};

/// Logical frame rate of a session at 1x speed
pub const FRAMES_PER_SECOND: u32 = 25;

/// Wall-clock length of one logical frame at 1x speed
pub const FRAME_INTERVAL: Duration = Duration::from_millis(1000 / FRAMES_PER_SECOND as u64);

/// Frames to step per manual seek (arrow keys)
pub const SEEK_STEP: i64 = 50;

/// Whole frames covered by `elapsed` at `speed`, floored.
///
/// A product too large for `f64` saturates to `usize::MAX`.
pub fn frames_to_advance(elapsed: Duration, speed: f64) -> usize {
    let intervals = elapsed.as_micros() as f64 / FRAME_INTERVAL.as_micros() as f64;
    let frames = (intervals * speed).floor();
    if frames.is_nan() || frames <= 0.0 {
        0
    } else {
        // Float to int casts saturate, so +inf lands on usize::MAX
        frames as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running { last_tick: Instant },
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Clock is stopped; nothing happened
    Idle,
    /// Running, but less than one frame has elapsed
    Held,
    /// Index moved forward
    Advanced { from: usize, to: usize },
    /// Index reached the last frame and the clock stopped itself
    Finished { index: usize },
}

impl Tick {
    pub fn moved(&self) -> bool {
        matches!(self, Tick::Advanced { .. } | Tick::Finished { .. })
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackClock {
    index: usize,
    last_index: usize,
    speed: f64,
    state: ClockState,
}

impl PlaybackClock {
    /// A stopped clock at frame 0 over `frame_count` frames
    pub fn new(frame_count: usize) -> Result<Self, ReplayError> {
        if frame_count == 0 {
            return Err(ReplayError::NoFrames);
        }
        Ok(Self {
            index: 0,
            last_index: frame_count - 1,
            speed: 1.0,
            state: ClockState::Stopped,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn last_index(&self) -> usize {
        self.last_index
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, ClockState::Running { .. })
    }

    pub fn play(&mut self, now: Instant) {
        if let ClockState::Stopped = self.state {
            self.state = ClockState::Running { last_tick: now };
            tracing::debug!("Clock running from frame {}", self.index);
        }
    }

    pub fn pause(&mut self) {
        if self.is_playing() {
            tracing::debug!("Clock paused at frame {}", self.index);
        }
        self.state = ClockState::Stopped;
    }

    pub fn toggle(&mut self, now: Instant) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play(now);
        }
    }

    pub fn restart(&mut self) {
        self.state = ClockState::Stopped;
        self.index = 0;
    }

    /// Takes effect on the next tick. Non-positive or non-finite speeds are
    /// rejected and leave the clock untouched.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), ReplayError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ReplayError::InvalidSpeed(speed));
        }
        self.speed = speed;
        Ok(())
    }

    /// Relative seek, clamped. Run state is unchanged.
    pub fn seek(&mut self, delta: i64) -> usize {
        let target = if delta.is_negative() {
            self.index.saturating_sub(delta.unsigned_abs() as usize)
        } else {
            self.index.saturating_add(delta as usize)
        };
        self.seek_to(target)
    }

    /// Absolute seek, clamped. Run state is unchanged.
    pub fn seek_to(&mut self, index: usize) -> usize {
        self.index = index.min(self.last_index);
        self.index
    }

    pub fn tick(&mut self, now: Instant) -> Tick {
        let last_tick = match self.state {
            ClockState::Stopped => return Tick::Idle,
            ClockState::Running { last_tick } => last_tick,
        };

        let advance = frames_to_advance(now.saturating_duration_since(last_tick), self.speed);
        if advance == 0 {
            return Tick::Held;
        }

        let from = self.index;
        let target = from.saturating_add(advance);
        if target > self.last_index {
            self.index = self.last_index;
            self.state = ClockState::Stopped;
            tracing::debug!("Reached final frame {}, clock stopped", self.index);
            return Tick::Finished { index: self.index };
        }

        self.index = target;
        self.state = ClockState::Running { last_tick: now };
        Tick::Advanced { from, to: target }
    }
}
