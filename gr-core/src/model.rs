//! Session data model
//!
//! Mirrors the exported session document: event metadata, the track outline,
//! the driver roster and the ordered frame list. Everything here is read-only
//! once loaded; playback state lives in the clock and controller.
//!
//! Coordinate system: native track units as recorded, X right, Y down the
//! drawing surface once projected. No axis flipping is applied.

use crate::error::ReplayError;
use crate::units::{KilometersPerHour, Seconds};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Static event metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub year: i32,
    pub name: String,
    pub round: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} - Round {}", self.year, self.name, self.round)
    }
}

/// A single vertex of the track outline in native units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub x: f64,
    pub y: f64,
}

impl TrackPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

pub const DEFAULT_DRIVER_COLOR: &str = "#FFFFFF";

fn default_color() -> String {
    DEFAULT_DRIVER_COLOR.to_string()
}

/// Roster entry. The driver code is the key of [`SessionDocument::drivers`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub abbreviation: String,
    pub full_name: String,
    pub team: String,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub number: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
}

impl Driver {
    /// Marker color, falling back to white for blank entries
    pub fn display_color(&self) -> &str {
        if self.color.trim().is_empty() {
            DEFAULT_DRIVER_COLOR
        } else {
            &self.color
        }
    }
}

/// Tyre compound
///
/// Encoded on the wire as an integer (0 = soft .. 4 = wet). Anything else,
/// including `null`, floats and strings, decodes to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "Option<i64>")]
pub enum Tyre {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
    #[default]
    Unknown,
}

impl From<Option<i64>> for Tyre {
    fn from(code: Option<i64>) -> Self {
        match code {
            Some(0) => Tyre::Soft,
            Some(1) => Tyre::Medium,
            Some(2) => Tyre::Hard,
            Some(3) => Tyre::Intermediate,
            Some(4) => Tyre::Wet,
            _ => Tyre::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for Tyre {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Tyre::from(integer_code(deserializer)?))
    }
}

impl From<Tyre> for Option<i64> {
    fn from(tyre: Tyre) -> Self {
        match tyre {
            Tyre::Soft => Some(0),
            Tyre::Medium => Some(1),
            Tyre::Hard => Some(2),
            Tyre::Intermediate => Some(3),
            Tyre::Wet => Some(4),
            Tyre::Unknown => None,
        }
    }
}

/// Per-driver telemetry inside one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Native coordinates; `None` when the car is off track or has no data
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,

    /// Classification rank, 1-based. 0 means the driver is unranked.
    #[serde(default, deserialize_with = "lenient_integer")]
    pub position: u32,

    #[serde(default, deserialize_with = "lenient_integer")]
    pub lap: u32,

    #[serde(default)]
    pub speed: KilometersPerHour,

    #[serde(default, deserialize_with = "lenient_integer")]
    pub gear: i8,

    #[serde(default, deserialize_with = "drs_flag")]
    pub drs: bool,

    #[serde(default)]
    pub tyre: Tyre,
}

impl PositionSample {
    /// Rank within the frame, if the driver has one
    pub fn rank(&self) -> Option<u32> {
        (self.position > 0).then_some(self.position)
    }

    /// Native coordinates when both axes are present and finite
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        }
    }
}

/// One timestamped snapshot of every driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub time: Seconds,
    pub lap: u32,
    #[serde(default)]
    pub positions: BTreeMap<String, PositionSample>,
}

/// Export bookkeeping carried alongside the frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub total_frames: usize,
    pub sample_rate: u32,
    pub original_frames: usize,
}

/// The complete, immutable recorded session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub event: Event,
    pub track: Vec<TrackPoint>,
    pub drivers: BTreeMap<String, Driver>,
    pub frames: Vec<Frame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SessionMetadata>,
}

impl SessionDocument {
    /// Check the structural invariants a replay depends on
    pub fn validate(&self) -> Result<(), ReplayError> {
        match self.track.len() {
            0 => return Err(ReplayError::EmptyTrack),
            1 => return Err(ReplayError::TrackTooShort { points: 1 }),
            _ => {}
        }

        if let Some(index) = self
            .track
            .iter()
            .position(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(ReplayError::NonFiniteTrackPoint { index });
        }

        if self.frames.is_empty() {
            return Err(ReplayError::NoFrames);
        }

        for (index, pair) in self.frames.windows(2).enumerate() {
            let (previous, current) = (pair[0].time.0, pair[1].time.0);
            if current < previous {
                return Err(ReplayError::TimeRegression {
                    index: index + 1,
                    previous,
                    current,
                });
            }
        }

        Ok(())
    }

    pub fn driver(&self, code: &str) -> Option<&Driver> {
        self.drivers.get(code)
    }
}

/// Accepts the DRS field as a boolean, as a 0/1 integer, or as a raw DRS
/// status code. Any non-zero value counts as active.
fn drs_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Code(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Flag(flag)) => flag,
        Some(Raw::Code(code)) => code != 0.0,
        None => false,
    })
}

/// Reads any JSON value, keeping it only if it is a whole number that fits
/// in an `i64`.
fn integer_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Code(i64),
        Other(IgnoredAny),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Code(code) => Some(code),
        Raw::Other(_) => None,
    })
}

/// Per-sample integers degrade to the field default when the value is
/// missing, mistyped or out of range for the field.
fn lenient_integer<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + TryFrom<i64>,
{
    Ok(integer_code(deserializer)?
        .and_then(|code| T::try_from(code).ok())
        .unwrap_or_default())
}

/// Racing numbers arrive as strings from some exporters and as integers from
/// others.
fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => Some(text),
        Some(Raw::Number(number)) => Some(number.to_string()),
        None => None,
    })
}
