//! Demo source that generates a synthetic race for testing
//!
//! Builds a closed circuit from straights and corners, then races a small
//! field around it at the replay's logical frame rate. Deterministic: the
//! same lap count always produces the same document.

use anyhow::Result;
use gr_core::clock::FRAMES_PER_SECOND;
use gr_core::model::*;
use gr_core::source::SessionSource;
use gr_core::units::{KilometersPerHour, Seconds};
use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use tracing::info;

// =============================================================================
// Circuit definition: a sequence of segments that form a lap
// =============================================================================

#[derive(Clone, Copy, PartialEq)]
enum SegmentKind {
    Straight,
    Corner,
}

#[derive(Clone, Copy)]
struct TrackSegment {
    kind: SegmentKind,
    length: f64,       // meters along the racing line
    turn: f64,         // total heading change in radians (+ = right)
    target_speed: f64, // m/s at end of segment
}

/// ~2.8km circuit: two long straights, a chicane and four corners
fn demo_circuit() -> Vec<TrackSegment> {
    use SegmentKind::*;
    let seg = |kind, length, turn, target_speed| TrackSegment { kind, length, turn, target_speed };
    vec![
        // Start/finish straight
        seg(Straight, 800.0, 0.0, 85.0),
        // T1: slow right-hander
        seg(Corner, 120.0, FRAC_PI_2, 30.0),
        seg(Straight, 400.0, 0.0, 70.0),
        // T2/T3: chicane
        seg(Corner, 90.0, FRAC_PI_4, 40.0),
        seg(Corner, 60.0, -FRAC_PI_4, 35.0),
        // T4: fast right
        seg(Corner, 100.0, FRAC_PI_2, 45.0),
        // Back straight
        seg(Straight, 700.0, 0.0, 80.0),
        // T5: long sweeper
        seg(Corner, 150.0, FRAC_PI_2, 50.0),
        seg(Straight, 300.0, 0.0, 65.0),
        // T6: hairpin onto the main straight
        seg(Corner, 80.0, FRAC_PI_2, 28.0),
    ]
}

/// Outline resolution in meters
const WAYPOINT_SPACING: f64 = 10.0;

/// Grid slot spacing in meters
const GRID_GAP: f64 = 8.0;

/// DRS detection window in seconds
const DRS_WINDOW: f64 = 1.0;

#[derive(Clone, Copy)]
struct Waypoint {
    x: f64,
    y: f64,
    distance: f64,
    speed: f64,
    straight: bool,
}

struct Circuit {
    waypoints: Vec<Waypoint>,
    length: f64,
}

impl Circuit {
    fn build(segments: &[TrackSegment]) -> Self {
        let mut waypoints = Vec::new();
        let (mut x, mut y, mut heading, mut distance) = (0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64);
        let mut prev_speed = segments.last().map(|s| s.target_speed).unwrap_or(50.0);
        let mut straight = true;

        for seg in segments {
            let steps = (seg.length / WAYPOINT_SPACING).ceil().max(1.0) as usize;
            let ds = seg.length / steps as f64;
            let dh = seg.turn / steps as f64;
            straight = seg.kind == SegmentKind::Straight;

            for k in 0..steps {
                let t = k as f64 / steps as f64;
                waypoints.push(Waypoint {
                    x,
                    y,
                    distance,
                    speed: lerp(prev_speed, seg.target_speed, smoothstep(t)),
                    straight,
                });
                // Midpoint heading keeps arcs symmetric
                heading += dh / 2.0;
                x += ds * heading.cos();
                y += ds * heading.sin();
                heading += dh / 2.0;
                distance += ds;
            }
            prev_speed = seg.target_speed;
        }

        waypoints.push(Waypoint {
            x,
            y,
            distance,
            speed: prev_speed,
            straight,
        });

        // Close the loop back to the start line
        let start = waypoints[0];
        let length = distance + (x - start.x).hypot(y - start.y);

        Self { waypoints, length }
    }

    fn outline(&self) -> Vec<TrackPoint> {
        let mut points: Vec<TrackPoint> = self
            .waypoints
            .iter()
            .map(|w| TrackPoint::new(w.x, w.y))
            .collect();
        if let Some(first) = points.first().copied() {
            points.push(first);
        }
        points
    }

    /// Interpolated waypoint at race distance `d` (any lap)
    fn locate(&self, d: f64) -> Waypoint {
        let d = d.rem_euclid(self.length);
        let i = self
            .waypoints
            .partition_point(|w| w.distance <= d)
            .saturating_sub(1);
        let a = self.waypoints[i];
        let b = match self.waypoints.get(i + 1) {
            Some(next) => *next,
            None => Waypoint {
                distance: self.length,
                ..self.waypoints[0]
            },
        };
        let span = (b.distance - a.distance).max(f64::EPSILON);
        let t = ((d - a.distance) / span).clamp(0.0, 1.0);

        Waypoint {
            x: lerp(a.x, b.x, t),
            y: lerp(a.y, b.y, t),
            distance: d,
            speed: lerp(a.speed, b.speed, t),
            straight: a.straight,
        }
    }

    fn lap_of(&self, d: f64) -> u32 {
        (d.max(0.0) / self.length).floor() as u32 + 1
    }
}

fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn speed_to_gear(speed_ms: f64) -> i8 {
    let kph = speed_ms * 3.6;
    match kph {
        x if x < 80.0 => 2,
        x if x < 120.0 => 3,
        x if x < 160.0 => 4,
        x if x < 200.0 => 5,
        x if x < 240.0 => 6,
        x if x < 280.0 => 7,
        _ => 8,
    }
}

// =============================================================================
// Field
// =============================================================================

struct Entrant {
    code: &'static str,
    full_name: &'static str,
    team: &'static str,
    number: &'static str,
    color: &'static str,
    tyre: Tyre,
    pace: f64,
}

fn demo_field() -> Vec<Entrant> {
    let entrant = |code, full_name, team, number, color, tyre, pace| Entrant {
        code,
        full_name,
        team,
        number,
        color,
        tyre,
        pace,
    };
    vec![
        entrant("HAR", "Ada Harper", "Apex Racing", "7", "#E10600", Tyre::Soft, 1.000),
        entrant("KOV", "Ivan Kovac", "Apex Racing", "21", "#FF6F61", Tyre::Medium, 0.996),
        entrant("MEN", "Lucia Mendes", "Northline GP", "5", "#00A19C", Tyre::Medium, 0.993),
        entrant("OKA", "Ren Okada", "Northline GP", "12", "#6CD3BF", Tyre::Hard, 0.991),
        entrant("BRU", "Theo Brun", "Vantage Motorsport", "33", "#FF8000", Tyre::Hard, 0.988),
        entrant("SOL", "Maya Sol", "Vantage Motorsport", "9", "#2293D1", Tyre::Intermediate, 0.984),
    ]
}

/// Pace with a slow wobble so the order changes during the race
fn pace(entrant: &Entrant, slot: usize, time: f64) -> f64 {
    entrant.pace * (1.0 + 0.012 * (time * 0.07 + slot as f64 * 1.7).sin())
}

/// Whether an entrant's telemetry drops out for this frame
fn dropout(slot: usize, field_size: usize, frame_index: usize) -> bool {
    slot + 1 == field_size && frame_index % 600 < 12
}

// =============================================================================
// DemoSource
// =============================================================================

pub struct DemoSource {
    laps: u32,
}

impl DemoSource {
    pub const DEFAULT_LAPS: u32 = 3;

    /// Longest race the generator builds; every frame is held in memory
    pub const MAX_LAPS: u32 = 20;

    pub fn new() -> Self {
        Self::with_laps(Self::DEFAULT_LAPS)
    }

    pub fn with_laps(laps: u32) -> Self {
        Self {
            laps: laps.clamp(1, Self::MAX_LAPS),
        }
    }

    pub fn laps(&self) -> u32 {
        self.laps
    }

    fn generate(&self) -> SessionDocument {
        let circuit = Circuit::build(&demo_circuit());
        let field = demo_field();
        let n = field.len();
        let dt = 1.0 / FRAMES_PER_SECOND as f64;
        let race_distance = self.laps as f64 * circuit.length;

        let drivers: BTreeMap<String, Driver> = field
            .iter()
            .map(|e| {
                (
                    e.code.to_string(),
                    Driver {
                        abbreviation: e.code.to_string(),
                        full_name: e.full_name.to_string(),
                        team: e.team.to_string(),
                        number: Some(e.number.to_string()),
                        color: e.color.to_string(),
                    },
                )
            })
            .collect();

        // Grid order follows roster order
        let mut distances: Vec<f64> = (0..n).map(|slot| (n - slot) as f64 * GRID_GAP).collect();
        let mut frames = Vec::new();

        for frame_index in 0usize.. {
            let time = frame_index as f64 * dt;

            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by(|&a, &b| distances[b].total_cmp(&distances[a]));

            let mut speeds = vec![0.0; n];
            let mut positions = BTreeMap::new();

            for (rank, &slot) in order.iter().enumerate() {
                let entrant = &field[slot];
                let d = distances[slot];
                let here = circuit.locate(d);
                let speed = here.speed * pace(entrant, slot, time);
                speeds[slot] = speed;

                let drs = rank > 0 && here.straight && {
                    let gap = distances[order[rank - 1]] - d;
                    gap / speed.max(1.0) < DRS_WINDOW
                };
                let visible = !dropout(slot, n, frame_index);

                positions.insert(
                    entrant.code.to_string(),
                    PositionSample {
                        x: visible.then_some(here.x),
                        y: visible.then_some(here.y),
                        position: rank as u32 + 1,
                        lap: circuit.lap_of(d).min(self.laps),
                        speed: KilometersPerHour::from_meters_per_second(speed),
                        gear: speed_to_gear(speed),
                        drs,
                        tyre: entrant.tyre,
                    },
                );
            }

            let leader = distances[order[0]];
            frames.push(Frame {
                time: Seconds(time),
                lap: circuit.lap_of(leader).min(self.laps),
                positions,
            });

            if leader >= race_distance {
                break;
            }

            for (d, speed) in distances.iter_mut().zip(&speeds) {
                *d += speed * dt;
            }
        }

        let frame_count = frames.len();
        SessionDocument {
            event: Event {
                year: 2025,
                name: "GridReplay Demo Grand Prix".to_string(),
                round: 1,
                country: Some("Demo".to_string()),
                location: Some("Demo Circuit".to_string()),
            },
            track: circuit.outline(),
            drivers,
            frames,
            metadata: Some(SessionMetadata {
                total_frames: frame_count,
                sample_rate: 1,
                original_frames: frame_count,
            }),
        }
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionSource for DemoSource {
    fn name(&self) -> &str {
        "Demo"
    }

    fn load(&mut self) -> Result<SessionDocument> {
        let document = self.generate();
        document.validate()?;
        info!(
            "Generated demo session: {} laps, {} frames, {} drivers",
            self.laps,
            document.frames.len(),
            document.drivers.len()
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_turns_full_circle() {
        let total: f64 = demo_circuit().iter().map(|s| s.turn).sum();
        assert!((total - std::f64::consts::TAU).abs() < 1e-9);
    }

    #[test]
    fn test_circuit_locate_wraps() {
        let circuit = Circuit::build(&demo_circuit());
        let start = circuit.locate(0.0);
        let wrapped = circuit.locate(circuit.length);
        assert!((start.x - wrapped.x).abs() < 1e-6);
        assert!((start.y - wrapped.y).abs() < 1e-6);
        assert!(circuit.locate(-5.0).distance > 0.0);
        assert_eq!(circuit.lap_of(circuit.length * 1.5), 2);
    }

    #[test]
    fn test_outline_is_closed() {
        let outline = Circuit::build(&demo_circuit()).outline();
        assert!(outline.len() > 100);
        assert_eq!(outline.first(), outline.last());
    }

    #[test]
    fn test_speed_to_gear() {
        assert_eq!(speed_to_gear(10.0), 2);
        assert_eq!(speed_to_gear(50.0), 5);
        assert_eq!(speed_to_gear(85.0), 8);
    }
}
