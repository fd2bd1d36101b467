//! Leaderboard and driver-detail derivation
//!
//! Pure projections of a frame: no I/O and no playback state mutation.

use crate::model::{Driver, Frame, PositionSample, Tyre};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Display encoding of a tyre compound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TyreBadge {
    pub class_name: &'static str,
    pub short_label: &'static str,
}

impl Tyre {
    pub fn badge(&self) -> TyreBadge {
        let (class_name, short_label) = match self {
            Tyre::Soft => ("tyre-soft", "S"),
            Tyre::Medium => ("tyre-medium", "M"),
            Tyre::Hard => ("tyre-hard", "H"),
            Tyre::Intermediate => ("tyre-inter", "I"),
            Tyre::Wet => ("tyre-wet", "W"),
            Tyre::Unknown => ("tyre-unknown", "?"),
        };
        TyreBadge {
            class_name,
            short_label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub driver_code: String,
    pub driver: Driver,
    pub sample: PositionSample,
    pub badge: TyreBadge,
    pub is_selected: bool,
}

/// Ranked rows for one frame.
///
/// Samples for drivers missing from the roster are skipped. Rows sort by
/// rank, unranked drivers last, ties broken by driver code.
pub fn derive(
    frame: &Frame,
    drivers: &BTreeMap<String, Driver>,
    selected: Option<&str>,
) -> Vec<LeaderboardRow> {
    let mut entries: Vec<(&String, &Driver, &PositionSample)> = frame
        .positions
        .iter()
        .filter_map(|(code, sample)| match drivers.get(code) {
            Some(driver) => Some((code, driver, sample)),
            None => {
                tracing::debug!("Skipping leaderboard entry for unknown driver {}", code);
                None
            }
        })
        .collect();

    entries.sort_by(|a, b| compare_rank(a.2, b.2).then_with(|| a.0.cmp(b.0)));

    entries
        .into_iter()
        .map(|(code, driver, sample)| LeaderboardRow {
            driver_code: code.clone(),
            driver: driver.clone(),
            sample: sample.clone(),
            badge: sample.tyre.badge(),
            is_selected: selected == Some(code.as_str()),
        })
        .collect()
}

fn compare_rank(a: &PositionSample, b: &PositionSample) -> Ordering {
    match (a.rank(), b.rank()) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Detail panel for the selected driver
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverDetails {
    pub driver_code: String,
    pub full_name: String,
    pub team: String,
    pub position: Option<u32>,
    pub lap: u32,
    pub speed_kph: i64,
    pub gear: i8,
    pub drs_label: &'static str,
    pub tyre_label: &'static str,
}

impl DriverDetails {
    /// `None` when the driver is not on the roster or absent from the frame
    pub fn derive(code: &str, frame: &Frame, drivers: &BTreeMap<String, Driver>) -> Option<Self> {
        let driver = drivers.get(code)?;
        let sample = frame.positions.get(code)?;

        Some(DriverDetails {
            driver_code: code.to_string(),
            full_name: driver.full_name.clone(),
            team: driver.team.clone(),
            position: sample.rank(),
            lap: sample.lap,
            speed_kph: sample.speed.rounded(),
            gear: sample.gear,
            drs_label: if sample.drs { "Active" } else { "Inactive" },
            tyre_label: sample.tyre.badge().short_label,
        })
    }
}
