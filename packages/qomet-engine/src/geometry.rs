//! Geometry & antenna model (§4.1).
//!
//! Grounded on `examples/original_source/deltaQ/generic.c`
//! (`antenna_azimuth_attenuation`, `antenna_elevation_attenuation`,
//! `antenna_directional_attenuation`) — the azimuth fold-to-[0,180] and the
//! `3 * 2 * angle_diff / beamwidth` linear-in-angle term are reproduced
//! exactly from that source.

use serde::{Deserialize, Serialize};

use crate::constants::{ANTENNA_MAX_ATTENUATION, MIN_DISTANCE};

/// A position in whatever coordinate system the scenario declared
/// (`cartesian_coord_syst`); QOMET treats both the same way once resolved to
/// (x,y,z) meters, so no separate lat/lon variant is carried past init
/// (projection is the Geo collaborator's job, §6).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Euclidean distance between two coordinates, clamped to `MIN_DISTANCE`
/// (§4.1, §8 "Distance is symmetric and clamped").
///
/// Returns the clamped distance and whether clamping occurred, so the
/// caller can record the "first clamp per connection per tick" warning
/// required by §4.1 without this function owning any logging state.
pub fn distance(a: Coordinate, b: Coordinate) -> (f64, bool) {
    let raw = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2) + (a.z - b.z).powi(2)).sqrt();
    if raw < MIN_DISTANCE {
        (MIN_DISTANCE, true)
    } else {
        (raw, false)
    }
}

/// An interface's directional-antenna pattern: orientation + beamwidth in
/// both azimuth (x-y plane) and elevation (x-z plane). `beamwidth == 360`
/// means omnidirectional (§3 Interface).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AntennaPattern {
    pub azimuth_orientation_deg: f64,
    pub azimuth_beamwidth_deg: f64,
    pub elevation_orientation_deg: f64,
    pub elevation_beamwidth_deg: f64,
}

impl AntennaPattern {
    pub fn omni() -> Self {
        Self {
            azimuth_orientation_deg: 0.0,
            azimuth_beamwidth_deg: 360.0,
            elevation_orientation_deg: 0.0,
            elevation_beamwidth_deg: 360.0,
        }
    }
}

/// Fold an angle difference into `[0,180]`, mirroring
/// `generic.c: angle_diff = (angle_diff > 360.0 - angle_diff) ? 360.0 - angle_diff : angle_diff`.
fn fold_to_0_180(angle_diff: f64) -> f64 {
    let d = angle_diff.abs();
    if d > 360.0 - d {
        360.0 - d
    } else {
        d
    }
}

/// Linear-in-angle attenuation at `angle_diff` degrees off boresight for a
/// beam of the given width: 0 dB on boresight, 3 dB at `beamwidth/2`,
/// `ANTENNA_MAX_ATTENUATION` past it (§4.1, §8).
fn directional_term(angle_diff_deg: f64, beamwidth_deg: f64) -> f64 {
    if beamwidth_deg >= 360.0 {
        return 0.0;
    }
    let folded = fold_to_0_180(angle_diff_deg);
    if folded > beamwidth_deg / 2.0 {
        ANTENNA_MAX_ATTENUATION
    } else {
        3.0 * 2.0 * folded / beamwidth_deg
    }
}

/// Azimuth (horizontal, x-y plane) attenuation from `tx` (with antenna
/// `pattern`) toward `rx` (§4.1).
pub fn azimuth_attenuation(tx: Coordinate, pattern: &AntennaPattern, rx: Coordinate) -> f64 {
    if pattern.azimuth_beamwidth_deg >= 360.0 {
        return 0.0;
    }
    let bearing_deg = (rx.y - tx.y).atan2(rx.x - tx.x).to_degrees();
    let angle_diff = (pattern.azimuth_orientation_deg - bearing_deg).abs();
    directional_term(angle_diff, pattern.azimuth_beamwidth_deg)
}

/// Elevation (vertical, x-z plane) attenuation from `tx` toward `rx` (§4.1),
/// analogous to azimuth but over x-z.
pub fn elevation_attenuation(tx: Coordinate, pattern: &AntennaPattern, rx: Coordinate) -> f64 {
    if pattern.elevation_beamwidth_deg >= 360.0 {
        return 0.0;
    }
    let bearing_deg = (rx.z - tx.z).atan2(rx.x - tx.x).to_degrees();
    let angle_diff = (pattern.elevation_orientation_deg - bearing_deg).abs();
    directional_term(angle_diff, pattern.elevation_beamwidth_deg)
}

/// Combined directional attenuation = azimuth + elevation (§4.1).
pub fn directional_attenuation(tx: Coordinate, pattern: &AntennaPattern, rx: Coordinate) -> f64 {
    azimuth_attenuation(tx, pattern, rx) + elevation_attenuation(tx, pattern, rx)
}
