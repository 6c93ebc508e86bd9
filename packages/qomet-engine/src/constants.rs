//! Engine-wide constants.
//!
//! Grounded on `examples/original_source/deltaQ/generic.h` (`SPEED_LIGHT`,
//! `ANTENNA_MAX_ATTENUATION`) and the invariants named throughout spec.md
//! §3/§4/§8. Kept as plain `const`s per the "global mutable tables → constant
//! data the engine owns" design note (§9); where a scenario needs to override
//! one, `EngineConfig` (config.rs) carries the overridable copy.

/// Speed of light, m/s (`generic.h: SPEED_LIGHT`).
pub const SPEED_LIGHT: f64 = 2.9979e8;

/// Distance below which geometry is clamped to avoid singularities at r→0
/// (§3 Coordinate, §8 "distance... clamped").
pub const MIN_DISTANCE: f64 = 0.01;

/// Directional-antenna attenuation representing "no signal" outside the
/// beamwidth (§4.1, §8).
pub const ANTENNA_MAX_ATTENUATION: f64 = 100.0;

/// Upper clamp for any computed frame/packet error rate (§4.3, §8).
pub const MAX_FER: f64 = 0.999_999_999;

/// Floor below which `add_powers` treats an input as having no additive
/// effect (§4.2, §8 "add_powers idempotence").
pub const MIN_NOISE: f64 = -300.0;

/// Thermal-noise-floor-like constant used as the combined_noise floor for
/// 802.11 FER computation (§4.3 "floor at STANDARD_NOISE").
pub const STANDARD_NOISE: f64 = -110.0;

/// Iteration cap for the per-connection steady-state precompute (§4.8).
pub const MAXIMUM_PRECOMPUTE: u32 = 100;

/// Maximum number of fixed-deltaQ override windows per connection (§4.7).
pub const MAX_FIXED_DELTAQ: usize = 64;

/// Maximum vertex count for a scenario Object polygon/polyline (§7 Geometry
/// error).
pub const MAX_VERTICES: usize = 1024;

/// Epsilon below which a standard deviation is treated as zero (mirrors the
/// original `randn`'s `EPSILON` guard — avoids dividing by a near-zero sigma).
pub const EPSILON: f64 = 1e-9;
