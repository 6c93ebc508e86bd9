//! Engine configuration (ambient stack, §7 "malformed settings or parameter
//! file"): a TOML-deserializable overlay over `constants.rs`'s defaults
//! (`serde` + `toml`).

use serde::{Deserialize, Serialize};

use crate::constants;

/// Tunable engine parameters a scenario file may override. Every field
/// defaults to the corresponding `constants.rs` value so a scenario that
/// specifies nothing behaves exactly like the hardcoded defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub min_distance_m: f64,
    pub antenna_max_attenuation_db: f64,
    pub max_fer: f64,
    pub min_noise_dbm: f64,
    pub standard_noise_dbm: f64,
    pub maximum_precompute: u32,
    pub max_fixed_deltaq: usize,
    pub rng_seed: u64,
    /// §9 Open Questions: active-tag interference fraction kept
    /// configurable rather than hardwired.
    pub active_tag_interference_fraction: f64,
    /// §9 Open Questions: fleet-mode and pairwise-mode rule id ranges must
    /// be configurable and checked for collision at startup.
    pub fleet_out_pipe_base: u32,
    pub fleet_in_broadcast_pipe_base: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_distance_m: constants::MIN_DISTANCE,
            antenna_max_attenuation_db: constants::ANTENNA_MAX_ATTENUATION,
            max_fer: constants::MAX_FER,
            min_noise_dbm: constants::MIN_NOISE,
            standard_noise_dbm: constants::STANDARD_NOISE,
            maximum_precompute: constants::MAXIMUM_PRECOMPUTE,
            max_fixed_deltaq: constants::MAX_FIXED_DELTAQ,
            rng_seed: 0,
            active_tag_interference_fraction: crate::standards::active_tag::DEFAULT_INTERFERENCE_FRACTION,
            fleet_out_pipe_base: 10_000,
            fleet_in_broadcast_pipe_base: 20_000,
        }
    }
}

impl EngineConfig {
    /// Parse from a TOML config file's contents. Malformed fields are
    /// reported as `InputError::MalformedField` rather than toml's own
    /// error type, so every input-error path in the engine goes through
    /// one error enum (§7).
    pub fn from_toml_str(text: &str) -> Result<Self, crate::error::InputError> {
        toml::from_str(text).map_err(|e| crate::error::InputError::MalformedField {
            field: "config".to_string(),
            reason: e.to_string(),
        })
    }

    /// §9 Open Questions: validate the fleet pipe-id ranges don't collide
    /// with each other or with the reserved pairwise-mode ids below
    /// `fleet_out_pipe_base`.
    pub fn validate(&self) -> Result<(), crate::error::InputError> {
        if self.fleet_out_pipe_base == self.fleet_in_broadcast_pipe_base {
            return Err(crate::error::InputError::MalformedField {
                field: "fleet_out_pipe_base/fleet_in_broadcast_pipe_base".to_string(),
                reason: "fleet outbound and inbound-broadcast pipe id ranges must not overlap".to_string(),
            });
        }
        Ok(())
    }
}
