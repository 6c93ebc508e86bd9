//! 303.2 MHz active-RFID-tag model (§4.3 "Active tag family").
//!
//! The line-of-sight wall check and polynomial-in-distance FER are grounded
//! on spec.md §4.3's description; the "1/81 fractional interference rule"
//! mentioned there as an Open Question (§9) is kept as a named, overridable
//! constant rather than hardwired into the formula, per that section's
//! resolution.

use crate::constants::{MIN_NOISE, STANDARD_NOISE};
use crate::geometry;
use crate::propagation::{add_powers, received_power};
use crate::rng::EngineRng;

use super::common::{ConnUpdateInput, ConnUpdateOutput, StandardModel};

pub const ACTIVE_TAG_FREQUENCY_HZ: f64 = 303.2e6;
pub const ACTIVE_TAG_RATE_BPS: f64 = 4_800.0;
const ACTIVE_TAG_PSDU_BYTES: f64 = 4.0;
/// Fixed preamble/header overhead folded into the size-adaptation exponent
/// alongside the payload (§8 scenario 3: FER for a 7-byte payload scales
/// off the 4-byte reference by an exponent of (6+7)/(6+4)).
const ACTIVE_TAG_OVERHEAD_BYTES: f64 = 6.0;

/// Fractional interference weight applied to an active tag's contribution
/// to another connection's concurrent-station count (§9 Open Questions:
/// "the 1/81 constant is a specific regulatory duty-cycle artifact of the
/// reference deployment, not a universal constant — expose it as
/// configuration rather than hardcoding it").
pub const DEFAULT_INTERFERENCE_FRACTION: f64 = 1.0 / 81.0;

pub struct ActiveTag303 {
    pub interference_fraction: f64,
}

impl ActiveTag303 {
    pub fn new() -> Self {
        Self { interference_fraction: DEFAULT_INTERFERENCE_FRACTION }
    }

    /// Polynomial-in-scaled-distance FER (§4.3): `fer = min(1, (d/d_max)^2)`
    /// at the reference PSDU size, forced to 1 whenever a wall blocks direct
    /// line of sight, then scaled to `payload_bytes` the same way the other
    /// standards scale a PSDU-level FER to an arbitrary frame size.
    fn fer(&self, distance_m: f64, max_range_m: f64, line_of_sight_blocked: bool, payload_bytes: u32) -> f64 {
        if line_of_sight_blocked {
            return 1.0;
        }
        let ratio = distance_m / max_range_m.max(f64::MIN_POSITIVE);
        let fer_reference = (ratio * ratio).min(crate::constants::MAX_FER);
        let exponent = (ACTIVE_TAG_OVERHEAD_BYTES + payload_bytes as f64)
            / (ACTIVE_TAG_OVERHEAD_BYTES + ACTIVE_TAG_PSDU_BYTES);
        (1.0 - (1.0 - fer_reference).powf(exponent)).clamp(0.0, crate::constants::MAX_FER)
    }

    /// Interference's contribution to loss (§4.3, §9 Open Questions): each
    /// concurrent station independently has a chance
    /// `interference_fraction * (1 - fer)` of colliding with this tag's
    /// frame; OR-combined across all of them.
    fn interference_fer(&self, fer: f64, concurrent_stations: u32) -> f64 {
        if concurrent_stations == 0 {
            return 0.0;
        }
        let per_station = (self.interference_fraction * (1.0 - fer)).clamp(0.0, 1.0);
        (1.0 - (1.0 - per_station).powi(concurrent_stations as i32)).clamp(0.0, 1.0)
    }
}

impl Default for ActiveTag303 {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardModel for ActiveTag303 {
    fn update_connection(&self, input: &ConnUpdateInput, rng: &mut EngineRng) -> ConnUpdateOutput {
        let (distance_m, distance_clamped) = geometry::distance(input.tx.position, input.rx.position);

        let pr_dbm = received_power(
            input.tx.pr0_dbm,
            input.tx.gain_dbi,
            0.0, // active tags are omnidirectional by construction
            input.rx.gain_dbi,
            0.0,
            input.environment,
            distance_m,
            rng,
        );

        let env_noise = input.environment.last_segment_noise_dbm();
        let combined_noise = add_powers(env_noise, input.interference_noise_dbm, MIN_NOISE).max(STANDARD_NOISE);
        let snr_db = pr_dbm - combined_noise;

        let line_of_sight_blocked = input.environment.segments.len() > 1
            && input.environment.segments.iter().any(|s| s.wall_attenuation_db > 0.0);
        let max_range_m = 30.0;
        let fer = self.fer(distance_m, max_range_m, line_of_sight_blocked, input.packet_size_bytes);
        let interference_fer = self.interference_fer(fer, input.concurrent_stations);
        let loss_rate = (1.0 - (1.0 - fer) * (1.0 - interference_fer)).clamp(0.0, 1.0);
        let num_retransmissions = 0.0;

        let delay_ms = input.tx.internal_delay_ms + input.rx.internal_delay_ms;
        let jitter_ms = 0.0;
        let bandwidth_bps = ACTIVE_TAG_RATE_BPS * (1.0 - fer);

        ConnUpdateOutput {
            distance_m,
            distance_clamped,
            pr_dbm,
            snr_db,
            fer,
            loss_rate,
            num_retransmissions,
            new_operating_rate: 0,
            delay_ms,
            jitter_ms,
            bandwidth_bps,
            compatibility_mode: false,
            interference_fer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Environment, Segment};
    use crate::geometry::{AntennaPattern, Coordinate};
    use crate::standards::common::Endpoint;

    fn open_env() -> Environment {
        Environment::new(
            "outdoor",
            false,
            vec![Segment { alpha: 2.0, sigma_db: 0.0, wall_attenuation_db: 0.0, length_m: None, noise_power_dbm: -100.0 }],
        )
    }

    fn walled_env() -> Environment {
        Environment::new(
            "through_wall",
            false,
            vec![
                Segment { alpha: 2.0, sigma_db: 0.0, wall_attenuation_db: 0.0, length_m: Some(1.0), noise_power_dbm: -100.0 },
                Segment { alpha: 2.0, sigma_db: 0.0, wall_attenuation_db: 15.0, length_m: None, noise_power_dbm: -100.0 },
            ],
        )
    }

    fn endpoint(pos: Coordinate) -> Endpoint {
        Endpoint {
            position: pos,
            pattern: AntennaPattern::omni(),
            gain_dbi: 0.0,
            pr0_dbm: crate::propagation::pr0(0.0, ACTIVE_TAG_FREQUENCY_HZ, 0.0),
            internal_delay_ms: 0.0,
        }
    }

    fn base_input<'a>(env: &'a Environment) -> ConnUpdateInput<'a> {
        ConnUpdateInput {
            tx: endpoint(Coordinate::new(0.0, 0.0, 0.0)),
            rx: endpoint(Coordinate::new(5.0, 0.0, 0.0)),
            environment: env, channel: 0, packet_size_bytes: 4, rts_cts_threshold_bytes: 200,
            consider_interference: false, adaptive_operating_rate: false, operating_rate: 0, concurrent_stations: 0,
            interference_noise_dbm: MIN_NOISE, is_g_vs_b_compat: false, relative_velocity_mps: 0.0,
            mimo_type: crate::scenario::MimoType::Siso,
            antenna_count_tx: 1,
            antenna_count_rx: 1,
            system_bandwidth_mhz: 10.0,
            wimax_repetition_factor: 1,
        }
    }

    #[test]
    fn wall_forces_total_loss() {
        let env = walled_env();
        let input = base_input(&env);
        let mut rng = EngineRng::seeded(1);
        let model = ActiveTag303::new();
        let out = model.update_connection(&input, &mut rng);
        assert_eq!(out.fer, 1.0);
        assert_eq!(out.loss_rate, 1.0);
    }

    #[test]
    fn open_line_of_sight_has_partial_loss() {
        let env = open_env();
        let input = base_input(&env);
        let mut rng = EngineRng::seeded(1);
        let model = ActiveTag303::new();
        let out = model.update_connection(&input, &mut rng);
        assert!(out.fer < 1.0);
    }

    #[test]
    fn interference_fraction_is_overridable() {
        let model = ActiveTag303 { interference_fraction: 0.5 };
        assert_eq!(model.interference_fraction, 0.5);
        assert_ne!(model.interference_fraction, DEFAULT_INTERFERENCE_FRACTION);
    }

    #[test]
    fn larger_payload_scales_fer_by_overhead_exponent() {
        let env = open_env();
        let model = ActiveTag303::new();
        let mut rng = EngineRng::seeded(1);
        let reference = model.update_connection(&base_input(&env), &mut rng);

        let mut input = base_input(&env);
        input.packet_size_bytes = 7;
        let mut rng2 = EngineRng::seeded(1);
        let scaled = model.update_connection(&input, &mut rng2);

        let fer_reference = reference.fer;
        let expected = 1.0 - (1.0 - fer_reference).powf(
            (ACTIVE_TAG_OVERHEAD_BYTES + 7.0) / (ACTIVE_TAG_OVERHEAD_BYTES + ACTIVE_TAG_PSDU_BYTES),
        );
        assert!((scaled.fer - expected).abs() < 1e-9);
        assert!(scaled.fer > fer_reference);
    }

    #[test]
    fn concurrent_stations_raise_interference_fer_and_loss() {
        let env = open_env();
        let model = ActiveTag303::new();

        let mut rng = EngineRng::seeded(4);
        let quiet = model.update_connection(&base_input(&env), &mut rng);

        let mut busy_input = base_input(&env);
        busy_input.concurrent_stations = 5;
        let mut rng2 = EngineRng::seeded(4);
        let busy = model.update_connection(&busy_input, &mut rng2);

        assert_eq!(quiet.interference_fer, 0.0);
        assert!(busy.interference_fer > 0.0);
        assert!(busy.loss_rate > quiet.loss_rate);
    }
}
