//! Per-standard PHY/MAC models and their dispatch (§4.3).
//!
//! §9 "no deep inheritance": standards are not a trait-object hierarchy with
//! shared base-class state — each is a plain struct implementing
//! [`common::StandardModel`], and [`dispatch`] is a flat match rather than
//! dynamic dispatch through a common constructor.

pub mod active_tag;
pub mod common;
pub mod ethernet;
pub mod wimax;
pub mod wlan;
pub mod zigbee;

use qomet_types::Standard;

use self::common::{ConnUpdateInput, ConnUpdateOutput, StandardModel};
use crate::rng::EngineRng;

/// Construct the model for `standard` and run one connection update through
/// it. Building the model fresh each call is deliberate — models are
/// stateless parameter tables, and a per-connection `Standard` lookup is
/// cheap next to the Pr/FER floating-point work it wraps.
pub fn dispatch(standard: Standard, input: &ConnUpdateInput, rng: &mut EngineRng) -> ConnUpdateOutput {
    match standard {
        Standard::Wlan80211b | Standard::Wlan80211g | Standard::Wlan80211a => {
            wlan::Wlan80211::new(standard).update_connection(input, rng)
        }
        Standard::Wimax80216e => wimax::Wimax80216e::new().update_connection(input, rng),
        Standard::Zigbee802154 => zigbee::Zigbee802154::new().update_connection(input, rng),
        Standard::ActiveTag => active_tag::ActiveTag303::new().update_connection(input, rng),
        Standard::Ethernet10 | Standard::Ethernet100 | Standard::Ethernet1000 => {
            ethernet::Ethernet::new(standard).update_connection(input, rng)
        }
    }
}

/// The lowest receive sensitivity across `standard`'s own adapter/MCS table
/// (§4.5 "the lowest adapter sensitivity of C's own standard"): an
/// interferer weaker than this can't be decoded even as a contending
/// station's preamble, so it folds into the noise floor instead. Standards
/// with no rate table of their own (wired, and the tag's fixed-rate link)
/// have nothing to be "too weak to decode as a station" relative to, so
/// they fall back to the engine's noise floor.
pub fn lowest_sensitivity_dbm(standard: Standard) -> f64 {
    match standard {
        Standard::Wlan80211b | Standard::Wlan80211g | Standard::Wlan80211a => {
            wlan::Wlan80211::new(standard).table.lowest_sensitivity_dbm()
        }
        Standard::Wimax80216e => {
            wimax::MCS_TABLE.iter().map(|m| m.pr_threshold_dbm).fold(f64::INFINITY, f64::min)
        }
        Standard::Zigbee802154 => zigbee::ZIGBEE_PR_THRESHOLD_DBM,
        Standard::ActiveTag | Standard::Ethernet10 | Standard::Ethernet100 | Standard::Ethernet1000 => {
            crate::constants::MIN_NOISE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Environment, Segment};
    use crate::geometry::{AntennaPattern, Coordinate};
    use crate::standards::common::Endpoint;

    fn env() -> Environment {
        Environment::new(
            "office",
            false,
            vec![Segment { alpha: 2.0, sigma_db: 0.0, wall_attenuation_db: 0.0, length_m: None, noise_power_dbm: -100.0 }],
        )
    }

    fn endpoint() -> Endpoint {
        Endpoint {
            position: Coordinate::new(0.0, 0.0, 0.0),
            pattern: AntennaPattern::omni(),
            gain_dbi: 2.0,
            pr0_dbm: crate::propagation::pr0(15.0, 2.4e9, 0.0),
            internal_delay_ms: 0.0,
        }
    }

    #[test]
    fn dispatch_covers_every_standard_without_panicking() {
        let e = env();
        let mut rng = EngineRng::seeded(1);
        for standard in [
            Standard::Wlan80211b,
            Standard::Wlan80211g,
            Standard::Wlan80211a,
            Standard::Wimax80216e,
            Standard::Zigbee802154,
            Standard::ActiveTag,
            Standard::Ethernet10,
            Standard::Ethernet100,
            Standard::Ethernet1000,
        ] {
            let input = ConnUpdateInput {
                tx: endpoint(),
                rx: Endpoint { position: Coordinate::new(10.0, 0.0, 0.0), ..endpoint() },
                environment: &e, channel: 1, packet_size_bytes: 512, rts_cts_threshold_bytes: 2346,
                consider_interference: false, adaptive_operating_rate: true, operating_rate: 0,
                concurrent_stations: 0, interference_noise_dbm: crate::constants::MIN_NOISE,
                is_g_vs_b_compat: false, relative_velocity_mps: 0.0,
                mimo_type: crate::scenario::MimoType::Siso,
                antenna_count_tx: 1,
                antenna_count_rx: 1,
                system_bandwidth_mhz: 10.0,
                wimax_repetition_factor: 1,
            };
            let out = dispatch(standard, &input, &mut rng);
            assert!(out.fer >= 0.0 && out.fer <= 1.0);
            assert!(out.bandwidth_bps >= 0.0);
        }
    }

    proptest::proptest! {
        /// §8: "For all connections C and ticks t: 0 <= loss_rate(C,t) <= 1;
        /// FER(C,t) <= MAX_FER; bandwidth(C,t) >= 0; delay(C,t) >=
        /// internal_delay_tx + internal_delay_rx."
        #[test]
        fn every_standard_respects_the_core_output_invariants(
            distance_m in 1.0..2000.0f64,
            packet_size in 1u32..2000,
            internal_delay_tx in 0.0..5.0f64,
            internal_delay_rx in 0.0..5.0f64,
        ) {
            let e = env();
            let mut rng = EngineRng::seeded(7);
            let tx = Endpoint { internal_delay_ms: internal_delay_tx, ..endpoint() };
            let rx = Endpoint {
                position: Coordinate::new(distance_m, 0.0, 0.0),
                internal_delay_ms: internal_delay_rx,
                ..endpoint()
            };
            for standard in [
                Standard::Wlan80211b, Standard::Wlan80211g, Standard::Wlan80211a,
                Standard::Wimax80216e, Standard::Zigbee802154, Standard::ActiveTag,
                Standard::Ethernet10, Standard::Ethernet100, Standard::Ethernet1000,
            ] {
                let input = ConnUpdateInput {
                    tx, rx,
                    environment: &e, channel: 1, packet_size_bytes: packet_size, rts_cts_threshold_bytes: 2346,
                    consider_interference: false, adaptive_operating_rate: true, operating_rate: 0,
                    concurrent_stations: 0, interference_noise_dbm: crate::constants::MIN_NOISE,
                    is_g_vs_b_compat: false, relative_velocity_mps: 0.0,
                    mimo_type: crate::scenario::MimoType::Siso,
                    antenna_count_tx: 1,
                    antenna_count_rx: 1,
                    system_bandwidth_mhz: 10.0,
                    wimax_repetition_factor: 1,
                };
                let out = dispatch(standard, &input, &mut rng);
                prop_assert!(out.loss_rate >= 0.0 && out.loss_rate <= 1.0, "{standard:?}: loss_rate={}", out.loss_rate);
                prop_assert!(out.fer <= crate::constants::MAX_FER, "{standard:?}: fer={}", out.fer);
                prop_assert!(out.bandwidth_bps >= 0.0, "{standard:?}: bandwidth={}", out.bandwidth_bps);
                prop_assert!(
                    out.delay_ms >= internal_delay_tx + internal_delay_rx - 1e-9,
                    "{standard:?}: delay={} internal={}", out.delay_ms, internal_delay_tx + internal_delay_rx
                );
            }
        }
    }
}
