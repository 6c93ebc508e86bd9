//! Wired Ethernet model (§4.3 "Wired family"): no propagation physics, no
//! loss, fixed nominal bandwidth per variant.

use crate::geometry;
use crate::rng::EngineRng;
use qomet_types::Standard;

use super::common::{ConnUpdateInput, ConnUpdateOutput, StandardModel};

pub struct Ethernet {
    pub standard: Standard,
}

impl Ethernet {
    pub fn new(standard: Standard) -> Self {
        assert!(standard.is_wired(), "Ethernet model constructed for a wireless standard");
        Self { standard }
    }
}

impl StandardModel for Ethernet {
    fn update_connection(&self, input: &ConnUpdateInput, _rng: &mut EngineRng) -> ConnUpdateOutput {
        let (distance_m, distance_clamped) = geometry::distance(input.tx.position, input.rx.position);
        let bandwidth_bps = self.standard.wired_nominal_bps().unwrap_or(0.0);

        ConnUpdateOutput {
            distance_m,
            distance_clamped,
            pr_dbm: 0.0,
            snr_db: 0.0,
            fer: 0.0,
            loss_rate: 0.0,
            num_retransmissions: 0.0,
            new_operating_rate: input.operating_rate,
            delay_ms: input.tx.internal_delay_ms + input.rx.internal_delay_ms,
            jitter_ms: 0.0,
            bandwidth_bps,
            compatibility_mode: false,
            interference_fer: 0.0,
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
            "wire",
            false,
            vec![Segment { alpha: 0.0, sigma_db: 0.0, wall_attenuation_db: 0.0, length_m: None, noise_power_dbm: -100.0 }],
        )
    }

    fn endpoint(delay_ms: f64) -> Endpoint {
        Endpoint {
            position: Coordinate::new(0.0, 0.0, 0.0),
            pattern: AntennaPattern::omni(),
            gain_dbi: 0.0,
            pr0_dbm: 0.0,
            internal_delay_ms: delay_ms,
        }
    }

    #[test]
    fn gigabit_ethernet_has_zero_loss_and_nominal_bandwidth() {
        let e = env();
        let input = ConnUpdateInput {
            tx: endpoint(0.1),
            rx: endpoint(0.2),
            environment: &e, channel: 0, packet_size_bytes: 1500, rts_cts_threshold_bytes: 2346,
            consider_interference: false, adaptive_operating_rate: false, operating_rate: 0, concurrent_stations: 0,
            interference_noise_dbm: -300.0, is_g_vs_b_compat: false, relative_velocity_mps: 0.0,
            mimo_type: crate::scenario::MimoType::Siso,
            antenna_count_tx: 1,
            antenna_count_rx: 1,
            system_bandwidth_mhz: 10.0,
            wimax_repetition_factor: 1,
        };
        let model = Ethernet::new(Standard::Ethernet1000);
        let mut rng = EngineRng::seeded(0);
        let out = model.update_connection(&input, &mut rng);
        assert_eq!(out.fer, 0.0);
        assert_eq!(out.loss_rate, 0.0);
        assert_eq!(out.bandwidth_bps, 1000e6);
        assert!((out.delay_ms - 0.3).abs() < 1e-9);
    }
}
