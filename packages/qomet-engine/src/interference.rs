//! Co-channel interference engine (§4.5).
//!
//! Accounts for other transmitters in the same [`StandardFamily`] as a
//! connection's standard: nearby active transmitters either contribute
//! additive noise (via a virtual connection's received power) or are
//! counted as concurrent contending stations, depending on how strong their
//! signal is relative to the victim connection's own Pr.

use qomet_types::{Standard, StandardFamily};

use crate::constants::MIN_NOISE;
use crate::environment::Environment;
use crate::geometry::{self, Coordinate};
use crate::propagation::{add_powers, received_power};
use crate::rng::EngineRng;

/// DSSS/CCK (802.11b/g) adjacent-channel attenuation table, indexed by
/// `|channel_a - channel_b|`, asymptoting to the "no interference" floor
/// past 5 channels of separation (§4.5).
const DSSS_CHANNEL_ATTENUATION_DB: [f64; 6] = [0.0, 8.0, 16.0, 24.0, 35.0, 50.0];

/// OFDM (802.11a) adjacent-channel attenuation table — non-overlapping
/// channel plan, so separation of 1 already floors out (§4.5).
const OFDM_CHANNEL_ATTENUATION_DB: [f64; 2] = [0.0, 40.0];

const DSSS_ASYMPTOTIC_FLOOR_DB: f64 = -50.0;
const OFDM_ASYMPTOTIC_FLOOR_DB: f64 = -40.0;

fn channel_attenuation_db(family: StandardFamily, channel_a: u32, channel_b: u32) -> f64 {
    let sep = channel_a.abs_diff(channel_b) as usize;
    match family {
        StandardFamily::BgDsss => *DSSS_CHANNEL_ATTENUATION_DB
            .get(sep)
            .unwrap_or(&DSSS_ASYMPTOTIC_FLOOR_DB.abs()),
        StandardFamily::Ofdm5GHz => *OFDM_CHANNEL_ATTENUATION_DB
            .get(sep)
            .unwrap_or(&OFDM_ASYMPTOTIC_FLOOR_DB.abs()),
        _ => if sep == 0 { 0.0 } else { 100.0 },
    }
}

/// One potential interferer, as seen from the victim connection's receiver.
/// `from_node`/`from_interface` identify the transmitting interface so a
/// sweep can skip a self-loop source and de-dup a source already accounted
/// for this victim (§4.5).
pub struct Interferer {
    pub standard: Standard,
    pub channel: u32,
    pub position: Coordinate,
    pub pr0_dbm: f64,
    pub gain_dbi: f64,
    pub from_node: usize,
    pub from_interface: usize,
    pub is_noise_source: bool,
}

/// Result of folding all interferers into a connection's noise budget for
/// one tick (§4.5): either the interferer is weak enough to fold into an
/// additive noise term, or strong enough (and close enough in time/medium
/// access) to be counted as a contending station instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterferenceAccount {
    pub interference_noise_dbm: f64,
    pub concurrent_stations: u32,
    /// Set when some interferer this sweep is an 802.11b station heard by
    /// an 802.11g victim (§4.5 "if C is g and C' is b, set
    /// compatibility_mode=true").
    pub is_g_vs_b_compat: bool,
}

/// Fold every same-family interferer visible to `victim_rx` (through
/// `environment`) into one noise/contention account (§4.5 "Per tick: reset
/// concurrent_stations and interference_noise_dbm to their base state, then
/// accumulate each co-family interferer's contribution"). `victim_to_node`
/// is the victim connection's own receiver, used to skip a self-loop source
/// (a different connection whose transmitter is this connection's
/// receiver); `victim_lowest_sensitivity_dbm` is "the lowest adapter
/// sensitivity of C's own standard" (§4.5), below which a source folds into
/// noise rather than counting as a contending station.
pub fn accumulate(
    victim_standard: Standard,
    victim_channel: u32,
    victim_to_node: usize,
    victim_rx_position: Coordinate,
    victim_rx_gain_dbi: f64,
    victim_lowest_sensitivity_dbm: f64,
    environment: &Environment,
    interferers: &[Interferer],
    rng: &mut EngineRng,
) -> InterferenceAccount {
    let mut account = InterferenceAccount {
        interference_noise_dbm: MIN_NOISE,
        concurrent_stations: 0,
        is_g_vs_b_compat: false,
    };
    let family = victim_standard.family();
    let mut accounted = std::collections::HashSet::new();

    for interferer in interferers {
        if interferer.standard.family() != family {
            continue;
        }
        if interferer.from_node == victim_to_node {
            continue;
        }
        if !accounted.insert((interferer.from_node, interferer.from_interface)) {
            continue;
        }

        let (distance_m, _clamped) = geometry::distance(victim_rx_position, interferer.position);
        let base_pr = received_power(
            interferer.pr0_dbm,
            interferer.gain_dbi,
            0.0,
            victim_rx_gain_dbi,
            0.0,
            environment,
            distance_m,
            rng,
        );
        let channel_atten = channel_attenuation_db(family, victim_channel, interferer.channel);
        let pr_dbm = base_pr - channel_atten;

        if interferer.is_noise_source {
            account.interference_noise_dbm = add_powers(account.interference_noise_dbm, pr_dbm, MIN_NOISE);
            continue;
        }

        if pr_dbm <= MIN_NOISE {
            continue;
        }

        if pr_dbm < victim_lowest_sensitivity_dbm {
            account.interference_noise_dbm = add_powers(account.interference_noise_dbm, pr_dbm, MIN_NOISE);
        } else {
            account.concurrent_stations += 1;
            if victim_standard == Standard::Wlan80211g && interferer.standard == Standard::Wlan80211b {
                account.is_g_vs_b_compat = true;
            }
        }
    }

    account
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Environment, Segment};

    fn env() -> Environment {
        Environment::new(
            "office",
            false,
            vec![Segment { alpha: 2.0, sigma_db: 0.0, wall_attenuation_db: 0.0, length_m: None, noise_power_dbm: -100.0 }],
        )
    }

    #[test]
    fn no_interferers_leaves_account_at_floor() {
        let e = env();
        let mut rng = EngineRng::seeded(1);
        let account = accumulate(
            Standard::Wlan80211g, 6, 1, Coordinate::new(0.0, 0.0, 0.0), 2.0, -80.0, &e, &[], &mut rng,
        );
        assert_eq!(account.concurrent_stations, 0);
        assert_eq!(account.interference_noise_dbm, MIN_NOISE);
    }

    #[test]
    fn different_family_interferer_is_ignored() {
        let e = env();
        let mut rng = EngineRng::seeded(1);
        let interferers = vec![Interferer {
            standard: Standard::Zigbee802154,
            channel: 6,
            position: Coordinate::new(1.0, 0.0, 0.0),
            pr0_dbm: 20.0,
            gain_dbi: 2.0,
            from_node: 2,
            from_interface: 0,
            is_noise_source: false,
        }];
        let account = accumulate(
            Standard::Wlan80211g, 6, 1, Coordinate::new(0.0, 0.0, 0.0), 2.0, -80.0, &e, &interferers, &mut rng,
        );
        assert_eq!(account.concurrent_stations, 0);
        assert_eq!(account.interference_noise_dbm, MIN_NOISE);
    }

    #[test]
    fn close_same_channel_interferer_is_counted() {
        let e = env();
        let mut rng = EngineRng::seeded(1);
        let interferers = vec![Interferer {
            standard: Standard::Wlan80211g,
            channel: 6,
            position: Coordinate::new(1.0, 0.0, 0.0),
            pr0_dbm: 20.0,
            gain_dbi: 2.0,
            from_node: 2,
            from_interface: 0,
            is_noise_source: false,
        }];
        let account = accumulate(
            Standard::Wlan80211g, 6, 1, Coordinate::new(0.0, 0.0, 0.0), 2.0, -80.0, &e, &interferers, &mut rng,
        );
        assert!(account.concurrent_stations >= 1 || account.interference_noise_dbm > MIN_NOISE);
    }

    #[test]
    fn self_loop_source_is_skipped() {
        // §4.5: an interferer whose transmitter is this connection's own
        // receiver (C'.from = C.to) never counts against itself.
        let e = env();
        let mut rng = EngineRng::seeded(1);
        let interferers = vec![Interferer {
            standard: Standard::Wlan80211g,
            channel: 6,
            position: Coordinate::new(1.0, 0.0, 0.0),
            pr0_dbm: 20.0,
            gain_dbi: 2.0,
            from_node: 1,
            from_interface: 0,
            is_noise_source: false,
        }];
        let account = accumulate(
            Standard::Wlan80211g, 6, 1, Coordinate::new(0.0, 0.0, 0.0), 2.0, -80.0, &e, &interferers, &mut rng,
        );
        assert_eq!(account.concurrent_stations, 0);
        assert_eq!(account.interference_noise_dbm, MIN_NOISE);
    }

    #[test]
    fn duplicate_source_is_accounted_only_once() {
        let e = env();
        let mut rng = EngineRng::seeded(1);
        fn make() -> Interferer {
            Interferer {
                standard: Standard::Wlan80211g,
                channel: 6,
                position: Coordinate::new(1.0, 0.0, 0.0),
                pr0_dbm: 20.0,
                gain_dbi: 2.0,
                from_node: 2,
                from_interface: 0,
                is_noise_source: false,
            }
        }
        let interferers = vec![make(), make()];
        let account = accumulate(
            Standard::Wlan80211g, 6, 1, Coordinate::new(0.0, 0.0, 0.0), 2.0, -80.0, &e, &interferers, &mut rng,
        );
        assert_eq!(account.concurrent_stations, 1);
    }

    #[test]
    fn noise_source_is_folded_into_noise_regardless_of_strength() {
        let e = env();
        let mut rng = EngineRng::seeded(1);
        let interferers = vec![Interferer {
            standard: Standard::Wlan80211g,
            channel: 6,
            position: Coordinate::new(1.0, 0.0, 0.0),
            pr0_dbm: 20.0,
            gain_dbi: 2.0,
            from_node: 2,
            from_interface: 0,
            is_noise_source: true,
        }];
        let account = accumulate(
            Standard::Wlan80211g, 6, 1, Coordinate::new(0.0, 0.0, 0.0), 2.0, -80.0, &e, &interferers, &mut rng,
        );
        assert_eq!(account.concurrent_stations, 0);
        assert!(account.interference_noise_dbm > MIN_NOISE);
    }

    #[test]
    fn g_victim_hearing_b_interferer_sets_compat_flag() {
        let e = env();
        let mut rng = EngineRng::seeded(1);
        let interferers = vec![Interferer {
            standard: Standard::Wlan80211b,
            channel: 6,
            position: Coordinate::new(1.0, 0.0, 0.0),
            pr0_dbm: 20.0,
            gain_dbi: 2.0,
            from_node: 2,
            from_interface: 0,
            is_noise_source: false,
        }];
        let account = accumulate(
            Standard::Wlan80211g, 6, 1, Coordinate::new(0.0, 0.0, 0.0), 2.0, -80.0, &e, &interferers, &mut rng,
        );
        assert!(account.is_g_vs_b_compat);
    }

    #[test]
    fn distant_channel_separation_attenuates_toward_floor() {
        assert!(channel_attenuation_db(StandardFamily::BgDsss, 1, 11) > channel_attenuation_db(StandardFamily::BgDsss, 1, 2));
    }
}
