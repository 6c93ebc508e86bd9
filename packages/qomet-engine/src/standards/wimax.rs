//! 802.16e/WiMAX OFDMA model (§4.3 "802.16e family").
//!
//! The capacity table structure (rate count, bandwidth count, named rate
//! indices) is carried over as the concrete table SPEC_FULL.md supplemented
//! feature #4 describes, grounded on
//! `examples/original_source/deltaQ/wimax.h` (`WIMAX_RATES_NUMBER = 11`,
//! `WIMAX_SYS_BW_NUMBER = 7`, `FREQUENCY_WIMAX`, `WIMAX_FRAME_DURATION`).
//! MCS spectral-efficiency values and slot capacities are representative
//! 802.16e OFDMA figures rather than the original's internal lookup table,
//! which was not present in the retrieved source.

use crate::constants::{MIN_NOISE, STANDARD_NOISE};
use crate::geometry;
use crate::propagation::{add_powers, doppler_snr_loss_db, received_power};
use crate::rng::EngineRng;

use super::common::{expected_retransmissions, ConnUpdateInput, ConnUpdateOutput, StandardModel};

pub const FREQUENCY_WIMAX_HZ: f64 = 2.35e9;
pub const WIMAX_FRAME_DURATION_MS: f64 = 5.0;
pub const WIMAX_RATES_NUMBER: usize = 11;
pub const WIMAX_SYS_BW_NUMBER: usize = 7;

/// Named rate indices into the 11-entry MCS table (§4.3, supplemented
/// feature #4), from the most robust modulation to the least.
pub mod rate_index {
    pub const QPSK_1_8: usize = 0;
    pub const QPSK_1_4: usize = 1;
    pub const QPSK_3_8: usize = 2;
    pub const QPSK_1_2: usize = 3;
    pub const QPSK_5_8: usize = 4;
    pub const QPSK_3_4: usize = 5;
    pub const QAM_16_1_2: usize = 6;
    pub const QAM_16_5_8: usize = 7;
    pub const QAM_16_3_4: usize = 8;
    pub const QAM_64_2_3: usize = 9;
    pub const QAM_64_5_6: usize = 10;
}

/// Named system-bandwidth indices into the 7-entry bandwidth table (MHz).
pub mod bw_index {
    pub const SYS_BW_1: usize = 0; // 1.25 MHz
    pub const SYS_BW_2: usize = 1; // 2.5 MHz
    pub const SYS_BW_3: usize = 2; // 5.0 MHz
    pub const SYS_BW_4: usize = 3; // 7.0 MHz
    pub const SYS_BW_5: usize = 4; // 8.75 MHz
    pub const SYS_BW_6: usize = 5; // 10.0 MHz
    pub const SYS_BW_7: usize = 6; // 20.0 MHz
}

pub const SYSTEM_BANDWIDTHS_MHZ: [f64; WIMAX_SYS_BW_NUMBER] = [1.25, 2.5, 5.0, 7.0, 8.75, 10.0, 20.0];

/// Spectral efficiency (bits/symbol/subcarrier) and minimum-Rx-threshold
/// offset (dB below the most robust rate's threshold) per MCS.
#[derive(Debug, Clone, Copy)]
pub struct McsEntry {
    pub bits_per_symbol: f64,
    pub coding_rate: f64,
    pub pr_threshold_dbm: f64,
}

pub const MCS_TABLE: [McsEntry; WIMAX_RATES_NUMBER] = [
    McsEntry { bits_per_symbol: 2.0, coding_rate: 1.0 / 8.0, pr_threshold_dbm: -101.0 },
    McsEntry { bits_per_symbol: 2.0, coding_rate: 1.0 / 4.0, pr_threshold_dbm: -98.0 },
    McsEntry { bits_per_symbol: 2.0, coding_rate: 3.0 / 8.0, pr_threshold_dbm: -96.0 },
    McsEntry { bits_per_symbol: 2.0, coding_rate: 1.0 / 2.0, pr_threshold_dbm: -93.0 },
    McsEntry { bits_per_symbol: 2.0, coding_rate: 5.0 / 8.0, pr_threshold_dbm: -91.0 },
    McsEntry { bits_per_symbol: 2.0, coding_rate: 3.0 / 4.0, pr_threshold_dbm: -89.0 },
    McsEntry { bits_per_symbol: 4.0, coding_rate: 1.0 / 2.0, pr_threshold_dbm: -87.0 },
    McsEntry { bits_per_symbol: 4.0, coding_rate: 5.0 / 8.0, pr_threshold_dbm: -85.0 },
    McsEntry { bits_per_symbol: 4.0, coding_rate: 3.0 / 4.0, pr_threshold_dbm: -82.0 },
    McsEntry { bits_per_symbol: 6.0, coding_rate: 2.0 / 3.0, pr_threshold_dbm: -77.0 },
    McsEntry { bits_per_symbol: 6.0, coding_rate: 5.0 / 6.0, pr_threshold_dbm: -73.0 },
];

const SUBCARRIER_SPACING_HZ: f64 = 10937.5; // 802.16e OFDMA default (11.2 MHz FFT / 1024)

const PSDU_WIMAX_BYTES: f64 = 1500.0;
const MAX_TRANSMISSIONS: u32 = 4;

/// DL and UL OFDMA symbol counts per 5ms frame. Scalable OFDMA holds
/// subcarrier spacing constant across FFT sizes, so this split is a frame
/// timing constant rather than something that scales with bandwidth — only
/// subchannel counts (`BandwidthProfile`) vary per bandwidth.
pub const DL_SYMBOLS_PER_FRAME: u32 = 35;
pub const UL_SYMBOLS_PER_FRAME: u32 = 21;
const DL_DATA_SUBCARRIERS_PER_SUBCHANNEL: u32 = 48;
const UL_DATA_SUBCARRIERS_PER_SUBCHANNEL: u32 = 24;

/// Per-bandwidth OFDMA subchannelization (§4.3), indexed in lockstep with
/// [`SYSTEM_BANDWIDTHS_MHZ`]/[`bw_index`].
#[derive(Debug, Clone, Copy)]
pub struct BandwidthProfile {
    pub fft_size: u32,
    pub dl_subchannels: u32,
    pub ul_subchannels: u32,
}

pub const BANDWIDTH_PROFILES: [BandwidthProfile; WIMAX_SYS_BW_NUMBER] = [
    BandwidthProfile { fft_size: 128, dl_subchannels: 2, ul_subchannels: 1 },    // 1.25 MHz
    BandwidthProfile { fft_size: 256, dl_subchannels: 3, ul_subchannels: 1 },    // 2.5 MHz
    BandwidthProfile { fft_size: 512, dl_subchannels: 6, ul_subchannels: 3 },    // 5.0 MHz
    BandwidthProfile { fft_size: 1024, dl_subchannels: 8, ul_subchannels: 4 },   // 7.0 MHz
    BandwidthProfile { fft_size: 1024, dl_subchannels: 10, ul_subchannels: 4 },  // 8.75 MHz
    BandwidthProfile { fft_size: 1024, dl_subchannels: 12, ul_subchannels: 5 },  // 10.0 MHz
    BandwidthProfile { fft_size: 2048, dl_subchannels: 24, ul_subchannels: 10 }, // 20.0 MHz
];

/// Nearest configured bandwidth row, so an interpolated or mistyped
/// `system_bandwidth_mhz` still gets a profile instead of panicking.
fn bandwidth_profile(system_bandwidth_mhz: f64) -> &'static BandwidthProfile {
    SYSTEM_BANDWIDTHS_MHZ
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (**a - system_bandwidth_mhz).abs().partial_cmp(&(**b - system_bandwidth_mhz).abs()).unwrap()
        })
        .map(|(idx, _)| &BANDWIDTH_PROFILES[idx])
        .unwrap_or(&BANDWIDTH_PROFILES[bw_index::SYS_BW_6])
}

/// One frame's worth of slot/symbol/rate capacity for a given bandwidth,
/// MCS, MIMO configuration and repetition factor (§4.3 supplemented feature
/// #4). DL and UL are tracked separately since the subchannelization
/// differs between subframes.
#[derive(Debug, Clone, Copy)]
pub struct Capacity {
    pub dl_symbols: u32,
    pub ul_symbols: u32,
    pub dl_slots: u32,
    pub ul_slots: u32,
    pub dl_data_rate_bps: f64,
    pub ul_data_rate_bps: f64,
}

impl Capacity {
    pub fn derive(
        system_bandwidth_mhz: f64,
        mcs_index: usize,
        mimo: crate::scenario::MimoType,
        antenna_count_tx: u32,
        antenna_count_rx: u32,
        repetition_factor: u32,
    ) -> Self {
        let profile = bandwidth_profile(system_bandwidth_mhz);
        let mcs = &MCS_TABLE[mcs_index.min(WIMAX_RATES_NUMBER - 1)];
        let dl_slots = DL_SYMBOLS_PER_FRAME * profile.dl_subchannels;
        let ul_slots = UL_SYMBOLS_PER_FRAME * profile.ul_subchannels;
        let bits_per_data_subcarrier = mcs.bits_per_symbol * mcs.coding_rate;

        let mut dl_bits_per_frame =
            dl_slots as f64 * DL_DATA_SUBCARRIERS_PER_SUBCHANNEL as f64 * bits_per_data_subcarrier;
        let ul_bits_per_frame =
            ul_slots as f64 * UL_DATA_SUBCARRIERS_PER_SUBCHANNEL as f64 * bits_per_data_subcarrier;

        // Repetition coding only applies to QPSK rates; it trades bitrate
        // for robustness by repeating each symbol R times (§4.3).
        let repetition_factor = repetition_factor.max(1);
        if repetition_factor > 1 && mcs.bits_per_symbol <= 2.0 {
            dl_bits_per_frame /= repetition_factor as f64;
        }

        // Matrix A is a diversity mode (SNR gain, applied separately via
        // `mimo_snr_gain_db`); Matrix B is spatial multiplexing, which
        // multiplies the DL data rate by the number of independent streams.
        if matches!(mimo, crate::scenario::MimoType::MatrixB) {
            dl_bits_per_frame *= antenna_count_tx.min(antenna_count_rx).max(1) as f64;
        }

        let frame_s = WIMAX_FRAME_DURATION_MS / 1000.0;
        Self {
            dl_symbols: DL_SYMBOLS_PER_FRAME,
            ul_symbols: UL_SYMBOLS_PER_FRAME,
            dl_slots,
            ul_slots,
            dl_data_rate_bps: dl_bits_per_frame / frame_s,
            ul_data_rate_bps: ul_bits_per_frame / frame_s,
        }
    }
}

/// Repetition factor applied to a rate under heavy FER before it is dropped
/// a full MCS step — coarse analogue of HARQ chase combining (§4.3). Feeds
/// the FER calculation as an SNR gain; `Capacity::derive` applies the
/// matching rate penalty.
fn repetition_gain_db(repetition_factor: u32) -> f64 {
    10.0 * (repetition_factor as f64).log10()
}

/// MIMO SNR gain for the configured matrix type (§4.3): Matrix A (transmit
/// diversity / space-time coding) trades spatial redundancy for SNR, adding
/// `10*log10(Nr) + 10*log10(Nt*Nr)` dB; Matrix B (spatial multiplexing)
/// adds no SNR gain of its own — its payoff is the rate multiplier applied
/// in `Capacity::derive`.
fn mimo_snr_gain_db(mimo: crate::scenario::MimoType, antenna_count_tx: u32, antenna_count_rx: u32) -> f64 {
    match mimo {
        crate::scenario::MimoType::Siso => 0.0,
        crate::scenario::MimoType::MatrixA => {
            let nt = antenna_count_tx.max(1) as f64;
            let nr = antenna_count_rx.max(1) as f64;
            10.0 * nr.log10() + 10.0 * (nt * nr).log10()
        }
        crate::scenario::MimoType::MatrixB => 0.0,
    }
}

pub struct Wimax80216e;

impl Wimax80216e {
    pub fn new() -> Self {
        Self
    }

    fn fer_at_mcs(&self, mcs_index: usize, pr_dbm: f64, combined_noise_dbm: f64, payload_bytes: u32) -> f64 {
        let mcs = &MCS_TABLE[mcs_index];
        let margin = pr_dbm - combined_noise_dbm - mcs.pr_threshold_dbm;
        let fer_psdu = (1.0 / (1.0 + (0.8 * margin).exp())).clamp(0.0, crate::constants::MAX_FER);
        let exponent = payload_bytes as f64 / PSDU_WIMAX_BYTES;
        (1.0 - (1.0 - fer_psdu).powf(exponent)).clamp(0.0, crate::constants::MAX_FER)
    }

    fn select_mcs(&self, pr_dbm: f64, combined_noise_dbm: f64, payload_bytes: u32) -> usize {
        for idx in (0..WIMAX_RATES_NUMBER).rev() {
            if self.fer_at_mcs(idx, pr_dbm, combined_noise_dbm, payload_bytes) < 0.1 {
                return idx;
            }
        }
        0
    }
}

impl Default for Wimax80216e {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardModel for Wimax80216e {
    fn update_connection(&self, input: &ConnUpdateInput, rng: &mut EngineRng) -> ConnUpdateOutput {
        let (distance_m, distance_clamped) = geometry::distance(input.tx.position, input.rx.position);
        let dir_atten_tx = geometry::directional_attenuation(input.tx.position, &input.tx.pattern, input.rx.position);
        let dir_atten_rx = geometry::directional_attenuation(input.rx.position, &input.rx.pattern, input.tx.position);

        let pr_dbm_raw = received_power(
            input.tx.pr0_dbm,
            input.tx.gain_dbi,
            dir_atten_tx,
            input.rx.gain_dbi,
            dir_atten_rx,
            input.environment,
            distance_m,
            rng,
        );

        // Doppler is applied before MIMO gain (§9 REDESIGN FLAG: the
        // original's order coupled Doppler loss to the post-MIMO SNR,
        // understating its effect at a given raw Pr).
        let doppler_loss_db = doppler_snr_loss_db(
            FREQUENCY_WIMAX_HZ,
            SUBCARRIER_SPACING_HZ,
            input.relative_velocity_mps,
            pr_dbm_raw - input.environment.last_segment_noise_dbm(),
        );
        let pr_after_doppler = pr_dbm_raw - doppler_loss_db;

        let mimo_gain_db = mimo_snr_gain_db(input.mimo_type, input.antenna_count_tx, input.antenna_count_rx);
        let pr_dbm = pr_after_doppler + mimo_gain_db;

        let env_noise = input.environment.last_segment_noise_dbm();
        let combined_noise = add_powers(env_noise, input.interference_noise_dbm, MIN_NOISE).max(STANDARD_NOISE);
        let snr_db = pr_dbm - combined_noise;

        let mcs_index = if input.adaptive_operating_rate {
            self.select_mcs(pr_dbm, combined_noise, input.packet_size_bytes)
        } else {
            input.operating_rate.min(WIMAX_RATES_NUMBER - 1)
        };

        let mcs = &MCS_TABLE[mcs_index];
        let is_qpsk = mcs.bits_per_symbol <= 2.0;
        let repetition_factor = input.wimax_repetition_factor.max(1);
        let repetition_snr_gain_db =
            if is_qpsk && repetition_factor > 1 { repetition_gain_db(repetition_factor) } else { 0.0 };

        let fer = self.fer_at_mcs(mcs_index, pr_dbm + repetition_snr_gain_db, combined_noise, input.packet_size_bytes);
        let loss_rate = fer.powi(MAX_TRANSMISSIONS as i32);
        let num_retransmissions = expected_retransmissions(fer, MAX_TRANSMISSIONS);

        let capacity = Capacity::derive(
            input.system_bandwidth_mhz,
            mcs_index,
            input.mimo_type,
            input.antenna_count_tx,
            input.antenna_count_rx,
            repetition_factor,
        );
        let sharing_factor = (input.concurrent_stations + 1) as f64;
        let bandwidth_bps = (capacity.dl_data_rate_bps / sharing_factor) * (1.0 - fer);

        // Frame-synchronous delay: average half a frame for TDD scheduling
        // plus retransmission rounds, each a full frame (§4.3).
        let base_delay_ms = WIMAX_FRAME_DURATION_MS / 2.0 + num_retransmissions * WIMAX_FRAME_DURATION_MS;
        let jitter_ms = WIMAX_FRAME_DURATION_MS / 4.0 * (1.0 + fer);

        ConnUpdateOutput {
            distance_m,
            distance_clamped,
            pr_dbm,
            snr_db,
            fer,
            loss_rate,
            num_retransmissions,
            new_operating_rate: mcs_index,
            delay_ms: base_delay_ms + input.tx.internal_delay_ms + input.rx.internal_delay_ms,
            jitter_ms,
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
            "outdoor",
            false,
            vec![Segment { alpha: 3.0, sigma_db: 0.0, wall_attenuation_db: 0.0, length_m: None, noise_power_dbm: -100.0 }],
        )
    }

    fn endpoint(pos: Coordinate, pr0: f64) -> Endpoint {
        Endpoint { position: pos, pattern: AntennaPattern::omni(), gain_dbi: 3.0, pr0_dbm: pr0, internal_delay_ms: 0.0 }
    }

    #[test]
    fn close_range_selects_high_mcs() {
        let model = Wimax80216e::new();
        let e = env();
        let tx = endpoint(Coordinate::new(0.0, 0.0, 0.0), crate::propagation::pr0(20.0, FREQUENCY_WIMAX_HZ, 0.0));
        let rx = endpoint(Coordinate::new(10.0, 0.0, 0.0), crate::propagation::pr0(20.0, FREQUENCY_WIMAX_HZ, 0.0));
        let input = ConnUpdateInput {
            tx, rx, environment: &e, channel: 0, packet_size_bytes: 1000, rts_cts_threshold_bytes: 2346,
            consider_interference: false, adaptive_operating_rate: true, operating_rate: 0, concurrent_stations: 0,
            interference_noise_dbm: MIN_NOISE, is_g_vs_b_compat: false, relative_velocity_mps: 0.0,
            mimo_type: crate::scenario::MimoType::Siso,
            antenna_count_tx: 1,
            antenna_count_rx: 1,
            system_bandwidth_mhz: 10.0,
            wimax_repetition_factor: 1,
        };
        let mut rng = EngineRng::seeded(3);
        let out = model.update_connection(&input, &mut rng);
        assert!(out.new_operating_rate >= rate_index::QAM_16_1_2);
    }

    #[test]
    fn doppler_reduces_pr_before_mimo_gain() {
        let model = Wimax80216e::new();
        let e = env();

        let make_input = |velocity_mps: f64| ConnUpdateInput {
            tx: endpoint(Coordinate::new(0.0, 0.0, 0.0), crate::propagation::pr0(20.0, FREQUENCY_WIMAX_HZ, 0.0)),
            rx: endpoint(Coordinate::new(50.0, 0.0, 0.0), crate::propagation::pr0(20.0, FREQUENCY_WIMAX_HZ, 0.0)),
            environment: &e, channel: 0, packet_size_bytes: 1000, rts_cts_threshold_bytes: 2346,
            consider_interference: false, adaptive_operating_rate: false, operating_rate: 5, concurrent_stations: 0,
            interference_noise_dbm: MIN_NOISE, is_g_vs_b_compat: false, relative_velocity_mps: velocity_mps,
            mimo_type: crate::scenario::MimoType::Siso,
            antenna_count_tx: 1,
            antenna_count_rx: 1,
            system_bandwidth_mhz: 10.0,
            wimax_repetition_factor: 1,
        };

        let mut rng1 = EngineRng::seeded(5);
        let mut rng2 = EngineRng::seeded(5);
        let out_slow = model.update_connection(&make_input(0.0), &mut rng1);
        let out_fast = model.update_connection(&make_input(30.0), &mut rng2);
        assert!(out_fast.pr_dbm <= out_slow.pr_dbm);
    }

    #[test]
    fn capacity_matches_10mhz_qpsk_half_siso_frame_budget() {
        // §8 scenario 5: 10 MHz, QPSK 1/2, SISO, 5ms frame.
        let capacity = Capacity::derive(10.0, rate_index::QPSK_1_2, crate::scenario::MimoType::Siso, 1, 1, 1);
        assert_eq!(capacity.dl_symbols, 35);
        assert_eq!(capacity.ul_symbols, 21);
        assert_eq!(capacity.dl_slots, 420);
        assert_eq!(capacity.ul_slots, 105);
    }

    #[test]
    fn matrix_b_multiplies_dl_rate_by_stream_count() {
        let siso = Capacity::derive(10.0, rate_index::QPSK_1_2, crate::scenario::MimoType::Siso, 1, 1, 1);
        let matrix_b = Capacity::derive(10.0, rate_index::QPSK_1_2, crate::scenario::MimoType::MatrixB, 2, 2, 1);
        assert_eq!(matrix_b.dl_data_rate_bps, siso.dl_data_rate_bps * 2.0);
    }

    #[test]
    fn repetition_factor_divides_qpsk_dl_rate() {
        let no_repetition = Capacity::derive(10.0, rate_index::QPSK_1_2, crate::scenario::MimoType::Siso, 1, 1, 1);
        let repeated = Capacity::derive(10.0, rate_index::QPSK_1_2, crate::scenario::MimoType::Siso, 1, 1, 2);
        assert_eq!(repeated.dl_data_rate_bps, no_repetition.dl_data_rate_bps / 2.0);
    }

    #[test]
    fn matrix_a_adds_snr_gain_instead_of_rate_multiplier() {
        let siso_gain = mimo_snr_gain_db(crate::scenario::MimoType::Siso, 1, 1);
        let matrix_a_gain = mimo_snr_gain_db(crate::scenario::MimoType::MatrixA, 2, 2);
        assert_eq!(siso_gain, 0.0);
        assert!(matrix_a_gain > 0.0);
    }
}
