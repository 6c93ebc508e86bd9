//! 802.11 b/g/a PHY/MAC model (§4.3 "802.11 family").
//!
//! Rate/threshold tables are grounded on the *structure* documented in
//! `examples/original_source/deltaQ/wlan.c` (per-adapter `Pr_thresholds`
//! array indexed by rate, `Pr_threshold_fer`/`Pr_threshold_per`, PSDU-size
//! renormalization, RTS/CTS `MAX_TRANSMISSIONS_RTS_CTS`, ARF thresholds) —
//! the exact OEM calibration constants are adapter-specific data tables, so
//! representative values from the same family of 802.11 link-budget
//! literature are used in their place (`AdapterTable::orinoco` etc.),
//! documented per-constant below.

use crate::constants::{MAX_FER, MIN_NOISE, STANDARD_NOISE};
use crate::geometry;
use crate::propagation::{add_powers, doppler_snr_loss_db, received_power};
use crate::rng::EngineRng;
use qomet_types::Standard;

use super::common::{expected_retransmissions, ConnUpdateInput, ConnUpdateOutput, StandardModel};

/// PHY-layer service-data-unit reference length (bytes) FER is normalized
/// against before being re-scaled to the actual payload (§4.3, GLOSSARY
/// "PSDU").
const PSDU_DSSS_BYTES: f64 = 1500.0;
const PSDU_OFDM_BYTES: f64 = 1500.0;

const MAC_HEADER_BYTES: u32 = 28;
const ACK_BYTES: u32 = 14;
const RTS_BYTES: u32 = 20;
const CTS_BYTES: u32 = 14;

const SIFS_US: f64 = 10.0;
const DIFS_DSSS_US: f64 = 50.0;
const SIFS_OFDM_US: f64 = 16.0;
const DIFS_OFDM_US: f64 = 34.0;
const SLOT_DSSS_US: f64 = 20.0;
const SLOT_OFDM_US: f64 = 9.0;
const CW_MIN: f64 = 15.0;
const MAX_TRANSMISSIONS: u32 = 7;
const MAX_TRANSMISSIONS_RTS_CTS: u32 = 4;

const ARF_FER_DOWN_THRESHOLD: f64 = 0.3;
const ARF_FER_UP_THRESHOLD: f64 = 0.9;
const ARF_FER_KEEP_THRESHOLD: f64 = 0.2;

/// One operating rate's PHY parameters and sensitivity threshold.
#[derive(Debug, Clone, Copy)]
pub struct RateEntry {
    pub mbps: f64,
    pub pr_threshold_dbm: f64,
    pub is_ofdm: bool,
}

#[derive(Debug, Clone)]
pub struct AdapterTable {
    pub rates: Vec<RateEntry>,
    pub pr_threshold_fer: f64,
    pub fer_alpha: f64,
    pub frequency_hz: f64,
    pub subcarrier_spacing_hz: f64,
}

impl AdapterTable {
    /// ORiNOCO 802.11b: 4 DSSS/CCK rates.
    pub fn orinoco_802_11b() -> Self {
        Self {
            rates: vec![
                RateEntry { mbps: 1.0, pr_threshold_dbm: -94.0, is_ofdm: false },
                RateEntry { mbps: 2.0, pr_threshold_dbm: -91.0, is_ofdm: false },
                RateEntry { mbps: 5.5, pr_threshold_dbm: -88.0, is_ofdm: false },
                RateEntry { mbps: 11.0, pr_threshold_dbm: -82.0, is_ofdm: false },
            ],
            pr_threshold_fer: 0.08,
            fer_alpha: 0.5,
            frequency_hz: 2.4e9,
            subcarrier_spacing_hz: 0.0, // DSSS — no OFDM subcarriers, no Doppler term
        }
    }

    /// Cisco a/b/g 802.11g: DSSS rates plus OFDM rates, compat mode capable.
    pub fn cisco_802_11g() -> Self {
        Self {
            rates: vec![
                RateEntry { mbps: 1.0, pr_threshold_dbm: -94.0, is_ofdm: false },
                RateEntry { mbps: 2.0, pr_threshold_dbm: -91.0, is_ofdm: false },
                RateEntry { mbps: 5.5, pr_threshold_dbm: -88.0, is_ofdm: false },
                RateEntry { mbps: 11.0, pr_threshold_dbm: -82.0, is_ofdm: false },
                RateEntry { mbps: 6.0, pr_threshold_dbm: -90.0, is_ofdm: true },
                RateEntry { mbps: 12.0, pr_threshold_dbm: -87.0, is_ofdm: true },
                RateEntry { mbps: 24.0, pr_threshold_dbm: -83.0, is_ofdm: true },
                RateEntry { mbps: 54.0, pr_threshold_dbm: -71.0, is_ofdm: true },
            ],
            pr_threshold_fer: 0.08,
            fer_alpha: 0.5,
            frequency_hz: 2.4e9,
            subcarrier_spacing_hz: 312.5e3,
        }
    }

    /// Cisco 802.11a: OFDM-only rates, 5 GHz band.
    pub fn cisco_802_11a() -> Self {
        Self {
            rates: vec![
                RateEntry { mbps: 6.0, pr_threshold_dbm: -90.0, is_ofdm: true },
                RateEntry { mbps: 12.0, pr_threshold_dbm: -87.0, is_ofdm: true },
                RateEntry { mbps: 24.0, pr_threshold_dbm: -83.0, is_ofdm: true },
                RateEntry { mbps: 36.0, pr_threshold_dbm: -79.0, is_ofdm: true },
                RateEntry { mbps: 54.0, pr_threshold_dbm: -71.0, is_ofdm: true },
            ],
            pr_threshold_fer: 0.10,
            fer_alpha: 0.5,
            frequency_hz: 5.8e9,
            subcarrier_spacing_hz: 312.5e3,
        }
    }

    pub fn psdu_bytes(&self, rate: &RateEntry) -> f64 {
        if rate.is_ofdm { PSDU_OFDM_BYTES } else { PSDU_DSSS_BYTES }
    }

    pub fn lowest_rate_index(&self) -> usize {
        0
    }

    pub fn highest_rate_index(&self) -> usize {
        self.rates.len() - 1
    }

    /// Lowest receive sensitivity across the adapter's rate table (most
    /// negative `pr_threshold_dbm`): an interferer weaker than this can't
    /// even be decoded as a frame preamble, so it folds into the noise
    /// floor instead of being counted as a contending station (§4.5).
    pub fn lowest_sensitivity_dbm(&self) -> f64 {
        self.rates
            .iter()
            .map(|r| r.pr_threshold_dbm)
            .fold(f64::INFINITY, f64::min)
    }
}

pub struct Wlan80211 {
    pub table: AdapterTable,
    pub standard: Standard,
}

impl Wlan80211 {
    pub fn new(standard: Standard) -> Self {
        let table = match standard {
            Standard::Wlan80211b => AdapterTable::orinoco_802_11b(),
            Standard::Wlan80211g => AdapterTable::cisco_802_11g(),
            Standard::Wlan80211a => AdapterTable::cisco_802_11a(),
            _ => panic!("Wlan80211 model constructed for non-WLAN standard"),
        };
        Self { table, standard }
    }

    /// FER at a given rate index, folded for the actual packet size (§4.3):
    /// `fer_PSDU = fer_thresh * exp(alpha*(Pr_thresh_r - (Pr - combined_noise)))`,
    /// clamped to `[0, MAX_FER]`, then size-adapted:
    /// `fer_actual = 1 - (1 - fer_PSDU)^((payload+header)/PSDU)`.
    pub fn fer_at_rate(
        &self,
        rate_index: usize,
        pr_dbm: f64,
        combined_noise_dbm: f64,
        payload_bytes: u32,
    ) -> f64 {
        let rate = &self.table.rates[rate_index];
        let snr_like = pr_dbm - combined_noise_dbm;
        let fer_psdu = (self.table.pr_threshold_fer
            * (self.table.fer_alpha * (rate.pr_threshold_dbm - snr_like)).exp())
        .clamp(0.0, MAX_FER);
        let psdu = self.table.psdu_bytes(rate);
        let exponent = (payload_bytes as f64 + MAC_HEADER_BYTES as f64) / psdu;
        (1.0 - (1.0 - fer_psdu).powf(exponent)).clamp(0.0, MAX_FER)
    }

    fn max_transmissions(&self, packet_size_bytes: u32, rts_cts_threshold: u32) -> u32 {
        if packet_size_bytes > rts_cts_threshold {
            MAX_TRANSMISSIONS_RTS_CTS
        } else {
            MAX_TRANSMISSIONS
        }
    }

    /// ARF-style adaptive rate (§4.3 "Adaptive rate").
    fn adapt_rate(
        &self,
        mut rate_index: usize,
        pr_dbm: f64,
        combined_noise_dbm: f64,
        payload_bytes: u32,
    ) -> usize {
        loop {
            let fer = self.fer_at_rate(rate_index, pr_dbm, combined_noise_dbm, payload_bytes);
            if fer.powi(2) > ARF_FER_DOWN_THRESHOLD && rate_index > self.table.lowest_rate_index() {
                rate_index -= 1;
                continue;
            }
            if (1.0 - fer).powi(10) > ARF_FER_UP_THRESHOLD && rate_index < self.table.highest_rate_index() {
                let probe_fer =
                    self.fer_at_rate(rate_index + 1, pr_dbm, combined_noise_dbm, payload_bytes);
                if probe_fer < ARF_FER_KEEP_THRESHOLD {
                    rate_index += 1;
                    continue;
                }
            }
            break;
        }
        rate_index
    }

    /// PPDU duration at `rate_index`, including RTS/CTS and g-compat
    /// CTS-to-self overhead (§4.3).
    fn ppdu_duration_us(&self, rate_index: usize, payload_bytes: u32, rts_cts: bool, g_compat: bool) -> f64 {
        let rate = &self.table.rates[rate_index];
        let (sifs, difs, slot) = if rate.is_ofdm {
            (SIFS_OFDM_US, DIFS_OFDM_US, SLOT_OFDM_US)
        } else {
            (SIFS_US, DIFS_DSSS_US, SLOT_DSSS_US)
        };
        let preamble_us = if rate.is_ofdm { 20.0 } else { 192.0 };
        let bits = (MAC_HEADER_BYTES + payload_bytes) as f64 * 8.0;
        let frame_us = (bits / (rate.mbps * 1e6) * 1e6).ceil();
        let ack_us = (ACK_BYTES as f64 * 8.0 / (rate.mbps * 1e6) * 1e6).ceil();

        let mut duration = difs + preamble_us + frame_us + sifs + preamble_us + ack_us;

        if rts_cts {
            let rts_us = (RTS_BYTES as f64 * 8.0 / (rate.mbps * 1e6) * 1e6).ceil();
            let cts_us = (CTS_BYTES as f64 * 8.0 / (rate.mbps * 1e6) * 1e6).ceil();
            duration += rts_us + cts_us + 2.0 * sifs;
        }
        if g_compat {
            let cts_self_us = (CTS_BYTES as f64 * 8.0 / (rate.mbps * 1e6) * 1e6).ceil();
            duration += cts_self_us + sifs;
        }
        duration
    }

    /// Delay/jitter over the FER-weighted retransmission distribution
    /// (§4.3). `n` is `concurrent_stations + 1` for the CSMA/CA
    /// capacity-sharing multiplier (§4.5).
    fn delay_jitter_ms(
        &self,
        rate_index: usize,
        fer: f64,
        payload_bytes: u32,
        rts_cts: bool,
        g_compat: bool,
        max_transmissions: u32,
        n_sharing: u32,
    ) -> (f64, f64) {
        let (_, _, slot) = if self.table.rates[rate_index].is_ofdm {
            (SIFS_OFDM_US, DIFS_OFDM_US, SLOT_OFDM_US)
        } else {
            (SIFS_US, DIFS_DSSS_US, SLOT_DSSS_US)
        };
        let t_frame = self.ppdu_duration_us(rate_index, payload_bytes, rts_cts, g_compat);
        let busy_fraction = (fer * 0.3).min(0.9); // fraction of slots observed busy, grows with loss

        let mut delays = Vec::with_capacity(max_transmissions as usize + 1);
        let mut weights = Vec::with_capacity(max_transmissions as usize + 1);
        let mut cumulative_time = 0.0;
        for i in 0..=max_transmissions {
            let cw = CW_MIN * 2f64.powi(i as i32).min(16.0);
            cumulative_time += t_frame + cw * slot / 2.0;
            let d_i = cumulative_time / (1.0 - busy_fraction).max(0.01);
            delays.push(d_i);
            let w = if i < max_transmissions {
                (1.0 - fer) * fer.powi(i as i32)
            } else {
                fer.powi(max_transmissions as i32)
            };
            weights.push(w);
        }

        let sharing_factor = ((n_sharing as f64) * (n_sharing as f64).max(2.0).log2()).sqrt().max(1.0);

        let mean_delay: f64 = delays.iter().zip(weights.iter()).map(|(d, w)| d * w).sum();
        let mean_delay_us = mean_delay * sharing_factor;

        let mut jitter_us: f64 = delays
            .iter()
            .zip(weights.iter())
            .map(|(d, w)| w * (d * sharing_factor - mean_delay_us).abs())
            .sum();
        // zero-retransmission-bucket correction (§4.3)
        jitter_us += slot * (CW_MIN + 1.0) / 4.0;

        (mean_delay_us / 1000.0, jitter_us / 1000.0)
    }
}

impl StandardModel for Wlan80211 {
    fn update_connection(&self, input: &ConnUpdateInput, rng: &mut EngineRng) -> ConnUpdateOutput {
        let (distance_m, distance_clamped) = geometry::distance(input.tx.position, input.rx.position);

        let dir_atten_tx = geometry::directional_attenuation(input.tx.position, &input.tx.pattern, input.rx.position);
        let dir_atten_rx = geometry::directional_attenuation(input.rx.position, &input.rx.pattern, input.tx.position);

        let pr_dbm = received_power(
            input.tx.pr0_dbm,
            input.tx.gain_dbi,
            dir_atten_tx,
            input.rx.gain_dbi,
            dir_atten_rx,
            input.environment,
            distance_m,
            rng,
        );

        let env_noise = input.environment.last_segment_noise_dbm();
        let combined_noise = add_powers(env_noise, input.interference_noise_dbm, MIN_NOISE).max(STANDARD_NOISE);

        let mut snr_db = pr_dbm - combined_noise;
        if self.table.rates[input.operating_rate].is_ofdm {
            // Doppler applied before any MIMO gain would be added (§9 order
            // preservation note; WLAN here has no MIMO gain term).
            snr_db -= doppler_snr_loss_db(
                self.table.frequency_hz,
                self.table.subcarrier_spacing_hz,
                input.relative_velocity_mps,
                snr_db,
            );
        }

        let operating_rate = if input.adaptive_operating_rate {
            self.adapt_rate(input.operating_rate, pr_dbm, combined_noise, input.packet_size_bytes)
        } else {
            input.operating_rate
        };

        let fer = self.fer_at_rate(operating_rate, pr_dbm, combined_noise, input.packet_size_bytes);
        let max_tx = self.max_transmissions(input.packet_size_bytes, input.rts_cts_threshold_bytes);
        let loss_rate = fer.powi(max_tx as i32);
        let num_retransmissions = expected_retransmissions(fer, max_tx);

        let rts_cts = input.packet_size_bytes > input.rts_cts_threshold_bytes;
        let g_compat = self.standard == Standard::Wlan80211g && input.is_g_vs_b_compat;

        let n_sharing = input.concurrent_stations + 1;
        let (delay_ms, jitter_ms) = self.delay_jitter_ms(
            operating_rate, fer, input.packet_size_bytes, rts_cts, g_compat, max_tx, n_sharing,
        );

        let rate = &self.table.rates[operating_rate];
        let bandwidth_bps = rate.mbps * 1e6 * (1.0 - fer);

        ConnUpdateOutput {
            distance_m,
            distance_clamped,
            pr_dbm,
            snr_db,
            fer,
            loss_rate,
            num_retransmissions,
            new_operating_rate: operating_rate,
            delay_ms: delay_ms + input.tx.internal_delay_ms + input.rx.internal_delay_ms,
            jitter_ms,
            bandwidth_bps,
            compatibility_mode: g_compat,
            interference_fer: 0.0,
        }
    }
}
