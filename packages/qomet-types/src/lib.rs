//! # qomet-types
//!
//! Shared wire/record structures for the QOMET wireless-network emulator.
//!
//! These types are used by:
//! - `qomet-engine`: producing per-tick deltaQ samples (bandwidth, loss,
//!   delay, jitter) for every connection in a scenario
//! - `qomet-shaper`: consuming that same stream and reprogramming the host
//!   kernel's traffic-shaping pipes to match
//!
//! ## Conventions
//!
//! - All radio powers are in dBm/dB unless explicitly summed as linear mW
//!   (see `qomet-engine::propagation::add_powers`).
//! - Bandwidth is bits/second, delay and jitter are milliseconds, loss is a
//!   fraction in `[0,1]`.
//! - `from_id`/`to_id` are node-table indices resolved at scenario init time
//!   (§3 "Node: ... stable numeric id = index in node table"); nothing
//!   downstream of init ever looks connections up by name.

use serde::{Deserialize, Serialize};

// ── Radio standards (§3 Connection.standard) ─────────────────────────────────

/// The wireless/wired technology driving a connection's PHY/MAC model.
///
/// Dispatch target for the five per-standard operations in §4.3:
/// `update_connection`, `fer`, `loss_rate`, `operating_rate`, `delay_jitter`,
/// `bandwidth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standard {
    Wlan80211b,
    Wlan80211g,
    Wlan80211a,
    Wimax80216e,
    Zigbee802154,
    ActiveTag,
    Ethernet10,
    Ethernet100,
    Ethernet1000,
}

impl Standard {
    /// Family used by the interference engine (§4.5) to decide whether two
    /// connections can interfere with each other at all.
    pub fn family(&self) -> StandardFamily {
        match self {
            Standard::Wlan80211b | Standard::Wlan80211g => StandardFamily::BgDsss,
            Standard::Wlan80211a => StandardFamily::Ofdm5GHz,
            Standard::Zigbee802154 => StandardFamily::Zigbee,
            Standard::ActiveTag => StandardFamily::ActiveTag,
            Standard::Wimax80216e => StandardFamily::Wimax,
            Standard::Ethernet10 | Standard::Ethernet100 | Standard::Ethernet1000 => {
                StandardFamily::Wired
            }
        }
    }

    pub fn is_wired(&self) -> bool {
        matches!(self.family(), StandardFamily::Wired)
    }

    /// Nominal wired rate in bits/second; `None` for wireless standards (the
    /// rate there is adaptive / capacity-derived, not a fixed nominal value).
    pub fn wired_nominal_bps(&self) -> Option<f64> {
        match self {
            Standard::Ethernet10 => Some(10e6),
            Standard::Ethernet100 => Some(100e6),
            Standard::Ethernet1000 => Some(1000e6),
            _ => None,
        }
    }
}

/// Co-interference families — only connections in the same family ever run
/// through the interference engine against each other (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardFamily {
    BgDsss,
    Ofdm5GHz,
    Zigbee,
    ActiveTag,
    Wimax,
    Wired,
}

// ── deltaQ sample (§6 binary record payload) ─────────────────────────────────

/// One connection's QoS parameters at one simulated instant.
///
/// This is the little-endian, fixed-size record written after every
/// `{time:f64, record_count:u32}` time header in the `.bin` output (§6), and
/// is also what the shaper driver consumes (live, over a channel, or read
/// back from disk) to reprogram its pipes (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct DeltaQSample {
    pub from_id: u32,
    pub to_id: u32,
    pub bandwidth_bps: f32,
    pub loss: f32,
    pub delay_ms: f32,
    pub jitter_ms: f32,
}

impl DeltaQSample {
    pub fn new(from_id: u32, to_id: u32, bandwidth_bps: f64, loss: f64, delay_ms: f64, jitter_ms: f64) -> Self {
        Self {
            from_id,
            to_id,
            bandwidth_bps: bandwidth_bps as f32,
            loss: loss as f32,
            delay_ms: delay_ms as f32,
            jitter_ms: jitter_ms as f32,
        }
    }

    /// (from_id, to_id) as a binary-diff key — see §6 "binary-record diffing".
    pub fn key(&self) -> (u32, u32) {
        (self.from_id, self.to_id)
    }
}

/// A full tick's worth of samples, stamped with simulation time (seconds
/// since scenario start). Mirrors the `{time:f64, record_count:u32}` header
/// that precedes each group of `DeltaQSample` records in the `.bin` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaQTick {
    pub time_s: f64,
    pub samples: Vec<DeltaQSample>,
}

// ── Shaper driver configuration surface (§6 CLI surface) ─────────────────────

/// Which of the two shaper operating modes described in §4.9 is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageMode {
    Pairwise,
    Fleet,
}

/// Traffic direction for a shaping rule, matching the kernel facade's
/// `add_rule(..., direction)` parameter (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    In,
    Out,
    Both,
}

/// Motion-trace output format (§6 "Motion (.nam or .ns2)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionTraceFormat {
    None,
    Nam,
    Ns2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_family_groups_bg_together() {
        assert_eq!(Standard::Wlan80211b.family(), StandardFamily::BgDsss);
        assert_eq!(Standard::Wlan80211g.family(), StandardFamily::BgDsss);
        assert_ne!(Standard::Wlan80211a.family(), StandardFamily::BgDsss);
    }

    #[test]
    fn deltaq_sample_is_plain_old_data() {
        // bytemuck::Pod requires this to hold; exercised via cast round-trip.
        let s = DeltaQSample::new(1, 2, 1e6, 0.01, 5.0, 0.5);
        let bytes = bytemuck::bytes_of(&s);
        let back: DeltaQSample = *bytemuck::from_bytes(bytes);
        assert_eq!(s, back);
    }

    #[test]
    fn wired_standards_report_nominal_rate() {
        assert_eq!(Standard::Ethernet100.wired_nominal_bps(), Some(100e6));
        assert_eq!(Standard::Wlan80211g.wired_nominal_bps(), None);
    }
}
