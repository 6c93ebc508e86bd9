//! Environment model (§4.2, §3 Environment).
//!
//! `string_hash` is carried over verbatim from
//! `examples/original_source/deltaQ/generic.h`'s documented "Jenkins one at a
//! time hash" (§3 "Environment: name (hashed for fast lookup)",
//! SPEC_FULL.md supplemented feature #1).

/// Jenkins one-at-a-time hash, used to key environments by name for O(1)
/// lookup instead of the linear name scan a naive port would do.
pub fn string_hash(key: &str) -> u32 {
    let mut hash: u32 = 0;
    for &b in key.as_bytes() {
        hash = hash.wrapping_add(b as u32);
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash = hash.wrapping_add(hash << 15);
    hash
}

/// One segment of a (possibly multi-segment, dynamic) environment (§3
/// Environment, §4.2 "Multi-segment case").
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    /// Path-loss exponent α.
    pub alpha: f64,
    /// Shadow-fading standard deviation σ, dB.
    pub sigma_db: f64,
    /// Wall attenuation W, dB.
    pub wall_attenuation_db: f64,
    /// Segment length in meters; `None` means "use the runtime connection
    /// distance" (§3 "length (m; −1 means 'use runtime distance')").
    pub length_m: Option<f64>,
    /// Segment noise power, dBm.
    pub noise_power_dbm: f64,
}

/// A named propagation environment: an ordered, non-empty list of segments
/// (§3 invariant "at least one segment").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Environment {
    pub name: String,
    pub name_hash: u32,
    pub is_dynamic: bool,
    pub segments: Vec<Segment>,
}

impl Environment {
    pub fn new(name: impl Into<String>, is_dynamic: bool, segments: Vec<Segment>) -> Self {
        assert!(!segments.is_empty(), "environment must carry at least one segment");
        let name = name.into();
        let name_hash = string_hash(&name);
        Self { name, name_hash, is_dynamic, segments }
    }

    /// The noise power of the last segment — what the 802.11 FER model
    /// combines with interference noise (§4.3 "combined_noise =
    /// add_powers(env_noise_last_segment, interference_noise, MIN_NOISE)").
    pub fn last_segment_noise_dbm(&self) -> f64 {
        self.segments.last().expect("non-empty by construction").noise_power_dbm
    }
}
