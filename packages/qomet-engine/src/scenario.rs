//! Scenario data model (§3).
//!
//! Ownership: the `Scenario` owns every collection; everything else holds a
//! resolved integer index, never a name, once `Scenario::init` has run (§9
//! "String-keyed cross-references... replace with index handles").

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use qomet_types::Standard;

use crate::environment::Environment;
use crate::error::InputError;
use crate::geometry::{AntennaPattern, Coordinate};

pub type NodeId = usize;
pub type InterfaceId = usize;
pub type EnvironmentId = usize;
pub type ConnectionId = usize;
pub type ObjectId = usize;
pub type MotionId = usize;

// ── Interface (§3 Interface) ─────────────────────────────────────────────────

/// Adapter kind: identifies which per-standard parameter table an interface
/// draws its Pr-threshold / rate tables from (§3 "adapter kind (enum
/// identifying a per-standard parameter table)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdapterKind {
    Orinoco,
    Dei80211Mr,
    Cisco340,
    CiscoAbg,
    JennicZigbee,
    ActiveTag303,
    WimaxGeneric,
    EthernetGeneric,
}

/// MIMO configuration for WiMAX capacity sub-state (§3 Interface "for WiMAX:
/// OFDMA capacity bundle").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MimoType {
    Siso,
    MatrixA,
    MatrixB,
}

fn default_repetition_factor() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WimaxCapacityState {
    pub system_bandwidth_mhz: f64,
    pub mcs_index: usize,
    pub mimo_type: MimoType,
    pub antenna_count_tx: u32,
    pub antenna_count_rx: u32,
    #[serde(default = "default_repetition_factor")]
    pub repetition_factor: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    pub id: InterfaceId,
    pub gain_dbi: f64,
    pub pattern: AntennaPattern,
    pub adapter: AdapterKind,
    /// Pr0 per band (index is whatever the adapter table uses — e.g. one
    /// entry per supported channel/frequency).
    pub pr0_dbm: Vec<f64>,
    pub antenna_count_tx: u32,
    pub antenna_count_rx: u32,
    pub noise_source: Option<(f64, f64)>,
    pub wimax: Option<WimaxCapacityState>,
}

impl Interface {
    pub fn is_noise_source_at(&self, time_s: f64) -> bool {
        matches!(self.noise_source, Some((start, end)) if time_s >= start && time_s < end)
    }
}

// ── Node (§3 Node) ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub id: NodeId,
    pub position: Coordinate,
    pub velocity: Coordinate,
    pub internal_delay_ms: f64,
    pub pt_dbm: f64,
    pub interfaces: Vec<Interface>,
}

// ── Object (§3 Object) ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Building,
    Road,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    pub height_m: f64,
    pub environment_name: String,
    pub vertices: Vec<Coordinate>,
    pub is_polyline: bool,
}

impl SceneObject {
    /// Post-init invariant (§3 Object): a closed polygon's first vertex
    /// equals its last, unless explicitly marked as a polyline.
    pub fn check_closure_invariant(&self) -> bool {
        if self.is_polyline {
            return true;
        }
        match (self.vertices.first(), self.vertices.last()) {
            (Some(first), Some(last)) => first == last,
            _ => false,
        }
    }
}

// ── Fixed deltaQ overrides (§3, §4.7) ────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FixedDeltaQEntry {
    pub start_s: f64,
    pub end_s: f64,
    pub bandwidth_bps: Option<f64>,
    pub loss: Option<f64>,
    pub delay_ms: Option<f64>,
    pub jitter_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixedDeltaQTable {
    entries: Vec<FixedDeltaQEntry>,
}

impl FixedDeltaQTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, validating ordering and capacity (§4.7 "Adding an
    /// entry validates that start_i ≥ end_{i-1}... fits MAX_FIXED_DELTAQ").
    pub fn push(&mut self, entry: FixedDeltaQEntry) -> Result<(), InputError> {
        if self.entries.len() >= crate::constants::MAX_FIXED_DELTAQ {
            return Err(InputError::FixedDeltaQFull(crate::constants::MAX_FIXED_DELTAQ));
        }
        if let Some(prev) = self.entries.last() {
            if entry.start_s < prev.end_s {
                return Err(InputError::FixedDeltaQOrdering(entry.start_s, prev.end_s));
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Select the active entry at `time_s`, if any (§4.7: `start_i <= t <
    /// end_i`).
    pub fn active_at(&self, time_s: f64) -> Option<&FixedDeltaQEntry> {
        self.entries.iter().find(|e| time_s >= e.start_s && time_s < e.end_s)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Connection (§3 Connection) ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DynamicConnectionState {
    pub distance_m: f64,
    pub pr_dbm: f64,
    pub snr_db: f64,
    pub fer: f64,
    pub interference_fer: f64,
    pub loss_rate: f64,
    pub delay_ms: f64,
    pub jitter_ms: f64,
    pub bandwidth_bps: f64,
    pub num_retransmissions: f64,
    pub concurrent_stations: u32,
    pub interference_noise_dbm: f64,
    pub compatibility_mode: bool,
    pub bandwidth_defined: bool,
    pub loss_defined: bool,
    pub delay_defined: bool,
    pub jitter_defined: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub name: String,
    pub id: ConnectionId,
    pub from_node: NodeId,
    pub from_interface: InterfaceId,
    pub to_node: NodeId,
    pub to_interface: InterfaceId,
    pub through_environment: EnvironmentId,
    pub packet_size_bytes: u32,
    pub channel: u32,
    pub standard: Standard,
    pub rts_cts_threshold_bytes: u32,
    pub consider_interference: bool,
    pub adaptive_operating_rate: bool,
    pub operating_rate: usize,
    pub new_operating_rate: usize,
    pub fixed_deltaq: FixedDeltaQTable,
    pub state: DynamicConnectionState,
}

// ── Motion (§3 Motion, §4.6) ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MotionKind {
    Linear { velocity: Coordinate },
    Behavioral { destination: Coordinate, nominal_speed_mps: f64 },
    Trace { handle: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Motion {
    pub node: NodeId,
    pub kind: MotionKind,
    pub start_s: f64,
    pub stop_s: f64,
}

// ── Scenario container (§3 Lifecycle) ────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    pub nodes: Vec<Node>,
    pub environments: Vec<Environment>,
    pub objects: Vec<SceneObject>,
    pub connections: Vec<Connection>,
    pub motions: Vec<Motion>,

    pub start_time_s: f64,
    pub duration_s: f64,
    pub step_s: f64,
    pub motion_step_divider: u32,
    pub cartesian_coord_syst: bool,

    #[serde(skip)]
    environment_by_name: HashMap<String, EnvironmentId>,
    #[serde(skip)]
    node_by_name: HashMap<String, NodeId>,
}

impl Scenario {
    pub fn new(start_time_s: f64, duration_s: f64, step_s: f64, motion_step_divider: u32) -> Self {
        Self {
            start_time_s,
            duration_s,
            step_s,
            motion_step_divider: motion_step_divider.max(1),
            cartesian_coord_syst: true,
            ..Default::default()
        }
    }

    /// Rebuild the name→index lookup maps after deserializing a scenario
    /// from disk (§3 "String-keyed cross-references... the name→index map
    /// only at parse time" — the maps themselves are not part of the wire
    /// format, only the `name` fields they're built from are).
    pub fn rebuild_name_indices(&mut self) {
        self.node_by_name = self.nodes.iter().map(|n| (n.name.clone(), n.id)).collect();
        self.environment_by_name = self
            .environments
            .iter()
            .enumerate()
            .map(|(id, e)| (e.name.clone(), id))
            .collect();
    }

    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        let id = self.nodes.len();
        node.id = id;
        self.node_by_name.insert(node.name.clone(), id);
        self.nodes.push(node);
        id
    }

    pub fn add_environment(&mut self, environment: Environment) -> EnvironmentId {
        let id = self.environments.len();
        self.environment_by_name.insert(environment.name.clone(), id);
        self.environments.push(environment);
        id
    }

    pub fn resolve_node(&self, name: &str) -> Result<NodeId, InputError> {
        self.node_by_name
            .get(name)
            .copied()
            .ok_or_else(|| InputError::UnknownNode(name.to_string()))
    }

    pub fn resolve_environment(&self, name: &str) -> Result<EnvironmentId, InputError> {
        self.environment_by_name
            .get(name)
            .copied()
            .ok_or_else(|| InputError::UnknownEnvironment(name.to_string()))
    }

    pub fn resolve_interface(&self, node: NodeId, iface_name: &str) -> Result<InterfaceId, InputError> {
        let n = self.nodes.get(node).ok_or(InputError::IdOutOfRange(node, self.nodes.len()))?;
        n.interfaces
            .iter()
            .position(|i| i.name == iface_name)
            .ok_or_else(|| InputError::UnknownInterface(iface_name.to_string(), n.name.clone()))
    }

    /// Tick count for the per-tick loop (§4.8): `ceil(duration / step)`.
    pub fn tick_count(&self) -> u64 {
        (self.duration_s / self.step_s).ceil().max(0.0) as u64
    }
}
