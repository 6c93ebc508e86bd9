//! DeltaQ precompute-to-steady-state and per-tick simulation loop (§4.8).
//!
//! Ordering within a tick follows §5 verbatim: motion → propagation →
//! interference → FER → loss/rate → delay → bandwidth. Across ticks, no
//! reordering is permitted — `run` always advances `t` monotonically by
//! `step_s`.

use tracing::warn;

use qomet_types::DeltaQSample;

use crate::config::EngineConfig;
use crate::constants::MIN_NOISE;
use crate::error::EngineResult;
use crate::interference::{self, Interferer};
use crate::motion;
use crate::rng::EngineRng;
use crate::scenario::{Connection, DynamicConnectionState, Scenario};
use crate::standards::common::{ConnUpdateInput, Endpoint};

/// Outcome of running one connection to steady state at init (§4.8
/// "Precompute").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecomputeOutcome {
    Converged { iterations: u32 },
    HitIterationCap,
}

fn build_endpoint(scenario: &Scenario, node_id: usize, interface_id: usize) -> Endpoint {
    let node = &scenario.nodes[node_id];
    let iface = &node.interfaces[interface_id];
    Endpoint {
        position: node.position,
        pattern: iface.pattern,
        gain_dbi: iface.gain_dbi,
        pr0_dbm: iface.pr0_dbm.first().copied().unwrap_or(0.0),
        internal_delay_ms: node.internal_delay_ms,
    }
}

fn gather_interferers(scenario: &Scenario, exclude: usize, time_s: f64) -> Vec<Interferer> {
    scenario
        .connections
        .iter()
        .enumerate()
        .filter(|(idx, c)| *idx != exclude && c.consider_interference)
        .map(|(_, c)| {
            let node = &scenario.nodes[c.from_node];
            let iface = &node.interfaces[c.from_interface];
            Interferer {
                standard: c.standard,
                channel: c.channel,
                position: node.position,
                pr0_dbm: iface.pr0_dbm.first().copied().unwrap_or(0.0),
                gain_dbi: iface.gain_dbi,
                from_node: c.from_node,
                from_interface: c.from_interface,
                is_noise_source: iface.is_noise_source_at(time_s),
            }
        })
        .collect()
}

/// WiMAX capacity parameters for a connection (§4.3): pulled from either
/// endpoint's `Interface.wimax`, tx preferred, falling back to a SISO/1x1
/// 10 MHz default when neither side carries an OFDMA capacity bundle.
fn wimax_params(
    scenario: &Scenario,
    connection: &Connection,
) -> (crate::scenario::MimoType, u32, u32, f64, u32) {
    let tx_iface = &scenario.nodes[connection.from_node].interfaces[connection.from_interface];
    let rx_iface = &scenario.nodes[connection.to_node].interfaces[connection.to_interface];
    match tx_iface.wimax.as_ref().or(rx_iface.wimax.as_ref()) {
        Some(w) => (
            w.mimo_type,
            tx_iface.antenna_count_tx,
            rx_iface.antenna_count_rx,
            w.system_bandwidth_mhz,
            w.repetition_factor,
        ),
        None => (
            crate::scenario::MimoType::Siso,
            1,
            1,
            crate::standards::wimax::SYSTEM_BANDWIDTHS_MHZ[crate::standards::wimax::bw_index::SYS_BW_6],
            1,
        ),
    }
}

/// Run one connection-update pass (§4.4), writing the result into
/// `connection.state`. `time_s` feeds fixed-deltaQ window selection and
/// noise-source-window checks.
fn update_one_connection(
    scenario: &Scenario,
    connection_idx: usize,
    time_s: f64,
    rng: &mut EngineRng,
) -> DynamicConnectionState {
    let connection = &scenario.connections[connection_idx];
    let environment = &scenario.environments[connection.through_environment];

    let tx = build_endpoint(scenario, connection.from_node, connection.from_interface);
    let rx = build_endpoint(scenario, connection.to_node, connection.to_interface);

    let mut state = connection.state.clone();

    let account = if connection.consider_interference {
        let interferers = gather_interferers(scenario, connection_idx, time_s);
        let lowest_sensitivity_dbm = crate::standards::lowest_sensitivity_dbm(connection.standard);
        interference::accumulate(
            connection.standard,
            connection.channel,
            connection.to_node,
            rx.position,
            rx.gain_dbi,
            lowest_sensitivity_dbm,
            environment,
            &interferers,
            rng,
        )
    } else {
        interference::InterferenceAccount {
            interference_noise_dbm: MIN_NOISE,
            concurrent_stations: 0,
            is_g_vs_b_compat: false,
        }
    };

    // Relative (closing) velocity along the tx→rx line, for the Doppler term.
    let tx_node = &scenario.nodes[connection.from_node];
    let rx_node = &scenario.nodes[connection.to_node];
    let relative_velocity_mps = (tx_node.velocity.x - rx_node.velocity.x).abs()
        + (tx_node.velocity.y - rx_node.velocity.y).abs()
        + (tx_node.velocity.z - rx_node.velocity.z).abs();

    let (mimo_type, antenna_count_tx, antenna_count_rx, system_bandwidth_mhz, wimax_repetition_factor) =
        wimax_params(scenario, connection);

    let input = ConnUpdateInput {
        tx,
        rx,
        environment,
        channel: connection.channel,
        packet_size_bytes: connection.packet_size_bytes,
        rts_cts_threshold_bytes: connection.rts_cts_threshold_bytes,
        consider_interference: connection.consider_interference,
        adaptive_operating_rate: connection.adaptive_operating_rate,
        operating_rate: connection.operating_rate,
        concurrent_stations: account.concurrent_stations,
        interference_noise_dbm: account.interference_noise_dbm,
        is_g_vs_b_compat: account.is_g_vs_b_compat,
        relative_velocity_mps,
        mimo_type,
        antenna_count_tx,
        antenna_count_rx,
        system_bandwidth_mhz,
        wimax_repetition_factor,
    };

    let output = crate::standards::dispatch(connection.standard, &input, rng);

    let fixed = connection.fixed_deltaq.active_at(time_s);

    state.distance_m = output.distance_m;
    state.pr_dbm = output.pr_dbm;
    state.snr_db = output.snr_db;
    state.fer = output.fer;
    state.num_retransmissions = output.num_retransmissions;
    state.concurrent_stations = account.concurrent_stations;
    state.interference_noise_dbm = account.interference_noise_dbm;
    state.compatibility_mode = output.compatibility_mode;
    state.interference_fer = output.interference_fer;

    state.bandwidth_defined = fixed.and_then(|f| f.bandwidth_bps).is_some();
    state.loss_defined = fixed.and_then(|f| f.loss).is_some();
    state.delay_defined = fixed.and_then(|f| f.delay_ms).is_some();
    state.jitter_defined = fixed.and_then(|f| f.jitter_ms).is_some();

    state.loss_rate = fixed.and_then(|f| f.loss).unwrap_or(output.loss_rate);
    state.delay_ms = fixed.and_then(|f| f.delay_ms).unwrap_or(output.delay_ms);
    state.jitter_ms = fixed.and_then(|f| f.jitter_ms).unwrap_or(output.jitter_ms);
    state.bandwidth_bps = fixed.and_then(|f| f.bandwidth_bps).unwrap_or(output.bandwidth_bps);

    state
}

/// Whether any of the five outwardly-visible parameters changed between
/// two states (§4.4 step 4 "Record which... changed").
fn state_changed(prev: &DynamicConnectionState, next: &DynamicConnectionState) -> bool {
    prev.loss_rate != next.loss_rate
        || prev.delay_ms != next.delay_ms
        || prev.jitter_ms != next.jitter_ms
        || prev.bandwidth_bps != next.bandwidth_bps
}

/// Run a connection to steady state at init (§4.8 "Precompute"): repeat
/// `update_one_connection` until consecutive iterations agree, or the
/// iteration cap is hit.
pub fn precompute_connection(
    scenario: &mut Scenario,
    connection_idx: usize,
    time_s: f64,
    max_iterations: u32,
    rng: &mut EngineRng,
) -> PrecomputeOutcome {
    for iteration in 1..=max_iterations {
        let next = update_one_connection(scenario, connection_idx, time_s, rng);
        let prev = scenario.connections[connection_idx].state.clone();
        let changed = state_changed(&prev, &next);
        scenario.connections[connection_idx].state = next;
        if !changed {
            return PrecomputeOutcome::Converged { iterations: iteration };
        }
    }
    warn!(
        connection = connection_idx,
        "precompute did not reach a steady state within {} iterations; keeping last values", max_iterations
    );
    PrecomputeOutcome::HitIterationCap
}

/// Precompute every connection in the scenario (§4.8 "init").
pub fn precompute_all(scenario: &mut Scenario, config: &EngineConfig, rng: &mut EngineRng) {
    for idx in 0..scenario.connections.len() {
        precompute_connection(scenario, idx, scenario.start_time_s, config.maximum_precompute, rng);
    }
}

/// Everything one connection's text-output line (§6) needs beyond the
/// fixed-size binary sample — carried alongside the sample so `on_tick`
/// callbacks never need to borrow the scenario back out of the simulation
/// loop they're called from.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSnapshot {
    pub from_position: crate::geometry::Coordinate,
    pub to_position: crate::geometry::Coordinate,
    pub distance_m: f64,
    pub pr_dbm: f64,
    pub snr_db: f64,
    pub standard: qomet_types::Standard,
    pub channel: u32,
    pub fer: f64,
}

/// One tick's worth of freshly-dispatched samples, plus the count that
/// changed from their previous value (for the binary-diff header, §6).
pub struct TickResult {
    pub time_s: f64,
    pub samples: Vec<DeltaQSample>,
    pub snapshots: Vec<ConnectionSnapshot>,
    pub changed_count: u32,
}

/// Run one full deltaQ tick at `time_s` (§4.8 "Per-tick loop"): motion
/// advances first, then every connection is updated, then noise-source
/// transmitters are excluded from the emitted sample set.
pub fn run_tick(scenario: &mut Scenario, time_s: f64, rng: &mut EngineRng) -> EngineResult<TickResult> {
    motion::advance_tick(
        &mut scenario.nodes,
        &scenario.motions,
        time_s,
        scenario.step_s,
        scenario.motion_step_divider,
    );

    let mut samples = Vec::with_capacity(scenario.connections.len());
    let mut snapshots = Vec::with_capacity(scenario.connections.len());
    let mut changed_count = 0u32;

    for idx in 0..scenario.connections.len() {
        let prev = scenario.connections[idx].state.clone();
        let next = update_one_connection(scenario, idx, time_s, rng);
        let changed = state_changed(&prev, &next);
        scenario.connections[idx].state = next;

        let connection = &scenario.connections[idx];
        let from_iface = &scenario.nodes[connection.from_node].interfaces[connection.from_interface];
        if from_iface.is_noise_source_at(time_s) {
            continue;
        }

        if changed {
            changed_count += 1;
        }

        samples.push(DeltaQSample::new(
            connection.from_node as u32,
            connection.to_node as u32,
            connection.state.bandwidth_bps,
            connection.state.loss_rate,
            connection.state.delay_ms,
            connection.state.jitter_ms,
        ));
        snapshots.push(ConnectionSnapshot {
            from_position: scenario.nodes[connection.from_node].position,
            to_position: scenario.nodes[connection.to_node].position,
            distance_m: connection.state.distance_m,
            pr_dbm: connection.state.pr_dbm,
            snr_db: connection.state.snr_db,
            standard: connection.standard,
            channel: connection.channel,
            fer: connection.state.fer,
        });
    }

    Ok(TickResult { time_s, samples, snapshots, changed_count })
}

/// Run the full scenario from `start_time_s` for `tick_count()` ticks,
/// invoking `on_tick` with each result in order (§4.8). The caller is
/// responsible for routing `on_tick`'s output to the text/binary writers
/// (output.rs) — this function only owns simulation ordering.
pub fn run<F: FnMut(TickResult) -> EngineResult<()>>(
    scenario: &mut Scenario,
    config: &EngineConfig,
    rng: &mut EngineRng,
    mut on_tick: F,
) -> EngineResult<()> {
    precompute_all(scenario, config, rng);

    let ticks = scenario.tick_count();
    for i in 0..ticks {
        let time_s = scenario.start_time_s + i as f64 * scenario.step_s;
        let result = run_tick(scenario, time_s, rng)?;
        on_tick(result)?;
    }
    Ok(())
}
