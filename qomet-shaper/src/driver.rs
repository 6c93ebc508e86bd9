//! The two operating modes (§4.9): pairwise (one classifier rule, one pipe,
//! reconfigured from a single connection's samples) and fleet (one outbound
//! + one inbound-broadcast pipe per peer, reconfigured every `period_s`
//! seconds from whichever connections the current tick carries).
//!
//! Timing follows §9's "Deadline timer" design note: a monotonic clock plus
//! absolute-deadline sleeps, never `tokio::time::interval`, "because jitter
//! compounds across thousands of ticks". A missed deadline is a logged
//! warning and the driver proceeds without sleeping (§7 "Timing warning").

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use qomet_types::Direction;

use crate::deltaq_source::DeltaQSource;
use crate::error::ShaperError;
use crate::kernel_facade::{KernelFacade, RuleHandle};

/// Rules installed this run, oldest first — teardown deletes them in
/// reverse order of creation (§5 Cancellation & timeouts).
#[derive(Default)]
struct InstalledRules(Vec<RuleHandle>);

impl InstalledRules {
    fn push(&mut self, handle: RuleHandle) {
        self.0.push(handle);
    }

    fn teardown(mut self, facade: &mut impl KernelFacade) -> Result<(), ShaperError> {
        while let Some(handle) = self.0.pop() {
            facade.delete_rule(handle)?;
        }
        Ok(())
    }
}

/// Wait for `deadline`, but never sleep past one: if it's already in the
/// past, warn and proceed immediately (§4.9 "If the deadline is already in
/// the past when the reconfigure finishes, emit one warning and proceed").
/// Races against Ctrl-C so the loop can still be cancelled mid-wait.
///
/// Returns `false` if cancellation won the race.
async fn wait_for_deadline_or_cancel(deadline: Instant) -> bool {
    if deadline <= Instant::now() {
        warn!("shaper deadline already passed; proceeding without delay");
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep_until(deadline) => true,
        _ = tokio::signal::ctrl_c() => false,
    }
}

pub struct PairwiseParams {
    pub from_id: u32,
    pub to_id: u32,
    pub from_ip: String,
    pub to_ip: String,
    pub pipe_id: u32,
    pub direction: Direction,
}

/// Pairwise mode (§4.9 "given (src_ip, dst_ip, pipe_id, rule_id,
/// direction), install one classifier rule and one shaping pipe; at each
/// deltaQ sample matching (from_id, to_id), reconfigure the pipe's (rate,
/// delay, loss). On exit, delete the rule/pipe.").
pub async fn run_pairwise(
    facade: &mut impl KernelFacade,
    source: &mut impl DeltaQSource,
    params: PairwiseParams,
) -> Result<(), ShaperError> {
    let mut rules = InstalledRules::default();
    let handle = facade.add_rule(
        &format!("{}/32", params.from_ip),
        &format!("{}/32", params.to_ip),
        params.pipe_id,
        params.direction,
    )?;
    rules.push(handle);

    let start = Instant::now();
    loop {
        let tick = match source.next_tick().map_err(ShaperError::Io)? {
            Some(tick) => tick,
            None => break,
        };

        let deadline = start + Duration::from_secs_f64(tick.time_s.max(0.0));
        if !wait_for_deadline_or_cancel(deadline).await {
            break;
        }

        for sample in tick.samples.iter().filter(|s| s.from_id == params.from_id && s.to_id == params.to_id) {
            facade.configure_pipe(
                params.pipe_id,
                sample.bandwidth_bps as f64,
                (sample.delay_ms as f64 * 1000.0) as u64,
                sample.loss as f64,
            )?;
        }
    }

    rules.teardown(facade)
}

pub struct FleetParams {
    pub my_id: u32,
    /// Peer node id → IP address, excluding `my_id` (§6 "a settings table
    /// mapping ids→IPs").
    pub peers: HashMap<u32, String>,
    pub period_s: f64,
    pub broadcast_ip: String,
    pub fleet_out_pipe_base: u32,
    pub fleet_in_broadcast_pipe_base: u32,
}

/// Fleet mode (§4.9 "install one outbound shaping pipe per peer ... and one
/// inbound broadcast pipe per peer ... every `period` seconds, advance to
/// the next deltaQ time bucket and reconfigure all 2·(N−1) pipes"). Each
/// rule's peer-facing CIDR is resolved through `next_hop` rather than used
/// directly, so a multi-hop route (§6) ends up shaping the right next-hop
/// interface instead of the unreachable far peer.
pub async fn run_fleet(
    facade: &mut impl KernelFacade,
    source: &mut impl DeltaQSource,
    params: FleetParams,
) -> Result<(), ShaperError> {
    let mut rules = InstalledRules::default();
    let mut out_pipes = HashMap::new();
    let mut in_pipes = HashMap::new();

    let mut peer_ids: Vec<u32> = params.peers.keys().copied().collect();
    peer_ids.sort_unstable();
    for peer_id in &peer_ids {
        let peer_ip = &params.peers[peer_id];
        let out_pipe = params.fleet_out_pipe_base + peer_id;
        let out_next_hop = facade.next_hop(peer_ip, Direction::Out)?;
        let handle = facade.add_rule("0.0.0.0/0", &format!("{out_next_hop}/32"), out_pipe, Direction::Out)?;
        rules.push(handle);
        out_pipes.insert(*peer_id, out_pipe);

        let in_pipe = params.fleet_in_broadcast_pipe_base + peer_id;
        let in_next_hop = facade.next_hop(peer_ip, Direction::In)?;
        let handle = facade.add_rule(&format!("{in_next_hop}/32"), &params.broadcast_ip, in_pipe, Direction::In)?;
        rules.push(handle);
        in_pipes.insert(*peer_id, in_pipe);
    }

    let start = Instant::now();
    let mut bucket_index: u64 = 0;
    loop {
        let tick = match source.next_tick().map_err(ShaperError::Io)? {
            Some(tick) => tick,
            None => break,
        };

        let deadline = start + Duration::from_secs_f64(bucket_index as f64 * params.period_s);
        bucket_index += 1;
        if !wait_for_deadline_or_cancel(deadline).await {
            break;
        }

        for sample in &tick.samples {
            let pipe_id = if sample.from_id == params.my_id {
                out_pipes.get(&sample.to_id)
            } else if sample.to_id == params.my_id {
                in_pipes.get(&sample.from_id)
            } else {
                None
            };
            let Some(&pipe_id) = pipe_id else { continue };
            facade.configure_pipe(
                pipe_id,
                sample.bandwidth_bps as f64,
                (sample.delay_ms as f64 * 1000.0) as u64,
                sample.loss as f64,
            )?;
        }
    }

    rules.teardown(facade)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deltaq_source::InMemoryDeltaQSource;
    use crate::kernel_facade::FakeKernelFacade;
    use qomet_types::{DeltaQSample, DeltaQTick};

    #[tokio::test]
    async fn pairwise_installs_then_tears_down_exactly_one_rule() {
        let mut facade = FakeKernelFacade::new();
        let mut source = InMemoryDeltaQSource::new(vec![
            DeltaQTick { time_s: 0.0, samples: vec![DeltaQSample::new(1, 2, 1e6, 0.01, 5.0, 1.0)] },
        ]);
        run_pairwise(
            &mut facade,
            &mut source,
            PairwiseParams {
                from_id: 1,
                to_id: 2,
                from_ip: "10.0.0.1".to_string(),
                to_ip: "10.0.0.2".to_string(),
                pipe_id: 1,
                direction: Direction::Both,
            },
        )
        .await
        .unwrap();

        assert_eq!(facade.configure_pipe_calls.len(), 1);
        assert!(facade.installed.is_empty(), "teardown must delete every installed rule");
    }

    #[tokio::test]
    async fn fleet_shaper_reconfigures_exactly_the_sampled_pipe_twice() {
        // §8 scenario 6: N=3 nodes, period=1s, two ticks for (1→2).
        let mut facade = FakeKernelFacade::new();
        let mut peers = HashMap::new();
        peers.insert(2, "10.0.0.2".to_string());
        peers.insert(3, "10.0.0.3".to_string());

        let mut source = InMemoryDeltaQSource::new(vec![
            DeltaQTick { time_s: 0.0, samples: vec![DeltaQSample::new(1, 2, 1e6, 0.01, 5.0, 1.0)] },
            DeltaQTick { time_s: 1.0, samples: vec![DeltaQSample::new(1, 2, 2e6, 0.0, 10.0, 1.0)] },
        ]);

        run_fleet(
            &mut facade,
            &mut source,
            FleetParams {
                my_id: 1,
                peers,
                period_s: 1.0,
                broadcast_ip: "255.255.255.255".to_string(),
                fleet_out_pipe_base: 10_000,
                fleet_in_broadcast_pipe_base: 20_000,
            },
        )
        .await
        .unwrap();

        let pipe_1_to_2 = 10_000 + 2;
        let calls_on_1_to_2: Vec<_> =
            facade.configure_pipe_calls.iter().filter(|c| c.pipe_id == pipe_1_to_2).collect();
        assert_eq!(calls_on_1_to_2.len(), 2);
        assert_eq!(calls_on_1_to_2[0].rate_bps, 1e6);
        assert_eq!(calls_on_1_to_2[0].delay_us, 5_000);
        assert_eq!(calls_on_1_to_2[0].loss_fraction, 0.01_f32 as f64);
        assert_eq!(calls_on_1_to_2[1].rate_bps, 2e6);
        assert_eq!(calls_on_1_to_2[1].delay_us, 10_000);
        assert_eq!(calls_on_1_to_2[1].loss_fraction, 0.0);

        // startup installed 2*(N-1) = 4 rules; teardown must remove all of them.
        assert!(facade.installed.is_empty());
        assert_eq!(facade.delete_rule_calls.len(), 4);
    }
}
