//! Motion engine (§4.6): per-sub-step node position updates driving the
//! propagation model between deltaQ ticks.
//!
//! `motion_step_divider` subdivides each deltaQ tick into that many motion
//! sub-steps (§3 Scenario "motion_step_divider... motion advances more
//! finely than deltaQ is recomputed" — finer-grained motion without paying
//! for a full deltaQ recompute at every sub-step).

use crate::geometry::Coordinate;
use crate::scenario::{Motion, MotionKind, Node};

/// Advance `node` by one motion sub-step of `sub_step_s` seconds according
/// to `motion`'s kind. No-op if `time_s` falls outside `[motion.start_s,
/// motion.stop_s)` (§4.6 "a motion only applies inside its active
/// window").
pub fn step(node: &mut Node, motion: &Motion, time_s: f64, sub_step_s: f64) {
    if time_s < motion.start_s || time_s >= motion.stop_s {
        return;
    }

    match &motion.kind {
        MotionKind::Linear { velocity } => {
            node.position.x += velocity.x * sub_step_s;
            node.position.y += velocity.y * sub_step_s;
            node.position.z += velocity.z * sub_step_s;
            node.velocity = *velocity;
        }
        MotionKind::Behavioral { destination, nominal_speed_mps } => {
            step_behavioral(node, *destination, *nominal_speed_mps, sub_step_s);
        }
        MotionKind::Trace { handle } => {
            // External trace playback (e.g. a recorded NS-2/NAM file) is a
            // loader-time concern (§6 "Motion (.nam or .ns2)" covers output,
            // not input replay) — nothing to do here but hold the node
            // still; a real trace loader would look `handle` up and seek to
            // `time_s`.
            let _ = handle;
        }
    }
}

/// Move `node` toward `destination` at `nominal_speed_mps`, never
/// overshooting (§4.6 "Behavioral... moves toward a destination at a
/// nominal speed, stopping on arrival"). Building avoidance (steering
/// around `SceneObject`s marked as buildings) is left to a future
/// extension — this straight-line implementation is the documented
/// baseline behavior.
fn step_behavioral(node: &mut Node, destination: Coordinate, nominal_speed_mps: f64, sub_step_s: f64) {
    let dx = destination.x - node.position.x;
    let dy = destination.y - node.position.y;
    let dz = destination.z - node.position.z;
    let remaining = (dx * dx + dy * dy + dz * dz).sqrt();

    if remaining < f64::EPSILON {
        node.velocity = Coordinate::default();
        return;
    }

    let travel = (nominal_speed_mps * sub_step_s).min(remaining);
    let scale = travel / remaining;
    node.position.x += dx * scale;
    node.position.y += dy * scale;
    node.position.z += dz * scale;
    node.velocity = Coordinate::new(dx / remaining * nominal_speed_mps, dy / remaining * nominal_speed_mps, dz / remaining * nominal_speed_mps);
}

/// Run all of `scenario`'s motions for one full deltaQ tick, subdivided
/// into `motion_step_divider` sub-steps (§4.6, §4.8 step ordering: motion
/// runs before propagation is recomputed for the tick).
pub fn advance_tick(nodes: &mut [Node], motions: &[Motion], tick_start_s: f64, tick_step_s: f64, motion_step_divider: u32) {
    let divider = motion_step_divider.max(1);
    let sub_step_s = tick_step_s / divider as f64;

    for sub in 0..divider {
        let sub_time_s = tick_start_s + sub as f64 * sub_step_s;
        for motion in motions {
            if let Some(node) = nodes.get_mut(motion.node) {
                step(node, motion, sub_time_s, sub_step_s);
            }
        }
    }
}
