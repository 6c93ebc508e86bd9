//! Wire/kernel facade (§6 "Wire/kernel facade"): the one interface the
//! driver uses to reprogram the host's traffic-control pipes. Abstracted so
//! a real implementation may target FreeBSD dummynet/ipfw or Linux
//! tc+netem+htb+u32 — "the core never touches sockets directly" (§9).
//!
//! The actual kernel control-plane transport is out of scope (§1): only the
//! trait and an in-memory fake backend (for tests and for driving the
//! pairwise/fleet loops without a live kernel) live here.

use qomet_types::Direction;

use crate::error::KernelFacadeError;

/// An opaque handle to an installed classifier rule, returned by
/// `add_rule` and required by `delete_rule`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleHandle(pub u64);

/// The kernel traffic-control facade (§6). `configure_pipe` is idempotent —
/// safe to call every tick with the same or updated parameters.
pub trait KernelFacade {
    fn add_rule(
        &mut self,
        src_cidr: &str,
        dst_cidr: &str,
        pipe_id: u32,
        direction: Direction,
    ) -> Result<RuleHandle, KernelFacadeError>;

    fn configure_pipe(
        &mut self,
        pipe_id: u32,
        rate_bps: f64,
        delay_us: u64,
        loss_fraction: f64,
    ) -> Result<(), KernelFacadeError>;

    fn delete_rule(&mut self, handle: RuleHandle) -> Result<(), KernelFacadeError>;

    fn next_hop(&mut self, dst_ip: &str, direction: Direction) -> Result<String, KernelFacadeError>;
}

/// Burst size floor (§4.9 "Burst size ≥ frame length (1522 B) when the
/// derived bandwidth/HZ is small"). Exposed so a real backend can apply the
/// same floor; the fake backend just records it wasn't violated.
pub const MIN_FRAME_BYTES: u32 = 1522;

/// One recorded `configure_pipe` call, kept for assertions in tests and for
/// the fleet-mode "exactly two configure_pipe calls" scenario (§8 scenario
/// 6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigurePipeCall {
    pub pipe_id: u32,
    pub rate_bps: f64,
    pub delay_us: u64,
    pub loss_fraction: f64,
}

/// An in-memory fake kernel facade: records every call it receives and
/// tracks which rule handles are currently installed, so a test can assert
/// "no rule installed by this run remains" after teardown (§8 "Shaper
/// driver teardown").
#[derive(Debug, Default)]
pub struct FakeKernelFacade {
    next_handle: u64,
    pub installed: std::collections::HashSet<RuleHandle>,
    pub add_rule_calls: Vec<(String, String, u32, Direction)>,
    pub configure_pipe_calls: Vec<ConfigurePipeCall>,
    pub delete_rule_calls: Vec<RuleHandle>,
    /// Static routes for `next_hop`; defaults to "direct to peer" (echoes
    /// `dst_ip`) when no entry is present.
    pub routes: std::collections::HashMap<String, String>,
}

impl FakeKernelFacade {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KernelFacade for FakeKernelFacade {
    fn add_rule(
        &mut self,
        src_cidr: &str,
        dst_cidr: &str,
        pipe_id: u32,
        direction: Direction,
    ) -> Result<RuleHandle, KernelFacadeError> {
        let handle = RuleHandle(self.next_handle);
        self.next_handle += 1;
        self.installed.insert(handle);
        self.add_rule_calls.push((src_cidr.to_string(), dst_cidr.to_string(), pipe_id, direction));
        Ok(handle)
    }

    fn configure_pipe(
        &mut self,
        pipe_id: u32,
        rate_bps: f64,
        delay_us: u64,
        loss_fraction: f64,
    ) -> Result<(), KernelFacadeError> {
        self.configure_pipe_calls.push(ConfigurePipeCall { pipe_id, rate_bps, delay_us, loss_fraction });
        Ok(())
    }

    fn delete_rule(&mut self, handle: RuleHandle) -> Result<(), KernelFacadeError> {
        if !self.installed.remove(&handle) {
            return Err(KernelFacadeError::DeleteRule {
                handle: handle.0,
                reason: "no such rule installed".to_string(),
            });
        }
        self.delete_rule_calls.push(handle);
        Ok(())
    }

    fn next_hop(&mut self, dst_ip: &str, _direction: Direction) -> Result<String, KernelFacadeError> {
        Ok(self.routes.get(dst_ip).cloned().unwrap_or_else(|| dst_ip.to_string()))
    }
}
