//! Driver error kinds (§7 "Kernel-facade error", "Input error").

use thiserror::Error;

/// Errors surfaced by the kernel traffic-control facade (§6 wire/kernel
/// facade). Any of these aborts the driver cleanly, running teardown (§7
/// "the driver aborts cleanly, running teardown").
#[derive(Debug, Error)]
pub enum KernelFacadeError {
    #[error("add_rule failed for pipe {pipe_id}: {reason}")]
    AddRule { pipe_id: u32, reason: String },
    #[error("configure_pipe failed for pipe {pipe_id}: {reason}")]
    ConfigurePipe { pipe_id: u32, reason: String },
    #[error("delete_rule failed for handle {handle}: {reason}")]
    DeleteRule { handle: u64, reason: String },
    #[error("next_hop lookup failed for {dst_ip}: {reason}")]
    NextHop { dst_ip: String, reason: String },
}

/// Malformed CLI configuration (§7 "Input error: ... malformed CLI").
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed configuration field '{field}': {reason}")]
    MalformedField { field: String, reason: String },
    #[error("fleet and pairwise pipe-id ranges collide: {0}")]
    PipeRangeCollision(String),
}

/// Top-level driver error. Distinguishes kernel-facade failures (exit code
/// 2, §6) from configuration failures (exit code 1, §6).
#[derive(Debug, Error)]
pub enum ShaperError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Kernel(#[from] KernelFacadeError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShaperError {
    /// Exit code mapping per §6's CLI surface.
    pub fn exit_code(&self) -> u8 {
        match self {
            ShaperError::Config(_) | ShaperError::Io(_) => 1,
            ShaperError::Kernel(_) => 2,
        }
    }
}
