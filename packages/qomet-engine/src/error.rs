//! Engine error kinds (§7 Error Handling Design).
//!
//! `thiserror` backs every error enum here so propagation policy ("model
//! functions report success/failure back to the per-connection update")
//! goes through a real error type and `?` rather than panics.

use thiserror::Error;

/// Input errors: unresolved names, malformed scenario data (§7 "Input
/// error"). These abort scenario initialization.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("unresolved node name: {0}")]
    UnknownNode(String),
    #[error("unresolved interface name: {0} on node {1}")]
    UnknownInterface(String, String),
    #[error("unresolved environment name: {0}")]
    UnknownEnvironment(String),
    #[error("node/interface/environment id {0} out of range (max {1})")]
    IdOutOfRange(usize, usize),
    #[error("malformed scenario field '{field}': {reason}")]
    MalformedField { field: String, reason: String },
    #[error("fixed-deltaQ override table full (max {0})")]
    FixedDeltaQFull(usize),
    #[error("fixed-deltaQ entries must be ordered and non-overlapping: entry starting at {0} precedes previous entry ending at {1}")]
    FixedDeltaQOrdering(f64, f64),
}

/// Geometry errors (§7 "Geometry error"). A polyline-merge failure is
/// recoverable (warn + drop); vertex overflow is not.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("object '{0}' exceeds MAX_VERTICES ({1})")]
    TooManyVertices(String, usize),
    #[error("polyline '{0}' could not be merged into any polygon")]
    UnmergeablePolyline(String),
}

/// Numeric errors (§7 "Numeric error") — programmer errors (bad table
/// index, unknown MCS/bandwidth) that abort the offending tick but not the
/// whole run.
#[derive(Debug, Error)]
pub enum NumericError {
    #[error("invalid operating-rate index {0} for standard {1:?}")]
    InvalidOperatingRate(usize, qomet_types::Standard),
    #[error("unknown WiMAX MCS index {0}")]
    UnknownMcs(usize),
    #[error("unknown WiMAX system bandwidth {0} MHz")]
    UnknownSystemBandwidth(f64),
}

/// Top-level engine error, uniting the above plus a tick-abort wrapper (§7
/// propagation policy: "a per-connection failure aborts the tick").
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Numeric(#[from] NumericError),
    #[error("connection {connection_id} update aborted tick {tick}: {source}")]
    TickAborted {
        connection_id: usize,
        tick: u64,
        #[source]
        source: NumericError,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
