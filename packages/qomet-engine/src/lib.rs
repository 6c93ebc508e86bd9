//! # qomet-engine
//!
//! The deltaQ simulation engine: per-tick bandwidth/loss/delay/jitter
//! computation for wireless and wired network connections, driven by a
//! scenario (nodes, interfaces, environments, motions, connections) and a
//! tagged-variant dispatch over the supported radio standards (§2, §4).
//!
//! This crate is also consumed by `qomet-sim` (the CLI binary defined in
//! `main.rs`) and, indirectly, by `qomet-shaper` through the shared
//! `qomet-types` wire structures — the engine itself never depends on the
//! shaper.

pub mod config;
pub mod constants;
pub mod deltaq;
pub mod environment;
pub mod error;
pub mod geometry;
pub mod interference;
pub mod motion;
pub mod output;
pub mod propagation;
pub mod rng;
pub mod scenario;
pub mod standards;
