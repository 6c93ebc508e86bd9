//! qomet-shaperd — the real-time shaper driver (§4.9, §6 CLI surface).
//!
//! Reads a deltaQ record stream and reprograms a kernel traffic-control
//! facade to match. The real kernel control-plane transport is an external
//! collaborator (§1 Non-goals: "the low-level kernel control-plane
//! transport"); this binary drives the in-memory fake facade
//! (`kernel_facade::FakeKernelFacade`) so the pairwise/fleet loops, the
//! deadline timer, and the teardown path are fully exercised without one.
//! Wiring a real backend means implementing `KernelFacade` against
//! ipfw/dummynet or tc+netem+htb+u32 and swapping it in here.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use qomet_shaper::config::{Args, UsageModeArg};
use qomet_shaper::deltaq_source::BinaryFileDeltaQSource;
use qomet_shaper::driver::{run_fleet, run_pairwise, FleetParams, PairwiseParams};
use qomet_shaper::error::{ConfigError, ShaperError};
use qomet_shaper::kernel_facade::FakeKernelFacade;

/// Parse a fleet settings file: one `id ip` pair per non-empty,
/// non-comment (`#`) line (§6 "a settings table mapping ids→IPs").
fn load_peer_table(path: &PathBuf, my_id: u32) -> Result<HashMap<u32, String>, ShaperError> {
    let text = std::fs::read_to_string(path)?;
    let mut peers = HashMap::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let id: u32 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ConfigError::MalformedField {
                field: format!("settings_path line {}", line_no + 1),
                reason: "expected '<id> <ip>'".to_string(),
            })?;
        let ip = parts.next().ok_or_else(|| ConfigError::MalformedField {
            field: format!("settings_path line {}", line_no + 1),
            reason: "missing ip column".to_string(),
        })?;
        if id != my_id {
            peers.insert(id, ip.to_string());
        }
    }
    Ok(peers)
}

async fn run(args: Args) -> Result<(), ShaperError> {
    args.validate()?;

    let file = File::open(&args.scenario_path)?;
    let mut source = BinaryFileDeltaQSource::new(BufReader::new(file))?;
    let mut facade = FakeKernelFacade::new();

    match args.usage_mode {
        UsageModeArg::Pairwise => {
            info!(from_id = args.from_id, to_id = args.to_id, pipe_id = args.pipe_id, "starting pairwise shaper");
            run_pairwise(
                &mut facade,
                &mut source,
                PairwiseParams {
                    from_id: args.from_id.expect("validated"),
                    to_id: args.to_id.expect("validated"),
                    from_ip: args.from_ip.unwrap_or_default(),
                    to_ip: args.to_ip.unwrap_or_default(),
                    pipe_id: args.pipe_id.expect("validated"),
                    direction: args.direction.expect("validated").into(),
                },
            )
            .await?;
        }
        UsageModeArg::Fleet => {
            let my_id = args.my_id.expect("validated");
            let settings_path = args.settings_path.clone().expect("validated");
            let peers = load_peer_table(&settings_path, my_id)?;
            info!(my_id, peer_count = peers.len(), period_s = args.period_s, "starting fleet shaper");
            run_fleet(
                &mut facade,
                &mut source,
                FleetParams {
                    my_id,
                    peers,
                    period_s: args.period_s.expect("validated"),
                    broadcast_ip: args.broadcast_ip.clone(),
                    fleet_out_pipe_base: args.fleet_out_pipe_base,
                    fleet_in_broadcast_pipe_base: args.fleet_in_broadcast_pipe_base,
                },
            )
            .await?;
        }
    }

    info!("shaper driver exiting cleanly");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "qomet_shaper=info".into()),
        )
        .init();

    let args = match Args::try_parse() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(1);
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(e.exit_code())
        }
    }
}
