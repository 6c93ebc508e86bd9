//! CLI surface of the runtime agent (§6 "CLI surface of the runtime
//! agent"): every configuration key spec.md enumerates, as a `clap`
//! `#[derive(Parser)]` struct in the same style as `qomet-sim`'s `Args`.

use std::path::PathBuf;

use clap::Parser;
use qomet_types::{Direction, MotionTraceFormat, UsageMode};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum UsageModeArg {
    Pairwise,
    Fleet,
}

impl From<UsageModeArg> for UsageMode {
    fn from(v: UsageModeArg) -> Self {
        match v {
            UsageModeArg::Pairwise => UsageMode::Pairwise,
            UsageModeArg::Fleet => UsageMode::Fleet,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum DirectionArg {
    In,
    Out,
    Both,
}

impl From<DirectionArg> for Direction {
    fn from(v: DirectionArg) -> Self {
        match v {
            DirectionArg::In => Direction::In,
            DirectionArg::Out => Direction::Out,
            DirectionArg::Both => Direction::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum MotionTraceFormatArg {
    None,
    Nam,
    Ns2,
}

impl From<MotionTraceFormatArg> for MotionTraceFormat {
    fn from(v: MotionTraceFormatArg) -> Self {
        match v {
            MotionTraceFormatArg::None => MotionTraceFormat::None,
            MotionTraceFormatArg::Nam => MotionTraceFormat::Nam,
            MotionTraceFormatArg::Ns2 => MotionTraceFormat::Ns2,
        }
    }
}

/// Recognized configuration keys (§6), enumerated verbatim. Pairwise-only
/// and fleet-only fields are all `Option` since only one mode's subset is
/// required at a time — checked in `Args::validate`, not by `clap`'s own
/// required-arg machinery, since the requirement is conditional on
/// `usage_mode`.
#[derive(Parser, Debug)]
#[command(name = "qomet-shaperd", about = "QOMET real-time shaper driver")]
pub struct Args {
    /// Path to the deltaQ record stream this driver reads (`.bin`, as
    /// written by `qomet-sim --emit-binary`).
    #[arg(long)]
    pub scenario_path: PathBuf,

    #[arg(long, value_enum)]
    pub usage_mode: UsageModeArg,

    // ── Pairwise mode ──
    #[arg(long)]
    pub from_id: Option<u32>,
    #[arg(long)]
    pub from_ip: Option<String>,
    #[arg(long)]
    pub to_id: Option<u32>,
    #[arg(long)]
    pub to_ip: Option<String>,
    #[arg(long)]
    pub rule_id: Option<u64>,
    #[arg(long)]
    pub pipe_id: Option<u32>,
    #[arg(long, value_enum)]
    pub direction: Option<DirectionArg>,

    // ── Fleet mode ──
    #[arg(long)]
    pub my_id: Option<u32>,
    #[arg(long)]
    pub settings_path: Option<PathBuf>,
    #[arg(long)]
    pub period_s: Option<f64>,
    #[arg(long, default_value = "255.255.255.255")]
    pub broadcast_ip: String,
    /// §9 Open Questions: fleet outbound pipe-id range base, configurable
    /// and checked for collision against `pipe_id` at startup.
    #[arg(long, default_value_t = 10_000)]
    pub fleet_out_pipe_base: u32,
    #[arg(long, default_value_t = 20_000)]
    pub fleet_in_broadcast_pipe_base: u32,

    // ── Shared output flags (mirrors qomet-sim's, §6) ──
    #[arg(long)]
    pub emit_text: bool,
    #[arg(long)]
    pub emit_binary: bool,
    #[arg(long, value_enum, default_value = "none")]
    pub emit_motion: MotionTraceFormatArg,
    #[arg(long)]
    pub disable_deltaq: bool,
}

impl Args {
    /// Validate the conditional-required fields per mode, and check the
    /// fleet/pairwise pipe-id ranges don't collide (§9 Open Questions:
    /// these ranges are configurable and checked for collision at startup).
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.usage_mode {
            UsageModeArg::Pairwise => {
                let missing = [
                    ("from_id", self.from_id.is_none()),
                    ("to_id", self.to_id.is_none()),
                    ("rule_id", self.rule_id.is_none()),
                    ("pipe_id", self.pipe_id.is_none()),
                    ("direction", self.direction.is_none()),
                ]
                .into_iter()
                .find(|(_, missing)| *missing);
                if let Some((field, _)) = missing {
                    return Err(ConfigError::MalformedField {
                        field: field.to_string(),
                        reason: "required in pairwise usage_mode".to_string(),
                    });
                }
                if let Some(pipe_id) = self.pipe_id {
                    if pipe_id >= self.fleet_out_pipe_base.min(self.fleet_in_broadcast_pipe_base) {
                        return Err(ConfigError::PipeRangeCollision(format!(
                            "pairwise pipe_id {pipe_id} falls inside the fleet pipe-id range (out base {}, broadcast base {})",
                            self.fleet_out_pipe_base, self.fleet_in_broadcast_pipe_base
                        )));
                    }
                }
            }
            UsageModeArg::Fleet => {
                let missing = [
                    ("my_id", self.my_id.is_none()),
                    ("settings_path", self.settings_path.is_none()),
                    ("period_s", self.period_s.is_none()),
                ]
                .into_iter()
                .find(|(_, missing)| *missing);
                if let Some((field, _)) = missing {
                    return Err(ConfigError::MalformedField {
                        field: field.to_string(),
                        reason: "required in fleet usage_mode".to_string(),
                    });
                }
                if self.fleet_out_pipe_base == self.fleet_in_broadcast_pipe_base {
                    return Err(ConfigError::PipeRangeCollision(
                        "fleet outbound and inbound-broadcast pipe-id ranges must not overlap".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            scenario_path: PathBuf::from("stream.bin"),
            usage_mode: UsageModeArg::Pairwise,
            from_id: None,
            from_ip: None,
            to_id: None,
            to_ip: None,
            rule_id: None,
            pipe_id: None,
            direction: None,
            my_id: None,
            settings_path: None,
            period_s: None,
            broadcast_ip: "255.255.255.255".to_string(),
            fleet_out_pipe_base: 10_000,
            fleet_in_broadcast_pipe_base: 20_000,
            emit_text: false,
            emit_binary: false,
            emit_motion: MotionTraceFormatArg::None,
            disable_deltaq: false,
        }
    }

    #[test]
    fn pairwise_missing_required_field_is_rejected() {
        let args = base_args();
        assert!(args.validate().is_err());
    }

    #[test]
    fn pairwise_with_all_required_fields_validates() {
        let mut args = base_args();
        args.from_id = Some(1);
        args.to_id = Some(2);
        args.rule_id = Some(1);
        args.pipe_id = Some(1);
        args.direction = Some(DirectionArg::Both);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn pairwise_pipe_id_colliding_with_fleet_range_is_rejected() {
        let mut args = base_args();
        args.from_id = Some(1);
        args.to_id = Some(2);
        args.rule_id = Some(1);
        args.pipe_id = Some(10_000);
        args.direction = Some(DirectionArg::Both);
        assert!(args.validate().is_err());
    }

    #[test]
    fn fleet_colliding_pipe_bases_are_rejected() {
        let mut args = base_args();
        args.usage_mode = UsageModeArg::Fleet;
        args.my_id = Some(1);
        args.settings_path = Some(PathBuf::from("settings.txt"));
        args.period_s = Some(1.0);
        args.fleet_in_broadcast_pipe_base = args.fleet_out_pipe_base;
        assert!(args.validate().is_err());
    }
}
