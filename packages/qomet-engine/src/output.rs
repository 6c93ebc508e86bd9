//! Output writers (§6 "Output files").
//!
//! Three concrete writers (text `.out`, binary `.bin`, `.settings`) plus a
//! minimal motion (`.nam`/`.ns2`) writer. Binary output diffs against the
//! last emitted value per `(from_id, to_id)` pair and rewrites its header
//! once the stream completes, exactly as §6 specifies.

use std::collections::HashMap;
use std::io::{self, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use qomet_types::{DeltaQSample, Standard};

use crate::scenario::Scenario;

/// One connection's values as they appear on a single text-output line
/// (§6 "Text (.out)").
#[allow(clippy::too_many_arguments)]
pub struct TextRecord {
    pub time_s: f64,
    pub from_id: u32,
    pub from_x: f64,
    pub from_y: f64,
    pub from_z: f64,
    pub to_id: u32,
    pub to_x: f64,
    pub to_y: f64,
    pub to_z: f64,
    pub distance_m: f64,
    pub pr_dbm: f64,
    pub snr_db: f64,
    pub standard: Standard,
    pub channel: u32,
    pub fer: f64,
    pub bandwidth_bps: f64,
    pub loss_rate: f64,
    pub delay_ms: f64,
    pub jitter_ms: f64,
}

/// Writes `.out` text records: one space-separated line per connection per
/// tick, in the exact column order §6 specifies.
pub struct TextWriter<W: Write> {
    inner: W,
}

impl<W: Write> TextWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_record(&mut self, r: &TextRecord) -> io::Result<()> {
        writeln!(
            self.inner,
            "{} {} {} {} {} {} {} {} {} {} {} {} {:?} {} {} {} {} {} {}",
            r.time_s, r.from_id, r.from_x, r.from_y, r.from_z,
            r.to_id, r.to_x, r.to_y, r.to_z,
            r.distance_m, r.pr_dbm, r.snr_db, r.standard, r.channel,
            r.fer, r.bandwidth_bps, r.loss_rate, r.delay_ms, r.jitter_ms,
        )
    }
}

// ── Binary writer (§6 "Binary (.bin)") ───────────────────────────────────────

const FORMAT_VERSION: (u8, u8, u8) = (1, 0, 0);
const FORMAT_REVISION: i32 = 1;

/// Writes the `.bin` stream: a rewritable header, then one
/// `{time:f64, record_count:u32}` group per tick followed by that many
/// fixed-size [`DeltaQSample`] records. Diffs against the last emitted
/// sample per `(from_id, to_id)` so unchanged connections are omitted from
/// a tick's group — §6 "the time record header carries the count of
/// changed records that follow".
pub struct BinaryWriter<W: Write + Seek> {
    inner: W,
    interface_count: u32,
    time_record_count: u32,
    suppress_empty_time_records: bool,
    last_values: HashMap<(u32, u32), DeltaQSample>,
}

impl<W: Write + Seek> BinaryWriter<W> {
    pub fn new(mut inner: W, interface_count: u32, suppress_empty_time_records: bool) -> io::Result<Self> {
        Self::write_header(&mut inner, interface_count, 0)?;
        Ok(Self { inner, interface_count, time_record_count: 0, suppress_empty_time_records, last_values: HashMap::new() })
    }

    fn write_header(w: &mut W, interface_count: u32, time_record_count: u32) -> io::Result<()> {
        w.seek(SeekFrom::Start(0))?;
        w.write_u32::<LittleEndian>(interface_count)?;
        w.write_u32::<LittleEndian>(time_record_count)?;
        w.write_u8(FORMAT_VERSION.0)?;
        w.write_u8(FORMAT_VERSION.1)?;
        w.write_u8(FORMAT_VERSION.2)?;
        w.write_i32::<LittleEndian>(FORMAT_REVISION)?;
        Ok(())
    }

    fn write_sample(w: &mut W, s: &DeltaQSample) -> io::Result<()> {
        w.write_u32::<LittleEndian>(s.from_id)?;
        w.write_u32::<LittleEndian>(s.to_id)?;
        w.write_f32::<LittleEndian>(s.bandwidth_bps)?;
        w.write_f32::<LittleEndian>(s.loss)?;
        w.write_f32::<LittleEndian>(s.delay_ms)?;
        w.write_f32::<LittleEndian>(s.jitter_ms)?;
        Ok(())
    }

    /// Emit one tick's samples, diffed against the last value per key.
    pub fn write_tick(&mut self, time_s: f64, samples: &[DeltaQSample]) -> io::Result<()> {
        let mut changed = Vec::with_capacity(samples.len());
        for s in samples {
            let key = s.key();
            let is_new = match self.last_values.get(&key) {
                Some(prev) => prev != s,
                None => true,
            };
            if is_new {
                changed.push(*s);
                self.last_values.insert(key, *s);
            }
        }

        if changed.is_empty() && self.suppress_empty_time_records {
            return Ok(());
        }

        self.inner.seek(SeekFrom::End(0))?;
        self.inner.write_f64::<LittleEndian>(time_s)?;
        self.inner.write_u32::<LittleEndian>(changed.len() as u32)?;
        for s in &changed {
            Self::write_sample(&mut self.inner, s)?;
        }
        self.time_record_count += 1;
        Ok(())
    }

    /// Rewrite the header with the final `time_record_count` (§6 "After the
    /// stream completes, the header is rewritten"). Must be called exactly
    /// once, after the last `write_tick`.
    pub fn finish(mut self) -> io::Result<W> {
        Self::write_header(&mut self.inner, self.interface_count, self.time_record_count)?;
        self.inner.seek(SeekFrom::End(0))?;
        Ok(self.inner)
    }
}

// ── Settings writer (§6 ".settings") ──────────────────────────────────────────

/// Writes a one-shot textual snapshot of per-node configuration at the end
/// of a run (§6 "Settings (.settings): textual snapshot... written once at
/// end").
pub fn write_settings<W: Write>(mut w: W, scenario: &Scenario) -> io::Result<()> {
    writeln!(w, "# node_id name x y z pt_dbm internal_delay_ms")?;
    for node in &scenario.nodes {
        writeln!(
            w,
            "{} {} {} {} {} {} {}",
            node.id, node.name, node.position.x, node.position.y, node.position.z, node.pt_dbm, node.internal_delay_ms,
        )?;
    }
    Ok(())
}

// ── Motion writer (§6 "Motion (.nam or .ns2)") ───────────────────────────────

/// One recorded position for one node at one instant.
pub struct MotionRecord {
    pub time_s: f64,
    pub node_id: u32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Minimal NS-2/NAM-style motion writer. Parsing either format back in is
/// out of scope (that's the Geo/scenario collaborator's job, §6) — this
/// only emits the subset both formats need: a per-node position line per
/// recorded instant.
pub fn write_motion_record<W: Write>(mut w: W, format: qomet_types::MotionTraceFormat, r: &MotionRecord) -> io::Result<()> {
    match format {
        qomet_types::MotionTraceFormat::None => Ok(()),
        qomet_types::MotionTraceFormat::Nam => {
            writeln!(w, "n -t {:.6} -s {} -x {:.3} -y {:.3} -z {:.3}", r.time_s, r.node_id, r.x, r.y, r.z)
        }
        qomet_types::MotionTraceFormat::Ns2 => {
            writeln!(
                w,
                "$ns_ at {:.6} \"$node_({}) setdest {:.3} {:.3} {:.3}\"",
                r.time_s, r.node_id, r.x, r.y, r.z
            )
        }
    }
}
