//! The driver's input side: a source of deltaQ time buckets (§4.9 "at each
//! deltaQ sample matching (from_id, to_id), reconfigure the pipe").
//!
//! The driver consumes "the same parameter stream (file or in-memory)" the
//! engine produces (§2) — a [`BinaryFileDeltaQSource`] reads the `.bin`
//! layout `qomet-engine::output::BinaryWriter` writes (§6), and an
//! [`InMemoryDeltaQSource`] feeds pre-built ticks directly, which is what
//! drives the fleet-shaper test (§8 scenario 6).

use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use qomet_types::{DeltaQSample, DeltaQTick};

/// One time bucket at a time, in stream order; `None` marks end-of-stream
/// (§5 "the driver loop terminates when the input parameter stream ends").
pub trait DeltaQSource {
    fn next_tick(&mut self) -> io::Result<Option<DeltaQTick>>;
}

/// Feeds a fixed, pre-built sequence of ticks — used by tests (§8 scenario
/// 6) and by any caller that already holds the stream in memory rather than
/// on disk.
pub struct InMemoryDeltaQSource {
    ticks: std::vec::IntoIter<DeltaQTick>,
}

impl InMemoryDeltaQSource {
    pub fn new(ticks: Vec<DeltaQTick>) -> Self {
        Self { ticks: ticks.into_iter() }
    }
}

impl DeltaQSource for InMemoryDeltaQSource {
    fn next_tick(&mut self) -> io::Result<Option<DeltaQTick>> {
        Ok(self.ticks.next())
    }
}

/// Reads the `.bin` stream format (§6 "Binary (.bin)") record-by-record,
/// skipping the rewritable header once at construction time.
pub struct BinaryFileDeltaQSource<R: Read> {
    inner: R,
}

impl<R: Read> BinaryFileDeltaQSource<R> {
    pub fn new(mut inner: R) -> io::Result<Self> {
        // header: u32 interface_count, u32 time_record_count, u8*3 version, i32 revision
        let mut header = [0u8; 15];
        inner.read_exact(&mut header)?;
        Ok(Self { inner })
    }
}

impl<R: Read> DeltaQSource for BinaryFileDeltaQSource<R> {
    fn next_tick(&mut self) -> io::Result<Option<DeltaQTick>> {
        let time_s = match self.inner.read_f64::<LittleEndian>() {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        };
        let record_count = self.inner.read_u32::<LittleEndian>()?;
        let mut samples = Vec::with_capacity(record_count as usize);
        for _ in 0..record_count {
            let from_id = self.inner.read_u32::<LittleEndian>()?;
            let to_id = self.inner.read_u32::<LittleEndian>()?;
            let bandwidth_bps = self.inner.read_f32::<LittleEndian>()?;
            let loss = self.inner.read_f32::<LittleEndian>()?;
            let delay_ms = self.inner.read_f32::<LittleEndian>()?;
            let jitter_ms = self.inner.read_f32::<LittleEndian>()?;
            samples.push(DeltaQSample {
                from_id,
                to_id,
                bandwidth_bps,
                loss,
                delay_ms,
                jitter_ms,
            });
        }
        Ok(Some(DeltaQTick { time_s, samples }))
    }
}
