use crate::config::DriverConfig;
use crate::constants::{LIDAR_ANS_LENGTH_MEASUREMENT, READ_CHUNK_SIZE};
use crate::error::{Result, RplidarError};
use crate::packet::decode_scan_frame;
use crate::serial::Transport;
use crate::stats::ScanStats;
use crossbeam_channel::Receiver;
use rplidar_data::ScanSample;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{trace, warn};

/// Outcome of pushing bytes into a [`ScanFrameDecoder`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeCounts {
    pub frames: usize,
    pub filtered: usize,
    pub check_bit_errors: usize,
}

/// Turns a byte stream of 5-byte measurement frames into samples.
///
/// Bytes of an incomplete frame are held until the rest arrives, so the
/// result does not depend on how the stream was chunked. Alignment is
/// assumed; there is no search for a frame boundary.
#[derive(Clone, Debug, Default)]
pub struct ScanFrameDecoder {
    pending: [u8; LIDAR_ANS_LENGTH_MEASUREMENT],
    n_pending: usize,
    validate_check_bit: bool,
}

impl ScanFrameDecoder {
    pub fn new(validate_check_bit: bool) -> ScanFrameDecoder {
        ScanFrameDecoder {
            validate_check_bit,
            ..ScanFrameDecoder::default()
        }
    }

    /// Bytes of the frame currently being assembled.
    pub fn pending(&self) -> usize {
        self.n_pending
    }

    /// Forgets a partially assembled frame.
    pub fn reset(&mut self) {
        self.n_pending = 0;
    }

    /// Decodes every frame completed by `bytes`, appending kept samples in
    /// wire order.
    pub fn push(&mut self, mut bytes: &[u8], samples: &mut Vec<ScanSample>) -> DecodeCounts {
        let mut counts = DecodeCounts::default();
        while !bytes.is_empty() {
            let n = (LIDAR_ANS_LENGTH_MEASUREMENT - self.n_pending).min(bytes.len());
            self.pending[self.n_pending..self.n_pending + n].copy_from_slice(&bytes[..n]);
            self.n_pending += n;
            bytes = &bytes[n..];
            if self.n_pending < LIDAR_ANS_LENGTH_MEASUREMENT {
                break;
            }
            self.n_pending = 0;
            counts.frames += 1;

            let frame = decode_scan_frame(&self.pending);
            if !frame.has_valid_check_bit() {
                counts.check_bit_errors += 1;
                if self.validate_check_bit {
                    trace!("check bit mismatch, frame discarded");
                    continue;
                }
            }
            match frame.to_sample() {
                Some(sample) => samples.push(sample),
                None => counts.filtered += 1,
            }
        }
        counts
    }
}

/// What one pull from a [`ScanReader`] produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScanEvent {
    Sample(ScanSample),
    /// `short_reads` consecutive reads have completed no frame.
    Stalled { short_reads: u32 },
}

/// Pull-based scan decoding over a transport in the scanning state.
///
/// Each call to `next` blocks at most for the reads needed to produce one
/// event, each bounded by the transport timeout. Returns `None` once the
/// terminator fires; a transport error is yielded once and ends the
/// sequence.
pub struct ScanReader<T> {
    port: T,
    decoder: ScanFrameDecoder,
    ready: VecDeque<ScanSample>,
    decoded: Vec<ScanSample>,
    buffer: Vec<u8>,
    short_reads: u32,
    stall_threshold: u32,
    terminator_rx: Option<Receiver<bool>>,
    stats: Arc<ScanStats>,
    failed: bool,
}

impl<T: Transport> ScanReader<T> {
    /// `port` must already have answered the SCAN request.
    pub fn new(port: T, config: &DriverConfig) -> ScanReader<T> {
        ScanReader {
            port,
            decoder: ScanFrameDecoder::new(config.validate_check_bit),
            ready: VecDeque::new(),
            decoded: Vec::new(),
            buffer: vec![0u8; READ_CHUNK_SIZE],
            short_reads: 0,
            stall_threshold: config.stall_threshold.max(1),
            terminator_rx: None,
            stats: Arc::new(ScanStats::default()),
            failed: false,
        }
    }

    pub(crate) fn with_terminator(mut self, terminator_rx: Receiver<bool>) -> Self {
        self.terminator_rx = Some(terminator_rx);
        self
    }

    pub(crate) fn with_stats(mut self, stats: Arc<ScanStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> Arc<ScanStats> {
        Arc::clone(&self.stats)
    }

    /// Gives the transport back. Any partial frame is lost.
    pub fn into_inner(self) -> T {
        self.port
    }

    fn terminated(&self) -> bool {
        self.terminator_rx
            .as_ref()
            .map(do_terminate)
            .unwrap_or(false)
    }

    fn read_cycle(&mut self) -> Result<DecodeCounts> {
        let n_read = self.port.read_available(&mut self.buffer)?;
        self.decoded.clear();
        let counts = self
            .decoder
            .push(&self.buffer[..n_read], &mut self.decoded);
        self.ready.extend(self.decoded.drain(..));

        self.stats.add_frames(counts.frames as u64);
        self.stats.add_filtered(counts.filtered as u64);
        self.stats.add_check_bit_errors(counts.check_bit_errors as u64);
        Ok(counts)
    }
}

impl<T: Transport> Iterator for ScanReader<T> {
    type Item = Result<ScanEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(sample) = self.ready.pop_front() {
                return Some(Ok(ScanEvent::Sample(sample)));
            }
            if self.terminated() {
                return None;
            }
            match self.read_cycle() {
                Ok(counts) if counts.frames > 0 => self.short_reads = 0,
                Ok(_) => {
                    self.short_reads = self.short_reads.saturating_add(1);
                    if self.short_reads % self.stall_threshold == 0 {
                        warn!("{} consecutive reads without a frame", self.short_reads);
                        self.stats.add_stall();
                        return Some(Ok(ScanEvent::Stalled {
                            short_reads: self.short_reads,
                        }));
                    }
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

pub(crate) fn do_terminate(terminator_rx: &Receiver<bool>) -> bool {
    terminator_rx.try_recv().unwrap_or(false)
}

impl From<ScanEvent> for Result<ScanSample> {
    fn from(event: ScanEvent) -> Self {
        match event {
            ScanEvent::Sample(sample) => Ok(sample),
            ScanEvent::Stalled { short_reads } => Err(RplidarError::Stalled { short_reads }),
        }
    }
}
