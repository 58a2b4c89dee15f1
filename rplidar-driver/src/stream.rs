use crate::error::Result;
use crate::stats::{ScanStats, StatsSnapshot};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use rplidar_data::{Revolution, ScanSample};
use std::sync::Arc;
use std::time::Duration;

/// Consumer end of a running scan.
///
/// Items arrive in wire order. `Err(RplidarError::Stalled { .. })` items
/// report a quiet line and the stream goes on after them; any other error
/// is the last item. The stream ends when the scan is stopped and cannot be
/// restarted; a new `start_scan` returns a new stream.
///
/// Clones share one queue, so every item goes to exactly one of them.
#[derive(Clone)]
pub struct SampleStream {
    rx: Receiver<Result<ScanSample>>,
    stats: Arc<ScanStats>,
}

impl SampleStream {
    pub(crate) fn new(rx: Receiver<Result<ScanSample>>, stats: Arc<ScanStats>) -> SampleStream {
        SampleStream { rx, stats }
    }

    /// Next buffered item without waiting.
    pub fn try_next(&self) -> Option<Result<ScanSample>> {
        self.rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next item. `None` on timeout or when
    /// the scan has ended.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Result<ScanSample>> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Everything buffered right now.
    pub fn try_iter(&self) -> impl Iterator<Item = Result<ScanSample>> + '_ {
        self.rx.try_iter()
    }

    /// Items waiting in the ring buffer.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Groups samples into laps of the sensor head.
    pub fn revolutions(self) -> Revolutions<SampleStream> {
        Revolutions::new(self)
    }
}

impl Iterator for SampleStream {
    type Item = Result<ScanSample>;

    /// Blocks until an item arrives or the scan ends.
    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}

/// Cuts a sample sequence at every new-scan marker.
///
/// Errors pass through immediately without closing the lap in progress.
/// When the input ends, the unfinished lap is yielded as incomplete.
pub struct Revolutions<I> {
    samples: I,
    current: Revolution,
}

impl<I> Revolutions<I>
where
    I: Iterator<Item = Result<ScanSample>>,
{
    pub fn new(samples: I) -> Revolutions<I> {
        Revolutions {
            samples,
            current: Revolution::default(),
        }
    }
}

impl<I> Iterator for Revolutions<I>
where
    I: Iterator<Item = Result<ScanSample>>,
{
    type Item = Result<Revolution>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.samples.next() {
                Some(Ok(sample)) => {
                    if sample.is_new_scan && !self.current.is_empty() {
                        let finished = std::mem::replace(
                            &mut self.current,
                            Revolution {
                                samples: vec![sample],
                                complete: true,
                            },
                        );
                        return Some(Ok(finished));
                    }
                    if sample.is_new_scan {
                        self.current.complete = true;
                    }
                    self.current.samples.push(sample);
                }
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    if self.current.is_empty() {
                        return None;
                    }
                    let mut last = std::mem::take(&mut self.current);
                    last.complete = false;
                    return Some(Ok(last));
                }
            }
        }
    }
}
