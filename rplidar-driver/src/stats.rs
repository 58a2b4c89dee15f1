use crossbeam_utils::atomic::AtomicCell;

/// Counters updated by the decode thread, readable from any thread.
#[derive(Debug, Default)]
pub struct ScanStats {
    frames: AtomicCell<u64>,
    filtered: AtomicCell<u64>,
    check_bit_errors: AtomicCell<u64>,
    delivered: AtomicCell<u64>,
    overwritten: AtomicCell<u64>,
    stalls: AtomicCell<u64>,
}

/// Point-in-time copy of [`ScanStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Complete 5-byte frames decoded.
    pub frames: u64,
    /// Frames dropped for zero quality or zero distance.
    pub filtered: u64,
    /// Frames whose check bit disagreed with the new-scan bit.
    pub check_bit_errors: u64,
    /// Samples handed to the ring buffer.
    pub delivered: u64,
    /// Buffered samples overwritten because no consumer kept up.
    pub overwritten: u64,
    pub stalls: u64,
}

impl ScanStats {
    pub(crate) fn add_frames(&self, n: u64) {
        self.frames.fetch_add(n);
    }

    pub(crate) fn add_filtered(&self, n: u64) {
        self.filtered.fetch_add(n);
    }

    pub(crate) fn add_check_bit_errors(&self, n: u64) {
        self.check_bit_errors.fetch_add(n);
    }

    pub(crate) fn add_delivered(&self) {
        self.delivered.fetch_add(1);
    }

    pub(crate) fn add_overwritten(&self) {
        self.overwritten.fetch_add(1);
    }

    pub(crate) fn add_stall(&self) {
        self.stalls.fetch_add(1);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames: self.frames.load(),
            filtered: self.filtered.load(),
            check_bit_errors: self.check_bit_errors.load(),
            delivered: self.delivered.load(),
            overwritten: self.overwritten.load(),
            stalls: self.stalls.load(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_snapshot_across_threads() {
        let stats = Arc::new(ScanStats::default());
        let writer = Arc::clone(&stats);
        thread::spawn(move || {
            writer.add_frames(10);
            writer.add_filtered(2);
            writer.add_check_bit_errors(1);
            for _ in 0..8 {
                writer.add_delivered();
            }
            writer.add_overwritten();
            writer.add_stall();
        })
        .join()
        .unwrap();

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                frames: 10,
                filtered: 2,
                check_bit_errors: 1,
                delivered: 8,
                overwritten: 1,
                stalls: 1,
            }
        );
    }
}
