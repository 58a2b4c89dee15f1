use crate::config::DriverConfig;
use crate::error::{Result, RplidarError};
use crate::scan::{ScanEvent, ScanReader};
use crate::serial::{stop_scan_and_flush, Transport};
use crate::stats::ScanStats;
use crate::stream::SampleStream;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use rplidar_data::ScanSample;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, warn};

/// What the decode thread hands back when it ends.
pub(crate) struct DecoderExit {
    pub(crate) port: Box<dyn Transport>,
    /// Outcome of stopping the device and flushing the port.
    pub(crate) stop_result: Result<()>,
}

/// Struct that contains the decode thread of a running scan.
pub(crate) struct DriverThreads {
    pub(crate) terminator_tx: Sender<bool>,
    pub(crate) decoder_thread: Option<JoinHandle<DecoderExit>>,
}

/// Bounded ring between the decode thread and consumers. The producer never
/// blocks: when full, a stall report is dropped and anything else
/// overwrites the oldest entry. Only overwritten samples are counted.
pub(crate) struct Handoff {
    tx: Sender<Result<ScanSample>>,
    rx: Receiver<Result<ScanSample>>,
    stats: Arc<ScanStats>,
}

impl Handoff {
    pub(crate) fn new(capacity: usize, stats: Arc<ScanStats>) -> Handoff {
        let (tx, rx) = bounded(capacity.max(1));
        Handoff { tx, rx, stats }
    }

    pub(crate) fn stream(&self) -> SampleStream {
        SampleStream::new(self.rx.clone(), Arc::clone(&self.stats))
    }

    pub(crate) fn push(&self, item: Result<ScanSample>) {
        let is_sample = item.is_ok();
        let mut item = item;
        loop {
            match self.tx.try_send(item) {
                Ok(()) => break,
                // A stall report never displaces buffered data.
                Err(TrySendError::Full(Err(e))) if e.is_stall() => return,
                Err(TrySendError::Full(back)) => {
                    if let Ok(Ok(_)) = self.rx.try_recv() {
                        self.stats.add_overwritten();
                    }
                    item = back;
                }
                // Unreachable while `self.rx` is alive.
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
        if is_sample {
            self.stats.add_delivered();
        }
    }
}

pub(crate) fn read_device_signal(
    port: Box<dyn Transport>,
    config: DriverConfig,
    handoff: Handoff,
    terminator_rx: Receiver<bool>,
) -> DecoderExit {
    let mut reader = ScanReader::new(port, &config)
        .with_terminator(terminator_rx)
        .with_stats(Arc::clone(&handoff.stats));

    for event in reader.by_ref() {
        match event {
            Ok(ScanEvent::Sample(sample)) => handoff.push(Ok(sample)),
            Ok(stall) => handoff.push(stall.into()),
            Err(e) => {
                error!("Scan aborted: {}", e);
                handoff.push(Err(e));
            }
        }
    }
    // Consumers see the end of the stream from here on.
    drop(handoff);

    let mut port = reader.into_inner();
    let stop_result = stop_scan_and_flush(&mut *port, &config);
    if let Err(e) = &stop_result {
        warn!("Failed to stop the scan: {}", e);
    }
    debug!("Decode thread finished");
    DecoderExit { port, stop_result }
}

/// Starts decoding on a port that has accepted the SCAN request.
pub(crate) fn spawn_decoder(
    port: Box<dyn Transport>,
    config: &DriverConfig,
) -> Result<(DriverThreads, SampleStream)> {
    let (terminator_tx, terminator_rx) = bounded(1);
    let handoff = Handoff::new(config.handoff_capacity, Arc::new(ScanStats::default()));
    let stream = handoff.stream();
    let config = config.clone();

    let decoder_thread = std::thread::Builder::new()
        .name("rplidar-decoder".to_string())
        .spawn(move || read_device_signal(port, config, handoff, terminator_rx))?;

    let driver_threads = DriverThreads {
        terminator_tx,
        decoder_thread: Some(decoder_thread),
    };
    Ok((driver_threads, stream))
}

impl DriverThreads {
    /// True once the decode thread has ended on its own, e.g. after a
    /// transport failure.
    pub(crate) fn is_finished(&self) -> bool {
        self.decoder_thread
            .as_ref()
            .map(|t| t.is_finished())
            .unwrap_or(true)
    }

    /// Signals the decode thread and waits for it. The thread observes the
    /// signal within one read timeout.
    pub(crate) fn join(&mut self) -> Result<DecoderExit> {
        let thread = self
            .decoder_thread
            .take()
            .ok_or(RplidarError::NotScanning)?;
        // Fails only if the thread already ended.
        let _ = self.terminator_tx.try_send(true);
        thread.join().map_err(|_| RplidarError::DecoderPanicked)
    }
}

impl Drop for DriverThreads {
    fn drop(&mut self) {
        if self.decoder_thread.is_some() {
            if let Err(e) = self.join() {
                warn!("{}", e);
            }
        }
    }
}
