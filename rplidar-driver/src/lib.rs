//! Driver for the Slamtec RPLIDAR A1 over a serial line.
//!
//! [`Rplidar`] owns the port and walks the device through its
//! `Idle -> Scanning -> Idle` lifecycle. While scanning, a dedicated thread
//! owns the port and decodes 5-byte measurement frames into a bounded ring
//! buffer that any number of [`SampleStream`] handles drain at their own
//! pace.
//!
//! ```no_run
//! use rplidar_driver::{DriverConfig, Rplidar};
//!
//! let mut lidar = Rplidar::new(DriverConfig::new("/dev/ttyUSB0"));
//! lidar.connect()?;
//! println!("{}", lidar.get_info()?);
//! for sample in lidar.start_scan()?.take(100) {
//!     let sample = sample?;
//!     println!("{:.2} deg {:.1} mm", sample.angle_degrees, sample.distance_mm);
//! }
//! lidar.stop_scan()?;
//! # Ok::<(), rplidar_driver::RplidarError>(())
//! ```

mod command;
mod config;
mod constants;
mod driver_threads;
mod error;
mod numeric;
mod packet;
mod scan;
mod serial;
mod stats;
mod stream;
#[cfg(test)]
mod testing;

use crate::driver_threads::{spawn_decoder, DriverThreads};
use crate::serial::{request, reset_device, start_scan, stop_scan_and_flush};
use std::mem;
use tracing::{debug, info, warn};

pub use crate::command::Command;
pub use crate::config::DriverConfig;
pub use crate::error::{ProtocolError, Result, RplidarError};
pub use crate::packet::{
    decode_device_info, decode_health, decode_scan_frame, ResponseDescriptor, ScanFrame, SendMode,
};
pub use crate::scan::{DecodeCounts, ScanEvent, ScanFrameDecoder, ScanReader};
pub use crate::serial::{open_port, Transport};
pub use crate::stats::{ScanStats, StatsSnapshot};
pub use crate::stream::{Revolutions, SampleStream};
pub use rplidar_data::{DeviceInfo, HealthState, HealthStatus, Revolution, ScanSample};

pub fn get_device_info(port: &mut dyn Transport) -> Result<DeviceInfo> {
    let info = request(port, Command::GetInfo)?;
    Ok(decode_device_info(&info)?)
}

pub fn get_device_health(port: &mut dyn Transport) -> Result<HealthStatus> {
    let health = request(port, Command::GetHealth)?;
    Ok(decode_health(&health)?)
}

/// Lifecycle phase reported by [`Rplidar::state`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanState {
    Disconnected,
    Idle,
    Scanning,
}

struct ScanSession {
    threads: DriverThreads,
    stream: SampleStream,
}

enum State {
    Disconnected,
    Idle(Box<dyn Transport>),
    Scanning(ScanSession),
}

fn idle_port(state: &mut State) -> Result<&mut dyn Transport> {
    match state {
        State::Idle(port) => Ok(port.as_mut()),
        State::Scanning(_) => Err(RplidarError::ScanInProgress),
        State::Disconnected => Err(RplidarError::NotConnected),
    }
}

/// An RPLIDAR connection.
///
/// Dropping it stops a running scan and closes the port.
pub struct Rplidar {
    config: DriverConfig,
    state: State,
}

impl Rplidar {
    /// A disconnected driver; call [`Rplidar::connect`] to open the port.
    pub fn new(config: DriverConfig) -> Rplidar {
        Rplidar {
            config,
            state: State::Disconnected,
        }
    }

    /// A driver over an already open transport, in the idle state.
    pub fn with_transport(config: DriverConfig, transport: Box<dyn Transport>) -> Rplidar {
        Rplidar {
            config,
            state: State::Idle(transport),
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn state(&self) -> ScanState {
        match &self.state {
            State::Disconnected => ScanState::Disconnected,
            State::Idle(_) => ScanState::Idle,
            State::Scanning(session) if session.threads.is_finished() => ScanState::Idle,
            State::Scanning(_) => ScanState::Scanning,
        }
    }

    /// Opens the serial port and silences a device left streaming by an
    /// earlier session. No-op when already connected.
    pub fn connect(&mut self) -> Result<()> {
        if !matches!(self.state, State::Disconnected) {
            return Ok(());
        }
        let mut port: Box<dyn Transport> = Box::new(open_port(&self.config)?);
        stop_scan_and_flush(port.as_mut(), &self.config)?;
        info!("Connected to {}", self.config.port_name);
        self.state = State::Idle(port);
        Ok(())
    }

    /// Stops a running scan, sends STOP and closes the port.
    ///
    /// The port is released even when stopping fails; the first cleanup
    /// error is returned.
    pub fn disconnect(&mut self) -> Result<()> {
        let result = match &mut self.state {
            State::Disconnected => return Ok(()),
            State::Idle(port) => stop_scan_and_flush(port.as_mut(), &self.config),
            State::Scanning(_) => self.stop_scan(),
        };
        self.state = State::Disconnected;
        info!("Disconnected from {}", self.config.port_name);
        result
    }

    pub fn get_info(&mut self) -> Result<DeviceInfo> {
        self.reap_finished_scan();
        get_device_info(idle_port(&mut self.state)?)
    }

    pub fn get_health(&mut self) -> Result<HealthStatus> {
        self.reap_finished_scan();
        get_device_health(idle_port(&mut self.state)?)
    }

    /// Sends SCAN and starts the decode thread.
    ///
    /// If the answer descriptor is missing or does not start with the sync
    /// bytes, the driver stays idle and no stream is created.
    pub fn start_scan(&mut self) -> Result<SampleStream> {
        self.reap_finished_scan();
        let mut port = match mem::replace(&mut self.state, State::Disconnected) {
            State::Idle(port) => port,
            State::Scanning(session) => {
                self.state = State::Scanning(session);
                return Err(RplidarError::ScanInProgress);
            }
            State::Disconnected => return Err(RplidarError::NotConnected),
        };
        if let Err(e) = start_scan(port.as_mut()) {
            self.state = State::Idle(port);
            return Err(e);
        }
        // The port moves into the thread; if spawning fails it is lost and
        // the driver ends up disconnected.
        let (threads, stream) = spawn_decoder(port, &self.config)?;
        debug!("Scanning");
        self.state = State::Scanning(ScanSession {
            threads,
            stream: stream.clone(),
        });
        Ok(stream)
    }

    fn running_session(&self) -> Option<&ScanSession> {
        match &self.state {
            State::Scanning(session) if !session.threads.is_finished() => Some(session),
            _ => None,
        }
    }

    /// Another handle on the running scan's stream.
    pub fn samples(&self) -> Result<SampleStream> {
        self.running_session()
            .map(|session| session.stream.clone())
            .ok_or(RplidarError::NotScanning)
    }

    pub fn stats(&self) -> Option<StatsSnapshot> {
        self.running_session().map(|session| session.stream.stats())
    }

    /// Ends the scan: the decode thread sends STOP, waits for the device to
    /// go quiet, flushes the port and hands it back. Calling it when no scan
    /// runs does nothing.
    pub fn stop_scan(&mut self) -> Result<()> {
        let mut session = match mem::replace(&mut self.state, State::Disconnected) {
            State::Scanning(session) => session,
            other => {
                self.state = other;
                return Ok(());
            }
        };
        let exit = session.threads.join()?;
        self.state = State::Idle(exit.port);
        debug!("Scan stopped");
        exit.stop_result
    }

    /// Reboots the device, stopping a running scan first.
    pub fn reset(&mut self) -> Result<()> {
        if let Err(e) = self.stop_scan() {
            warn!("Stopping the scan before reset failed: {}", e);
        }
        reset_device(idle_port(&mut self.state)?, &self.config)?;
        info!("Device reset");
        Ok(())
    }

    /// Rejoins a decode thread that ended on its own.
    fn reap_finished_scan(&mut self) {
        let finished =
            matches!(&self.state, State::Scanning(session) if session.threads.is_finished());
        if finished {
            if let Err(e) = self.stop_scan() {
                warn!("Cleanup after an aborted scan failed: {}", e);
            }
        }
    }
}

impl Drop for Rplidar {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            warn!("{}", e);
        }
    }
}

/// Connects, checks health and starts scanning.
///
/// # Arguments
///
/// * `config` - Port name, baud rate and stream settings.
pub fn run_driver(config: DriverConfig) -> Result<(Rplidar, SampleStream)> {
    let mut lidar = Rplidar::new(config);
    lidar.connect()?;
    let health = lidar.get_health()?;
    if !health.is_ok() {
        warn!(
            "Device reports {:?}, error code {:#06X}",
            health.state(),
            health.error_code
        );
    }
    let stream = lidar.start_scan()?;
    Ok((lidar, stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use std::io::ErrorKind;
    use std::time::{Duration, Instant};

    const SCAN_DESCRIPTOR: [u8; 7] = [0xA5, 0x5A, 0x05, 0x00, 0x00, 0x40, 0x81];
    const INFO_DESCRIPTOR: [u8; 7] = [0xA5, 0x5A, 0x14, 0x00, 0x00, 0x00, 0x04];
    const HEALTH_DESCRIPTOR: [u8; 7] = [0xA5, 0x5A, 0x03, 0x00, 0x00, 0x00, 0x06];

    fn lidar() -> (Rplidar, MockTransport) {
        let port = MockTransport::new();
        let lidar = Rplidar::with_transport(DriverConfig::for_tests(), Box::new(port.clone()));
        (lidar, port)
    }

    fn is_stall(item: &Result<ScanSample>) -> bool {
        matches!(item, Err(RplidarError::Stalled { .. }))
    }

    #[test]
    fn test_get_info() {
        let (mut lidar, port) = lidar();
        port.push_read(&INFO_DESCRIPTOR);
        port.push_read(&[18, 5, 1, 0]);
        port.push_read(&[0; 16]);

        let info = lidar.get_info().unwrap();
        assert_eq!(info.model_number, 18);
        assert_eq!(info.firmware_version(), "1.5");
        assert_eq!(info.hardware_version, 0);
        assert_eq!(info.serial_number_hex(), "00".repeat(16));
        assert_eq!(port.written(), [0xA5, 0x50]);
    }

    #[test]
    fn test_get_info_short_payload() {
        let (mut lidar, port) = lidar();
        port.push_read(&INFO_DESCRIPTOR);
        port.push_read(&[18, 5, 1, 0]);
        port.push_timeout();
        assert!(matches!(
            lidar.get_info(),
            Err(RplidarError::Protocol(ProtocolError::ShortRead {
                expected: 20,
                actual: 4
            }))
        ));
        assert_eq!(lidar.state(), ScanState::Idle);
    }

    #[test]
    fn test_get_health() {
        let (mut lidar, port) = lidar();
        port.push_read(&HEALTH_DESCRIPTOR);
        port.push_read(&[0x01, 0x34, 0x12]);
        let health = lidar.get_health().unwrap();
        assert_eq!(health.status, 1);
        assert_eq!(health.state(), HealthState::Warning);
        assert_eq!(health.error_code, 0x1234);
        assert_eq!(port.written(), [0xA5, 0x52]);
    }

    #[test]
    fn test_missing_descriptor() {
        let (mut lidar, _port) = lidar();
        assert!(matches!(
            lidar.get_health(),
            Err(RplidarError::Protocol(ProtocolError::ShortRead {
                expected: 7,
                actual: 0
            }))
        ));
    }

    #[test]
    fn test_start_scan_bad_sync() {
        let (mut lidar, port) = lidar();
        port.push_read(&[0xA5, 0x00, 0x05, 0x00, 0x00, 0x40, 0x81]);
        assert!(matches!(
            lidar.start_scan(),
            Err(RplidarError::Protocol(ProtocolError::UnexpectedSyncBytes([
                0xA5, 0x00
            ])))
        ));
        assert_eq!(lidar.state(), ScanState::Idle);
        assert!(matches!(lidar.samples(), Err(RplidarError::NotScanning)));
        assert_eq!(port.written(), [0xA5, 0x20]);
    }

    #[test]
    fn test_scan_lifecycle() {
        let (mut lidar, port) = lidar();
        port.push_read(&SCAN_DESCRIPTOR);
        port.push_read(&[0x05, 0x20, 0x10, 0xE8, 0x03, 0x01, 0x00]);
        port.push_read(&[0x20, 0xE8, 0x03, 0x3E, 0x01]);
        port.push_read(&[0x20, 0x10, 0x27]);

        let mut stream = lidar.start_scan().unwrap();
        assert_eq!(lidar.state(), ScanState::Scanning);
        assert!(lidar.samples().is_ok());
        assert!(matches!(lidar.start_scan(), Err(RplidarError::ScanInProgress)));
        assert!(matches!(lidar.get_info(), Err(RplidarError::ScanInProgress)));

        let samples: Vec<ScanSample> = stream
            .by_ref()
            .filter(|item| !is_stall(item))
            .take(2)
            .map(|item| item.unwrap())
            .collect();
        assert_eq!(samples[0].angle_degrees, 32.25);
        assert_eq!(samples[0].distance_mm, 250.);
        assert!(samples[0].is_new_scan);
        assert_eq!(samples[1].angle_degrees, 64.);
        assert_eq!(samples[1].distance_mm, 2500.);
        assert!(!samples[1].is_new_scan);

        let stats = lidar.stats().unwrap();
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.filtered, 1);

        lidar.stop_scan().unwrap();
        assert_eq!(lidar.state(), ScanState::Idle);
        assert_eq!(port.written(), [0xA5, 0x20, 0xA5, 0x25]);
        assert_eq!(port.flush_count(), 1);

        // Second stop is a no-op.
        lidar.stop_scan().unwrap();
        assert_eq!(port.written(), [0xA5, 0x20, 0xA5, 0x25]);

        assert!(stream.all(|item| is_stall(&item)));
        assert!(matches!(lidar.samples(), Err(RplidarError::NotScanning)));
        assert!(lidar.stats().is_none());

        // A new scan needs a new start.
        port.push_read(&SCAN_DESCRIPTOR);
        port.push_read(&[0x3E, 0x01, 0x20, 0x10, 0x27]);
        let mut restarted = lidar.start_scan().unwrap();
        let sample = restarted.find(|item| !is_stall(item)).unwrap().unwrap();
        assert_eq!(sample.angle_degrees, 64.);
        lidar.stop_scan().unwrap();
    }

    #[test]
    fn test_transport_failure_during_scan() {
        let (mut lidar, port) = lidar();
        port.push_read(&SCAN_DESCRIPTOR);
        port.push_read(&[0x05, 0x20, 0x10, 0xE8, 0x03]);
        port.push_error(ErrorKind::BrokenPipe);

        let stream = lidar.start_scan().unwrap();
        let items: Vec<Result<ScanSample>> = stream.collect();
        assert!(items[0].is_ok());
        let last = items.last().unwrap();
        assert!(matches!(last, Err(e) if e.is_transport()));

        // The thread still stops the device after the stream ends.
        let deadline = Instant::now() + Duration::from_secs(1);
        while lidar.state() == ScanState::Scanning && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(lidar.state(), ScanState::Idle);
        assert!(matches!(lidar.samples(), Err(RplidarError::NotScanning)));
        assert!(lidar.stats().is_none());

        lidar.stop_scan().unwrap();
        assert_eq!(lidar.state(), ScanState::Idle);
        assert!(port.written().ends_with(&[0xA5, 0x25]));

        port.push_read(&HEALTH_DESCRIPTOR);
        port.push_read(&[0x00, 0x00, 0x00]);
        assert!(lidar.get_health().unwrap().is_ok());
    }

    #[test]
    fn test_stop_scan_within_read_timeout() {
        let read_timeout = Duration::from_millis(200);
        let stop_settle = Duration::from_millis(50);
        let port = MockTransport::new();
        port.set_read_delay(read_timeout);
        let config = DriverConfig::for_tests()
            .with_read_timeout(read_timeout)
            .with_stop_settle(stop_settle);
        let mut lidar = Rplidar::with_transport(config, Box::new(port.clone()));

        port.push_read(&SCAN_DESCRIPTOR);
        for _ in 0..100 {
            port.push_read(&[0x3E, 0x01, 0x20, 0x10, 0x27]);
        }
        let mut stream = lidar.start_scan().unwrap();
        assert!(stream.next().unwrap().is_ok());

        let started = Instant::now();
        lidar.stop_scan().unwrap();
        let elapsed = started.elapsed();
        assert!(
            elapsed < read_timeout + stop_settle + Duration::from_millis(150),
            "stop took {:?}",
            elapsed
        );
        assert!(elapsed >= stop_settle);
        assert_eq!(lidar.state(), ScanState::Idle);
        assert_eq!(port.remaining(), 0);
        assert!(port.written().ends_with(&[0xA5, 0x25]));
    }

    #[test]
    fn test_reset() {
        let (mut lidar, port) = lidar();
        port.push_read(&SCAN_DESCRIPTOR);
        let _stream = lidar.start_scan().unwrap();

        lidar.reset().unwrap();
        assert_eq!(lidar.state(), ScanState::Idle);
        assert_eq!(port.written(), [0xA5, 0x20, 0xA5, 0x25, 0xA5, 0x40]);
        assert_eq!(port.flush_count(), 2);
    }

    #[test]
    fn test_disconnect() {
        let (mut lidar, port) = lidar();
        port.push_read(&SCAN_DESCRIPTOR);
        let stream = lidar.start_scan().unwrap();

        lidar.disconnect().unwrap();
        assert_eq!(lidar.state(), ScanState::Disconnected);
        assert_eq!(port.written(), [0xA5, 0x20, 0xA5, 0x25]);
        assert!(stream.into_iter().all(|item| is_stall(&item)));

        assert!(matches!(lidar.get_info(), Err(RplidarError::NotConnected)));
        assert!(matches!(lidar.start_scan(), Err(RplidarError::NotConnected)));
        assert!(matches!(lidar.reset(), Err(RplidarError::NotConnected)));
        lidar.stop_scan().unwrap();
        lidar.disconnect().unwrap();
    }

    #[test]
    fn test_drop_stops_scan() {
        let (mut lidar, port) = lidar();
        port.push_read(&SCAN_DESCRIPTOR);
        let _stream = lidar.start_scan().unwrap();
        drop(lidar);
        assert_eq!(port.written(), [0xA5, 0x20, 0xA5, 0x25]);
    }

    #[test]
    fn test_disconnect_when_idle_sends_stop() {
        let (mut lidar, port) = lidar();
        lidar.disconnect().unwrap();
        assert_eq!(port.written(), [0xA5, 0x25]);
        assert_eq!(port.flush_count(), 1);
    }
}
