use crate::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_HANDOFF_CAPACITY, DEFAULT_PORT_NAME, DEFAULT_READ_TIMEOUT,
    DEFAULT_RESET_SETTLE, DEFAULT_STALL_THRESHOLD, DEFAULT_STOP_SETTLE,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings of a driver session.
///
/// The serial line is always 8 data bits, no parity, one stop bit.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DriverConfig {
    /// Serial port name such as `/dev/ttyUSB0`.
    pub port_name: String,
    pub baud_rate: u32,
    /// Upper bound of every read; a timed-out read during a scan only means
    /// "no data this cycle". Also the hard deadline for `stop_scan`, which
    /// waits out at most one pending read before stopping the device.
    pub read_timeout: Duration,
    /// Wait after STOP for the device to cease transmission.
    pub stop_settle: Duration,
    /// Wait after RESET for the device to reboot.
    pub reset_settle: Duration,
    /// Items (samples and stall reports) buffered between the decode thread
    /// and consumers. When full, a new stall report is dropped; anything
    /// else overwrites the oldest item.
    pub handoff_capacity: usize,
    /// Consecutive reads completing no frame before a stall is reported.
    pub stall_threshold: u32,
    /// Discard frames whose check bit is not the inverse of the new-scan bit.
    pub validate_check_bit: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            port_name: DEFAULT_PORT_NAME.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            stop_settle: DEFAULT_STOP_SETTLE,
            reset_settle: DEFAULT_RESET_SETTLE,
            handoff_capacity: DEFAULT_HANDOFF_CAPACITY,
            stall_threshold: DEFAULT_STALL_THRESHOLD,
            validate_check_bit: false,
        }
    }
}

impl DriverConfig {
    pub fn new(port_name: &str) -> DriverConfig {
        DriverConfig {
            port_name: port_name.to_string(),
            ..DriverConfig::default()
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn with_stop_settle(mut self, stop_settle: Duration) -> Self {
        self.stop_settle = stop_settle;
        self
    }

    pub fn with_reset_settle(mut self, reset_settle: Duration) -> Self {
        self.reset_settle = reset_settle;
        self
    }

    /// Clamped to at least one item.
    pub fn with_handoff_capacity(mut self, handoff_capacity: usize) -> Self {
        self.handoff_capacity = handoff_capacity.max(1);
        self
    }

    /// Clamped to at least one read.
    pub fn with_stall_threshold(mut self, stall_threshold: u32) -> Self {
        self.stall_threshold = stall_threshold.max(1);
        self
    }

    pub fn with_check_bit_validation(mut self, validate_check_bit: bool) -> Self {
        self.validate_check_bit = validate_check_bit;
        self
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> DriverConfig {
        DriverConfig::new("mock")
            .with_read_timeout(Duration::from_millis(1))
            .with_stop_settle(Duration::ZERO)
            .with_reset_settle(Duration::ZERO)
    }
}
