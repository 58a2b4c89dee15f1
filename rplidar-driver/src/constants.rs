use std::time::Duration;

pub(crate) const LIDAR_CMD_SYNC_BYTE: u8 = 0xA5;
pub(crate) const LIDAR_ANS_SYNC_BYTES: [u8; 2] = [0xA5, 0x5A];

pub(crate) const LIDAR_CMD_STOP: u8 = 0x25;
pub(crate) const LIDAR_CMD_SCAN: u8 = 0x20;
pub(crate) const LIDAR_CMD_RESET: u8 = 0x40;
pub(crate) const LIDAR_CMD_GET_DEVICE_INFO: u8 = 0x50;
pub(crate) const LIDAR_CMD_GET_DEVICE_HEALTH: u8 = 0x52;
// Compressed scan mode; no decoder exists for its answer.
#[cfg(test)]
pub(crate) const LIDAR_CMD_EXPRESS_SCAN: u8 = 0x82;

pub(crate) const HEADER_SIZE: usize = 7;
pub(crate) const LIDAR_ANS_TYPE_DEVINFO: u8 = 0x04;
pub(crate) const LIDAR_ANS_LENGTH_DEVINFO: usize = 20;
pub(crate) const LIDAR_ANS_TYPE_DEVHEALTH: u8 = 0x06;
pub(crate) const LIDAR_ANS_LENGTH_DEVHEALTH: usize = 3;
pub(crate) const LIDAR_ANS_TYPE_MEASUREMENT: u8 = 0x81;
pub(crate) const LIDAR_ANS_LENGTH_MEASUREMENT: usize = 5;

pub(crate) const LIDAR_ANS_SIZE_MASK: u32 = 0x3FFF_FFFF;
pub(crate) const LIDAR_ANS_SEND_MODE_SHIFT: u32 = 30;

pub(crate) const DEFAULT_PORT_NAME: &str = "/dev/ttyUSB0";
pub(crate) const DEFAULT_BAUD_RATE: u32 = 115_200;
pub(crate) const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);
pub(crate) const DEFAULT_STOP_SETTLE: Duration = Duration::from_millis(100);
pub(crate) const DEFAULT_RESET_SETTLE: Duration = Duration::from_secs(2);
pub(crate) const DEFAULT_HANDOFF_CAPACITY: usize = 1800;
pub(crate) const DEFAULT_STALL_THRESHOLD: u32 = 3;

// Bytes requested from the port per decode cycle.
pub(crate) const READ_CHUNK_SIZE: usize = LIDAR_ANS_LENGTH_MEASUREMENT * 64;
