use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identity of the connected sensor as reported by the GET_INFO request.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceInfo {
    pub model_number: u8,
    pub firmware_major_version: u8,
    pub firmware_minor_version: u8,
    pub hardware_version: u8,
    pub serial_number: [u8; 16],
}

impl DeviceInfo {
    /// Firmware version formatted as `major.minor`.
    pub fn firmware_version(&self) -> String {
        format!(
            "{}.{}",
            self.firmware_major_version, self.firmware_minor_version
        )
    }

    /// Serial number as 32 lowercase hex digits.
    pub fn serial_number_hex(&self) -> String {
        hex::encode(self.serial_number)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "model {} firmware {} hardware {} serial {}",
            self.model_number,
            self.firmware_version(),
            self.hardware_version,
            self.serial_number_hex()
        )
    }
}
