#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Health category encoded in the first byte of a GET_HEALTH reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HealthState {
    Good,
    Warning,
    Error,
    /// Status byte outside the documented range.
    Unknown(u8),
}

impl From<u8> for HealthState {
    fn from(status: u8) -> Self {
        match status {
            0 => HealthState::Good,
            1 => HealthState::Warning,
            2 => HealthState::Error,
            other => HealthState::Unknown(other),
        }
    }
}

/// Reply to the GET_HEALTH request.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HealthStatus {
    /// 0 means healthy, anything else is a warning or an error.
    pub status: u8,
    pub error_code: u16,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == 0
    }

    pub fn state(&self) -> HealthState {
        HealthState::from(self.status)
    }
}
