use crate::constants::{
    LIDAR_ANS_LENGTH_DEVHEALTH, LIDAR_ANS_LENGTH_DEVINFO, LIDAR_ANS_LENGTH_MEASUREMENT,
    LIDAR_ANS_TYPE_DEVHEALTH, LIDAR_ANS_TYPE_DEVINFO, LIDAR_ANS_TYPE_MEASUREMENT,
    LIDAR_CMD_GET_DEVICE_HEALTH, LIDAR_CMD_GET_DEVICE_INFO, LIDAR_CMD_RESET, LIDAR_CMD_SCAN,
    LIDAR_CMD_STOP, LIDAR_CMD_SYNC_BYTE,
};

/// Requests understood by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    GetInfo,
    GetHealth,
    Stop,
    Reset,
    Scan,
}

/// Answer announced by the response descriptor of a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ExpectedAnswer {
    pub(crate) data_type: u8,
    pub(crate) length: usize,
}

impl Command {
    pub fn opcode(self) -> u8 {
        match self {
            Command::GetInfo => LIDAR_CMD_GET_DEVICE_INFO,
            Command::GetHealth => LIDAR_CMD_GET_DEVICE_HEALTH,
            Command::Stop => LIDAR_CMD_STOP,
            Command::Reset => LIDAR_CMD_RESET,
            Command::Scan => LIDAR_CMD_SCAN,
        }
    }

    /// Request frame sent on the wire.
    pub fn encode(self) -> [u8; 2] {
        [LIDAR_CMD_SYNC_BYTE, self.opcode()]
    }

    /// Stop and Reset are fire-and-forget.
    pub(crate) fn expected_answer(self) -> Option<ExpectedAnswer> {
        match self {
            Command::GetInfo => Some(ExpectedAnswer {
                data_type: LIDAR_ANS_TYPE_DEVINFO,
                length: LIDAR_ANS_LENGTH_DEVINFO,
            }),
            Command::GetHealth => Some(ExpectedAnswer {
                data_type: LIDAR_ANS_TYPE_DEVHEALTH,
                length: LIDAR_ANS_LENGTH_DEVHEALTH,
            }),
            Command::Scan => Some(ExpectedAnswer {
                data_type: LIDAR_ANS_TYPE_MEASUREMENT,
                length: LIDAR_ANS_LENGTH_MEASUREMENT,
            }),
            Command::Stop | Command::Reset => None,
        }
    }
}
