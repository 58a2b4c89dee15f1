use crate::command::ExpectedAnswer;
use crate::constants::{
    HEADER_SIZE, LIDAR_ANS_LENGTH_DEVHEALTH, LIDAR_ANS_LENGTH_DEVINFO,
    LIDAR_ANS_LENGTH_MEASUREMENT, LIDAR_ANS_SEND_MODE_SHIFT, LIDAR_ANS_SIZE_MASK,
    LIDAR_ANS_SYNC_BYTES,
};
use crate::error::ProtocolError;
use crate::numeric::{to_angle_q6, to_degree, to_millimeter, to_string, to_u16};
use byteorder::{ByteOrder, LittleEndian};
use rplidar_data::{DeviceInfo, HealthStatus, ScanSample};
use tracing::{trace, warn};

/// How many answers follow a descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendMode {
    SingleResponse,
    MultipleResponse,
    Reserved(u8),
}

impl From<u8> for SendMode {
    fn from(value: u8) -> Self {
        match value {
            0 => SendMode::SingleResponse,
            1 => SendMode::MultipleResponse,
            other => SendMode::Reserved(other),
        }
    }
}

/// The 7-byte header preceding every answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseDescriptor {
    pub sync: [u8; 2],
    /// Length of one answer, 30 bits.
    pub payload_len: u32,
    pub send_mode: SendMode,
    pub data_type: u8,
}

impl ResponseDescriptor {
    pub fn parse(header: &[u8]) -> Result<ResponseDescriptor, ProtocolError> {
        let header = header.get(..HEADER_SIZE).ok_or(ProtocolError::ShortRead {
            expected: HEADER_SIZE,
            actual: header.len(),
        })?;
        let size_and_mode = LittleEndian::read_u32(&header[2..6]);
        Ok(ResponseDescriptor {
            sync: [header[0], header[1]],
            payload_len: size_and_mode & LIDAR_ANS_SIZE_MASK,
            send_mode: SendMode::from((size_and_mode >> LIDAR_ANS_SEND_MODE_SHIFT) as u8),
            data_type: header[6],
        })
    }

    pub fn has_valid_sync(&self) -> bool {
        self.sync == LIDAR_ANS_SYNC_BYTES
    }
}

/// Rejects descriptors without the sync pair. A data type or length other
/// than the expected one is only logged; some firmware revisions disagree
/// with the protocol document there.
pub(crate) fn validate_response_header(
    descriptor: &ResponseDescriptor,
    expected: Option<ExpectedAnswer>,
) -> Result<(), ProtocolError> {
    if !descriptor.has_valid_sync() {
        return Err(ProtocolError::UnexpectedSyncBytes(descriptor.sync));
    }
    if let Some(expected) = expected {
        if descriptor.data_type != expected.data_type {
            warn!(
                "Expected answer type {:02X} but obtained {:02X}.",
                expected.data_type, descriptor.data_type
            );
        }
        if descriptor.payload_len as usize != expected.length {
            warn!(
                "Expected answer length of {} bytes but descriptor announces {} bytes.",
                expected.length, descriptor.payload_len
            );
        }
    }
    Ok(())
}

fn exact<const N: usize>(data: &[u8]) -> Result<&[u8; N], ProtocolError> {
    data.get(..N)
        .and_then(|d| d.try_into().ok())
        .ok_or(ProtocolError::ShortRead {
            expected: N,
            actual: data.len(),
        })
}

pub fn decode_device_info(data: &[u8]) -> Result<DeviceInfo, ProtocolError> {
    let info = exact::<LIDAR_ANS_LENGTH_DEVINFO>(data)?;
    let mut serial_number = [0u8; 16];
    serial_number.copy_from_slice(&info[4..20]);
    Ok(DeviceInfo {
        model_number: info[0],
        // minor precedes major on the wire
        firmware_minor_version: info[1],
        firmware_major_version: info[2],
        hardware_version: info[3],
        serial_number,
    })
}

pub fn decode_health(data: &[u8]) -> Result<HealthStatus, ProtocolError> {
    let health = exact::<LIDAR_ANS_LENGTH_DEVHEALTH>(data)?;
    Ok(HealthStatus {
        status: health[0],
        error_code: LittleEndian::read_u16(&health[1..3]),
    })
}

/// Raw fields of one 5-byte measurement frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanFrame {
    pub quality: u8,
    pub is_new_scan: bool,
    /// Bit 1 of byte 0; the protocol sets it to the inverse of the new-scan bit.
    pub inverted_new_scan: bool,
    pub angle_q6: u16,
    pub distance_q2: u16,
}

impl ScanFrame {
    pub fn has_valid_check_bit(&self) -> bool {
        self.is_new_scan != self.inverted_new_scan
    }

    /// Out-of-range and low-signal readings carry no information.
    pub fn is_filtered(&self) -> bool {
        self.quality == 0 || self.distance_q2 == 0
    }

    pub fn to_sample(&self) -> Option<ScanSample> {
        if self.is_filtered() {
            return None;
        }
        Some(ScanSample {
            angle_degrees: to_degree(self.angle_q6),
            distance_mm: to_millimeter(self.distance_q2),
            quality: self.quality,
            is_new_scan: self.is_new_scan,
        })
    }
}

pub fn decode_scan_frame(frame: &[u8; LIDAR_ANS_LENGTH_MEASUREMENT]) -> ScanFrame {
    let decoded = ScanFrame {
        quality: frame[0] >> 2,
        is_new_scan: frame[0] & 0x01 == 1,
        inverted_new_scan: frame[0] & 0x02 == 0x02,
        angle_q6: to_angle_q6(frame[1], frame[2]),
        distance_q2: to_u16(frame[4], frame[3]),
    };
    trace!("frame {} -> {:?}", to_string(frame), decoded);
    decoded
}
