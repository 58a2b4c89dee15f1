use rplidar_data::scan::{ANGLE_STEPS_PER_DEGREE, DISTANCE_STEPS_PER_MM};

pub(crate) fn to_u16(high: u8, low: u8) -> u16 {
    ((high as u16) << 8) | (low as u16)
}

/// 15-bit angle from bytes 1 and 2 of a scan frame. Bit 0 of `low` is the
/// check bit and is shifted out.
pub(crate) fn to_angle_q6(low: u8, high: u8) -> u16 {
    to_u16(high, low) >> 1
}

pub(crate) fn to_degree(angle_q6: u16) -> f64 {
    (angle_q6 as f64) / ANGLE_STEPS_PER_DEGREE
}

pub(crate) fn to_millimeter(distance_q2: u16) -> f64 {
    (distance_q2 as f64) / DISTANCE_STEPS_PER_MM
}

pub(crate) fn to_string(data: &[u8]) -> String {
    data.iter()
        .map(|e| format!("{:02X}", e))
        .collect::<Vec<_>>()
        .join(" ")
}
