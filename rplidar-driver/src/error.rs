use std::io;
use thiserror::Error;

/// Violations of the wire protocol.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Expected {expected} bytes but only {actual} arrived before the timeout.")]
    ShortRead { expected: usize, actual: usize },

    #[error("Response must start with 0xA5 0x5A. Observed = {0:02X?}.")]
    UnexpectedSyncBytes([u8; 2]),
}

#[derive(Error, Debug)]
pub enum RplidarError {
    #[error("Serial port error: {0}")]
    Transport(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Scan stalled: {short_reads} consecutive reads completed no frame.")]
    Stalled { short_reads: u32 },

    #[error("The device is not connected.")]
    NotConnected,

    #[error("A scan is in progress. Stop it first.")]
    ScanInProgress,

    #[error("No scan is in progress.")]
    NotScanning,

    #[error("The decode thread panicked.")]
    DecoderPanicked,
}

impl RplidarError {
    /// Port open/read/write failures, fatal to the session.
    pub fn is_transport(&self) -> bool {
        matches!(self, RplidarError::Transport(_) | RplidarError::Io(_))
    }

    /// In-band report of a quiet line; the scan goes on after it.
    pub fn is_stall(&self) -> bool {
        matches!(self, RplidarError::Stalled { .. })
    }
}

pub type Result<T> = std::result::Result<T, RplidarError>;
