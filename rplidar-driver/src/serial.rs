use crate::command::Command;
use crate::config::DriverConfig;
use crate::constants::HEADER_SIZE;
use crate::error::{ProtocolError, Result};
use crate::numeric::to_string;
use crate::packet::{validate_response_header, ResponseDescriptor};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::thread::sleep;
use tracing::{debug, trace};

/// Byte channel to the sensor.
///
/// Reads block for at most the channel's own timeout. Closing is dropping.
pub trait Transport: Send {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Reads whatever arrives before the timeout, up to `buf.len()` bytes.
    /// Returns 0 if the timeout expired with nothing received.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Discards bytes already received but not yet read.
    fn flush_input(&mut self) -> io::Result<()>;

    /// Fills `buf` unless a read times out first; returns the bytes read.
    fn read_exact_timeout(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_available(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

impl Transport for dyn SerialPort {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        Write::write_all(self, data)?;
        self.flush()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn flush_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write_all(data)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_available(buf)
    }

    fn flush_input(&mut self) -> io::Result<()> {
        (**self).flush_input()
    }
}

/// Opens the configured port as 8N1 without flow control.
pub fn open_port(config: &DriverConfig) -> Result<Box<dyn SerialPort>> {
    debug!(
        "Opening {} at {} baud, timeout {:?}",
        config.port_name, config.baud_rate, config.read_timeout
    );
    let port = serialport::new(config.port_name.as_str(), config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(config.read_timeout)
        .open()?;
    Ok(port)
}

pub(crate) fn send_command(port: &mut dyn Transport, command: Command) -> Result<()> {
    let data = command.encode();
    debug!("Sending {:?} ({})", command, to_string(&data));
    port.write_all(&data)?;
    Ok(())
}

pub(crate) fn read(port: &mut dyn Transport, data_size: usize) -> Result<Vec<u8>> {
    let mut packet = vec![0u8; data_size];
    let n_read = port.read_exact_timeout(&mut packet)?;
    if n_read < data_size {
        return Err(ProtocolError::ShortRead {
            expected: data_size,
            actual: n_read,
        }
        .into());
    }
    Ok(packet)
}

pub(crate) fn read_descriptor(port: &mut dyn Transport) -> Result<ResponseDescriptor> {
    let header = read(port, HEADER_SIZE)?;
    trace!("Descriptor {}", to_string(&header));
    Ok(ResponseDescriptor::parse(&header)?)
}

/// Sends a command that has an answer and returns its payload.
pub(crate) fn request(port: &mut dyn Transport, command: Command) -> Result<Vec<u8>> {
    let expected = command.expected_answer();
    send_command(port, command)?;
    let descriptor = read_descriptor(port)?;
    validate_response_header(&descriptor, expected)?;
    match expected {
        Some(answer) => read(port, answer.length),
        None => Ok(Vec::new()),
    }
}

pub(crate) fn start_scan(port: &mut dyn Transport) -> Result<()> {
    send_command(port, Command::Scan)?;
    let descriptor = read_descriptor(port)?;
    validate_response_header(&descriptor, Command::Scan.expected_answer())?;
    debug!("Scan started: {:?}", descriptor);
    Ok(())
}

/// Stops the measurement and drops what the device sent before it obeyed.
pub(crate) fn stop_scan_and_flush(port: &mut dyn Transport, config: &DriverConfig) -> Result<()> {
    send_command(port, Command::Stop)?;
    sleep(config.stop_settle);
    port.flush_input()?;
    Ok(())
}

pub(crate) fn reset_device(port: &mut dyn Transport, config: &DriverConfig) -> Result<()> {
    send_command(port, Command::Reset)?;
    sleep(config.reset_settle);
    port.flush_input()?;
    Ok(())
}
