//! Serial link to the Minitel
//!
//! The Minitel peripheral socket speaks TTL serial at 7 data bits, even
//! parity, 1 stop bit. A USB-TTL cable (PL2303 and friends) shows up as
//! `/dev/ttyUSB*` on Linux or `COM*` on Windows.
//!
//! The engine needs three handles on the same link (reader pump, writer pump
//! and itself for speed changes), so [`Transport`] exposes `try_clone`.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use thiserror::Error;

use super::capability::DEFAULT_SPEED;

/// Read timeout used by the pumps
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Failed to configure serial port: {0}")]
    Configure(#[source] serialport::Error),

    #[error("Failed to clone serial port handle: {0}")]
    Clone(#[source] serialport::Error),

    #[error("Failed to read from serial port: {0}")]
    Read(#[source] io::Error),

    #[error("Failed to write to serial port: {0}")]
    Write(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Duplex byte channel to the terminal
pub trait Transport: Send {
    /// Wait up to `timeout` for one byte, `None` on timeout
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>>;

    /// Write one byte and block until it has left the buffer
    fn write_and_flush(&mut self, byte: u8) -> Result<()>;

    /// Change the link speed without closing it
    fn set_baud_rate(&mut self, bps: u32) -> Result<()>;

    /// Another handle on the same link
    fn try_clone(&self) -> Result<Box<dyn Transport>>;
}

/// Transport over a real serial device
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    timeout: Duration,
}

impl SerialTransport {
    /// Open `path` at the Minitel power-on settings: 1200 bps 7E1, 1 s timeout
    pub fn open(path: &str) -> Result<Self> {
        let port = serialport::new(path, DEFAULT_SPEED)
            .data_bits(DataBits::Seven)
            .parity(Parity::Even)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(DEFAULT_TIMEOUT)
            .open()
            .map_err(|source| TransportError::Open {
                path: path.to_string(),
                source,
            })?;

        tracing::debug!("Opened {} at {} bps 7E1", path, DEFAULT_SPEED);

        Ok(Self {
            port,
            timeout: DEFAULT_TIMEOUT,
        })
    }
}

impl Transport for SerialTransport {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        if timeout != self.timeout {
            self.port
                .set_timeout(timeout)
                .map_err(TransportError::Configure)?;
            self.timeout = timeout;
        }

        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(1) => Ok(Some(buf[0])),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(TransportError::Read(e)),
        }
    }

    fn write_and_flush(&mut self, byte: u8) -> Result<()> {
        self.port.write_all(&[byte]).map_err(TransportError::Write)?;
        self.port.flush().map_err(TransportError::Write)
    }

    fn set_baud_rate(&mut self, bps: u32) -> Result<()> {
        self.port
            .set_baud_rate(bps)
            .map_err(TransportError::Configure)
    }

    fn try_clone(&self) -> Result<Box<dyn Transport>> {
        let port = self.port.try_clone().map_err(TransportError::Clone)?;
        Ok(Box::new(SerialTransport {
            port,
            timeout: self.timeout,
        }))
    }
}

/// Names of the serial ports present on this machine
pub fn available_ports() -> Vec<String> {
    serialport::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .unwrap_or_default()
}
