use std::{io, time::Duration};

use log::*;
use serialport::SerialPortType;
use thiserror::Error;

pub const DEFAULT_BAUD_RATE: u32 = 9600;
const OPEN_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("No candidate output device found")]
    NoDeviceFound,
    #[error("The output device link is not open")]
    NotConnected,
    #[error("Could not open the output device. {0}")]
    OpenFailed(String),
    #[error("Write to the output device failed. {0}")]
    WriteFailed(io::Error),
    #[error("Could not flush data to the output device. {0}")]
    FlushFailed(io::Error),
    #[error("The device manager is not running")]
    ManagerGone,
}

/// One open transport to the device. `flush` must not return until the bytes have physically
/// left the host.
pub trait DeviceLink: Send + 'static {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

impl DeviceLink for Box<dyn serialport::SerialPort> {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        io::Write::write_all(self, data)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(self)
    }
}

/// Finds and opens device links. Both calls block, so the manager runs them on the blocking
/// pool; `Clone` lets it hand the opener to `spawn_blocking`.
pub trait LinkOpener: Clone + Send + 'static {
    type Link: DeviceLink;

    /// The path of the first plausible device, when none is configured explicitly.
    fn discover(&self) -> Result<String, DeviceError>;

    fn open(&self, path: &str) -> Result<Self::Link, DeviceError>;
}

/// The production opener: enumerates serial ports and picks the first that looks like the
/// expected microcontroller family, by path (`usbmodem`) or by USB manufacturer (`arduino`).
#[derive(Debug, Clone)]
pub struct SerialOpener {
    baud_rate: u32,
}

impl Default for SerialOpener {
    fn default() -> Self {
        Self { baud_rate: DEFAULT_BAUD_RATE }
    }
}

impl SerialOpener {
    pub fn new(baud_rate: u32) -> Self {
        Self { baud_rate }
    }
}

impl LinkOpener for SerialOpener {
    type Link = Box<dyn serialport::SerialPort>;

    fn discover(&self) -> Result<String, DeviceError> {
        let ports = serialport::available_ports().map_err(|e| DeviceError::OpenFailed(e.to_string()))?;
        debug!("🎹️ {} serial ports available", ports.len());
        let candidate = ports.into_iter().find(|port| {
            let by_path = port.port_name.to_lowercase().contains("usbmodem");
            let by_manufacturer = matches!(
                &port.port_type,
                SerialPortType::UsbPort(usb) if usb
                    .manufacturer
                    .as_deref()
                    .map(|m| m.to_lowercase().contains("arduino"))
                    .unwrap_or(false)
            );
            by_path || by_manufacturer
        });
        match candidate {
            Some(port) => {
                info!("🎹️ Found candidate device on {}", port.port_name);
                Ok(port.port_name)
            },
            None => Err(DeviceError::NoDeviceFound),
        }
    }

    fn open(&self, path: &str) -> Result<Self::Link, DeviceError> {
        serialport::new(path, self.baud_rate)
            .timeout(OPEN_TIMEOUT)
            .open()
            .map_err(|e| DeviceError::OpenFailed(format!("{path}: {e}")))
    }
}
