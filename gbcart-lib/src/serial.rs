//! USB serial transport for the physical adapter.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};

use crate::error::CartError;
use crate::link::{Inbox, Transport};

/// The adapter runs its UART at 1 Mbaud.
pub const ADAPTER_BAUD: u32 = 1_000_000;

/// USB IDs of the CH340 bridge the adapters ship with.
pub const DEFAULT_VID: u16 = 0x1A86;
pub const DEFAULT_PID: u16 = 0x7523;

/// Device path prefixes the bridge shows up under when USB IDs are unavailable.
pub const DEFAULT_PATH_PREFIXES: &[&str] = &[
    "/dev/ttyUSB",
    "/dev/cu.wchusbserial",
    "/dev/cu.usbserial",
    "COM",
];

/// Read timeout of the reader thread; bounds how long `close` waits.
const READ_POLL: Duration = Duration::from_millis(50);

/// How the adapter's serial port is located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMatcher {
    pub vid: u16,
    pub pid: u16,
    pub path_prefixes: Vec<String>,
    /// Explicit port path; skips discovery entirely
    pub port: Option<String>,
}

impl Default for DeviceMatcher {
    fn default() -> Self {
        Self {
            vid: DEFAULT_VID,
            pid: DEFAULT_PID,
            path_prefixes: DEFAULT_PATH_PREFIXES.iter().map(|s| s.to_string()).collect(),
            port: None,
        }
    }
}

/// One serial port seen during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSummary {
    pub path: String,
    /// `(vid, pid)` for USB ports
    pub usb_id: Option<(u16, u16)>,
    pub product: Option<String>,
    /// Whether the configured matcher would pick this port
    pub matches: bool,
}

impl DeviceMatcher {
    /// Whether a port with this path and USB ID looks like the adapter.
    /// A USB ID match wins; the path prefixes are the fallback.
    pub fn matches(&self, path: &str, usb_id: Option<(u16, u16)>) -> bool {
        if let Some(explicit) = &self.port {
            return path == explicit;
        }
        if usb_id == Some((self.vid, self.pid)) {
            return true;
        }
        self.path_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Enumerate serial ports, flagging the ones this matcher accepts.
    pub fn scan(&self) -> Result<Vec<PortSummary>, CartError> {
        let ports = serialport::available_ports().map_err(io::Error::from)?;
        Ok(ports
            .into_iter()
            .map(|info| {
                let (usb_id, product) = match info.port_type {
                    SerialPortType::UsbPort(usb) => (Some((usb.vid, usb.pid)), usb.product),
                    _ => (None, None),
                };
                let matches = self.matches(&info.port_name, usb_id);
                PortSummary {
                    path: info.port_name,
                    usb_id,
                    product,
                    matches,
                }
            })
            .collect())
    }

    /// Path of the adapter's port. USB ID matches are preferred over
    /// path-prefix matches.
    pub fn find(&self) -> Result<String, CartError> {
        if let Some(port) = &self.port {
            return Ok(port.clone());
        }
        let ports = self.scan()?;
        ports
            .iter()
            .find(|p| p.usb_id == Some((self.vid, self.pid)))
            .or_else(|| ports.iter().find(|p| p.matches))
            .map(|p| p.path.clone())
            .ok_or_else(|| {
                CartError::DeviceNotFound(format!(
                    "no port with USB ID {:04X}:{:04X} or path {}",
                    self.vid,
                    self.pid,
                    self.path_prefixes.join("|")
                ))
            })
    }
}

/// [`Transport`] over a real serial port.
///
/// A reader thread pumps bytes into the link's inbox and marks it removed
/// when the port errors out.
pub struct SerialTransport {
    matcher: DeviceMatcher,
    port: Option<Box<dyn SerialPort>>,
    path: Option<String>,
    reader: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl SerialTransport {
    pub fn new(matcher: DeviceMatcher) -> Self {
        Self {
            matcher,
            port: None,
            path: None,
            reader: None,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn matcher(&self) -> &DeviceMatcher {
        &self.matcher
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, inbox: Arc<Inbox>) -> Result<(), CartError> {
        if self.port.is_some() {
            return Ok(());
        }
        let path = self.matcher.find()?;
        let mut port = serialport::new(&path, ADAPTER_BAUD)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_POLL)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => CartError::DeviceNotFound(path.clone()),
                _ => CartError::Io(io::Error::from(e)),
            })?;
        port.write_data_terminal_ready(true)
            .map_err(io::Error::from)?;
        port.write_request_to_send(true).map_err(io::Error::from)?;

        let mut rx = port.try_clone().map_err(io::Error::from)?;
        let stop = Arc::new(AtomicBool::new(false));
        let reader_stop = Arc::clone(&stop);
        let reader = thread::Builder::new()
            .name("gbcart-serial-rx".into())
            .spawn(move || {
                let mut buf = [0u8; 512];
                while !reader_stop.load(Ordering::Acquire) {
                    match rx.read(&mut buf) {
                        Ok(0) => {}
                        Ok(n) => inbox.deliver(&buf[..n]),
                        Err(e)
                            if matches!(
                                e.kind(),
                                io::ErrorKind::TimedOut
                                    | io::ErrorKind::Interrupted
                                    | io::ErrorKind::WouldBlock
                            ) => {}
                        Err(e) => {
                            log::warn!("serial read failed: {}", e);
                            inbox.mark_removed();
                            break;
                        }
                    }
                }
            })?;

        log::info!("Connected to adapter on {}", path);
        self.port = Some(port);
        self.path = Some(path);
        self.reader = Some(reader);
        self.stop = stop;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        port.write_all(bytes)?;
        port.flush()
    }

    fn close(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.port = None;
        if let Some(reader) = self.reader.take()
            && reader.join().is_err()
        {
            log::warn!("serial reader thread panicked");
        }
        if let Some(path) = self.path.take() {
            log::debug!("closed {}", path);
        }
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("adapter on {path}"),
            None => "adapter (not connected)".to_string(),
        }
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usb_id_matches_regardless_of_path() {
        let m = DeviceMatcher::default();
        assert!(m.matches("/dev/ttyACM3", Some((0x1A86, 0x7523))));
        assert!(!m.matches("/dev/ttyACM3", Some((0x2341, 0x0043))));
    }

    #[test]
    fn test_path_prefix_fallback() {
        let m = DeviceMatcher::default();
        assert!(m.matches("/dev/ttyUSB0", None));
        assert!(m.matches("/dev/cu.wchusbserial1410", None));
        assert!(m.matches("COM4", None));
        assert!(!m.matches("/dev/ttyS0", None));
    }

    #[test]
    fn test_explicit_port_overrides_discovery() {
        let m = DeviceMatcher {
            port: Some("/dev/ttyS5".into()),
            ..Default::default()
        };
        assert!(m.matches("/dev/ttyS5", None));
        assert!(!m.matches("/dev/ttyUSB0", Some((0x1A86, 0x7523))));
        assert_eq!(m.find().unwrap(), "/dev/ttyS5");
    }

    #[test]
    fn test_closed_transport_refuses_writes() {
        let mut t = SerialTransport::new(DeviceMatcher::default());
        assert!(!t.is_open());
        assert_eq!(
            t.write(b"0").unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
        assert_eq!(t.describe(), "adapter (not connected)");
    }
}
