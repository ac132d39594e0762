//! Line transports and serial port discovery

mod mock;
mod serial;

pub use mock::MockLineSource;
pub use serial::SerialLineSource;

use crate::error::{Error, Result};
use serialport::SerialPortType;

/// Substrings identifying USB-serial adapters (Linux, Windows)
const USB_PORT_PATTERNS: [&str; 2] = ["/dev/ttyUSB", "COM"];

/// Pick the device port from a list of port names
///
/// The last name matching a USB-serial pattern wins, mirroring enumeration
/// order where a freshly plugged adapter is listed last.
pub fn select_port<'a, I>(names: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter(|name| USB_PORT_PATTERNS.iter().any(|p| name.contains(p)))
        .last()
        .map(str::to_string)
}

/// Enumerate serial ports and pick the USB-serial adapter
pub fn find_port() -> Result<String> {
    let ports = serialport::available_ports()?;
    // Ports without device information ("n/a") are on-board UARTs
    let candidates: Vec<&str> = ports
        .iter()
        .filter(|p| !matches!(p.port_type, SerialPortType::Unknown))
        .map(|p| p.port_name.as_str())
        .collect();

    let port = select_port(candidates).ok_or(Error::PortNotFound)?;
    log::info!("{} is found", port);
    Ok(port)
}

/// Human-readable list of available ports, one per entry
pub fn describe_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let kind = match p.port_type {
                SerialPortType::UsbPort(info) => format!(
                    "USB {:04x}:{:04x} {}",
                    info.vid,
                    info.pid,
                    info.product.unwrap_or_default()
                ),
                SerialPortType::PciPort => "PCI".to_string(),
                SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                SerialPortType::Unknown => "n/a".to_string(),
            };
            format!("{} ({})", p.port_name, kind.trim_end())
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_last_usb_port() {
        let names = ["/dev/ttyS0", "/dev/ttyUSB0", "/dev/ttyUSB1", "/dev/ttyACM0"];
        assert_eq!(select_port(names), Some("/dev/ttyUSB1".to_string()));
    }

    #[test]
    fn test_select_windows_port() {
        assert_eq!(select_port(["COM3"]), Some("COM3".to_string()));
    }

    #[test]
    fn test_no_usb_port() {
        assert_eq!(select_port(["/dev/ttyS0", "/dev/ttyS1"]), None);
        assert_eq!(select_port(std::iter::empty()), None);
    }
}
