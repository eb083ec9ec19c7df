use crate::domain::error::{SerTermError, SerTermResult};
use serde::Serialize;
use serialport::{SerialPortInfo, SerialPortType};

/// Serial port found on this machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortSummary {
    pub name: String,
    pub port_type: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortSummary {
    fn from(info: SerialPortInfo) -> Self {
        let (port_type, vid, pid, manufacturer, product) = match info.port_type {
            SerialPortType::UsbPort(usb) => (
                "usb".to_string(),
                Some(usb.vid),
                Some(usb.pid),
                usb.manufacturer,
                usb.product,
            ),
            SerialPortType::PciPort => ("pci".to_string(), None, None, None, None),
            SerialPortType::BluetoothPort => ("bluetooth".to_string(), None, None, None, None),
            SerialPortType::Unknown => ("unknown".to_string(), None, None, None, None),
        };

        Self {
            name: info.port_name,
            port_type,
            vid,
            pid,
            manufacturer,
            product,
        }
    }
}

/// List the serial ports the OS reports, sorted by name.
pub fn list_ports() -> SerTermResult<Vec<PortSummary>> {
    let mut ports: Vec<PortSummary> = serialport::available_ports()
        .map_err(SerTermError::Serial)?
        .into_iter()
        .map(PortSummary::from)
        .collect();
    ports.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(ports)
}
