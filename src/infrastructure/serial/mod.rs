// Serial module - Serial line endpoint and port discovery
pub mod client;
pub mod ports;

pub use client::SerialDevice;
pub use ports::{list_ports, PortSummary};
