// Communication module - Device endpoints and wire encoding
pub mod message;
pub mod transport;

pub use message::{encode_command, Direction};
pub use transport::{open_device, Device, TransportType};
