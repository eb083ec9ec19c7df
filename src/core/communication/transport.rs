use crate::domain::config::{Endpoint, SessionConfig};
use crate::domain::error::{SerTermError, SerTermResult};
use crate::infrastructure::{serial::SerialDevice, tcp::TcpDevice};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::time::Duration;
use tracing::info;

/// Transport type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    Serial,
    Tcp,
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportType::Serial => write!(f, "serial"),
            TransportType::Tcp => write!(f, "tcp"),
        }
    }
}

/// An open byte-stream endpoint
#[async_trait]
pub trait Device: Send {
    fn transport_type(&self) -> TransportType;

    /// Address the device was opened with
    fn address(&self) -> &str;

    /// Wait up to `timeout` for data. An empty chunk means nothing arrived;
    /// an error means the endpoint is gone.
    async fn read_chunk(&mut self, timeout: Duration) -> SerTermResult<Vec<u8>>;

    /// Write and flush all of `data`.
    async fn write_all(&mut self, data: &[u8]) -> SerTermResult<()>;

    async fn close(&mut self) -> SerTermResult<()>;
}

/// Whether an I/O error only means "no data this time".
pub fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
    )
}

/// Map an I/O error from an open device into the session's taxonomy.
pub fn classify_io_error(address: &str, error: std::io::Error) -> SerTermError {
    if is_transient(error.kind()) {
        SerTermError::Io(error)
    } else {
        SerTermError::DeviceLost {
            address: address.to_string(),
            reason: error.to_string(),
        }
    }
}

/// Open the endpoint named by the configuration.
pub async fn open_device(config: &SessionConfig) -> SerTermResult<Box<dyn Device>> {
    let device: Box<dyn Device> = match &config.endpoint {
        Endpoint::Serial { path } => {
            Box::new(SerialDevice::open(path, &config.serial, config.timeout)?)
        }
        Endpoint::Tcp { host, port } => {
            Box::new(TcpDevice::connect(host, *port, config.connect_timeout).await?)
        }
    };

    info!(
        "Opened {} device {}",
        device.transport_type(),
        device.address()
    );
    Ok(device)
}
