use crate::core::communication::transport::{classify_io_error, is_transient, Device, TransportType};
use crate::domain::error::{SerTermError, SerTermResult};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

const READ_BUFFER_SIZE: usize = 4096;

/// Any async byte stream used as a device. Sockets are the production case.
pub struct StreamDevice<S> {
    address: String,
    stream: S,
    buffer: Vec<u8>,
}

pub type TcpDevice = StreamDevice<TcpStream>;

impl<S> StreamDevice<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(address: impl Into<String>, stream: S) -> Self {
        Self {
            address: address.into(),
            stream,
            buffer: vec![0u8; READ_BUFFER_SIZE],
        }
    }
}

impl TcpDevice {
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> SerTermResult<Self> {
        let address = if host.contains(':') {
            format!("tcp://[{}]:{}", host, port)
        } else {
            format!("tcp://{}:{}", host, port)
        };

        // Connect with timeout
        let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| SerTermError::Open {
                address: address.clone(),
                reason: format!("connection timed out after {:.1}s", timeout.as_secs_f64()),
            })?
            .map_err(|e| SerTermError::Open {
                address: address.clone(),
                reason: e.to_string(),
            })?;

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        info!("TCP connection established to {}", address);
        Ok(Self::new(address, stream))
    }
}

#[async_trait]
impl<S> Device for StreamDevice<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn transport_type(&self) -> TransportType {
        TransportType::Tcp
    }

    fn address(&self) -> &str {
        &self.address
    }

    async fn read_chunk(&mut self, timeout: Duration) -> SerTermResult<Vec<u8>> {
        match tokio::time::timeout(timeout, self.stream.read(&mut self.buffer)).await {
            // Timeout - nothing this cycle
            Err(_) => Ok(Vec::new()),
            Ok(Ok(0)) => Err(SerTermError::DeviceLost {
                address: self.address.clone(),
                reason: "connection closed by peer".to_string(),
            }),
            Ok(Ok(n)) => {
                debug!("Received {} bytes from {}", n, self.address);
                Ok(self.buffer[..n].to_vec())
            }
            Ok(Err(e)) if is_transient(e.kind()) => {
                debug!("Read on {} yielded nothing: {}", self.address, e);
                Ok(Vec::new())
            }
            Ok(Err(e)) => Err(classify_io_error(&self.address, e)),
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> SerTermResult<()> {
        self.stream
            .write_all(data)
            .await
            .map_err(|e| classify_io_error(&self.address, e))?;
        self.stream
            .flush()
            .await
            .map_err(|e| classify_io_error(&self.address, e))?;

        debug!("Sent {} bytes to {}", data.len(), self.address);
        Ok(())
    }

    async fn close(&mut self) -> SerTermResult<()> {
        if let Err(e) = self.stream.shutdown().await {
            warn!("Failed to shut down {}: {}", self.address, e);
        }
        info!("Stream device {} closed", self.address);
        Ok(())
    }
}
