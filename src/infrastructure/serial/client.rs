use crate::core::communication::transport::{classify_io_error, Device, TransportType};
use crate::domain::config::{FlowControlConfig, ParityConfig, SerialSettings};
use crate::domain::error::{SerTermError, SerTermResult};
use async_trait::async_trait;
use serialport::SerialPort;
use std::io::{self, ErrorKind};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

const READ_BUFFER_SIZE: usize = 4096;

/// Serial line opened with the serialport crate. The blocking port is
/// handed to tokio's blocking pool for every read and write.
pub struct SerialDevice {
    address: String,
    port: Arc<Mutex<Box<dyn SerialPort>>>,
}

impl SerialDevice {
    pub fn open(path: &str, settings: &SerialSettings, timeout: Duration) -> SerTermResult<Self> {
        let open_error = |reason: String| SerTermError::Open {
            address: path.to_string(),
            reason,
        };

        let mut builder = serialport::new(path, settings.baud_rate);

        builder = builder.data_bits(match settings.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            8 => serialport::DataBits::Eight,
            other => return Err(open_error(format!("Invalid data bits: {}", other))),
        });

        builder = builder.stop_bits(match settings.stop_bits {
            1 => serialport::StopBits::One,
            2 => serialport::StopBits::Two,
            other => return Err(open_error(format!("Invalid stop bits: {}", other))),
        });

        builder = builder.parity(match settings.parity {
            ParityConfig::None => serialport::Parity::None,
            ParityConfig::Even => serialport::Parity::Even,
            ParityConfig::Odd => serialport::Parity::Odd,
        });

        builder = builder.flow_control(match settings.flow_control {
            FlowControlConfig::None => serialport::FlowControl::None,
            FlowControlConfig::Software => serialport::FlowControl::Software,
            FlowControlConfig::Hardware => serialport::FlowControl::Hardware,
        });

        let port = builder
            .timeout(timeout)
            .open()
            .map_err(|e| open_error(e.to_string()))?;

        info!(
            "Serial port {} opened with {} baud, {:.1}s timeout",
            path,
            settings.baud_rate,
            timeout.as_secs_f64()
        );

        Ok(Self {
            address: path.to_string(),
            port: Arc::new(Mutex::new(port)),
        })
    }

    async fn with_port<T, F>(&self, op: F) -> SerTermResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn SerialPort) -> io::Result<T> + Send + 'static,
    {
        let port = Arc::clone(&self.port);
        let outcome = tokio::task::spawn_blocking(move || {
            let mut port = port
                .lock()
                .map_err(|_| io::Error::new(ErrorKind::Other, "serial port lock poisoned"))?;
            op(&mut **port)
        })
        .await
        .map_err(|e| SerTermError::DeviceLost {
            address: self.address.clone(),
            reason: e.to_string(),
        })?;

        outcome.map_err(|e| classify_io_error(&self.address, e))
    }
}

#[async_trait]
impl Device for SerialDevice {
    fn transport_type(&self) -> TransportType {
        TransportType::Serial
    }

    fn address(&self) -> &str {
        &self.address
    }

    async fn read_chunk(&mut self, timeout: Duration) -> SerTermResult<Vec<u8>> {
        let result = self
            .with_port(move |port| {
                port.set_timeout(timeout).map_err(io::Error::from)?;
                let mut buffer = vec![0u8; READ_BUFFER_SIZE];
                match port.read(&mut buffer) {
                    Ok(n) => {
                        buffer.truncate(n);
                        Ok(buffer)
                    }
                    Err(e) if e.kind() == ErrorKind::TimedOut => Ok(Vec::new()),
                    Err(e) => Err(e),
                }
            })
            .await;

        match result {
            Ok(data) => {
                if !data.is_empty() {
                    debug!("Received {} bytes over serial", data.len());
                }
                Ok(data)
            }
            Err(SerTermError::Io(e)) => {
                debug!("Serial read on {} yielded nothing: {}", self.address, e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> SerTermResult<()> {
        let data = data.to_vec();
        let len = data.len();
        self.with_port(move |port| {
            port.write_all(&data)?;
            port.flush()
        })
        .await?;

        debug!("Sent {} bytes over serial", len);
        Ok(())
    }

    async fn close(&mut self) -> SerTermResult<()> {
        self.with_port(|port| port.flush()).await?;
        info!("Serial device {} closed", self.address);
        Ok(())
    }
}
