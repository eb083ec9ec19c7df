use crate::cli::args::OutputFormat;
use crate::domain::config::{DeviceProfile, SerTermConfig};
use crate::infrastructure::serial::PortSummary;
use std::fmt::Write;
use std::io;
use tabled::{Table, Tabled};

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Formatting error: {0}")]
    FormatError(#[from] std::fmt::Error),
}

impl From<OutputError> for crate::domain::error::SerTermError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Console output writer for listings and status messages
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn write_ports(&self, ports: &[PortSummary]) -> Result<(), OutputError> {
        print!("{}", self.render_ports(ports)?);
        Ok(())
    }

    pub fn write_config(&self, config: &SerTermConfig) -> Result<(), OutputError> {
        print!("{}", self.render_config(config)?);
        Ok(())
    }

    pub fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }

    /// Report a failed command on stderr.
    pub fn write_error(&self, error: &str) -> Result<(), OutputError> {
        eprintln!("{}", self.render_error(error)?);
        Ok(())
    }

    pub fn render_error(&self, error: &str) -> Result<String, OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "error": error,
                    "level": "error"
                });
                Ok(serde_json::to_string_pretty(&output)?)
            }
            _ => Ok(format!("Error: {}", error)),
        }
    }

    pub fn render_ports(&self, ports: &[PortSummary]) -> Result<String, OutputError> {
        let mut out = String::new();
        match self.format {
            OutputFormat::Text => {
                if ports.is_empty() {
                    writeln!(out, "No serial ports found")?;
                }
                for port in ports {
                    write!(out, "{} ({})", port.name, port.port_type)?;
                    if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
                        write!(out, " {:04x}:{:04x}", vid, pid)?;
                    }
                    if let Some(product) = &port.product {
                        write!(out, " {}", product)?;
                    }
                    writeln!(out)?;
                }
            }
            OutputFormat::Json => {
                writeln!(out, "{}", serde_json::to_string_pretty(ports)?)?;
            }
            OutputFormat::Table => {
                if !ports.is_empty() {
                    let rows: Vec<PortTableRow> = ports.iter().map(PortTableRow::from).collect();
                    writeln!(out, "{}", Table::new(rows))?;
                }
            }
        }
        Ok(out)
    }

    pub fn render_config(&self, config: &SerTermConfig) -> Result<String, OutputError> {
        let mut out = String::new();
        match self.format {
            OutputFormat::Text => {
                let defaults = &config.defaults;
                writeln!(out, "SerTerm Configuration:")?;
                writeln!(out, "  Log level: {}", defaults.log_level)?;
                writeln!(out, "  Baud rate: {}", defaults.baud_rate)?;
                writeln!(out, "  Timeout: {}s", defaults.timeout)?;
                writeln!(out, "  Connect timeout: {}s", defaults.connect_timeout)?;
                writeln!(out, "  Display: {} (width {})", defaults.display, defaults.width)?;
                writeln!(out, "  Prompt: {:?}", defaults.prompt)?;

                if !config.devices.is_empty() {
                    writeln!(out, "  Devices:")?;
                    for device in &config.devices {
                        let desc = if device.description.is_empty() {
                            "No description"
                        } else {
                            &device.description
                        };
                        writeln!(out, "    {}: {} ({})", device.name, device.address, desc)?;
                    }
                }
            }
            OutputFormat::Json => {
                writeln!(out, "{}", serde_json::to_string_pretty(config)?)?;
            }
            OutputFormat::Table => {
                if !config.devices.is_empty() {
                    let rows: Vec<DeviceTableRow> =
                        config.devices.iter().map(DeviceTableRow::from).collect();
                    writeln!(out, "{}", Table::new(rows))?;
                }
            }
        }
        Ok(out)
    }
}

/// Table row for a serial port
#[derive(Tabled)]
struct PortTableRow {
    name: String,
    r#type: String,
    vid_pid: String,
    product: String,
}

impl From<&PortSummary> for PortTableRow {
    fn from(port: &PortSummary) -> Self {
        let vid_pid = match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => format!("{:04x}:{:04x}", vid, pid),
            _ => String::new(),
        };
        Self {
            name: port.name.clone(),
            r#type: port.port_type.clone(),
            vid_pid,
            product: port.product.clone().unwrap_or_default(),
        }
    }
}

/// Table row for device configuration
#[derive(Tabled)]
struct DeviceTableRow {
    name: String,
    address: String,
    description: String,
}

impl From<&DeviceProfile> for DeviceTableRow {
    fn from(device: &DeviceProfile) -> Self {
        Self {
            name: device.name.clone(),
            address: device.address.clone(),
            description: device.description.clone(),
        }
    }
}
