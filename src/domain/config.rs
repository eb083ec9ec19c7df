use crate::domain::error::{SerTermError, SerTermResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// SerTerm configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerTermConfig {
    /// Defaults applied to every session
    #[serde(default)]
    pub defaults: Defaults,
    /// Named device profiles
    #[serde(default)]
    pub devices: Vec<DeviceProfile>,
}

/// Session defaults from the `[defaults]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Default log level for diagnostics on stderr
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Read timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: f64,
    #[serde(default)]
    pub eol: EndOfLine,
    #[serde(default)]
    pub display: DisplayMode,
    #[serde(default = "default_width")]
    pub width: usize,
    /// Prefixes for received lines, a single style or a list
    #[serde(default, deserialize_with = "one_or_many")]
    pub timestamps: Vec<TimestampStyle>,
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

/// Device profile, selectable by name instead of an address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Serial path or `tcp://host:port`
    pub address: String,
    #[serde(default)]
    pub baud_rate: Option<u32>,
    #[serde(default)]
    pub eol: Option<EndOfLine>,
    #[serde(default)]
    pub display: Option<DisplayMode>,
    #[serde(default)]
    pub width: Option<usize>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// End-of-line sequence appended to outgoing commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndOfLine {
    #[default]
    Lf,
    Cr,
    Crlf,
    Lfcr,
    None,
}

impl EndOfLine {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            EndOfLine::Lf => b"\n",
            EndOfLine::Cr => b"\r",
            EndOfLine::Crlf => b"\r\n",
            EndOfLine::Lfcr => b"\n\r",
            EndOfLine::None => b"",
        }
    }
}

/// Textual rendering of received bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Raw,
    Hex,
    Binary,
    Decimal,
}

/// Prefix prepended to every received line. Several styles combine in
/// declaration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampStyle {
    #[default]
    None,
    /// Seconds since the unix epoch
    Unix,
    /// Local date and time
    Date,
    /// Seconds since the session opened
    Elapsed,
}

/// How operator lines are turned into bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    #[default]
    Text,
    Hex,
    Base64,
}

/// Parity configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParityConfig {
    #[default]
    None,
    Odd,
    Even,
}

/// Flow control configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControlConfig {
    #[default]
    None,
    Hardware,
    Software,
}

/// Byte-stream endpoint a session talks to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Endpoint {
    Serial { path: String },
    Tcp { host: String, port: u16 },
}

impl Endpoint {
    /// Parse a device address. `tcp://host:port` and `socket://host:port`
    /// select a socket, anything else is a serial device path.
    pub fn parse(address: &str) -> SerTermResult<Self> {
        let remote = address
            .strip_prefix("tcp://")
            .or_else(|| address.strip_prefix("socket://"));

        let Some(remote) = remote else {
            if address.is_empty() {
                return Err(SerTermError::InvalidInput("empty device address".to_string()));
            }
            return Ok(Endpoint::Serial {
                path: address.to_string(),
            });
        };

        let (host, port) = remote.rsplit_once(':').ok_or_else(|| {
            SerTermError::InvalidInput(format!("missing port in '{}'", address))
        })?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(SerTermError::InvalidInput(format!("missing host in '{}'", address)));
        }
        let port = port.parse::<u16>().map_err(|e| {
            SerTermError::InvalidInput(format!("invalid port in '{}': {}", address, e))
        })?;

        Ok(Endpoint::Tcp {
            host: host.to_string(),
            port,
        })
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Serial { path } => write!(f, "{}", path),
            Endpoint::Tcp { host, port } if host.contains(':') => {
                write!(f, "tcp://[{}]:{}", host, port)
            }
            Endpoint::Tcp { host, port } => write!(f, "tcp://{}:{}", host, port),
        }
    }
}

/// Serial line parameters; ignored for sockets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: ParityConfig,
    pub flow_control: FlowControlConfig,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            data_bits: 8,
            stop_bits: 1,
            parity: ParityConfig::None,
            flow_control: FlowControlConfig::None,
        }
    }
}

/// Everything one session needs, resolved once at startup
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub endpoint: Endpoint,
    pub serial: SerialSettings,
    /// Upper bound of a single device read
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub eol: EndOfLine,
    pub display: DisplayMode,
    /// Byte groups per rendered line
    pub width: usize,
    pub timestamps: Vec<TimestampStyle>,
    pub log_file: Option<PathBuf>,
    /// Mark log lines with `< ` and `> `
    pub log_direction: bool,
    /// Don't print device output to stdout
    pub quiet: bool,
    /// Send these and exit after the response
    pub commands: Vec<String>,
    pub input_format: InputFormat,
    pub prompt: String,
    /// Sent before every prompt, first reply line is shown in the prompt
    pub prompt_command: Option<String>,
    /// Read continuously without prompting, re-sending `commands` every cycle
    pub monitor: bool,
}

/// Session behavior selected by the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    OneShot,
    Interactive,
    Monitor,
}

impl SessionConfig {
    /// Configuration with built-in defaults for the given endpoint.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            serial: SerialSettings::default(),
            timeout: Duration::from_secs_f64(default_timeout()),
            connect_timeout: Duration::from_secs_f64(default_connect_timeout()),
            eol: EndOfLine::Lf,
            display: DisplayMode::Raw,
            width: default_width(),
            timestamps: Vec::new(),
            log_file: None,
            log_direction: true,
            quiet: false,
            commands: Vec::new(),
            input_format: InputFormat::Text,
            prompt: default_prompt(),
            prompt_command: None,
            monitor: false,
        }
    }

    pub fn mode(&self) -> SessionMode {
        if self.monitor {
            SessionMode::Monitor
        } else if !self.commands.is_empty() {
            SessionMode::OneShot
        } else {
            SessionMode::Interactive
        }
    }

    /// Reject values no session can run with.
    pub fn validate(&self) -> SerTermResult<()> {
        if self.width == 0 {
            return Err(SerTermError::Config {
                message: "width must be at least 1".to_string(),
            });
        }
        if self.serial.baud_rate == 0 {
            return Err(SerTermError::Config {
                message: "baud rate must be positive".to_string(),
            });
        }
        if !(5..=8).contains(&self.serial.data_bits) {
            return Err(SerTermError::Config {
                message: format!("Invalid data bits: {}", self.serial.data_bits),
            });
        }
        if !(1..=2).contains(&self.serial.stop_bits) {
            return Err(SerTermError::Config {
                message: format!("Invalid stop bits: {}", self.serial.stop_bits),
            });
        }
        Ok(())
    }
}

/// Convert seconds from the command line or config file into a duration.
pub fn seconds(value: f64, what: &str) -> SerTermResult<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| SerTermError::Config {
        message: format!("{} must be a non-negative number of seconds, got {}", what, value),
    })
}

// Default value functions
fn default_log_level() -> String {
    "warn".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_timeout() -> f64 {
    0.5
}

fn default_connect_timeout() -> f64 {
    3.0
}

fn default_width() -> usize {
    16
}

fn default_prompt() -> String {
    "> ".to_string()
}

/// Accept `timestamps = "unix"` as well as `timestamps = ["unix", "elapsed"]`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<TimestampStyle>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(TimestampStyle),
        Many(Vec<TimestampStyle>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(style) => vec![style],
        OneOrMany::Many(styles) => styles,
    })
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            baud_rate: default_baud_rate(),
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            eol: EndOfLine::default(),
            display: DisplayMode::default(),
            width: default_width(),
            timestamps: Vec::new(),
            prompt: default_prompt(),
        }
    }
}

impl SerTermConfig {
    pub fn find_device(&self, name: &str) -> Option<&DeviceProfile> {
        self.devices.iter().find(|device| device.name == name)
    }
}
