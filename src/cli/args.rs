use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command line arguments for SerTerm
#[derive(Parser, Debug)]
#[command(
    name = "serterm",
    version = env!("CARGO_PKG_VERSION"),
    about = "Line-oriented terminal for serial and TCP devices",
    long_about = "Send commands to a serial or TCP device, print and log its responses. \
                  Runs one-shot when commands are given, interactively otherwise."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for listings
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a session with a device
    Connect(ConnectArgs),
    /// List available serial ports
    Ports,
    /// Configuration management commands
    Config(ConfigArgs),
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

/// Session arguments. Unset options fall back to the device profile, then
/// the configuration defaults.
#[derive(ClapArgs, Debug, Default)]
pub struct ConnectArgs {
    /// Serial device path, tcp://host:port, socket://host:port or profile name
    pub device: String,

    /// Commands to send; the session exits after the response
    pub commands: Vec<String>,

    /// Baud rate
    #[arg(short, long)]
    pub baudrate: Option<u32>,

    /// Data bits (5-8)
    #[arg(long)]
    pub data_bits: Option<u8>,

    /// Stop bits (1 or 2)
    #[arg(long)]
    pub stop_bits: Option<u8>,

    /// Parity
    #[arg(long, value_enum)]
    pub parity: Option<ParityArg>,

    /// Flow control
    #[arg(long, value_enum)]
    pub flow_control: Option<FlowControlArg>,

    /// Read timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// TCP connect timeout in seconds
    #[arg(long)]
    pub connect_timeout: Option<f64>,

    /// Line ending appended to every command
    #[arg(short, long, value_enum)]
    pub eol: Option<EolArg>,

    /// How received bytes are shown
    #[arg(short, long, value_enum)]
    pub display: Option<DisplayArg>,

    /// Byte groups per line in hex, binary and decimal display
    #[arg(short, long)]
    pub width: Option<usize>,

    /// Prefix for every received line; repeat to combine
    #[arg(long, value_enum)]
    pub timestamp: Vec<TimestampArg>,

    /// Append the session to this file
    #[arg(short, long)]
    pub logfile: Option<PathBuf>,

    /// Don't mark log lines with '< ' and '> '
    #[arg(long)]
    pub plain_log: bool,

    /// Don't print device output
    #[arg(short, long)]
    pub quiet: bool,

    /// How typed lines are turned into bytes
    #[arg(short, long, value_enum, default_value = "text")]
    pub input_format: DataFormat,

    /// Prompt, strftime patterns allowed
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Command whose reply is shown in front of every prompt
    #[arg(long)]
    pub prompt_cmd: Option<String>,

    /// Only read and print, never prompt; commands are re-sent every read cycle
    #[arg(short, long)]
    pub monitor: bool,
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Validate configuration
    Validate {
        /// Configuration file path
        file: Option<PathBuf>,
    },
    /// Create default configuration
    Init {
        /// Directory that receives .serterm/config.toml
        #[arg(long)]
        output: Option<PathBuf>,
        /// Global configuration
        #[arg(short, long)]
        global: bool,
    },
}

/// Parity configuration argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ParityArg {
    None,
    Even,
    Odd,
}

/// Flow control configuration argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum FlowControlArg {
    None,
    Software,
    Hardware,
}

/// Line ending argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum EolArg {
    Lf,
    Cr,
    Crlf,
    Lfcr,
    None,
}

/// Display mode argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DisplayArg {
    Raw,
    Hex,
    Binary,
    Decimal,
}

/// Timestamp argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum TimestampArg {
    None,
    Unix,
    Date,
    Elapsed,
}

/// Data format argument
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum DataFormat {
    #[default]
    Text,
    Hex,
    Base64,
}

impl From<ParityArg> for crate::domain::config::ParityConfig {
    fn from(parity: ParityArg) -> Self {
        match parity {
            ParityArg::None => Self::None,
            ParityArg::Even => Self::Even,
            ParityArg::Odd => Self::Odd,
        }
    }
}

impl From<FlowControlArg> for crate::domain::config::FlowControlConfig {
    fn from(flow_control: FlowControlArg) -> Self {
        match flow_control {
            FlowControlArg::None => Self::None,
            FlowControlArg::Software => Self::Software,
            FlowControlArg::Hardware => Self::Hardware,
        }
    }
}

impl From<EolArg> for crate::domain::config::EndOfLine {
    fn from(eol: EolArg) -> Self {
        match eol {
            EolArg::Lf => Self::Lf,
            EolArg::Cr => Self::Cr,
            EolArg::Crlf => Self::Crlf,
            EolArg::Lfcr => Self::Lfcr,
            EolArg::None => Self::None,
        }
    }
}

impl From<DisplayArg> for crate::domain::config::DisplayMode {
    fn from(display: DisplayArg) -> Self {
        match display {
            DisplayArg::Raw => Self::Raw,
            DisplayArg::Hex => Self::Hex,
            DisplayArg::Binary => Self::Binary,
            DisplayArg::Decimal => Self::Decimal,
        }
    }
}

impl From<TimestampArg> for crate::domain::config::TimestampStyle {
    fn from(timestamp: TimestampArg) -> Self {
        match timestamp {
            TimestampArg::None => Self::None,
            TimestampArg::Unix => Self::Unix,
            TimestampArg::Date => Self::Date,
            TimestampArg::Elapsed => Self::Elapsed,
        }
    }
}

impl From<DataFormat> for crate::domain::config::InputFormat {
    fn from(format: DataFormat) -> Self {
        match format {
            DataFormat::Text => Self::Text,
            DataFormat::Hex => Self::Hex,
            DataFormat::Base64 => Self::Base64,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}
