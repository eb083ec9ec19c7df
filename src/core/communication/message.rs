use crate::domain::config::{EndOfLine, InputFormat};
use crate::domain::error::{SerTermError, SerTermResult};
use serde::{Deserialize, Serialize};

/// Which way data travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Data received from the device
    Inbound,
    /// Data sent to the device
    Outbound,
}

impl Direction {
    /// Marker used in log files
    pub fn marker(&self) -> &'static str {
        match self {
            Direction::Inbound => "< ",
            Direction::Outbound => "> ",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Inbound => write!(f, "inbound"),
            Direction::Outbound => write!(f, "outbound"),
        }
    }
}

impl InputFormat {
    /// Decode an operator line into bytes.
    pub fn decode(&self, line: &str) -> SerTermResult<Vec<u8>> {
        match self {
            InputFormat::Text => Ok(line.as_bytes().to_vec()),
            InputFormat::Hex => {
                let cleaned: String = line.split_whitespace().collect();
                hex::decode(&cleaned)
                    .map_err(|e| SerTermError::InvalidInput(format!("Invalid hex data: {}", e)))
            }
            InputFormat::Base64 => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD
                    .decode(line.trim())
                    .map_err(|e| SerTermError::InvalidInput(format!("Invalid base64 data: {}", e)))
            }
        }
    }
}

/// Bytes put on the wire for one command line.
pub fn encode_command(line: &str, format: InputFormat, eol: EndOfLine) -> SerTermResult<Vec<u8>> {
    let mut data = format.decode(line)?;
    data.extend_from_slice(eol.as_bytes());
    Ok(data)
}
