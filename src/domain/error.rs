use std::path::PathBuf;
use thiserror::Error;

/// SerTerm unified error type
#[derive(Error, Debug)]
pub enum SerTermError {
    #[error("could not open {address}: {reason}")]
    Open { address: String, reason: String },

    #[error("lost connection to {address}: {reason}")]
    DeviceLost { address: String, reason: String },

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output error: {0}")]
    Output(String),
}

impl SerTermError {
    /// Whether the error ends the session. Everything else is tolerated
    /// as "nothing happened this cycle".
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SerTermError::Io(_) | SerTermError::Output(_))
    }

    /// Process exit code for an error that reached `main`.
    pub fn exit_code(&self) -> i32 {
        match self {
            SerTermError::Config { .. } | SerTermError::InvalidInput(_) => 2,
            _ => 1,
        }
    }
}

pub type SerTermResult<T> = Result<T, SerTermError>;
