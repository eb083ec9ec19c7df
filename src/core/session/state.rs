use crate::domain::error::{SerTermError, SerTermResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Session lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionStatus {
    /// Endpoint is being opened
    Connecting,
    /// Endpoint is open, nothing exchanged yet
    Open,
    /// Collecting and emitting device output
    ReadLoop,
    /// Waiting for the operator
    PromptLoop,
    /// Flushing the log and releasing the device
    Closing,
    /// Session is over
    Closed,
}

impl SessionStatus {
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;

        match (self, next) {
            (Closed, _) => false,
            (_, Closing) => *self != Closing,
            (Connecting, Open) | (Connecting, Closed) => true,
            (Open, ReadLoop) | (Open, PromptLoop) => true,
            (ReadLoop, ReadLoop) | (ReadLoop, PromptLoop) => true,
            (PromptLoop, ReadLoop) => true,
            (Closing, Closed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Connecting => write!(f, "Connecting"),
            SessionStatus::Open => write!(f, "Open"),
            SessionStatus::ReadLoop => write!(f, "ReadLoop"),
            SessionStatus::PromptLoop => write!(f, "PromptLoop"),
            SessionStatus::Closing => write!(f, "Closing"),
            SessionStatus::Closed => write!(f, "Closed"),
        }
    }
}

/// Session statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStatistics {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub commands_sent: u64,
    pub chunks_received: u64,
    /// Writes that failed without ending the session
    pub write_failures: u64,
}

/// Session state information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    status: SessionStatus,
    created_at: SystemTime,
    pub statistics: SessionStatistics,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Connecting,
            created_at: SystemTime::now(),
            statistics: SessionStatistics::default(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Move to `next`, refusing transitions the lifecycle does not allow.
    pub fn transition(&mut self, next: SessionStatus) -> SerTermResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(SerTermError::Session {
                message: format!("invalid transition {} -> {}", self.status, next),
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn record_sent(&mut self, bytes: usize) {
        self.statistics.commands_sent += 1;
        self.statistics.bytes_sent += bytes as u64;
    }

    pub fn record_received(&mut self, bytes: usize) {
        self.statistics.chunks_received += 1;
        self.statistics.bytes_received += bytes as u64;
    }

    pub fn record_write_failure(&mut self) {
        self.statistics.write_failures += 1;
    }

    pub fn get_uptime(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.created_at)
            .unwrap_or_default()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
