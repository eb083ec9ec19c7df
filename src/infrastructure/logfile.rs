// Log file - append-only transcript of a session
use crate::core::communication::Direction;
use crate::core::format::prefix_lines;
use crate::domain::error::{SerTermError, SerTermResult};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Append-only transcript. Every record is newline-terminated and flushed
/// before `record` returns.
#[derive(Debug)]
pub struct LogSink {
    path: PathBuf,
    file: File,
    mark_direction: bool,
}

impl LogSink {
    pub fn open(path: &Path, mark_direction: bool) -> SerTermResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| SerTermError::LogFile {
                path: path.to_path_buf(),
                source,
            })?;

        info!("Logging session to {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            file,
            mark_direction,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&mut self, direction: Direction, text: &str) -> std::io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        let mut entry = if self.mark_direction {
            prefix_lines(text, direction.marker())
        } else {
            text.to_string()
        };
        if !entry.ends_with('\n') {
            entry.push('\n');
        }

        self.file.write_all(entry.as_bytes())?;
        self.file.flush()
    }

    /// Flush to stable storage and release the file.
    pub fn close(mut self) -> std::io::Result<()> {
        self.file.flush()?;
        self.file.sync_all()
    }
}
