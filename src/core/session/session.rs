use crate::core::communication::{encode_command, open_device, Device, Direction};
use crate::core::format::{prefix_lines, stamp_prefix, ByteFormatter};
use crate::core::session::operator::Operator;
use crate::core::session::state::{SessionState, SessionStatus};
use crate::domain::config::{InputFormat, SessionConfig, SessionMode};
use crate::domain::error::SerTermResult;
use crate::infrastructure::logfile::LogSink;
use std::fmt::Write;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Upper bound of device output collected in one read cycle
const MAX_PENDING: usize = 64 * 1024;

/// How a session that did not fail came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// One-shot commands were sent and answered
    Completed,
    /// The operator closed standard input
    EndOfInput,
    /// An interrupt arrived
    Interrupted,
}

impl std::fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionOutcome::Completed => write!(f, "completed"),
            SessionOutcome::EndOfInput => write!(f, "end of input"),
            SessionOutcome::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// One exchange with one device
pub struct Session {
    config: SessionConfig,
    device: Box<dyn Device>,
    operator: Box<dyn Operator>,
    log: Option<LogSink>,
    formatter: ByteFormatter,
    state: SessionState,
    /// Read from the device, not yet shown or logged
    pending: Vec<u8>,
    /// The last emitted output ended a line
    at_line_start: bool,
    started: Instant,
}

impl Session {
    /// Open the configured endpoint, then the log file.
    pub async fn connect(config: SessionConfig, operator: Box<dyn Operator>) -> SerTermResult<Self> {
        info!("Connecting to {}", config.endpoint);
        let device = open_device(&config).await?;
        Self::open(config, device, operator)
    }

    /// Start a session on an already open device.
    pub fn open(
        config: SessionConfig,
        device: Box<dyn Device>,
        operator: Box<dyn Operator>,
    ) -> SerTermResult<Self> {
        let log = match &config.log_file {
            Some(path) => Some(LogSink::open(path, config.log_direction)?),
            None => None,
        };

        let mut state = SessionState::new();
        state.transition(SessionStatus::Open)?;

        Ok(Self {
            formatter: ByteFormatter::new(config.display, config.width),
            config,
            device,
            operator,
            log,
            state,
            pending: Vec::new(),
            at_line_start: true,
            started: Instant::now(),
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Run until the session completes, the operator leaves, or `shutdown`
    /// receives a message. The log and device are closed in every case.
    pub async fn run(&mut self, shutdown: &mut mpsc::Receiver<()>) -> SerTermResult<SessionOutcome> {
        let mode = self.config.mode();
        info!("Session on {} running in {:?} mode", self.device.address(), mode);

        let result = tokio::select! {
            Some(()) = shutdown.recv() => {
                info!("Interrupt received");
                Ok(SessionOutcome::Interrupted)
            }
            result = self.drive(mode) => result,
        };

        self.close().await;

        match &result {
            Ok(outcome) => {
                info!("Session ended: {}", outcome);
                if mode == SessionMode::Interactive {
                    if let Err(e) = self.operator.notice("Bye.") {
                        debug!("Failed to say goodbye: {}", e);
                    }
                }
            }
            Err(e) => error!("Session failed: {}", e),
        }

        result
    }

    async fn drive(&mut self, mode: SessionMode) -> SerTermResult<SessionOutcome> {
        match mode {
            SessionMode::OneShot => self.run_one_shot().await,
            SessionMode::Monitor => self.run_monitor().await,
            SessionMode::Interactive => self.run_interactive().await,
        }
    }

    async fn run_one_shot(&mut self) -> SerTermResult<SessionOutcome> {
        let commands = self.config.commands.clone();
        for command in &commands {
            self.send_line(command).await?;
        }

        self.state.transition(SessionStatus::ReadLoop)?;
        self.drain().await?;
        self.emit_pending();
        Ok(SessionOutcome::Completed)
    }

    /// Read forever. Configured commands are sent again before every read
    /// cycle, which polls devices that only talk when asked.
    async fn run_monitor(&mut self) -> SerTermResult<SessionOutcome> {
        let commands = self.config.commands.clone();
        loop {
            for command in &commands {
                self.send_line(command).await?;
            }

            self.state.transition(SessionStatus::ReadLoop)?;
            self.drain().await?;
            self.emit_pending();
        }
    }

    async fn run_interactive(&mut self) -> SerTermResult<SessionOutcome> {
        loop {
            self.state.transition(SessionStatus::ReadLoop)?;
            self.drain().await?;
            self.emit_pending();

            self.state.transition(SessionStatus::PromptLoop)?;
            let prompt = self.render_prompt().await?;
            self.emit_pending();

            match self.operator.read_line(&prompt).await {
                Ok(Some(line)) => {
                    let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
                    // An empty line only fetches pending output
                    if !line.is_empty() {
                        self.send_line(line).await?;
                    }
                }
                Ok(None) => return Ok(SessionOutcome::EndOfInput),
                Err(e) => {
                    warn!("Failed to read operator input: {}", e);
                    return Ok(SessionOutcome::EndOfInput);
                }
            }
        }
    }

    /// Collect device output until a read times out empty.
    async fn drain(&mut self) -> SerTermResult<()> {
        while self.pending.len() < MAX_PENDING {
            let chunk = self.device.read_chunk(self.config.timeout).await?;
            if chunk.is_empty() {
                break;
            }
            self.state.record_received(chunk.len());
            self.pending.extend_from_slice(&chunk);
        }
        Ok(())
    }

    /// Format, print and log everything collected so far.
    fn emit_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let data = std::mem::take(&mut self.pending);
        let mut text = self.formatter.format(&data);
        if let Some(stamp) = stamp_prefix(&self.config.timestamps, self.started) {
            text = if self.at_line_start {
                prefix_lines(&text, &stamp)
            } else {
                // The first line continues one that is already stamped
                match text.find('\n') {
                    Some(end) => {
                        let (head, tail) = text.split_at(end + 1);
                        format!("{}{}", head, prefix_lines(tail, &stamp))
                    }
                    None => text,
                }
            };
        }
        self.at_line_start = text.ends_with('\n');

        if !self.config.quiet {
            if let Err(e) = self.operator.display(&text) {
                warn!("Failed to print device output: {}", e);
            }
        }
        self.log(Direction::Inbound, &text);
    }

    async fn send_line(&mut self, line: &str) -> SerTermResult<()> {
        let data = match encode_command(line, self.config.input_format, self.config.eol) {
            Ok(data) => data,
            Err(e) if self.config.mode() != SessionMode::Interactive => return Err(e),
            Err(e) => {
                if let Err(notice_error) = self.operator.notice(&e.to_string()) {
                    debug!("Failed to report input error: {}", notice_error);
                }
                return Ok(());
            }
        };

        match self.device.write_all(&data).await {
            Ok(()) => self.state.record_sent(data.len()),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.state.record_write_failure();
                warn!("Write to {} failed: {}", self.device.address(), e);
            }
        }

        self.log(Direction::Outbound, line);
        Ok(())
    }

    fn log(&mut self, direction: Direction, text: &str) {
        if let Some(log) = self.log.as_mut() {
            if let Err(e) = log.record(direction, text) {
                warn!("Failed to write {} data to {}: {}", direction, log.path().display(), e);
            }
        }
    }

    async fn render_prompt(&mut self) -> SerTermResult<String> {
        let prompt = render_prompt_template(&self.config.prompt);
        match self.config.prompt_command.clone() {
            Some(command) => {
                let reply = self.query(&command).await?;
                Ok(format!("{} {}", reply, prompt))
            }
            None => Ok(prompt),
        }
    }

    /// Send `command` and return the first line of the reply. Anything after
    /// that line stays pending as regular device output, and so does the
    /// whole reply when the read is interrupted.
    async fn query(&mut self, command: &str) -> SerTermResult<String> {
        let data = encode_command(command, InputFormat::Text, self.config.eol)?;
        match self.device.write_all(&data).await {
            Ok(()) => self.state.record_sent(data.len()),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.state.record_write_failure();
                warn!("Prompt command to {} failed: {}", self.device.address(), e);
                return Ok(String::new());
            }
        }

        let start = self.pending.len();
        loop {
            let chunk = self.device.read_chunk(self.config.timeout).await?;
            if chunk.is_empty() {
                break;
            }
            self.state.record_received(chunk.len());
            self.pending.extend_from_slice(&chunk);
            if chunk.contains(&b'\n') {
                break;
            }
        }

        let end = self.pending[start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.pending.len(), |newline| start + newline + 1);
        let first_line: Vec<u8> = self.pending.drain(start..end).collect();
        Ok(String::from_utf8_lossy(&first_line)
            .trim_end_matches(|c| c == '\r' || c == '\n')
            .to_string())
    }

    /// Flush pending output, close the log, then the device. Runs once.
    async fn close(&mut self) {
        if matches!(self.state.status(), SessionStatus::Closing | SessionStatus::Closed) {
            return;
        }
        if let Err(e) = self.state.transition(SessionStatus::Closing) {
            debug!("{}", e);
        }

        self.emit_pending();

        if let Some(log) = self.log.take() {
            let path = log.path().to_path_buf();
            if let Err(e) = log.close() {
                warn!("Failed to close log file {}: {}", path.display(), e);
            }
        }

        if let Err(e) = self.device.close().await {
            warn!("Failed to close {}: {}", self.device.address(), e);
        }

        if let Err(e) = self.state.transition(SessionStatus::Closed) {
            debug!("{}", e);
        }

        let stats = &self.state.statistics;
        info!(
            "Closed {} after {:?}: {} bytes sent in {} commands, {} bytes received",
            self.device.address(),
            self.state.get_uptime(),
            stats.bytes_sent,
            stats.commands_sent,
            stats.bytes_received
        );
    }
}

/// Render a prompt template. Templates containing `%` are strftime patterns
/// over the local time; invalid patterns are shown literally.
pub fn render_prompt_template(template: &str) -> String {
    if !template.contains('%') {
        return template.to_string();
    }

    let mut rendered = String::new();
    match write!(rendered, "{}", chrono::Local::now().format(template)) {
        Ok(()) => rendered,
        Err(_) => template.to_string(),
    }
}
