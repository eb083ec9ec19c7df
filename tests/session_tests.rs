use async_trait::async_trait;
use serterm::cli::ConsoleOperator;
use serterm::core::session::{Operator, Session, SessionOutcome, SessionStatus};
use serterm::domain::config::{DisplayMode, Endpoint, EndOfLine, InputFormat, SessionConfig, TimestampStyle};
use serterm::infrastructure::tcp::StreamDevice;
use serterm::SerTermError;
use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;

/// Everything the session showed to the operator
#[derive(Default)]
struct Transcript {
    displayed: String,
    notices: Vec<String>,
    prompts: Vec<String>,
}

/// Operator that types a fixed list of lines, then closes its input
struct ScriptedOperator {
    lines: VecDeque<String>,
    transcript: Arc<Mutex<Transcript>>,
}

impl ScriptedOperator {
    fn new(lines: &[&str]) -> (Self, Arc<Mutex<Transcript>>) {
        let transcript = Arc::new(Mutex::new(Transcript::default()));
        let operator = Self {
            lines: lines.iter().map(|line| line.to_string()).collect(),
            transcript: transcript.clone(),
        };
        (operator, transcript)
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    fn display(&mut self, text: &str) -> io::Result<()> {
        self.transcript.lock().unwrap().displayed.push_str(text);
        Ok(())
    }

    fn notice(&mut self, message: &str) -> io::Result<()> {
        self.transcript.lock().unwrap().notices.push(message.to_string());
        Ok(())
    }

    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.transcript.lock().unwrap().prompts.push(prompt.to_string());
        Ok(self.lines.pop_front())
    }
}

fn session_config(timeout_ms: u64) -> SessionConfig {
    let mut config = SessionConfig::new(Endpoint::Serial {
        path: "duplex".to_string(),
    });
    config.timeout = Duration::from_millis(timeout_ms);
    config
}

fn duplex_device() -> (Box<StreamDevice<DuplexStream>>, DuplexStream) {
    let (device_side, peer) = tokio::io::duplex(4096);
    (Box::new(StreamDevice::new("duplex", device_side)), peer)
}

/// Answer every received chunk containing `request` with `reply` until the
/// session hangs up.
fn spawn_responder(mut peer: DuplexStream, request: &'static [u8], reply: &'static [u8]) -> tokio::task::JoinHandle<Vec<u8>> {
    tokio::spawn(async move {
        let mut received = Vec::new();
        let mut buf = [0u8; 256];
        loop {
            let n = match peer.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            received.extend_from_slice(&buf[..n]);
            if buf[..n].windows(request.len()).any(|w| w == request) {
                if peer.write_all(reply).await.is_err() {
                    break;
                }
            }
        }
        received
    })
}

fn read_log(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[cfg(test)]
mod session_tests {
    use super::*;

    #[tokio::test]
    async fn test_one_shot_ping_pong() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("session.log");

        let (device, peer) = duplex_device();
        let responder = spawn_responder(peer, b"PING", b"PONG\n");

        let mut config = session_config(200);
        config.commands = vec!["PING".to_string()];
        config.log_file = Some(log_path.clone());

        let (operator, transcript) = ScriptedOperator::new(&[]);
        let mut session = Session::open(config, device, Box::new(operator)).unwrap();
        let (_shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let outcome = session.run(&mut shutdown_rx).await.unwrap();
        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(session.state().status(), SessionStatus::Closed);

        let transcript = transcript.lock().unwrap();
        assert_eq!(transcript.displayed, "PONG\n");
        assert!(transcript.prompts.is_empty());
        assert!(transcript.notices.is_empty());

        assert_eq!(responder.await.unwrap(), b"PING\n");
        assert_eq!(read_log(&log_path), "> PING\n< PONG\n");
    }

    #[tokio::test]
    async fn test_one_shot_commands_use_eol() {
        let (device, peer) = duplex_device();
        let responder = spawn_responder(peer, b"B", b"ok\r\n");

        let mut config = session_config(100);
        config.commands = vec!["A".to_string(), "B".to_string()];
        config.eol = EndOfLine::Crlf;

        let (operator, _transcript) = ScriptedOperator::new(&[]);
        let mut session = Session::open(config, device, Box::new(operator)).unwrap();
        let (_shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        session.run(&mut shutdown_rx).await.unwrap();
        assert_eq!(responder.await.unwrap(), b"A\r\nB\r\n");
        assert_eq!(session.state().statistics.commands_sent, 2);
        assert_eq!(session.state().statistics.bytes_sent, 6);
    }

    #[tokio::test]
    async fn test_interactive_command_then_end_of_input() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("interactive.log");

        let (device, peer) = duplex_device();
        let responder = spawn_responder(peer, b"CMD1", b"OK\n");

        let mut config = session_config(200);
        config.log_file = Some(log_path.clone());

        let (operator, transcript) = ScriptedOperator::new(&["CMD1"]);
        let mut session = Session::open(config, device, Box::new(operator)).unwrap();
        let (_shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let outcome = session.run(&mut shutdown_rx).await.unwrap();
        assert_eq!(outcome, SessionOutcome::EndOfInput);

        assert_eq!(responder.await.unwrap(), b"CMD1\n");
        assert_eq!(read_log(&log_path), "> CMD1\n< OK\n");

        let transcript = transcript.lock().unwrap();
        assert_eq!(transcript.prompts, vec!["> ", "> "]);
        assert_eq!(transcript.displayed, "OK\n");
        assert_eq!(transcript.notices, vec!["Bye."]);
    }

    #[tokio::test]
    async fn test_empty_line_sends_nothing() {
        let (device, peer) = duplex_device();
        let responder = spawn_responder(peer, b"never", b"");

        let (operator, transcript) = ScriptedOperator::new(&["", ""]);
        let mut session = Session::open(session_config(50), device, Box::new(operator)).unwrap();
        let (_shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let outcome = session.run(&mut shutdown_rx).await.unwrap();
        assert_eq!(outcome, SessionOutcome::EndOfInput);
        assert_eq!(transcript.lock().unwrap().prompts.len(), 3);
        assert!(responder.await.unwrap().is_empty());
        assert_eq!(session.state().statistics.commands_sent, 0);
    }

    #[tokio::test]
    async fn test_invalid_hex_input_is_reported() {
        let (device, peer) = duplex_device();
        let responder = spawn_responder(peer, b"\x01\x02", b"");

        let mut config = session_config(50);
        config.input_format = InputFormat::Hex;
        config.eol = EndOfLine::None;

        let (operator, transcript) = ScriptedOperator::new(&["zz", "01 02"]);
        let mut session = Session::open(config, device, Box::new(operator)).unwrap();
        let (_shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        session.run(&mut shutdown_rx).await.unwrap();
        assert_eq!(responder.await.unwrap(), vec![0x01, 0x02]);

        let transcript = transcript.lock().unwrap();
        assert_eq!(transcript.notices.len(), 2);
        assert!(transcript.notices[0].contains("Invalid hex data"));
    }

    #[tokio::test]
    async fn test_interrupt_mid_read_keeps_received_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("interrupted.log");

        let (device, mut peer) = duplex_device();

        // Long timeout so the interrupt lands inside a read
        let mut config = session_config(10_000);
        config.log_file = Some(log_path.clone());

        let (operator, transcript) = ScriptedOperator::new(&[]);
        let mut session = Session::open(config, device, Box::new(operator)).unwrap();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            peer.write_all(b"partial line").await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
            shutdown_tx.send(()).await.unwrap();
            // Keep the peer open until the session is gone
            tokio::time::sleep(Duration::from_secs(1)).await;
            drop(peer);
        });

        let outcome = session.run(&mut shutdown_rx).await.unwrap();
        assert_eq!(outcome, SessionOutcome::Interrupted);
        assert_eq!(session.state().status(), SessionStatus::Closed);

        assert_eq!(transcript.lock().unwrap().displayed, "partial line");
        let log = read_log(&log_path);
        assert_eq!(log, "< partial line\n");
        assert!(log.lines().count() == log.matches('\n').count());
    }

    #[tokio::test]
    async fn test_monitor_mode_reads_until_interrupted() {
        let (device, mut peer) = duplex_device();

        let mut config = session_config(50);
        config.monitor = true;
        config.display = DisplayMode::Hex;
        config.width = 2;

        let (operator, transcript) = ScriptedOperator::new(&["never typed"]);
        let mut session = Session::open(config, device, Box::new(operator)).unwrap();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            peer.write_all(b"a\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(150)).await;
            peer.write_all(b"b\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(150)).await;
            shutdown_tx.send(()).await.unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
            drop(peer);
        });

        let outcome = session.run(&mut shutdown_rx).await.unwrap();
        assert_eq!(outcome, SessionOutcome::Interrupted);

        let transcript = transcript.lock().unwrap();
        assert_eq!(transcript.displayed, "61 0a\n62 0a\n");
        assert!(transcript.prompts.is_empty());
        assert!(transcript.notices.is_empty());
    }

    #[tokio::test]
    async fn test_prompt_command_reply_in_prompt() {
        let (device, peer) = duplex_device();
        let responder = spawn_responder(peer, b"VER", b"v1.2\r\nready\n");

        let mut config = session_config(100);
        config.prompt_command = Some("VER".to_string());

        let (operator, transcript) = ScriptedOperator::new(&[]);
        let mut session = Session::open(config, device, Box::new(operator)).unwrap();
        let (_shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let outcome = session.run(&mut shutdown_rx).await.unwrap();
        assert_eq!(outcome, SessionOutcome::EndOfInput);
        assert_eq!(responder.await.unwrap(), b"VER\n");

        let transcript = transcript.lock().unwrap();
        assert_eq!(transcript.prompts, vec!["v1.2 > "]);
        assert_eq!(transcript.displayed, "ready\n");
    }

    #[tokio::test]
    async fn test_peer_hangup_is_device_lost() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("lost.log");

        let (device, peer) = duplex_device();
        drop(peer);

        let mut config = session_config(100);
        config.commands = vec!["PING".to_string()];
        config.log_file = Some(log_path.clone());

        let (operator, _transcript) = ScriptedOperator::new(&[]);
        let mut session = Session::open(config, device, Box::new(operator)).unwrap();
        let (_shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let err = session.run(&mut shutdown_rx).await.unwrap_err();
        assert!(matches!(err, SerTermError::DeviceLost { .. }));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(session.state().status(), SessionStatus::Closed);
        assert!(log_path.exists());
    }

    #[tokio::test]
    async fn test_quiet_still_logs() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("quiet.log");

        let (device, peer) = duplex_device();
        let _responder = spawn_responder(peer, b"PING", b"PONG\n");

        let mut config = session_config(100);
        config.commands = vec!["PING".to_string()];
        config.log_file = Some(log_path.clone());
        config.log_direction = false;
        config.quiet = true;

        let (operator, transcript) = ScriptedOperator::new(&[]);
        let mut session = Session::open(config, device, Box::new(operator)).unwrap();
        let (_shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        session.run(&mut shutdown_rx).await.unwrap();
        assert!(transcript.lock().unwrap().displayed.is_empty());
        assert_eq!(read_log(&log_path), "PING\nPONG\n");
    }

    #[tokio::test]
    async fn test_connect_to_missing_device_creates_no_log() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("never.log");
        let missing = dir.path().join("ttyMISSING");

        let mut config = SessionConfig::new(Endpoint::Serial {
            path: missing.display().to_string(),
        });
        config.log_file = Some(log_path.clone());

        let (operator, _transcript) = ScriptedOperator::new(&[]);
        let err = Session::connect(config, Box::new(operator)).await.err().unwrap();

        assert!(matches!(err, SerTermError::Open { .. }));
        assert!(err.to_string().contains("ttyMISSING"));
        assert!(!log_path.exists());
    }

    #[tokio::test]
    async fn test_non_utf8_operator_line_keeps_session_alive() {
        let (device, peer) = duplex_device();
        let responder = spawn_responder(peer, b"CMD1", b"OK\n");

        let operator = ConsoleOperator::with_input(&b"caf\xe9\nCMD1\n"[..]);
        let mut session = Session::open(session_config(50), device, Box::new(operator)).unwrap();
        let (_shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let outcome = session.run(&mut shutdown_rx).await.unwrap();
        assert_eq!(outcome, SessionOutcome::EndOfInput);
        assert_eq!(session.state().statistics.commands_sent, 2);
        assert_eq!(responder.await.unwrap(), "caf\u{FFFD}\nCMD1\n".as_bytes());
    }

    #[tokio::test]
    async fn test_monitor_with_commands_polls_every_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("poll.log");

        let (device, peer) = duplex_device();
        let responder = spawn_responder(peer, b"PING", b"PONG\n");

        let mut config = session_config(50);
        config.monitor = true;
        config.commands = vec!["PING".to_string()];
        config.log_file = Some(log_path.clone());

        let (operator, transcript) = ScriptedOperator::new(&[]);
        let mut session = Session::open(config, device, Box::new(operator)).unwrap();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(400)).await;
            shutdown_tx.send(()).await.unwrap();
        });

        let outcome = session.run(&mut shutdown_rx).await.unwrap();
        assert_eq!(outcome, SessionOutcome::Interrupted);

        let received = responder.await.unwrap();
        let polls = received.windows(5).filter(|w| *w == b"PING\n").count();
        assert!(polls >= 2, "only {} polls", polls);

        let transcript = transcript.lock().unwrap();
        assert!(transcript.displayed.matches("PONG\n").count() >= 2);
        assert!(transcript.prompts.is_empty());
        assert!(read_log(&log_path).starts_with("> PING\n< PONG\n> PING\n"));
    }

    #[tokio::test]
    async fn test_monitor_with_invalid_command_fails() {
        let (device, _peer) = duplex_device();

        let mut config = session_config(50);
        config.monitor = true;
        config.input_format = InputFormat::Hex;
        config.commands = vec!["zz".to_string()];

        let (operator, _transcript) = ScriptedOperator::new(&[]);
        let mut session = Session::open(config, device, Box::new(operator)).unwrap();
        let (_shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let err = session.run(&mut shutdown_rx).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_combined_timestamps_prefix_every_line() {
        let (device, peer) = duplex_device();
        let _responder = spawn_responder(peer, b"PING", b"a\nb\n");

        let mut config = session_config(100);
        config.commands = vec!["PING".to_string()];
        config.timestamps = vec![TimestampStyle::Elapsed, TimestampStyle::Unix];

        let (operator, transcript) = ScriptedOperator::new(&[]);
        let mut session = Session::open(config, device, Box::new(operator)).unwrap();
        let (_shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        session.run(&mut shutdown_rx).await.unwrap();

        let transcript = transcript.lock().unwrap();
        let lines: Vec<&str> = transcript.displayed.lines().collect();
        assert_eq!(lines.len(), 2);
        for (line, text) in lines.iter().zip(["a", "b"]) {
            let fields: Vec<&str> = line.split(' ').collect();
            assert_eq!(fields.len(), 3, "line {:?}", line);
            assert!(fields[0].parse::<i64>().unwrap() > 1_600_000_000);
            assert!(fields[1].parse::<f64>().unwrap() >= 0.0);
            assert_eq!(fields[2], text);
        }
    }

    #[tokio::test]
    async fn test_line_split_across_reads_is_stamped_once() {
        let (device, mut peer) = duplex_device();

        let mut config = session_config(100);
        config.monitor = true;
        config.timestamps = vec![TimestampStyle::Elapsed];

        let (operator, transcript) = ScriptedOperator::new(&[]);
        let mut session = Session::open(config, device, Box::new(operator)).unwrap();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            peer.write_all(b"par").await.unwrap();
            // Longer than the read timeout, so the line arrives in two cycles
            tokio::time::sleep(Duration::from_millis(300)).await;
            peer.write_all(b"tial\nnext\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
            shutdown_tx.send(()).await.unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
            drop(peer);
        });

        let outcome = session.run(&mut shutdown_rx).await.unwrap();
        assert_eq!(outcome, SessionOutcome::Interrupted);

        let transcript = transcript.lock().unwrap();
        let lines: Vec<&str> = transcript.displayed.lines().collect();
        assert_eq!(lines.len(), 2, "displayed {:?}", transcript.displayed);
        assert_eq!(lines[0].split(' ').nth(1), Some("partial"));
        assert_eq!(lines[1].split(' ').nth(1), Some("next"));
    }

    #[tokio::test]
    async fn test_interrupt_during_prompt_command_keeps_reply() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("prompt.log");

        let (device, mut peer) = duplex_device();

        let mut config = session_config(300);
        config.prompt_command = Some("VER".to_string());
        config.log_file = Some(log_path.clone());

        let (operator, transcript) = ScriptedOperator::new(&["never typed"]);
        let mut session = Session::open(config, device, Box::new(operator)).unwrap();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            let mut received = Vec::new();
            let mut buf = [0u8; 64];
            while !received.ends_with(b"VER\n") {
                let n = peer.read(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
            }
            // Half a reply, then the interrupt lands while the rest is awaited
            peer.write_all(b"v1.").await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            shutdown_tx.send(()).await.unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
            drop(peer);
        });

        let outcome = session.run(&mut shutdown_rx).await.unwrap();
        assert_eq!(outcome, SessionOutcome::Interrupted);
        assert_eq!(session.state().statistics.bytes_received, 3);

        let transcript = transcript.lock().unwrap();
        assert_eq!(transcript.displayed, "v1.");
        assert!(transcript.prompts.is_empty());
        assert_eq!(read_log(&log_path), "< v1.\n");
    }
}
