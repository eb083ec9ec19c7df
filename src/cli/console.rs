use crate::core::session::Operator;
use async_trait::async_trait;
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

/// Operator on the terminal: device output on stdout, notices on stderr,
/// commands from stdin.
pub struct ConsoleOperator<R = BufReader<Stdin>> {
    stdout: io::Stdout,
    input: R,
}

impl ConsoleOperator {
    pub fn new() -> Self {
        Self::with_input(BufReader::new(tokio::io::stdin()))
    }
}

impl Default for ConsoleOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> ConsoleOperator<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    /// Read commands from `input` instead of stdin.
    pub fn with_input(input: R) -> Self {
        Self {
            stdout: io::stdout(),
            input,
        }
    }
}

#[async_trait]
impl<R> Operator for ConsoleOperator<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn display(&mut self, text: &str) -> io::Result<()> {
        let mut out = self.stdout.lock();
        out.write_all(text.as_bytes())?;
        out.flush()
    }

    fn notice(&mut self, message: &str) -> io::Result<()> {
        writeln!(io::stderr(), "{}", message)
    }

    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        {
            let mut out = self.stdout.lock();
            out.write_all(prompt.as_bytes())?;
            out.flush()?;
        }

        // Terminals in a non-UTF-8 locale hand us Latin-1 and friends
        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(None);
        }

        let line = String::from_utf8_lossy(&buf);
        Ok(Some(line.trim_end_matches(|c| c == '\r' || c == '\n').to_string()))
    }
}
