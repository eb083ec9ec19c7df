use async_trait::async_trait;
use std::io;

/// The person at the other end of the session: sees device output and
/// types commands.
#[async_trait]
pub trait Operator: Send {
    /// Show rendered device output.
    fn display(&mut self, text: &str) -> io::Result<()>;

    /// Show a status line that is not device output.
    fn notice(&mut self, message: &str) -> io::Result<()>;

    /// Show `prompt` and wait for one line. `None` means end of input.
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}
