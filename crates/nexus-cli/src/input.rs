//! Line input from stdin

use std::io::BufRead;
use tokio::sync::{Mutex, mpsc};

/// Reads stdin lines on a dedicated thread.
///
/// [`LineReader::read_line`] is cancel-safe: a line that arrives after the
/// caller stopped waiting stays queued for the next call.
pub struct LineReader {
    lines: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl LineReader {
    pub fn stdin() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self::from_receiver(rx)
    }

    pub fn from_receiver(lines: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            lines: Mutex::new(lines),
        }
    }

    /// Next line without its newline, or None at end of input
    pub async fn read_line(&self) -> Option<String> {
        self.lines.lock().await.recv().await
    }
}
