//! Cosmetic spinner for long-running stages.
//!
//! The operation runs on the calling thread while a ticker thread animates a
//! spinner on stderr. A single channel message tells the ticker to stop; the
//! ticker never touches generation state, so its outcome cannot affect the
//! operation's result.

use std::io::{IsTerminal, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const TICK: Duration = Duration::from_millis(100);

/// Runs `operation`, animating `message` on stderr while it runs.
///
/// The spinner is only drawn when `enabled` and stderr is a terminal.
pub fn with_progress<T, E, F>(message: &str, enabled: bool, operation: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    if !enabled || !std::io::stderr().is_terminal() {
        return operation();
    }

    let (done_tx, done_rx) = mpsc::channel::<()>();
    let label = message.to_string();
    let ticker = thread::spawn(move || {
        let mut stderr = std::io::stderr();
        for frame in FRAMES.iter().cycle() {
            let _ = write!(stderr, "\r{frame} {label}");
            let _ = stderr.flush();
            match done_rx.recv_timeout(TICK) {
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                _ => break,
            }
        }
        let _ = write!(stderr, "\r\x1b[2K");
        let _ = stderr.flush();
    });

    let result = operation();
    let _ = done_tx.send(());
    let _ = ticker.join();
    result
}
