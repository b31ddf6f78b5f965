// UI layer: the "Uploading..." animation and the timestamped messages the
// uploader prints. Both write to a shared terminal handle so the binary can
// point them at stdout and tests can point them at a buffer.

use crate::error::Diagnostic;
use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::{Print, Stylize};
use crossterm::terminal::{Clear, ClearType};
use std::io::{self, Write};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

/// Output stream shared between the indicator and the reporter.
pub type SharedTerminal = Arc<Mutex<dyn Write + Send>>;

/// Terminal handle for the process' standard output.
pub fn stdout_terminal() -> SharedTerminal {
    Arc::new(Mutex::new(io::stdout()))
}

const INDICATOR_TEXT: &str = "Uploading";
const DOTS_LIMIT: usize = 3;

/// Dot counter of the indicator: climbs to three dots, walks back to none,
/// and starts over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dots {
    count: usize,
    increasing: bool,
}

impl Default for Dots {
    fn default() -> Self {
        Dots { count: 0, increasing: true }
    }
}

impl Dots {
    /// Returns the number of dots for this frame and moves to the next one.
    pub fn advance(&mut self) -> usize {
        let current = self.count;
        if self.increasing {
            self.count += 1;
            if self.count == DOTS_LIMIT {
                self.increasing = false;
            }
        } else {
            self.count -= 1;
            if self.count == 0 {
                self.increasing = true;
            }
        }
        current
    }
}

/// Builds the bytes for a frame in a local buffer, then hands them to the
/// terminal in one write.
fn draw(terminal: &SharedTerminal, text: Option<&str>) -> io::Result<()> {
    let mut frame = Vec::new();
    queue!(frame, Clear(ClearType::CurrentLine), MoveToColumn(0))?;
    if let Some(text) = text {
        queue!(frame, Print(text))?;
    }
    let mut out = terminal.lock().unwrap_or_else(PoisonError::into_inner);
    out.write_all(&frame)?;
    out.flush()
}

/// A running progress indicator. Dropping it without calling `stop` leaves
/// the ticking thread to exit on its own at its next frame.
pub struct Indicator {
    stop: Sender<()>,
    worker: JoinHandle<()>,
    terminal: SharedTerminal,
}

impl Indicator {
    /// Starts drawing a new frame every `interval`. The first frame is drawn
    /// after one full interval.
    pub fn start(terminal: SharedTerminal, interval: Duration) -> Self {
        let (stop, ticks) = mpsc::channel::<()>();
        let frames = Arc::clone(&terminal);
        let worker = thread::spawn(move || {
            let mut dots = Dots::default();
            // Any message or a dropped sender ends the animation.
            while let Err(RecvTimeoutError::Timeout) = ticks.recv_timeout(interval) {
                let text = format!("{INDICATOR_TEXT}{}", ".".repeat(dots.advance()));
                if let Err(e) = draw(&frames, Some(&text)) {
                    warn!(error = %e, "Failed to draw progress indicator");
                }
            }
        });
        Indicator { stop, worker, terminal }
    }

    /// Cancels the animation and clears its line. No frame is drawn after
    /// this returns.
    pub fn stop(self) {
        // The worker may already be gone if the receiver was dropped.
        let _ = self.stop.send(());
        if self.worker.join().is_err() {
            error!("Progress indicator thread panicked");
        }
        if let Err(e) = draw(&self.terminal, None) {
            warn!(error = %e, "Failed to clear progress indicator");
        }
    }
}

/// Receives the messages the uploader wants the user to see.
pub trait Reporter: Send + Sync {
    fn failure(&self, diagnostic: &Diagnostic);
    fn success(&self, url: &str);
}

/// Prints `[timestamp] message` lines, red for failures and green for
/// success, and mirrors them as tracing events.
pub struct TerminalReporter {
    terminal: SharedTerminal,
}

impl TerminalReporter {
    pub fn new(terminal: SharedTerminal) -> Self {
        TerminalReporter { terminal }
    }

    fn line(&self, message: String) {
        let stamp = format!("[{}]", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
        let mut out = self.terminal.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{} {}", stamp.dark_grey(), message).and_then(|()| out.flush()) {
            warn!(error = %e, "Failed to write to terminal");
        }
    }
}

impl Reporter for TerminalReporter {
    fn failure(&self, diagnostic: &Diagnostic) {
        error!(%diagnostic, "Upload problem");
        self.line(diagnostic.to_string().red().to_string());
    }

    fn success(&self, url: &str) {
        info!(%url, "Documentation uploaded");
        self.line(format!("The documentation was successfully uploaded: {url}").green().to_string());
    }
}
