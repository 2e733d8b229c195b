use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Log message sent for `clear`; renderers treat it as "erase the log view".
pub const CLEAR_SENTINEL: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Receiver of the console's two output channels.
///
/// Both callbacks fire on the thread that owns the [`Console`](crate::Console).
pub trait ConsoleSink {
    fn log_message(&mut self, text: &str, severity: Severity);

    /// A command ran; `result` is a short summary.
    fn command_executed(&mut self, _line: &str, _result: &str) {}
}

/// Forwards console output to the `log` facade under the `console` target.
#[derive(Debug, Default)]
pub struct LogSink;

impl ConsoleSink for LogSink {
    fn log_message(&mut self, text: &str, severity: Severity) {
        if text == CLEAR_SENTINEL {
            return;
        }
        match severity {
            Severity::Info => log::info!(target: "console", "{}", text),
            Severity::Warning => log::warn!(target: "console", "{}", text),
            Severity::Error => log::error!(target: "console", "{}", text),
        }
    }

    fn command_executed(&mut self, line: &str, result: &str) {
        log::debug!(target: "console", "{} -> {}", line, result);
    }
}

/// Everything a [`MemorySink`] has seen.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Transcript {
    pub messages: Vec<(String, Severity)>,
    pub executed: Vec<(String, String)>,
    /// Number of clear requests received.
    pub clears: usize,
}

impl Transcript {
    pub fn texts(&self) -> Vec<&str> {
        self.messages.iter().map(|(text, _)| text.as_str()).collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|(_, severity)| *severity == Severity::Error)
            .map(|(text, _)| text.as_str())
            .collect()
    }
}

/// In-memory sink, the console's stand-in for a log panel.
///
/// A clear request empties the recorded messages, as a panel would.
pub struct MemorySink {
    transcript: Rc<RefCell<Transcript>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            transcript: Rc::new(RefCell::new(Transcript::default())),
        }
    }

    /// Create a sink and return a handle to read what it records.
    pub fn with_handle() -> (Self, Rc<RefCell<Transcript>>) {
        let sink = MemorySink::new();
        let handle = sink.transcript.clone();
        (sink, handle)
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleSink for MemorySink {
    fn log_message(&mut self, text: &str, severity: Severity) {
        let mut transcript = self.transcript.borrow_mut();
        if text == CLEAR_SENTINEL {
            transcript.messages.clear();
            transcript.clears += 1;
        } else {
            transcript.messages.push((text.to_string(), severity));
        }
    }

    fn command_executed(&mut self, line: &str, result: &str) {
        self.transcript
            .borrow_mut()
            .executed
            .push((line.to_string(), result.to_string()));
    }
}
