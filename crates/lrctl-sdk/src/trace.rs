/// Diagnostic output abstraction shared by every launcher component.
///
/// Components never talk to the `tracing` macros directly; they hold a
/// `TraceWriter` so tests can swap in a collecting or silent writer.
pub trait TraceWriter: Send + Sync {
    /// Log an informational message.
    fn info(&self, message: &str);

    /// Log a verbose / debug message.
    fn verbose(&self, message: &str);

    /// Log a warning message.
    fn warning(&self, message: &str) {
        self.info(&format!("warning: {message}"));
    }

    /// Log an error message.
    fn error(&self, message: &str) {
        self.info(&format!("error: {message}"));
    }
}

/// A trace writer that forwards to the `tracing` crate at matching levels.
#[derive(Debug, Clone)]
pub struct TracingTraceWriter {
    target: &'static str,
}

impl TracingTraceWriter {
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }
}

impl Default for TracingTraceWriter {
    fn default() -> Self {
        Self::new("lrctl")
    }
}

impl TraceWriter for TracingTraceWriter {
    fn info(&self, message: &str) {
        tracing::info!(component = self.target, "{}", message);
    }

    fn verbose(&self, message: &str) {
        tracing::debug!(component = self.target, "{}", message);
    }

    fn warning(&self, message: &str) {
        tracing::warn!(component = self.target, "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(component = self.target, "{}", message);
    }
}

/// A no-op trace writer that discards all messages.
#[derive(Debug, Clone)]
pub struct NullTraceWriter;

impl TraceWriter for NullTraceWriter {
    fn info(&self, _message: &str) {}
    fn verbose(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// The level of a collected trace message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceLevel {
    Info,
    Verbose,
    Warning,
    Error,
}

/// A trace writer that keeps every message in memory, for assertions.
#[derive(Debug, Default)]
pub struct CollectingTraceWriter {
    messages: parking_lot::Mutex<Vec<(TraceLevel, String)>>,
}

impl CollectingTraceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return all collected messages.
    pub fn messages(&self) -> Vec<(TraceLevel, String)> {
        self.messages.lock().clone()
    }

    /// Whether any message at `level` contains `needle`.
    pub fn contains(&self, level: TraceLevel, needle: &str) -> bool {
        self.messages
            .lock()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    fn push(&self, level: TraceLevel, message: &str) {
        self.messages.lock().push((level, message.to_string()));
    }
}

impl TraceWriter for CollectingTraceWriter {
    fn info(&self, message: &str) {
        self.push(TraceLevel::Info, message);
    }

    fn verbose(&self, message: &str) {
        self.push(TraceLevel::Verbose, message);
    }

    fn warning(&self, message: &str) {
        self.push(TraceLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.push(TraceLevel::Error, message);
    }
}
