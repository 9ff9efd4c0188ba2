// Per-component trace sources with secret masking, dispatched to the
// `tracing` crate.

use crate::secret_masker::SecretMasker;
use chrono::Utc;
use lrctl_sdk::TraceWriter;
use std::sync::Arc;

/// Trace event severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceEventType {
    Verbose,
    Information,
    Warning,
    Error,
}

impl std::fmt::Display for TraceEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceEventType::Verbose => write!(f, "VERB"),
            TraceEventType::Information => write!(f, "INFO"),
            TraceEventType::Warning => write!(f, "WARN"),
            TraceEventType::Error => write!(f, "ERR "),
        }
    }
}

/// Configuration for trace output.
#[derive(Debug, Clone)]
pub struct TraceSetting {
    /// Minimum severity level to emit.
    pub level: TraceEventType,
    /// Whether to also print to stdout.
    pub print_to_stdout: bool,
}

impl Default for TraceSetting {
    fn default() -> Self {
        Self {
            level: TraceEventType::Verbose,
            print_to_stdout: false,
        }
    }
}

/// A named trace source. Every component gets its own, all sharing one
/// `SecretMasker`.
#[derive(Clone)]
pub struct Tracing {
    name: String,
    secret_masker: Arc<SecretMasker>,
    setting: TraceSetting,
}

impl Tracing {
    pub fn new(name: impl Into<String>, secret_masker: Arc<SecretMasker>, setting: TraceSetting) -> Self {
        Self {
            name: name.into(),
            secret_masker,
            setting,
        }
    }

    fn trace(&self, event_type: TraceEventType, message: &str) {
        if event_type < self.setting.level {
            return;
        }

        let masked = self.secret_masker.mask_secrets(message);

        match event_type {
            TraceEventType::Error => tracing::error!(component = %self.name, "{}", masked),
            TraceEventType::Warning => tracing::warn!(component = %self.name, "{}", masked),
            TraceEventType::Information => tracing::info!(component = %self.name, "{}", masked),
            TraceEventType::Verbose => tracing::debug!(component = %self.name, "{}", masked),
        }

        if self.setting.print_to_stdout {
            let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
            println!("[{}][{}] {}: {}", timestamp, self.name, event_type, masked);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Log an error and its chain of causes.
    pub fn error_chain(&self, err: &anyhow::Error) {
        self.error(&format!("{}", err));
        for cause in err.chain().skip(1) {
            self.error(&format!("  caused by: {}", cause));
        }
    }
}

impl TraceWriter for Tracing {
    fn info(&self, message: &str) {
        self.trace(TraceEventType::Information, message);
    }

    fn verbose(&self, message: &str) {
        self.trace(TraceEventType::Verbose, message);
    }

    fn warning(&self, message: &str) {
        self.trace(TraceEventType::Warning, message);
    }

    fn error(&self, message: &str) {
        self.trace(TraceEventType::Error, message);
    }
}

/// Hands out named trace sources sharing one masker and setting.
pub struct TraceManager {
    secret_masker: Arc<SecretMasker>,
    default_setting: TraceSetting,
}

impl TraceManager {
    pub fn new(secret_masker: Arc<SecretMasker>, setting: TraceSetting) -> Self {
        Self {
            secret_masker,
            default_setting: setting,
        }
    }

    /// Get (create) a named trace source.
    pub fn get(&self, name: &str) -> Tracing {
        Tracing::new(name, self.secret_masker.clone(), self.default_setting.clone())
    }

    pub fn secret_masker(&self) -> &Arc<SecretMasker> {
        &self.secret_masker
    }
}
