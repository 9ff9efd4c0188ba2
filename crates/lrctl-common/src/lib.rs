// lrctl-common: Shared services and infrastructure for the lrctl launcher.
// Depends on `lrctl-sdk`; consumed by the `lrctl` binary crate.

pub mod constants;
pub mod errors;
pub mod http_client_factory;
pub mod launcher_context;
pub mod secret_masker;
pub mod temp_files;
pub mod tracing;

// ---------------------------------------------------------------------------
// Re-exports for convenient access
// ---------------------------------------------------------------------------

pub use errors::LaunchError;
pub use http_client_factory::HttpClientFactory;
pub use launcher_context::LauncherContext;
pub use secret_masker::SecretMasker;
pub use temp_files::TempFileRegistry;
pub use self::tracing::{TraceEventType, TraceManager, TraceSetting, Tracing};
