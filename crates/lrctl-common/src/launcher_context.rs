// LauncherContext: the per-invocation application context shared by every
// component. Owns trace creation, proxy settings and the temp-file registry.

use crate::constants::{self, variables};
use crate::http_client_factory::HttpClientFactory;
use crate::secret_masker::SecretMasker;
use crate::temp_files::TempFileRegistry;
use crate::tracing::{TraceManager, TraceSetting, Tracing};

use lrctl_sdk::{LauncherWebProxy, StringUtil};
use std::sync::Arc;
use std::time::Duration;

/// The central application context.
///
/// Built once in `main` and passed down as `Arc<LauncherContext>`; nothing
/// in the launcher reads process-wide mutable state besides this.
pub struct LauncherContext {
    /// Proxy configuration read from environment variables.
    pub web_proxy: LauncherWebProxy,

    /// Temporary files to remove on termination.
    temp_files: TempFileRegistry,

    trace_manager: TraceManager,
}

impl LauncherContext {
    /// Create a context from the process environment.
    pub fn new() -> Arc<Self> {
        let print_to_stdout = std::env::var(variables::PRINT_LOG_TO_STDOUT)
            .ok()
            .and_then(|v| StringUtil::convert_to_bool(&v))
            .unwrap_or(false);

        Self::with_parts(
            LauncherWebProxy::new(),
            TraceSetting {
                print_to_stdout,
                ..TraceSetting::default()
            },
        )
    }

    /// Create a context from explicit parts (used by tests).
    pub fn with_parts(web_proxy: LauncherWebProxy, trace_setting: TraceSetting) -> Arc<Self> {
        let secret_masker = Arc::new(SecretMasker::new());

        // Proxy passwords never reach the logs
        for password in [&web_proxy.http_proxy_password, &web_proxy.https_proxy_password]
            .into_iter()
            .flatten()
        {
            secret_masker.add_value(password);
        }

        Arc::new(Self {
            web_proxy,
            temp_files: TempFileRegistry::new(),
            trace_manager: TraceManager::new(secret_masker, trace_setting),
        })
    }

    /// Get a trace source for the given component name.
    pub fn get_trace(&self, name: &str) -> Tracing {
        self.trace_manager.get(name)
    }

    pub fn temp_files(&self) -> &TempFileRegistry {
        &self.temp_files
    }

    /// HTTP client for downloads.
    pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
        HttpClientFactory::create_client(&self.web_proxy, constants::HTTP_TIMEOUT)
    }

    /// HTTP client with a custom timeout (reachability probes).
    pub fn http_client_with_timeout(&self, timeout: Duration) -> anyhow::Result<reqwest::Client> {
        HttpClientFactory::create_client(&self.web_proxy, timeout)
    }
}
