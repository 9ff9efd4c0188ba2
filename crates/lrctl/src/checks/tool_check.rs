// Local tool availability, with an optional offer to install what is
// missing.

use super::check_extension::CheckResult;
use async_trait::async_trait;
use lrctl_common::constants::tools;
use lrctl_common::LaunchError;
use lrctl_sdk::{ProcessInvoker, TraceWriter, WhichUtil};
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;

/// Remediation offered when a required tool is missing.
#[async_trait]
pub trait InstallOffer: Send + Sync {
    /// Try to install `tool`. Returns whether an installation was attempted.
    async fn offer(&self, tool: &str) -> bool;
}

/// Never installs anything.
pub struct NoInstallOffer;

#[async_trait]
impl InstallOffer for NoInstallOffer {
    async fn offer(&self, _tool: &str) -> bool {
        false
    }
}

/// Asks on the terminal before running the tool's install command.
pub struct PromptInstallOffer {
    invoker: ProcessInvoker,
}

impl PromptInstallOffer {
    pub fn new(trace: Arc<dyn TraceWriter>) -> Self {
        Self {
            invoker: ProcessInvoker::new(trace),
        }
    }

    fn install_command(tool: &str) -> Option<&'static str> {
        (tool == tools::DOCKER).then_some(tools::DOCKER_INSTALL_COMMAND)
    }
}

#[async_trait]
impl InstallOffer for PromptInstallOffer {
    async fn offer(&self, tool: &str) -> bool {
        let Some(command) = Self::install_command(tool) else {
            return false;
        };
        if !std::io::stdin().is_terminal() {
            return false;
        }

        println!("{} is not installed. Install it now with `{}`? [y/N]", tool, command);
        let mut answer = String::new();
        let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
        if stdin.read_line(&mut answer).await.is_err() {
            return false;
        }
        if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            return false;
        }

        let arguments = vec!["-c".to_string(), command.to_string()];
        match self.invoker.execute_attached("sh", &arguments).await {
            Ok(code) => {
                if code != 0 {
                    println!("Installing {} exited with code {}", tool, code);
                }
                true
            }
            Err(e) => {
                println!("Installing {} failed: {:#}", tool, e);
                true
            }
        }
    }
}

pub struct ToolCheck;

impl ToolCheck {
    /// Check that `tool` is on PATH, consulting `offer` once when it is not.
    pub async fn run_check(tool: &str, offer: &dyn InstallOffer) -> CheckResult {
        Self::run_check_with(tool, offer, WhichUtil::is_available).await
    }

    pub async fn run_check_with<P>(tool: &str, offer: &dyn InstallOffer, probe: P) -> CheckResult
    where
        P: Fn(&str) -> bool,
    {
        let name = format!("Tool: {}", tool);
        let description = format!("Check that '{}' is installed and on PATH", tool);

        if probe(tool) {
            return CheckResult::pass(name, description);
        }

        if offer.offer(tool).await && probe(tool) {
            return CheckResult::pass(name, description).with_detail("installed during preflight");
        }

        let missing = LaunchError::ToolingMissing {
            tool: tool.to_string(),
        };
        let result = CheckResult::fail(name, description, missing.to_string());
        if tool == tools::DOCKER {
            result.with_doc_url(tools::DOCKER_DOC_URL)
        } else {
            result
        }
    }
}
