// Preflight checks: endpoint reachability, proxy report and local tooling.
// Every check runs; failures are counted, never short-circuited.

pub mod check_extension;
pub mod endpoint_check;
pub mod proxy_check;
pub mod tool_check;

use crate::remote_fetcher::Fetcher;
use check_extension::CheckResult;
use endpoint_check::EndpointCheck;
use lrctl_common::constants::{endpoints, tools};
use lrctl_sdk::{LauncherWebProxy, TraceWriter};
use proxy_check::ProxyCheck;
use tool_check::{InstallOffer, ToolCheck};

pub use check_extension::{failure_count, CheckStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightConfig {
    pub platform_url: String,
    pub versions_url: String,
    pub launcher_url: String,
    /// A local manifest makes the published one irrelevant.
    pub local_manifest: bool,
    /// No launcher will be fetched, so its source is not probed.
    pub skip_update: bool,
    pub required_tools: Vec<String>,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            platform_url: endpoints::PLATFORM_URL.to_string(),
            versions_url: endpoints::VERSIONS_URL.to_string(),
            launcher_url: endpoints::LAUNCHER_URL.to_string(),
            local_manifest: false,
            skip_update: false,
            required_tools: vec![tools::DOCKER.to_string()],
        }
    }
}

/// Run the full battery and return every result.
pub async fn run_all_checks(
    config: &PreflightConfig,
    fetcher: &dyn Fetcher,
    web_proxy: &LauncherWebProxy,
    offer: &dyn InstallOffer,
    trace: &dyn TraceWriter,
) -> Vec<CheckResult> {
    let mut results = Vec::new();

    trace.info(&format!("Checking container platform at {}", config.platform_url));
    results.push(
        EndpointCheck::new(
            "Container Platform",
            "Check the image registry is reachable",
            &config.platform_url,
        )
        .run_check(fetcher)
        .await,
    );

    let manifest = EndpointCheck::new(
        "Version Manifest",
        "Check the published version manifest is reachable",
        &config.versions_url,
    );
    if config.local_manifest {
        results.push(CheckResult::skipped(
            manifest.name,
            manifest.description,
            "a local version manifest was supplied",
        ));
    } else {
        trace.info(&format!("Checking version manifest at {}", config.versions_url));
        results.push(manifest.run_check(fetcher).await);
    }

    let launcher = EndpointCheck::new(
        "Launcher Source",
        "Check the published launcher is reachable",
        &config.launcher_url,
    );
    if config.skip_update {
        results.push(CheckResult::skipped(
            launcher.name,
            launcher.description,
            "self-update is disabled for this run",
        ));
    } else {
        trace.info(&format!("Checking launcher source at {}", config.launcher_url));
        results.push(launcher.run_check(fetcher).await);
    }

    results.push(ProxyCheck::run_check(web_proxy));

    for tool in &config.required_tools {
        trace.info(&format!("Checking for {}", tool));
        results.push(ToolCheck::run_check(tool, offer).await);
    }

    results
}

/// Format check results for display.
pub fn format_check_results(results: &[CheckResult]) -> String {
    let mut output = String::new();
    output.push_str("\n----------------------------------------------\n");
    output.push_str("  lrctl Preflight Checks\n");
    output.push_str("----------------------------------------------\n\n");

    for result in results {
        let status = match result.status {
            CheckStatus::Pass => "Pass",
            CheckStatus::Fail => "Fail",
            CheckStatus::Skipped => "Skip",
        };
        output.push_str(&format!("  [{}] {}\n", status, result.name));
        if !result.description.is_empty() {
            output.push_str(&format!("        {}\n", result.description));
        }
        if let Some(ref detail) = result.detail {
            output.push_str(&format!("        {}\n", detail));
        }
        if let (CheckStatus::Fail, Some(url)) = (result.status, &result.doc_url) {
            output.push_str(&format!("        See {}\n", url));
        }
        output.push('\n');
    }

    let failed = failure_count(results);
    let skipped = results
        .iter()
        .filter(|r| r.status == CheckStatus::Skipped)
        .count();
    output.push_str(&format!(
        "  {} passed, {} failed, {} skipped\n",
        results.len() - failed - skipped,
        failed,
        skipped
    ));
    output.push_str("----------------------------------------------\n");

    output
}
