// Launcher orchestrator.
//
//   execute_command → [preflight] → [self-update] → resolve version → workload
//
// Self-update never affects the exit code; an unresolvable version is the
// only fatal path besides platform failures while starting the workload.

use crate::checks::{self, tool_check::InstallOffer};
use crate::command_settings::CommandSettings;
use crate::container::ContainerPlatform;
use crate::remote_fetcher::Fetcher;
use crate::self_updater::{SelfUpdater, UpdaterConfig};
use crate::version_resolver::VersionResolver;
use crate::volume_store::ContainerVolumeStore;
use crate::workload::WorkloadRunner;
use anyhow::Result;
use lrctl_common::constants::return_code;
use lrctl_common::launcher_context::LauncherContext;
use lrctl_common::tracing::Tracing;
use lrctl_sdk::TraceWriter;
use std::sync::Arc;

pub struct Launcher {
    context: Arc<LauncherContext>,
    platform: Arc<dyn ContainerPlatform>,
    fetcher: Arc<dyn Fetcher>,
    install_offer: Arc<dyn InstallOffer>,
    trace: Tracing,
}

impl Launcher {
    pub fn new(
        context: Arc<LauncherContext>,
        platform: Arc<dyn ContainerPlatform>,
        fetcher: Arc<dyn Fetcher>,
        install_offer: Arc<dyn InstallOffer>,
    ) -> Self {
        let trace = context.get_trace("Launcher");
        Self {
            context,
            platform,
            fetcher,
            install_offer,
            trace,
        }
    }

    /// Run the launcher for `settings`. Returns the process exit code.
    pub async fn execute_command(&self, settings: &CommandSettings) -> Result<i32> {
        let updater_config = if settings.skip_update {
            None
        } else {
            match settings.updater_config() {
                Ok(config) => Some(config),
                Err(e) => {
                    self.trace
                        .warning(&format!("Skipping self-update: {:#}", e));
                    None
                }
            }
        };

        self.launch(settings, updater_config).await
    }

    async fn launch(
        &self,
        settings: &CommandSettings,
        updater_config: Option<UpdaterConfig>,
    ) -> Result<i32> {
        if settings.check && !self.run_checks(settings).await {
            return Ok(return_code::PREFLIGHT_FAILED);
        }

        let store = Arc::new(ContainerVolumeStore::new(
            self.platform.clone(),
            &self.context,
        ));

        if let Some(config) = updater_config {
            SelfUpdater::new(&self.context, store.clone(), self.fetcher.clone())
                .run(&config)
                .await;
        }

        let target = VersionResolver::new(
            &self.context,
            self.platform.clone(),
            store,
            self.fetcher.clone(),
        )
        .resolve(&settings.resolver_config())
        .await?;

        let exit_code = WorkloadRunner::new(&self.context, self.platform.clone())
            .run(&target, &settings.workload_args, settings.versions.is_some())
            .await?;

        self.trace
            .verbose(&format!("Workload exited with code {}", exit_code));
        Ok(exit_code)
    }

    /// Run the preflight battery and print the report. Returns whether
    /// everything passed.
    async fn run_checks(&self, settings: &CommandSettings) -> bool {
        self.trace.info("Running preflight checks");
        let results = checks::run_all_checks(
            &settings.preflight_config(),
            self.fetcher.as_ref(),
            &self.context.web_proxy,
            self.install_offer.as_ref(),
            &self.trace,
        )
        .await;

        println!("{}", checks::format_check_results(&results));

        let failures = checks::failure_count(&results);
        if failures > 0 {
            self.trace
                .error(&format!("{} preflight check(s) failed", failures));
            false
        } else {
            true
        }
    }
}
