// Command line of the launcher. Each trusted endpoint can be overridden by
// flag or by its LRCTL_* environment variable; everything after the flags is
// passed to the workload untouched.

use crate::checks::PreflightConfig;
use crate::self_updater::UpdaterConfig;
use crate::version_resolver::ResolverConfig;
use anyhow::Result;
use clap::Parser;
use lrctl_common::constants::{endpoints, variables};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "lrctl",
    version,
    about = "Self-updating launcher for the lrctl workload container"
)]
pub struct CommandSettings {
    /// Run preflight checks first; abort when any fails
    #[arg(long)]
    pub check: bool,

    /// Do not look for a newer launcher
    #[arg(long)]
    pub skip_update: bool,

    /// Version manifest to use instead of the published one
    #[arg(long, value_name = "PATH|URL", env = variables::VERSIONS)]
    pub versions: Option<String>,

    /// Published version manifest
    #[arg(long, value_name = "URL", env = variables::VERSIONS_URL, default_value = endpoints::VERSIONS_URL)]
    pub versions_url: String,

    /// Published launcher executable
    #[arg(long, value_name = "URL", env = variables::LAUNCHER_URL, default_value = endpoints::LAUNCHER_URL)]
    pub launcher_url: String,

    /// Container registry probed by --check
    #[arg(long, value_name = "URL", env = variables::PLATFORM_URL, default_value = endpoints::PLATFORM_URL)]
    pub platform_url: String,

    /// Arguments for the workload container
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub workload_args: Vec<String>,
}

impl CommandSettings {
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            versions_url: self.versions_url.clone(),
            local_versions: self.versions.clone(),
            ..ResolverConfig::default()
        }
    }

    pub fn updater_config(&self) -> Result<UpdaterConfig> {
        UpdaterConfig::for_current_exe(&self.launcher_url)
    }

    pub fn preflight_config(&self) -> PreflightConfig {
        PreflightConfig {
            platform_url: self.platform_url.clone(),
            versions_url: self.versions_url.clone(),
            launcher_url: self.launcher_url.clone(),
            local_manifest: self.versions.is_some(),
            skip_update: self.skip_update,
            ..PreflightConfig::default()
        }
    }
}
