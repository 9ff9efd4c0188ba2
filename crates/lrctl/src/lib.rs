// lrctl: the self-updating launcher. Depends on `lrctl-sdk` and
// `lrctl-common`.
//
// Architecture:
//   main → Launcher::execute_command → checks (--check) → SelfUpdater
//        → VersionResolver → WorkloadRunner
//   ContainerVolumeStore and RemoteFetcher sit underneath, on top of the
//   `ContainerPlatform` and `Fetcher` seams.

pub mod checks;
pub mod command_settings;
pub mod container;
pub mod launcher;
pub mod manifest;
pub mod remote_fetcher;
pub mod self_updater;
pub mod version_resolver;
pub mod volume_store;
pub mod workload;

#[cfg(test)]
mod testing;
