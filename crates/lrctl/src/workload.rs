// Hands off to the workload container: the resolved image, the caller's
// arguments, forwarded proxy settings and the local manifest mount.

use crate::container::{ContainerPlatform, ContainerSpec, VolumeMount};
use crate::version_resolver::ResolvedTarget;
use anyhow::{Context, Result};
use lrctl_common::constants::{variables, volumes};
use lrctl_common::launcher_context::LauncherContext;
use lrctl_common::tracing::Tracing;
use lrctl_sdk::TraceWriter;
use std::sync::Arc;

pub struct WorkloadRunner {
    platform: Arc<dyn ContainerPlatform>,
    forwarded_env: Vec<(String, String)>,
    trace: Tracing,
}

impl WorkloadRunner {
    pub fn new(context: &LauncherContext, platform: Arc<dyn ContainerPlatform>) -> Self {
        Self {
            platform,
            forwarded_env: context.web_proxy.forwarded_env(),
            trace: context.get_trace("WorkloadRunner"),
        }
    }

    pub fn container_spec(
        &self,
        target: &ResolvedTarget,
        arguments: &[String],
        local_manifest: bool,
    ) -> ContainerSpec {
        let mut spec = ContainerSpec::new(target.image_ref()).with_command(arguments.iter().cloned());

        for (key, value) in &self.forwarded_env {
            spec = spec.with_env(key, value);
        }

        if local_manifest {
            spec = spec
                .with_mount(
                    VolumeMount::new(volumes::LOCAL_VERSIONS_VOLUME, volumes::LOCAL_VERSIONS_MOUNT)
                        .read_only(),
                )
                .with_env(
                    variables::VERSIONS,
                    format!("{}/{}", volumes::LOCAL_VERSIONS_MOUNT, volumes::LOCAL_VERSIONS_FILE),
                );
        }

        spec
    }

    /// Run the workload attached to this terminal and return its exit code.
    pub async fn run(
        &self,
        target: &ResolvedTarget,
        arguments: &[String],
        local_manifest: bool,
    ) -> Result<i32> {
        let spec = self.container_spec(target, arguments, local_manifest);
        self.trace.verbose(&format!("Starting {}", spec.image));
        self.platform
            .run_attached(&spec)
            .await
            .with_context(|| format!("Failed to run {}", spec.image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePlatform;
    use crate::version_resolver::VersionSource;
    use lrctl_common::TraceSetting;
    use lrctl_sdk::LauncherWebProxy;

    fn target() -> ResolvedTarget {
        ResolvedTarget {
            image: "gcr.io/lrctl-releases/lrctl".into(),
            version: "1.2.3".into(),
            source: VersionSource::RemoteManifest,
        }
    }

    fn runner(platform: Arc<FakePlatform>, proxy: LauncherWebProxy) -> WorkloadRunner {
        let context = LauncherContext::with_parts(proxy, TraceSetting::default());
        WorkloadRunner::new(&context, platform)
    }

    #[test]
    fn proxy_settings_are_forwarded() {
        let proxy = LauncherWebProxy::from_lookup(|name| {
            (name == "https_proxy").then(|| "http://proxy.corp:3128".to_string())
        });
        let spec = runner(Arc::new(FakePlatform::new()), proxy).container_spec(&target(), &[], false);
        assert_eq!(
            spec.env,
            vec![("https_proxy".to_string(), "http://proxy.corp:3128".to_string())]
        );
        assert!(spec.mounts.is_empty());
    }

    #[test]
    fn local_manifest_is_mounted_read_only() {
        let spec = runner(Arc::new(FakePlatform::new()), LauncherWebProxy::from_lookup(|_| None))
            .container_spec(&target(), &["status".to_string()], true);

        assert_eq!(spec.mounts[0].to_arg(), "lrctl-local-versions:/etc/lrctl/versions:ro");
        assert!(spec
            .env
            .contains(&("LRCTL_VERSIONS".to_string(), "/etc/lrctl/versions/versions.yaml".to_string())));
        assert_eq!(spec.command, vec!["status"]);
    }

    #[tokio::test]
    async fn exit_code_is_passed_through() {
        let platform = Arc::new(FakePlatform::new().with_exit_code(42));
        let runner = runner(platform.clone(), LauncherWebProxy::from_lookup(|_| None));

        let args = vec!["deploy".to_string(), "--dry-run".to_string()];
        assert_eq!(runner.run(&target(), &args, false).await.unwrap(), 42);

        let attached = platform.attached();
        assert_eq!(attached[0].image, "gcr.io/lrctl-releases/lrctl:1.2.3");
        assert_eq!(attached[0].command, args);
    }
}
