// DockerCommandManager: the `ContainerPlatform` implementation that shells
// out to the docker CLI.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lrctl_common::constants::tools;
use lrctl_common::LaunchError;
use lrctl_sdk::{ProcessInvoker, ProcessOutput, TraceWriter};
use std::io::IsTerminal;
use std::sync::Arc;

use super::platform::{ContainerPlatform, ContainerSpec, CopySource, ImageSummary};

/// Docker CLI trace writer.
struct DockerTraceWriter;

impl TraceWriter for DockerTraceWriter {
    fn info(&self, message: &str) {
        tracing::info!(target: "docker", "{}", message);
    }

    fn verbose(&self, message: &str) {
        tracing::debug!(target: "docker", "{}", message);
    }

    fn warning(&self, message: &str) {
        tracing::warn!(target: "docker", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "docker", "{}", message);
    }
}

/// Manages Docker CLI operations.
pub struct DockerCommandManager {
    docker_path: String,
    invoker: ProcessInvoker,
}

impl DockerCommandManager {
    /// Create a new `DockerCommandManager` using `docker` from PATH.
    pub fn new() -> Self {
        Self::with_path(tools::DOCKER)
    }

    /// Create a new `DockerCommandManager` with a custom Docker binary path.
    pub fn with_path(docker_path: impl Into<String>) -> Self {
        Self {
            docker_path: docker_path.into(),
            invoker: ProcessInvoker::new(Arc::new(DockerTraceWriter)),
        }
    }

    pub fn docker_path(&self) -> &str {
        &self.docker_path
    }

    /// Run a docker command that must succeed; returns its stdout.
    async fn run_docker_command(&self, arguments: Vec<String>) -> Result<String> {
        let output = self
            .invoker
            .execute(&self.docker_path, &arguments, None, true)
            .await
            .map_err(|e| LaunchError::Platform {
                operation: format!("{} {}", self.docker_path, arguments.join(" ")),
                reason: format!("{:#}", e),
            })?;
        Ok(output.stdout)
    }
}

impl Default for DockerCommandManager {
    fn default() -> Self {
        Self::new()
    }
}

fn args<const N: usize>(fixed: [&str; N]) -> Vec<String> {
    fixed.iter().map(|s| s.to_string()).collect()
}

#[async_trait]
impl ContainerPlatform for DockerCommandManager {
    async fn list_volumes(&self) -> Result<Vec<String>> {
        let output = self
            .run_docker_command(args(["volume", "ls", "--format", "{{.Name}}"]))
            .await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn create_volume(&self, name: &str, options: &[String]) -> Result<()> {
        let mut arguments = args(["volume", "create"]);
        arguments.extend(options.iter().cloned());
        arguments.push(name.to_string());
        self.run_docker_command(arguments).await?;
        Ok(())
    }

    async fn remove_volume(&self, name: &str) -> Result<()> {
        let mut arguments = args(["volume", "rm", "--force"]);
        arguments.push(name.to_string());
        self.run_docker_command(arguments).await?;
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let mut arguments = args(["create"]);
        arguments.extend(spec.build_args());
        let output = self.run_docker_command(arguments).await?;
        Ok(output.trim().to_string())
    }

    async fn copy_into(&self, container: &str, source: CopySource<'_>, destination: &str) -> Result<()> {
        let target = format!("{}:{}", container, destination);
        match source {
            CopySource::File(path) => {
                let arguments = vec![
                    "cp".to_string(),
                    path.display().to_string(),
                    target,
                ];
                self.run_docker_command(arguments).await?;
            }
            CopySource::TarStream(path) => {
                let arguments = vec!["cp".to_string(), "-".to_string(), target];
                self.invoker
                    .execute(&self.docker_path, &arguments, Some(path), true)
                    .await
                    .with_context(|| {
                        format!("Failed to stream {} into {}", path.display(), container)
                    })?;
            }
        }
        Ok(())
    }

    async fn remove_container(&self, container: &str) -> Result<()> {
        let mut arguments = args(["rm", "--force"]);
        arguments.push(container.to_string());
        self.run_docker_command(arguments).await?;
        Ok(())
    }

    async fn run_captured(&self, spec: &ContainerSpec) -> Result<ProcessOutput> {
        let mut arguments = args(["run", "--rm"]);
        arguments.extend(spec.build_args());
        self.invoker
            .execute(&self.docker_path, &arguments, None, false)
            .await
            .with_context(|| format!("Failed to run container from {}", spec.image))
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<ImageSummary>> {
        let mut arguments = args(["images"]);
        arguments.push(repository.to_string());
        arguments.extend(args(["--format", "{{json .}}"]));
        let output = self.run_docker_command(arguments).await?;

        output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str::<ImageSummary>(line)
                    .with_context(|| format!("Unexpected image listing row: {}", line))
            })
            .collect()
    }

    async fn run_attached(&self, spec: &ContainerSpec) -> Result<i32> {
        let mut arguments = args(["run", "--rm", "-i"]);
        if std::io::stdin().is_terminal() && std::io::stdout().is_terminal() {
            arguments.push("-t".to_string());
        }
        arguments.extend(spec.build_args());
        self.invoker
            .execute_attached(&self.docker_path, &arguments)
            .await
    }
}
