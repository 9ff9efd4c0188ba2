// The container-platform primitives the launcher needs, as a trait so the
// store and resolver can be exercised against an in-memory platform.

use anyhow::Result;
use async_trait::async_trait;
use lrctl_sdk::ProcessOutput;
use serde::Deserialize;
use std::path::Path;

/// A named volume mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub volume: String,
    pub target: String,
    pub read_only: bool,
}

impl VolumeMount {
    pub fn new(volume: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            volume: volume.into(),
            target: target.into(),
            read_only: false,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// The `-v` argument value.
    pub fn to_arg(&self) -> String {
        if self.read_only {
            format!("{}:{}:ro", self.volume, self.target)
        } else {
            format!("{}:{}", self.volume, self.target)
        }
    }
}

/// What to create or run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Container name; empty lets the platform pick one.
    pub name: String,
    pub image: String,
    pub mounts: Vec<VolumeMount>,
    pub env: Vec<(String, String)>,
    /// Command and arguments appended after the image.
    pub command: Vec<String>,
}

impl ContainerSpec {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_mount(mut self, mount: VolumeMount) -> Self {
        self.mounts.push(mount);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// `--name`, `-v` and `-e` arguments, then the image and command.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if !self.name.is_empty() {
            args.push("--name".to_string());
            args.push(self.name.clone());
        }

        for mount in &self.mounts {
            args.push("-v".to_string());
            args.push(mount.to_arg());
        }

        for (key, value) in &self.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }

        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}

/// One row of the local image listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImageSummary {
    #[serde(rename = "Repository", default)]
    pub repository: String,
    #[serde(rename = "Tag", default)]
    pub tag: String,
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: String,
}

impl ImageSummary {
    /// Whether the row carries a usable tag (dangling images show `<none>`).
    pub fn is_tagged(&self) -> bool {
        !self.tag.is_empty() && self.tag != "<none>"
    }
}

/// Source of a copy into a container.
#[derive(Debug, Clone, Copy)]
pub enum CopySource<'a> {
    /// A single local file.
    File(&'a Path),
    /// A tar archive streamed through stdin and unpacked at the destination.
    TarStream(&'a Path),
}

/// The container-platform primitives used by the launcher.
#[async_trait]
pub trait ContainerPlatform: Send + Sync {
    /// Names of all volumes, one entry per volume.
    async fn list_volumes(&self) -> Result<Vec<String>>;

    async fn create_volume(&self, name: &str, options: &[String]) -> Result<()>;

    async fn remove_volume(&self, name: &str) -> Result<()>;

    /// Create (but do not start) a container. Returns its id.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;

    async fn copy_into(&self, container: &str, source: CopySource<'_>, destination: &str) -> Result<()>;

    async fn remove_container(&self, container: &str) -> Result<()>;

    /// Run a throwaway container to completion and capture its output.
    /// A non-zero exit is reported in the output, not as an error.
    async fn run_captured(&self, spec: &ContainerSpec) -> Result<ProcessOutput>;

    /// Locally cached images of `repository`, newest first.
    async fn list_images(&self, repository: &str) -> Result<Vec<ImageSummary>>;

    /// Run a container attached to the launcher's stdio; returns its exit code.
    async fn run_attached(&self, spec: &ContainerSpec) -> Result<i32>;
}
