// In-memory stand-ins for the container platform and the network, shared by
// the unit tests of the store, resolver, updater and launcher.

use crate::container::{ContainerPlatform, ContainerSpec, CopySource, ImageSummary};
use crate::remote_fetcher::{FetchError, Fetcher};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use lrctl_common::constants::volumes;
use lrctl_sdk::ProcessOutput;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

type Files = BTreeMap<String, String>;

#[derive(Default)]
pub struct FakePlatform {
    volumes: Mutex<BTreeMap<String, Files>>,
    containers: Mutex<BTreeMap<String, ContainerSpec>>,
    images: Mutex<Vec<ImageSummary>>,
    calls: Mutex<Vec<String>>,
    attached: Mutex<Vec<ContainerSpec>>,
    fail_copy: Mutex<bool>,
    fail_list: Mutex<bool>,
    exit_code: Mutex<i32>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_volume(self, name: &str, files: &[(&str, &str)]) -> Self {
        self.volumes.lock().insert(
            name.to_string(),
            files
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn with_image(self, repository: &str, tag: &str) -> Self {
        self.images.lock().push(ImageSummary {
            repository: repository.to_string(),
            tag: tag.to_string(),
            id: format!("sha-{}", tag),
            created_at: String::new(),
        });
        self
    }

    pub fn failing_copy(self) -> Self {
        *self.fail_copy.lock() = true;
        self
    }

    pub fn failing_list(self) -> Self {
        *self.fail_list.lock() = true;
        self
    }

    pub fn with_exit_code(self, code: i32) -> Self {
        *self.exit_code.lock() = code;
        self
    }

    pub fn has_volume(&self, name: &str) -> bool {
        self.volumes.lock().contains_key(name)
    }

    pub fn file(&self, volume: &str, name: &str) -> Option<String> {
        self.volumes.lock().get(volume)?.get(name).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of recorded calls starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn live_containers(&self) -> usize {
        self.containers.lock().len()
    }

    pub fn attached(&self) -> Vec<ContainerSpec> {
        self.attached.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl ContainerPlatform for FakePlatform {
    async fn list_volumes(&self) -> Result<Vec<String>> {
        self.record("volume ls".into());
        if *self.fail_list.lock() {
            bail!("Cannot connect to the Docker daemon");
        }
        Ok(self.volumes.lock().keys().cloned().collect())
    }

    async fn create_volume(&self, name: &str, options: &[String]) -> Result<()> {
        let mut call = vec!["volume create".to_string()];
        call.extend(options.iter().cloned());
        call.push(name.to_string());
        self.record(call.join(" "));
        self.volumes.lock().entry(name.to_string()).or_default();
        Ok(())
    }

    async fn remove_volume(&self, name: &str) -> Result<()> {
        self.record(format!("volume rm {}", name));
        self.volumes.lock().remove(name);
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        self.record(format!("create {}", spec.name));
        let id = format!("id-{}", spec.name);
        self.containers.lock().insert(id.clone(), spec.clone());
        Ok(id)
    }

    async fn copy_into(&self, container: &str, source: CopySource<'_>, destination: &str) -> Result<()> {
        self.record(format!("cp {}", container));
        if *self.fail_copy.lock() {
            bail!("copy failed");
        }

        let spec = self
            .containers
            .lock()
            .get(container)
            .cloned()
            .ok_or_else(|| anyhow!("no such container: {}", container))?;
        let mount = spec
            .mounts
            .iter()
            .find(|m| m.target == destination)
            .ok_or_else(|| anyhow!("{} is not a mount of {}", destination, container))?;

        let (path, name) = match source {
            CopySource::File(path) => (path, file_name(path)),
            CopySource::TarStream(path) => (path, format!("tar:{}", file_name(path))),
        };
        let content = String::from_utf8_lossy(&std::fs::read(path)?).into_owned();
        self.volumes
            .lock()
            .entry(mount.volume.clone())
            .or_default()
            .insert(name, content);
        Ok(())
    }

    async fn remove_container(&self, container: &str) -> Result<()> {
        self.record(format!("rm {}", container));
        self.containers.lock().remove(container);
        Ok(())
    }

    async fn run_captured(&self, spec: &ContainerSpec) -> Result<ProcessOutput> {
        self.record(format!("run {}", spec.command.join(" ")));

        let missing = ProcessOutput {
            exit_code: 1,
            stdout: String::new(),
            stderr: "cat: can't open file".into(),
        };
        let (Some(mount), Some(target)) = (spec.mounts.first(), spec.command.get(1)) else {
            return Ok(missing);
        };
        let name = target
            .trim_start_matches(volumes::HELPER_MOUNT)
            .trim_start_matches('/');

        Ok(match self.file(&mount.volume, name) {
            Some(stdout) => ProcessOutput {
                exit_code: 0,
                stdout,
                stderr: String::new(),
            },
            None => missing,
        })
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<ImageSummary>> {
        self.record(format!("images {}", repository));
        Ok(self
            .images
            .lock()
            .iter()
            .filter(|i| i.repository == repository)
            .cloned()
            .collect())
    }

    async fn run_attached(&self, spec: &ContainerSpec) -> Result<i32> {
        self.record(format!("run attached {}", spec.image));
        self.attached.lock().push(spec.clone());
        Ok(*self.exit_code.lock())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Serves canned bodies; any other URL is unreachable.
#[derive(Default)]
pub struct FakeFetcher {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    fetches: Mutex<Vec<String>>,
    probes: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.lock().insert(url.to_string(), body.into());
        self
    }

    /// Number of `fetch_text` and `fetch_to_file` calls.
    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().len()
    }

    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().clone()
    }

    fn body(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetches.lock().push(url.to_string());
        self.bodies
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Unreachable {
                url: url.to_string(),
                reason: "HTTP 404".into(),
            })
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let body = self.body(url)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    async fn fetch_to_file(&self, url: &str, destination: &Path) -> Result<(), FetchError> {
        let body = self.body(url)?;
        std::fs::write(destination, body).map_err(|source| FetchError::Write {
            path: destination.to_path_buf(),
            source,
        })
    }

    async fn check_reachable(&self, url: &str) -> bool {
        self.probes.lock().push(url.to_string());
        self.bodies.lock().contains_key(url)
    }
}
