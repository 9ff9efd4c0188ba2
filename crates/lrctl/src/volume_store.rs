// ContainerVolumeStore: durable launcher state kept in named container
// volumes. Holds the configuration document and, separately, a
// user-supplied version manifest for the workload.

use crate::container::{ContainerPlatform, ContainerSpec, CopySource, VolumeMount};
use anyhow::{Context, Result};
use lrctl_common::constants::volumes;
use lrctl_common::launcher_context::LauncherContext;
use lrctl_sdk::{StringUtil, TraceWriter};
use parking_lot::Mutex;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Offset of the `ustar` magic in a POSIX tar header.
const TAR_MAGIC_OFFSET: usize = 257;
const TAR_MAGIC: &[u8] = b"ustar";

// ---------------------------------------------------------------------------
// ConfigDocument
// ---------------------------------------------------------------------------

/// The persisted launcher configuration: a single `autoupdate: <bool>` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigDocument {
    pub autoupdate_enabled: bool,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            autoupdate_enabled: true,
        }
    }
}

impl ConfigDocument {
    const KEY: &'static str = "autoupdate:";

    /// Parse the document. Only the second token of the `autoupdate:` line
    /// is read; anything missing or unrecognized means the default.
    pub fn parse(text: &str) -> Self {
        let enabled = text
            .lines()
            .find(|line| line.trim_start().starts_with(Self::KEY))
            .and_then(StringUtil::second_token)
            .and_then(StringUtil::convert_to_bool);

        match enabled {
            Some(autoupdate_enabled) => Self { autoupdate_enabled },
            None => Self::default(),
        }
    }

    pub fn render(&self) -> String {
        format!("{} {}\n", Self::KEY, self.autoupdate_enabled)
    }
}

// ---------------------------------------------------------------------------
// ContainerVolumeStore
// ---------------------------------------------------------------------------

pub struct ContainerVolumeStore {
    platform: Arc<dyn ContainerPlatform>,
    trace: Arc<dyn TraceWriter>,
    config: Mutex<Option<ConfigDocument>>,
}

impl ContainerVolumeStore {
    pub fn new(platform: Arc<dyn ContainerPlatform>, context: &LauncherContext) -> Self {
        Self::with_trace(platform, Arc::new(context.get_trace("ContainerVolumeStore")))
    }

    pub fn with_trace(platform: Arc<dyn ContainerPlatform>, trace: Arc<dyn TraceWriter>) -> Self {
        Self {
            platform,
            trace,
            config: Mutex::new(None),
        }
    }

    /// Whether a volume named exactly `name` exists.
    pub async fn exists(&self, name: &str) -> Result<bool> {
        let names = self
            .platform
            .list_volumes()
            .await
            .context("Failed to list volumes")?;
        Ok(names.iter().any(|n| n == name))
    }

    /// Destroy `name` if present, then create it fresh. Prior contents are
    /// lost.
    pub async fn create_or_replace(&self, name: &str, options: &[String]) -> Result<()> {
        if self.exists(name).await? {
            self.trace.verbose(&format!("Removing existing volume {}", name));
            self.platform
                .remove_volume(name)
                .await
                .with_context(|| format!("Failed to remove volume {}", name))?;
        }

        self.trace.verbose(&format!("Creating volume {}", name));
        self.platform
            .create_volume(name, options)
            .await
            .with_context(|| format!("Failed to create volume {}", name))
    }

    /// Copy a local file, or unpack a tar archive, into the root of `volume`
    /// through a short-lived helper container. The helper is removed
    /// whether or not the copy succeeds.
    pub async fn write_file(&self, volume: &str, local_path: &Path) -> Result<()> {
        let helper_name = format!(
            "{}-{}",
            volumes::HELPER_CONTAINER_PREFIX,
            Uuid::new_v4().simple()
        );
        let spec = ContainerSpec::new(volumes::HELPER_IMAGE)
            .with_name(&helper_name)
            .with_mount(VolumeMount::new(volume, volumes::HELPER_MOUNT));

        let container = self
            .platform
            .create_container(&spec)
            .await
            .with_context(|| format!("Failed to create helper container for volume {}", volume))?;

        let source = if is_tar(local_path) {
            CopySource::TarStream(local_path)
        } else {
            CopySource::File(local_path)
        };
        let copied = self
            .platform
            .copy_into(&container, source, volumes::HELPER_MOUNT)
            .await;

        if let Err(e) = self.platform.remove_container(&container).await {
            self.trace.warning(&format!(
                "Failed to remove helper container {}: {:#}",
                helper_name, e
            ));
        }

        copied.with_context(|| {
            format!("Failed to copy {} into volume {}", local_path.display(), volume)
        })
    }

    /// Contents of `path` inside `volume`, or `None` when it cannot be read.
    pub async fn read_file(&self, volume: &str, path: &str) -> Option<String> {
        let spec = ContainerSpec::new(volumes::HELPER_IMAGE)
            .with_mount(VolumeMount::new(volume, volumes::HELPER_MOUNT).read_only())
            .with_command(["cat".to_string(), format!("{}/{}", volumes::HELPER_MOUNT, path)]);

        match self.platform.run_captured(&spec).await {
            Ok(output) if output.success() => Some(output.stdout),
            Ok(output) => {
                self.trace.verbose(&format!(
                    "Reading {} from volume {} exited with {}: {}",
                    path,
                    volume,
                    output.exit_code,
                    output.stderr.trim()
                ));
                None
            }
            Err(e) => {
                self.trace
                    .verbose(&format!("Reading {} from volume {} failed: {:#}", path, volume, e));
                None
            }
        }
    }

    /// The configuration document, provisioning the config volume with the
    /// default on first use. Loaded once and cached.
    pub async fn load_config(&self) -> Result<ConfigDocument> {
        if let Some(config) = *self.config.lock() {
            return Ok(config);
        }

        if !self.exists(volumes::CONFIG_VOLUME).await? {
            self.provision_config().await?;
        }

        let config = match self
            .read_file(volumes::CONFIG_VOLUME, volumes::CONFIG_FILE)
            .await
        {
            Some(text) => ConfigDocument::parse(&text),
            None => {
                self.trace.verbose("Configuration document unreadable, using defaults");
                ConfigDocument::default()
            }
        };

        self.trace
            .verbose(&format!("autoupdate: {}", config.autoupdate_enabled));
        *self.config.lock() = Some(config);
        Ok(config)
    }

    async fn provision_config(&self) -> Result<()> {
        self.trace.info(&format!(
            "Provisioning configuration volume {}",
            volumes::CONFIG_VOLUME
        ));
        self.create_or_replace(volumes::CONFIG_VOLUME, &[]).await?;

        let staging = tempfile::tempdir().context("Failed to create staging directory")?;
        let path = staging.path().join(volumes::CONFIG_FILE);
        std::fs::write(&path, ConfigDocument::default().render())
            .with_context(|| format!("Failed to write {}", path.display()))?;

        self.write_file(volumes::CONFIG_VOLUME, &path).await
    }
}

/// Tar archives are recognized by extension or by the `ustar` header magic.
fn is_tar(path: &Path) -> bool {
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tar"))
    {
        return true;
    }

    let mut header = [0u8; TAR_MAGIC_OFFSET + 5];
    std::fs::File::open(path)
        .and_then(|mut file| file.read_exact(&mut header))
        .map(|_| &header[TAR_MAGIC_OFFSET..] == TAR_MAGIC)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePlatform;
    use lrctl_sdk::trace::NullTraceWriter;

    fn store(platform: &Arc<FakePlatform>) -> ContainerVolumeStore {
        ContainerVolumeStore::with_trace(platform.clone(), Arc::new(NullTraceWriter))
    }

    #[test]
    fn config_document_parsing() {
        assert!(!ConfigDocument::parse("autoupdate: false\n").autoupdate_enabled);
        assert!(ConfigDocument::parse("autoupdate: true").autoupdate_enabled);
        assert!(!ConfigDocument::parse("# managed\n  autoupdate:   FALSE  \n").autoupdate_enabled);
        assert!(ConfigDocument::parse("").autoupdate_enabled);
        assert!(ConfigDocument::parse("autoupdate:").autoupdate_enabled);
        assert!(ConfigDocument::parse("autoupdate: perhaps").autoupdate_enabled);
        assert_eq!(ConfigDocument::default().render(), "autoupdate: true\n");
    }

    #[tokio::test]
    async fn exists_matches_whole_names_only() {
        let platform = Arc::new(
            FakePlatform::new()
                .with_volume("lrctl-config-old", &[])
                .with_volume("my-lrctl-config", &[]),
        );
        let store = store(&platform);
        assert!(!store.exists("lrctl-config").await.unwrap());
        assert!(store.exists("lrctl-config-old").await.unwrap());
    }

    #[tokio::test]
    async fn create_or_replace_destroys_prior_contents() {
        let platform = Arc::new(FakePlatform::new().with_volume("data", &[("stale.txt", "old")]));
        let store = store(&platform);

        store.create_or_replace("data", &[]).await.unwrap();

        assert!(platform.has_volume("data"));
        assert_eq!(platform.file("data", "stale.txt"), None);
        assert_eq!(platform.count("volume rm data"), 1);
        assert_eq!(platform.count("volume create data"), 1);
    }

    #[tokio::test]
    async fn create_or_replace_on_absent_volume_only_creates() {
        let platform = Arc::new(FakePlatform::new());
        let options = vec!["--label".to_string(), "owner=lrctl".to_string()];
        store(&platform).create_or_replace("data", &options).await.unwrap();

        assert_eq!(platform.count("volume rm"), 0);
        assert_eq!(platform.count("volume create --label owner=lrctl data"), 1);
    }

    #[tokio::test]
    async fn platform_errors_propagate() {
        let platform = Arc::new(FakePlatform::new().failing_list());
        let err = store(&platform).create_or_replace("data", &[]).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to list volumes"));
        assert_eq!(platform.count("volume create"), 0);
    }

    #[tokio::test]
    async fn write_file_copies_through_unique_helper_and_removes_it() {
        let platform = Arc::new(FakePlatform::new().with_volume("data", &[]));
        let store = store(&platform);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions.yaml");
        std::fs::write(&path, "lrctl:\n  version: 1.0\n").unwrap();

        store.write_file("data", &path).await.unwrap();
        store.write_file("data", &path).await.unwrap();

        assert_eq!(platform.file("data", "versions.yaml").as_deref(), Some("lrctl:\n  version: 1.0\n"));
        assert_eq!(platform.live_containers(), 0);

        let helpers: Vec<String> = platform
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("create "))
            .collect();
        assert_eq!(helpers.len(), 2);
        assert_ne!(helpers[0], helpers[1]);
        assert!(helpers[0].starts_with("create lrctl-volume-helper-"));
    }

    #[tokio::test]
    async fn helper_is_removed_when_copy_fails() {
        let platform = Arc::new(FakePlatform::new().with_volume("data", &[]).failing_copy());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "autoupdate: true\n").unwrap();

        let err = store(&platform).write_file("data", &path).await.unwrap_err();

        assert!(format!("{:#}", err).contains("copy failed"));
        assert_eq!(platform.count("rm id-"), 1);
        assert_eq!(platform.live_containers(), 0);
    }

    #[tokio::test]
    async fn tar_archives_are_streamed() {
        let platform = Arc::new(FakePlatform::new().with_volume("data", &[]));
        let dir = tempfile::tempdir().unwrap();

        let by_extension = dir.path().join("bundle.tar");
        std::fs::write(&by_extension, "x").unwrap();

        let mut header = vec![0u8; 512];
        header[257..262].copy_from_slice(b"ustar");
        let by_magic = dir.path().join("bundle.bin");
        std::fs::write(&by_magic, &header).unwrap();

        let plain = dir.path().join("short.txt");
        std::fs::write(&plain, "x").unwrap();

        assert!(is_tar(&by_extension));
        assert!(is_tar(&by_magic));
        assert!(!is_tar(&plain));

        store(&platform).write_file("data", &by_extension).await.unwrap();
        assert!(platform.file("data", "tar:bundle.tar").is_some());
    }

    #[tokio::test]
    async fn read_file_returns_none_for_missing_file() {
        let platform = Arc::new(FakePlatform::new().with_volume("data", &[("a.txt", "hello")]));
        let store = store(&platform);
        assert_eq!(store.read_file("data", "a.txt").await.as_deref(), Some("hello"));
        assert_eq!(store.read_file("data", "b.txt").await, None);
    }

    #[tokio::test]
    async fn absent_config_volume_is_provisioned_with_autoupdate_on() {
        let platform = Arc::new(FakePlatform::new());
        let store = store(&platform);

        let config = store.load_config().await.unwrap();

        assert!(config.autoupdate_enabled);
        assert_eq!(
            platform.file("lrctl-config", "config.yaml").as_deref(),
            Some("autoupdate: true\n")
        );
        assert_eq!(platform.live_containers(), 0);
    }

    #[tokio::test]
    async fn existing_config_is_read_once_and_cached() {
        let platform = Arc::new(
            FakePlatform::new().with_volume("lrctl-config", &[("config.yaml", "autoupdate: false\n")]),
        );
        let store = store(&platform);

        assert!(!store.load_config().await.unwrap().autoupdate_enabled);
        assert!(!store.load_config().await.unwrap().autoupdate_enabled);

        assert_eq!(platform.count("run cat"), 1);
        assert_eq!(platform.count("volume create"), 0);
    }

    #[tokio::test]
    async fn unreadable_config_means_default() {
        let platform = Arc::new(FakePlatform::new().with_volume("lrctl-config", &[]));
        assert!(store(&platform).load_config().await.unwrap().autoupdate_enabled);
    }
}
