// VersionResolver: decides which image and version of the primary service to
// launch. A user-supplied manifest wins over the published one, which wins
// over the newest locally cached image.

use crate::container::ContainerPlatform;
use crate::manifest::{self, FlatManifest};
use crate::remote_fetcher::{is_remote_location, Fetcher};
use crate::volume_store::ContainerVolumeStore;
use anyhow::{Context, Result};
use lrctl_common::constants::{self, endpoints, volumes};
use lrctl_common::launcher_context::LauncherContext;
use lrctl_common::{LaunchError, TempFileRegistry};
use lrctl_sdk::TraceWriter;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Inputs to a resolution, built from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Service whose image is launched.
    pub service: String,
    /// Image repository used for the cache lookup and when no manifest
    /// names an image.
    pub default_image: String,
    /// Published manifest.
    pub versions_url: String,
    /// User-supplied manifest, a path or an http(s) URL.
    pub local_versions: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            service: constants::PRIMARY_SERVICE.to_string(),
            default_image: constants::DEFAULT_IMAGE.to_string(),
            versions_url: endpoints::VERSIONS_URL.to_string(),
            local_versions: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    LocalCache,
    LocalManifest,
    RemoteManifest,
}

impl fmt::Display for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSource::LocalCache => write!(f, "local image cache"),
            VersionSource::LocalManifest => write!(f, "local version manifest"),
            VersionSource::RemoteManifest => write!(f, "remote version manifest"),
        }
    }
}

/// The image to launch and where its version came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub image: String,
    pub version: String,
    pub source: VersionSource,
}

impl ResolvedTarget {
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.version)
    }

    /// Take the service's image and version from `manifest` where present.
    fn overlay(&mut self, manifest: &FlatManifest, service: &str, source: VersionSource) {
        let entry = manifest.service(service);
        if let Some(image) = entry.image {
            self.image = image;
        }
        if let Some(version) = entry.version {
            self.version = version;
            self.source = source;
        }
    }
}

pub struct VersionResolver {
    platform: Arc<dyn ContainerPlatform>,
    store: Arc<ContainerVolumeStore>,
    fetcher: Arc<dyn Fetcher>,
    temp_files: TempFileRegistry,
    trace: Arc<dyn TraceWriter>,
}

impl VersionResolver {
    pub fn new(
        context: &LauncherContext,
        platform: Arc<dyn ContainerPlatform>,
        store: Arc<ContainerVolumeStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            platform,
            store,
            fetcher,
            temp_files: context.temp_files().clone(),
            trace: Arc::new(context.get_trace("VersionResolver")),
        }
    }

    pub fn with_trace(mut self, trace: Arc<dyn TraceWriter>) -> Self {
        self.trace = trace;
        self
    }

    pub async fn resolve(&self, config: &ResolverConfig) -> Result<ResolvedTarget> {
        let mut target = self.cached_target(config).await;

        if let Some(location) = &config.local_versions {
            let text = self.read_local_manifest(location).await?;
            self.publish_local_manifest(&text).await?;
            target.overlay(&manifest::flatten(&text), &config.service, VersionSource::LocalManifest);
        } else if self.autoupdate_enabled().await {
            match self.fetcher.fetch_text(&config.versions_url).await {
                Ok(text) => target.overlay(
                    &manifest::flatten(&text),
                    &config.service,
                    VersionSource::RemoteManifest,
                ),
                Err(e) => self.trace.warning(&format!(
                    "Unable to fetch version manifest from {}: {}. Continuing with the locally cached version.",
                    config.versions_url, e
                )),
            }
        } else {
            self.trace
                .verbose("Autoupdate disabled, using the locally cached version");
        }

        if target.version.is_empty() {
            return Err(LaunchError::VersionUnresolved {
                service: config.service.clone(),
            }
            .into());
        }

        self.trace.info(&format!(
            "Using {} from the {}",
            target.image_ref(),
            target.source
        ));
        Ok(target)
    }

    /// Seed from the newest tagged image of the default repository.
    async fn cached_target(&self, config: &ResolverConfig) -> ResolvedTarget {
        let version = match self.platform.list_images(&config.default_image).await {
            Ok(images) => images
                .into_iter()
                .find(|image| image.is_tagged())
                .map(|image| image.tag)
                .unwrap_or_default(),
            Err(e) => {
                self.trace
                    .warning(&format!("Unable to list cached images: {:#}", e));
                String::new()
            }
        };

        if !version.is_empty() {
            self.trace.verbose(&format!(
                "Found cached image {}:{}",
                config.default_image, version
            ));
        }

        ResolvedTarget {
            image: config.default_image.clone(),
            version,
            source: VersionSource::LocalCache,
        }
    }

    async fn autoupdate_enabled(&self) -> bool {
        match self.store.load_config().await {
            Ok(config) => config.autoupdate_enabled,
            Err(e) => {
                self.trace.warning(&format!(
                    "Unable to read the launcher configuration, assuming autoupdate is enabled: {:#}",
                    e
                ));
                true
            }
        }
    }

    async fn read_local_manifest(&self, location: &str) -> Result<String> {
        if is_remote_location(location) {
            return self.download_local_manifest(location).await;
        }

        let path = location.strip_prefix("file://").unwrap_or(location);
        let path: PathBuf = std::fs::canonicalize(path)
            .with_context(|| format!("Version manifest {} not found", path))?;
        self.trace
            .verbose(&format!("Reading version manifest {}", path.display()));
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read version manifest {}", path.display()))
    }

    async fn download_local_manifest(&self, url: &str) -> Result<String> {
        let download = NamedTempFile::new().context("Failed to create temporary file")?;
        self.temp_files.register(download.path());

        let text = match self.fetcher.fetch_to_file(url, download.path()).await {
            Ok(()) => std::fs::read_to_string(download.path())
                .with_context(|| format!("Failed to read version manifest downloaded from {}", url)),
            Err(e) => Err(anyhow::Error::new(LaunchError::from(e))),
        };

        self.temp_files.release(download.path());
        text
    }

    /// Make the manifest visible to the workload through the local-versions
    /// volume.
    async fn publish_local_manifest(&self, text: &str) -> Result<()> {
        self.store
            .create_or_replace(volumes::LOCAL_VERSIONS_VOLUME, &[])
            .await?;

        let staging = tempfile::tempdir().context("Failed to create staging directory")?;
        let path = staging.path().join(volumes::LOCAL_VERSIONS_FILE);
        std::fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;

        self.store
            .write_file(volumes::LOCAL_VERSIONS_VOLUME, &path)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeFetcher, FakePlatform};
    use lrctl_common::TraceSetting;
    use lrctl_sdk::trace::{CollectingTraceWriter, NullTraceWriter, TraceLevel};
    use lrctl_sdk::LauncherWebProxy;

    const REMOTE: &str = "https://releases.example.com/versions.yaml";
    const REPO: &str = "gcr.io/lrctl-releases/lrctl";

    fn remote_manifest(version: &str) -> String {
        format!("services:\n  lrctl:\n    image: \"{}\"\n    version: \"{}\"\n", REPO, version)
    }

    fn config() -> ResolverConfig {
        ResolverConfig {
            versions_url: REMOTE.to_string(),
            ..ResolverConfig::default()
        }
    }

    fn autoupdate(enabled: bool) -> FakePlatform {
        let text = format!("autoupdate: {}\n", enabled);
        FakePlatform::new().with_volume("lrctl-config", &[("config.yaml", text.as_str())])
    }

    fn resolver(
        platform: &Arc<FakePlatform>,
        fetcher: &Arc<FakeFetcher>,
        trace: Arc<dyn TraceWriter>,
    ) -> VersionResolver {
        let context = LauncherContext::with_parts(
            LauncherWebProxy::from_lookup(|_| None),
            TraceSetting::default(),
        );
        let store = Arc::new(ContainerVolumeStore::with_trace(
            platform.clone(),
            Arc::new(NullTraceWriter),
        ));
        VersionResolver::new(&context, platform.clone(), store, fetcher.clone()).with_trace(trace)
    }

    #[tokio::test]
    async fn cache_is_used_when_autoupdate_is_disabled() {
        let platform = Arc::new(autoupdate(false).with_image(REPO, "<none>").with_image(REPO, "1.0.0"));
        let fetcher = Arc::new(FakeFetcher::new().serve(REMOTE, remote_manifest("9.9.9")));

        let target = resolver(&platform, &fetcher, Arc::new(NullTraceWriter))
            .resolve(&config())
            .await
            .unwrap();

        assert_eq!(target.image_ref(), "gcr.io/lrctl-releases/lrctl:1.0.0");
        assert_eq!(target.source, VersionSource::LocalCache);
        assert_eq!(fetcher.fetch_count(), 0);
    }

    #[tokio::test]
    async fn remote_manifest_beats_cache_when_autoupdate_is_enabled() {
        let platform = Arc::new(autoupdate(true).with_image(REPO, "1.0.0"));
        let fetcher = Arc::new(FakeFetcher::new().serve(REMOTE, remote_manifest("2.0.0")));

        let target = resolver(&platform, &fetcher, Arc::new(NullTraceWriter))
            .resolve(&config())
            .await
            .unwrap();

        assert_eq!(target.version, "2.0.0");
        assert_eq!(target.source, VersionSource::RemoteManifest);
    }

    #[tokio::test]
    async fn local_manifest_beats_remote_and_is_published_to_volume() {
        let platform = Arc::new(autoupdate(true).with_image(REPO, "1.0.0"));
        let fetcher = Arc::new(FakeFetcher::new().serve(REMOTE, remote_manifest("2.0.0")));
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("my versions.yaml");
        std::fs::write(&local, "lrctl:\n  image: registry.local/lrctl\n  version: 3.0.0-dev\n").unwrap();

        let target = resolver(&platform, &fetcher, Arc::new(NullTraceWriter))
            .resolve(&ResolverConfig {
                local_versions: Some(local.display().to_string()),
                ..config()
            })
            .await
            .unwrap();

        assert_eq!(target.image_ref(), "registry.local/lrctl:3.0.0-dev");
        assert_eq!(target.source, VersionSource::LocalManifest);
        assert_eq!(fetcher.fetch_count(), 0);
        assert!(platform
            .file("lrctl-local-versions", "versions.yaml")
            .unwrap()
            .contains("3.0.0-dev"));
    }

    #[tokio::test]
    async fn local_manifest_url_is_downloaded_and_cleaned_up() {
        let url = "https://mirror.example.com/pinned.yaml";
        let platform = Arc::new(autoupdate(true));
        let fetcher = Arc::new(FakeFetcher::new().serve(url, remote_manifest("1.5.0")));
        let resolver = resolver(&platform, &fetcher, Arc::new(NullTraceWriter));

        let target = resolver
            .resolve(&ResolverConfig {
                local_versions: Some(url.to_string()),
                ..config()
            })
            .await
            .unwrap();

        assert_eq!(target.version, "1.5.0");
        assert_eq!(target.source, VersionSource::LocalManifest);
        assert!(resolver.temp_files.registered().is_empty());
    }

    #[tokio::test]
    async fn missing_local_manifest_is_an_error() {
        let platform = Arc::new(autoupdate(true).with_image(REPO, "1.0.0"));
        let fetcher = Arc::new(FakeFetcher::new());

        let err = resolver(&platform, &fetcher, Arc::new(NullTraceWriter))
            .resolve(&ResolverConfig {
                local_versions: Some("/nonexistent/lrctl/versions.yaml".into()),
                ..config()
            })
            .await
            .unwrap_err();

        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn unreachable_remote_manifest_warns_and_keeps_cache() {
        let platform = Arc::new(autoupdate(true).with_image(REPO, "1.0.0"));
        let fetcher = Arc::new(FakeFetcher::new());
        let trace = Arc::new(CollectingTraceWriter::new());

        let target = resolver(&platform, &fetcher, trace.clone())
            .resolve(&config())
            .await
            .unwrap();

        assert_eq!(target.version, "1.0.0");
        assert_eq!(target.source, VersionSource::LocalCache);
        assert!(trace.contains(TraceLevel::Warning, REMOTE));
    }

    #[tokio::test]
    async fn manifest_without_the_service_keeps_cache() {
        let platform = Arc::new(autoupdate(true).with_image(REPO, "1.0.0"));
        let fetcher = Arc::new(FakeFetcher::new().serve(REMOTE, "services:\n  other:\n    version: 5\n"));

        let target = resolver(&platform, &fetcher, Arc::new(NullTraceWriter))
            .resolve(&config())
            .await
            .unwrap();

        assert_eq!(target.version, "1.0.0");
        assert_eq!(target.source, VersionSource::LocalCache);
    }

    #[tokio::test]
    async fn no_source_is_fatal() {
        let platform = Arc::new(autoupdate(true));
        let fetcher = Arc::new(FakeFetcher::new());

        let err = resolver(&platform, &fetcher, Arc::new(NullTraceWriter))
            .resolve(&config())
            .await
            .unwrap_err();

        let launch_error = err.downcast_ref::<LaunchError>().unwrap();
        assert!(launch_error.is_fatal());
        assert!(err.to_string().contains("firewall"));
    }

    #[tokio::test]
    async fn disabled_autoupdate_without_cache_is_fatal() {
        let platform = Arc::new(autoupdate(false));
        let fetcher = Arc::new(FakeFetcher::new().serve(REMOTE, remote_manifest("2.0.0")));

        let err = resolver(&platform, &fetcher, Arc::new(NullTraceWriter))
            .resolve(&config())
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<LaunchError>(),
            Some(LaunchError::VersionUnresolved { .. })
        ));
        assert_eq!(fetcher.fetch_count(), 0);
    }
}
