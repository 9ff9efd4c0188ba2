// SelfUpdater: replaces the running launcher with the published one.
// CHECK_FLAG -> FETCH -> VALIDATE -> COMPARE -> REPLACE_OR_NOOP. Every stage
// either hands its value to the next one or ends the run with an
// `UpdateOutcome`; nothing here is allowed to stop the launch.

use crate::remote_fetcher::Fetcher;
use crate::volume_store::ContainerVolumeStore;
use anyhow::{Context, Result};
use lrctl_common::constants::{self, endpoints};
use lrctl_common::launcher_context::LauncherContext;
use lrctl_common::{LaunchError, TempFileRegistry};
use lrctl_sdk::{StringUtil, TraceWriter};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdaterConfig {
    /// Published launcher artifact.
    pub launcher_url: String,
    /// The executable to replace.
    pub executable: PathBuf,
}

impl UpdaterConfig {
    /// Target the currently running executable.
    pub fn for_current_exe(launcher_url: impl Into<String>) -> Result<Self> {
        let executable = std::env::current_exe()
            .and_then(std::fs::canonicalize)
            .context("Failed to locate the running executable")?;
        Ok(Self {
            launcher_url: launcher_url.into(),
            executable,
        })
    }
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            launcher_url: endpoints::LAUNCHER_URL.to_string(),
            executable: PathBuf::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    CheckFlag,
    Fetch,
    Validate,
    Compare,
    Replace,
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateStage::CheckFlag => "check-flag",
            UpdateStage::Fetch => "fetch",
            UpdateStage::Validate => "validate",
            UpdateStage::Compare => "compare",
            UpdateStage::Replace => "replace",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Autoupdate is off; nothing was fetched.
    Disabled,
    /// The published launcher is byte-identical to the running one.
    UpToDate,
    /// The executable was replaced; effective from the next invocation.
    Replaced { version: String, digest: String },
    Failed { stage: UpdateStage, reason: String },
}

impl UpdateOutcome {
    fn failed(stage: UpdateStage, reason: impl fmt::Display) -> Self {
        Self::Failed {
            stage,
            reason: reason.to_string(),
        }
    }
}

/// Download target registered for signal cleanup while it exists.
struct CandidateFile {
    file: Option<NamedTempFile>,
    path: PathBuf,
    registry: TempFileRegistry,
}

impl CandidateFile {
    fn create_beside(executable: &Path, registry: &TempFileRegistry) -> Result<Self> {
        let dir = executable
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .context("The executable path has no parent directory")?;
        let file = tempfile::Builder::new()
            .prefix(".lrctl-update-")
            .tempfile_in(dir)
            .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;

        let path = file.path().to_path_buf();
        registry.register(&path);
        Ok(Self {
            file: Some(file),
            path,
            registry: registry.clone(),
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically rename the candidate over `destination`.
    fn persist(mut self, destination: &Path) -> Result<()> {
        let file = self
            .file
            .take()
            .context("The candidate file was already consumed")?;
        file.persist(destination)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to rename over {}", destination.display()))?;
        Ok(())
    }
}

impl Drop for CandidateFile {
    fn drop(&mut self) {
        self.registry.release(&self.path);
    }
}

/// A validated candidate and its digest.
struct Candidate {
    file: CandidateFile,
    version: String,
    digest: String,
}

pub struct SelfUpdater {
    store: Arc<ContainerVolumeStore>,
    fetcher: Arc<dyn Fetcher>,
    temp_files: TempFileRegistry,
    trace: Arc<dyn TraceWriter>,
}

impl SelfUpdater {
    pub fn new(
        context: &LauncherContext,
        store: Arc<ContainerVolumeStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            store,
            fetcher,
            temp_files: context.temp_files().clone(),
            trace: Arc::new(context.get_trace("SelfUpdater")),
        }
    }

    pub fn with_trace(mut self, trace: Arc<dyn TraceWriter>) -> Self {
        self.trace = trace;
        self
    }

    /// Run the update. Never fails; the outcome is logged and returned.
    pub async fn run(&self, config: &UpdaterConfig) -> UpdateOutcome {
        let outcome = match self.advance(config).await {
            Ok(outcome) | Err(outcome) => outcome,
        };

        match &outcome {
            UpdateOutcome::Disabled => self.trace.info("Autoupdate is disabled, skipping self-update"),
            UpdateOutcome::UpToDate => self.trace.info("lrctl is up to date"),
            UpdateOutcome::Replaced { version, digest } => self.trace.info(&format!(
                "Updated lrctl to version {} (sha256 {}). The new version takes effect on the next run.",
                version, digest
            )),
            UpdateOutcome::Failed { stage, reason } => self.trace.warning(&format!(
                "Self-update failed during {}: {}. Continuing with the current launcher.",
                stage, reason
            )),
        }

        outcome
    }

    async fn advance(&self, config: &UpdaterConfig) -> Result<UpdateOutcome, UpdateOutcome> {
        if !self.check_flag().await? {
            return Ok(UpdateOutcome::Disabled);
        }

        let file = self.fetch(config).await?;
        let candidate = self.validate(file)?;

        if self.compare(&candidate, &config.executable)? {
            return Ok(UpdateOutcome::UpToDate);
        }

        self.replace(candidate, &config.executable)
    }

    async fn check_flag(&self) -> Result<bool, UpdateOutcome> {
        let config = self
            .store
            .load_config()
            .await
            .map_err(|e| UpdateOutcome::failed(UpdateStage::CheckFlag, format!("{:#}", e)))?;
        Ok(config.autoupdate_enabled)
    }

    async fn fetch(&self, config: &UpdaterConfig) -> Result<CandidateFile, UpdateOutcome> {
        let file = CandidateFile::create_beside(&config.executable, &self.temp_files)
            .map_err(|e| UpdateOutcome::failed(UpdateStage::Fetch, format!("{:#}", e)))?;

        self.trace
            .verbose(&format!("Downloading {} to {}", config.launcher_url, file.path().display()));
        self.fetcher
            .fetch_to_file(&config.launcher_url, file.path())
            .await
            .map_err(|e| UpdateOutcome::failed(UpdateStage::Fetch, e))?;

        Ok(file)
    }

    fn validate(&self, file: CandidateFile) -> Result<Candidate, UpdateOutcome> {
        let body = std::fs::read(file.path())
            .map_err(|e| UpdateOutcome::failed(UpdateStage::Validate, e))?;

        let text = String::from_utf8_lossy(&body);
        let version = embedded_version(&text).ok_or_else(|| {
            let reason = format!("no {} marker", constants::VERSION_MARKER);
            UpdateOutcome::failed(
                UpdateStage::Validate,
                LaunchError::malformed("launcher", reason),
            )
        })?;

        self.trace
            .info(&format!("Published launcher version: {}", version));
        Ok(Candidate {
            file,
            version,
            digest: sha256_hex(&body),
        })
    }

    /// Whether the candidate is byte-identical to the executable.
    fn compare(&self, candidate: &Candidate, executable: &Path) -> Result<bool, UpdateOutcome> {
        let current = std::fs::read(executable).map_err(|e| {
            UpdateOutcome::failed(
                UpdateStage::Compare,
                format!("failed to read {}: {}", executable.display(), e),
            )
        })?;
        let current_digest = sha256_hex(&current);

        self.trace.verbose(&format!(
            "Current sha256 {}, published sha256 {}",
            current_digest, candidate.digest
        ));
        Ok(current_digest == candidate.digest)
    }

    fn replace(&self, candidate: Candidate, executable: &Path) -> Result<UpdateOutcome, UpdateOutcome> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(candidate.file.path(), std::fs::Permissions::from_mode(0o755))
                .map_err(|e| UpdateOutcome::failed(UpdateStage::Replace, e))?;
        }

        candidate
            .file
            .persist(executable)
            .map_err(|e| UpdateOutcome::failed(UpdateStage::Replace, format!("{:#}", e)))?;

        Ok(UpdateOutcome::Replaced {
            version: candidate.version,
            digest: candidate.digest,
        })
    }
}

/// The value following the version marker, or `None` without a marker. A
/// marker with no value yields `"unknown"`.
fn embedded_version(text: &str) -> Option<String> {
    let start = text.find(constants::VERSION_MARKER)? + constants::VERSION_MARKER.len();
    let value = text[start..]
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .map(StringUtil::trim_matching_quotes)
        .unwrap_or_default();

    if value.is_empty() {
        Some("unknown".to_string())
    } else {
        Some(value.to_string())
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
