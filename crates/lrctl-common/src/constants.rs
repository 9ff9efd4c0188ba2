// Launcher-wide constants: names of the durable volumes, trusted endpoints,
// in-container paths and process exit codes.

use std::time::Duration;

/// The primary service whose image the launcher runs.
pub const PRIMARY_SERVICE: &str = "lrctl";

/// Image repository used when neither the cache nor a manifest names one.
pub const DEFAULT_IMAGE: &str = "gcr.io/lrctl-releases/lrctl";

/// Substring every published launcher artifact carries.
pub const VERSION_MARKER: &str = "lrctl_version=";

/// HTTP request timeout for manifest and launcher downloads.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP timeout for preflight reachability probes.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Trusted endpoints
// ---------------------------------------------------------------------------

pub mod endpoints {
    /// Published version manifest.
    pub const VERSIONS_URL: &str = "https://storage.googleapis.com/lrctl-releases/versions.yaml";

    /// Published launcher executable.
    pub const LAUNCHER_URL: &str = "https://storage.googleapis.com/lrctl-releases/lrctl";

    /// Container registry hosting the workload images.
    pub const PLATFORM_URL: &str = "https://gcr.io/v2/";
}

// ---------------------------------------------------------------------------
// Durable volumes
// ---------------------------------------------------------------------------

pub mod volumes {
    /// Volume holding the configuration document.
    pub const CONFIG_VOLUME: &str = "lrctl-config";

    /// File name of the configuration document inside the config volume.
    pub const CONFIG_FILE: &str = "config.yaml";

    /// Volume holding a user-supplied version manifest.
    pub const LOCAL_VERSIONS_VOLUME: &str = "lrctl-local-versions";

    /// File name a user-supplied manifest is stored under.
    pub const LOCAL_VERSIONS_FILE: &str = "versions.yaml";

    /// Where the local-versions volume is mounted inside the workload.
    pub const LOCAL_VERSIONS_MOUNT: &str = "/etc/lrctl/versions";

    /// Where helper containers mount the volume they operate on.
    pub const HELPER_MOUNT: &str = "/volume";

    /// Image used for helper containers.
    pub const HELPER_IMAGE: &str = "busybox:stable";

    /// Prefix of helper-container names; a unique suffix is appended.
    pub const HELPER_CONTAINER_PREFIX: &str = "lrctl-volume-helper";
}

// ---------------------------------------------------------------------------
// Local tooling
// ---------------------------------------------------------------------------

pub mod tools {
    /// Container platform CLI.
    pub const DOCKER: &str = "docker";

    /// Install command offered when the container CLI is missing.
    pub const DOCKER_INSTALL_COMMAND: &str = "curl -fsSL https://get.docker.com | sh";

    pub const DOCKER_DOC_URL: &str = "https://docs.docker.com/engine/install/";
}

// ---------------------------------------------------------------------------
// Environment variables
// ---------------------------------------------------------------------------

pub mod variables {
    pub const PRINT_LOG_TO_STDOUT: &str = "LRCTL_PRINT_LOG_TO_STDOUT";
    pub const VERSIONS: &str = "LRCTL_VERSIONS";
    pub const VERSIONS_URL: &str = "LRCTL_VERSIONS_URL";
    pub const LAUNCHER_URL: &str = "LRCTL_LAUNCHER_URL";
    pub const PLATFORM_URL: &str = "LRCTL_PLATFORM_URL";
}

// ---------------------------------------------------------------------------
// Return codes
// ---------------------------------------------------------------------------

pub mod return_code {
    pub const TERMINATED_ERROR: i32 = 1;
    pub const PREFLIGHT_FAILED: i32 = 2;
    pub const INTERRUPTED: i32 = 130;
}
