// Error taxonomy shared by the resolver, updater and preflight checks.

use thiserror::Error;

/// Failures the launcher distinguishes when deciding whether to continue.
///
/// "Candidate equals current" and "config absent" are not errors; they are
/// modelled as outcomes by the components that encounter them.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// A network target did not respond or answered with a failure status.
    #[error("{url} is unreachable: {reason}")]
    Unreachable { url: String, reason: String },

    /// A fetched artifact failed a structural sanity check.
    #[error("malformed {what}: {reason}")]
    Malformed { what: String, reason: String },

    /// A required local tool is not installed.
    #[error("required tool '{tool}' was not found on PATH")]
    ToolingMissing { tool: String },

    /// Neither the image cache nor any manifest produced a version.
    #[error(
        "Unable to determine which {service} version to run: no version found in the local image cache or any version manifest. \
         Check your network connection and firewall settings, then try again."
    )]
    VersionUnresolved { service: String },

    /// The container platform rejected an operation.
    #[error("container platform error during {operation}: {reason}")]
    Platform { operation: String, reason: String },
}

impl LaunchError {
    pub fn unreachable(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unreachable {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Whether the process must stop because of this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::VersionUnresolved { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_version_message_points_at_network() {
        let err = LaunchError::VersionUnresolved {
            service: "lrctl".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("lrctl"));
        assert!(msg.contains("firewall"));
        assert!(err.is_fatal());
    }

    #[test]
    fn unreachable_is_not_fatal() {
        let err = LaunchError::unreachable("https://example.com/v.yaml", "HTTP 503");
        assert_eq!(err.to_string(), "https://example.com/v.yaml is unreachable: HTTP 503");
        assert!(!err.is_fatal());
    }
}
