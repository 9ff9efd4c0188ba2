// Result type shared by every preflight check.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Fail,
    /// Not applicable to this invocation; never counts as a failure.
    Skipped,
}

/// Result of a single preflight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// The name of the check (e.g. "Version Manifest").
    pub name: String,
    /// What the check verifies.
    pub description: String,
    pub status: CheckStatus,
    /// Additional detail about the result (e.g. error message).
    pub detail: Option<String>,
    /// Where to read about fixing a failure.
    pub doc_url: Option<String>,
}

impl CheckResult {
    fn new(name: impl Into<String>, description: impl Into<String>, status: CheckStatus) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            status,
            detail: None,
            doc_url: None,
        }
    }

    pub fn pass(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, CheckStatus::Pass)
    }

    pub fn fail(
        name: impl Into<String>,
        description: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::new(name, description, CheckStatus::Fail).with_detail(detail)
    }

    pub fn skipped(
        name: impl Into<String>,
        description: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(name, description, CheckStatus::Skipped).with_detail(reason)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_doc_url(mut self, url: impl Into<String>) -> Self {
        self.doc_url = Some(url.into());
        self
    }

    pub fn failed(&self) -> bool {
        self.status == CheckStatus::Fail
    }
}

/// Number of failed checks.
pub fn failure_count(results: &[CheckResult]) -> usize {
    results.iter().filter(|r| r.failed()).count()
}
