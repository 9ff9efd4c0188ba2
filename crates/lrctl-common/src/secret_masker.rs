// Replaces registered secret values (proxy passwords) in log lines.

use parking_lot::RwLock;
use std::sync::Arc;

/// Replacement text used when a secret is found.
const MASK: &str = "***";

/// A thread-safe secret masker that replaces registered values with `***`.
#[derive(Debug, Clone, Default)]
pub struct SecretMasker {
    secrets: Arc<RwLock<Vec<String>>>,
}

impl SecretMasker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret. Empty or whitespace-only values are ignored.
    pub fn add_value(&self, secret: &str) {
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            return;
        }

        let mut secrets = self.secrets.write();
        if !secrets.iter().any(|s| s == trimmed) {
            secrets.push(trimmed.to_string());
            // Longest first, so a secret containing another is masked whole.
            secrets.sort_by(|a, b| b.len().cmp(&a.len()));
        }
    }

    /// Replace all registered secret values in `input`.
    pub fn mask_secrets(&self, input: &str) -> String {
        let secrets = self.secrets.read();
        secrets
            .iter()
            .fold(input.to_string(), |acc, secret| acc.replace(secret.as_str(), MASK))
    }
}
