// Reachability of one trusted HTTP endpoint.

use super::check_extension::CheckResult;
use crate::remote_fetcher::Fetcher;

/// A named endpoint probed during preflight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCheck {
    pub name: &'static str,
    pub description: &'static str,
    pub url: String,
}

impl EndpointCheck {
    pub fn new(name: &'static str, description: &'static str, url: impl Into<String>) -> Self {
        Self {
            name,
            description,
            url: url.into(),
        }
    }

    pub async fn run_check(&self, fetcher: &dyn Fetcher) -> CheckResult {
        if fetcher.check_reachable(&self.url).await {
            CheckResult::pass(self.name, self.description).with_detail(self.url.clone())
        } else {
            CheckResult::fail(
                self.name,
                self.description,
                format!(
                    "{} is unreachable. Please check your network, firewall and proxy settings.",
                    self.url
                ),
            )
        }
    }
}
