use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Information about a proxy bypass entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByPassInfo {
    pub host: String,
    pub port: Option<String>,
}

/// Proxy configuration read from the environment.
///
/// Reads `http_proxy` / `HTTP_PROXY`, `https_proxy` / `HTTPS_PROXY` and
/// `no_proxy` / `NO_PROXY`. The environment is consulted, never rewritten:
/// the raw values are kept so they can be forwarded verbatim to the
/// workload container.
#[derive(Debug, Clone, Default)]
pub struct LauncherWebProxy {
    pub http_proxy_raw: Option<String>,
    pub http_proxy_address: Option<String>,
    pub http_proxy_username: Option<String>,
    pub http_proxy_password: Option<String>,

    pub https_proxy_raw: Option<String>,
    pub https_proxy_address: Option<String>,
    pub https_proxy_username: Option<String>,
    pub https_proxy_password: Option<String>,

    pub no_proxy_list: Vec<ByPassInfo>,
}

/// Regex to validate an IPv4 address.
static VALID_IP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])\.){3}([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])$",
    )
    .expect("Invalid IP regex")
});

impl LauncherWebProxy {
    /// Read proxy settings from the process environment.
    pub fn new() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build proxy settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |lower: &str, upper: &str| {
            lookup(lower)
                .filter(|s| !s.trim().is_empty())
                .or_else(|| lookup(upper).filter(|s| !s.trim().is_empty()))
                .map(|s| s.trim().to_string())
        };

        let mut proxy = LauncherWebProxy {
            http_proxy_raw: read("http_proxy", "HTTP_PROXY"),
            https_proxy_raw: read("https_proxy", "HTTPS_PROXY"),
            ..Default::default()
        };

        if let Some(parsed) = proxy.http_proxy_raw.as_deref().and_then(Self::parse_address) {
            let (username, password) = Self::extract_user_info(&parsed);
            proxy.http_proxy_address = Some(parsed.to_string());
            proxy.http_proxy_username = username;
            proxy.http_proxy_password = password;
        }

        if let Some(parsed) = proxy.https_proxy_raw.as_deref().and_then(Self::parse_address) {
            let (username, password) = Self::extract_user_info(&parsed);
            proxy.https_proxy_address = Some(parsed.to_string());
            proxy.https_proxy_username = username;
            proxy.https_proxy_password = password;
        }

        if let Some(no_proxy) = read("no_proxy", "NO_PROXY") {
            proxy.no_proxy_list = Self::parse_no_proxy(&no_proxy);
        }

        proxy
    }

    /// Whether any proxy is configured.
    pub fn is_configured(&self) -> bool {
        self.http_proxy_address.is_some() || self.https_proxy_address.is_some()
    }

    /// The `(name, value)` pairs to forward into the workload container.
    pub fn forwarded_env(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        if let Some(ref raw) = self.http_proxy_raw {
            env.push(("http_proxy".to_string(), raw.clone()));
        }
        if let Some(ref raw) = self.https_proxy_raw {
            env.push(("https_proxy".to_string(), raw.clone()));
        }
        env
    }

    /// Determine the proxy URL to use for the given destination.
    /// Returns `None` if the destination should bypass the proxy.
    pub fn get_proxy_url(&self, destination: &Url) -> Option<Url> {
        if self.is_bypass(destination) {
            return None;
        }

        let proxy_address = if destination.scheme() == "https" {
            self.https_proxy_address.as_deref()
        } else {
            self.http_proxy_address.as_deref()
        };

        proxy_address.and_then(|addr| Url::parse(addr).ok())
    }

    /// Check if the given destination URL should bypass the proxy.
    pub fn is_bypass(&self, destination: &Url) -> bool {
        match destination.scheme() {
            "https" if self.https_proxy_address.is_none() => return true,
            "http" if self.http_proxy_address.is_none() => return true,
            _ => {}
        }

        if let Some(host) = destination.host_str() {
            let host_lower = host.to_lowercase();
            if host_lower == "localhost"
                || host_lower == "127.0.0.1"
                || host_lower == "::1"
                || host_lower == "[::1]"
            {
                return true;
            }
        }

        self.is_uri_in_bypass_list(destination)
    }

    fn is_uri_in_bypass_list(&self, destination: &Url) -> bool {
        let dest_host = match destination.host_str() {
            Some(h) => h.to_lowercase(),
            None => return false,
        };
        let dest_port = destination.port_or_known_default().map(|p| p.to_string());

        self.no_proxy_list.iter().any(|bypass| {
            if bypass.host == "*" {
                return true;
            }

            let port_match = match (&bypass.port, &dest_port) {
                (None, _) => true,
                (Some(bp), Some(dp)) => bp == dp,
                (Some(_), None) => false,
            };

            let bypass_host = bypass.host.to_lowercase();
            let host_match = if bypass_host.starts_with('.') {
                dest_host.ends_with(&bypass_host)
            } else {
                dest_host == bypass_host || dest_host.ends_with(&format!(".{bypass_host}"))
            };

            host_match && port_match
        })
    }

    fn parse_no_proxy(no_proxy: &str) -> Vec<ByPassInfo> {
        let mut seen = std::collections::HashSet::new();
        let mut list = Vec::new();

        for entry in no_proxy.split(',') {
            let trimmed = entry.trim();
            if trimmed.is_empty() || !seen.insert(trimmed.to_lowercase()) {
                continue;
            }

            let mut parts = trimmed.splitn(2, ':');
            let host = parts.next().unwrap_or_default().to_string();
            let port = parts.next().map(|p| p.to_string());

            // IP-based bypass entries are not supported
            if VALID_IP_REGEX.is_match(&host) {
                continue;
            }

            list.push(ByPassInfo { host, port });
        }

        list
    }

    fn parse_address(raw: &str) -> Option<Url> {
        Url::parse(&Self::prepend_http_if_missing(raw)).ok()
    }

    fn extract_user_info(url: &Url) -> (Option<String>, Option<String>) {
        let username = if url.username().is_empty() {
            None
        } else {
            Some(
                percent_encoding::percent_decode_str(url.username())
                    .decode_utf8_lossy()
                    .to_string(),
            )
        };

        let password = url.password().map(|p| {
            percent_encoding::percent_decode_str(p)
                .decode_utf8_lossy()
                .to_string()
        });

        (username, password)
    }

    fn prepend_http_if_missing(address: &str) -> String {
        if !address.starts_with("http://") && !address.starts_with("https://") {
            let prepended = format!("http://{address}");
            if Url::parse(&prepended).is_ok() {
                return prepended;
            }
        }
        address.to_string()
    }
}
