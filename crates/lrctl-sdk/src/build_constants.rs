/// Build constants for the launcher package.
/// Values come from compile-time environment variables with sensible defaults.

/// Source control information.
pub struct Source;

impl Source {
    /// The commit hash from which this binary was built.
    /// Set via the `LRCTL_COMMIT_HASH` env var at compile time, or "N/A".
    pub const COMMIT_HASH: &'static str = match option_env!("LRCTL_COMMIT_HASH") {
        Some(h) => h,
        None => "N/A",
    };
}

/// Launcher package metadata.
#[derive(Debug, Clone)]
pub struct LauncherPackage;

impl LauncherPackage {
    /// The semantic version of the launcher, from `Cargo.toml`.
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    /// The executable / distribution name.
    pub const NAME: &'static str = "lrctl";

    /// The User-Agent sent with every HTTP request.
    pub fn user_agent() -> String {
        format!("{}/{} ({})", Self::NAME, Self::VERSION, Source::COMMIT_HASH)
    }
}
