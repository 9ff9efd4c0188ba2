use std::path::PathBuf;

/// Locates executables on `PATH`.
pub struct WhichUtil;

impl WhichUtil {
    /// Locate the first occurrence of `command` on the system PATH.
    ///
    /// - If `require` is true and the command is not found, returns an error.
    /// - If `require` is false and the command is not found, returns `Ok(None)`.
    pub fn which(command: &str, require: bool) -> anyhow::Result<Option<PathBuf>> {
        if command.is_empty() {
            if require {
                anyhow::bail!("command must not be empty");
            }
            return Ok(None);
        }

        match which::which(command) {
            Ok(path) => Ok(Some(path)),
            Err(e) if require => Err(anyhow::anyhow!(
                "{command}: command not found ({e}). Make sure '{command}' is installed and its location included in the 'PATH' environment variable."
            )),
            Err(_) => Ok(None),
        }
    }

    /// Whether `command` resolves on PATH.
    pub fn is_available(command: &str) -> bool {
        matches!(Self::which(command, false), Ok(Some(_)))
    }
}
