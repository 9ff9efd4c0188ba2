use crate::trace::TraceWriter;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Error type for non-zero process exit codes.
#[derive(Debug, thiserror::Error)]
#[error("Exit code {exit_code} returned from process: file name '{file_name}', arguments '{arguments}'. {stderr}")]
pub struct ProcessExitCodeError {
    pub exit_code: i32,
    pub file_name: String,
    pub arguments: String,
    pub stderr: String,
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Spawns child processes and waits for them, one at a time.
///
/// Arguments are passed as a vector and never re-split by a shell, so paths
/// with spaces survive intact.
pub struct ProcessInvoker {
    trace: Arc<dyn TraceWriter>,
}

impl ProcessInvoker {
    /// Create a new `ProcessInvoker` with the given trace writer.
    pub fn new(trace: Arc<dyn TraceWriter>) -> Self {
        Self { trace }
    }

    /// Run `file_name` with `arguments`, capturing stdout and stderr.
    ///
    /// When `stdin_file` is given its contents are streamed to the child's
    /// stdin. With `require_exit_code_zero` a non-zero exit becomes a
    /// [`ProcessExitCodeError`].
    pub async fn execute(
        &self,
        file_name: &str,
        arguments: &[String],
        stdin_file: Option<&Path>,
        require_exit_code_zero: bool,
    ) -> Result<ProcessOutput> {
        anyhow::ensure!(!file_name.is_empty(), "file_name must not be empty");

        let joined = arguments.join(" ");
        self.trace
            .verbose(&format!("Starting process: '{file_name}' '{joined}'"));

        let mut cmd = Command::new(file_name);
        cmd.args(arguments)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if stdin_file.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        let start = std::time::Instant::now();
        let mut child = cmd.spawn().with_context(|| {
            format!("Failed to start process '{file_name}' with arguments '{joined}'")
        })?;
        let pid = child.id().unwrap_or(0);

        let stdin_task = match (stdin_file, child.stdin.take()) {
            (Some(path), Some(mut stdin)) => {
                let path = path.to_path_buf();
                Some(tokio::spawn(async move {
                    let mut file = tokio::fs::File::open(&path).await?;
                    tokio::io::copy(&mut file, &mut stdin).await?;
                    stdin.shutdown().await
                }))
            }
            _ => None,
        };

        let (stdout, stderr) = tokio::join!(
            read_stream(child.stdout.take()),
            read_stream(child.stderr.take())
        );

        let status = child
            .wait()
            .await
            .context("Failed to wait for process")?;
        let exit_code = status.code().unwrap_or(-1);

        if let Some(task) = stdin_task {
            task.await
                .context("stdin writer task failed")?
                .with_context(|| format!("Failed to stream stdin into '{file_name}'"))?;
        }

        for line in stdout.lines() {
            self.trace.verbose(line);
        }

        self.trace.verbose(&format!(
            "Finished process {pid} with exit code {exit_code}, and elapsed time {:.2?}.",
            start.elapsed()
        ));

        if exit_code != 0 && require_exit_code_zero {
            return Err(ProcessExitCodeError {
                exit_code,
                file_name: file_name.to_string(),
                arguments: joined,
                stderr: stderr.trim().to_string(),
            }
            .into());
        }

        Ok(ProcessOutput {
            exit_code,
            stdout,
            stderr,
        })
    }

    /// Run `file_name` attached to the launcher's own stdio and return its
    /// exit code.
    pub async fn execute_attached(
        &self,
        file_name: &str,
        arguments: &[String],
    ) -> Result<i32> {
        let joined = arguments.join(" ");
        self.trace
            .info(&format!("Running attached: '{file_name}' '{joined}'"));

        let status = Command::new(file_name)
            .args(arguments)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .with_context(|| format!("Failed to start process '{file_name}'"))?;

        Ok(status.code().unwrap_or(-1))
    }
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        let _ = stream.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}
