//! External Renderer Invoker
//!
//! Runs the report tool as a child process. The tool receives four
//! positional arguments after its launch prefix:
//!
//! ```text
//! <program> [leading args...] <input.xml> <template> <output dir> <params json>
//! ```
//!
//! and reports success purely through its exit status. Whatever it prints
//! on stdout is handed back trimmed; stderr is kept for diagnostics.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// Renderer errors
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to launch renderer: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Failed to wait for renderer: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Renderer exited unsuccessfully (exit code: {code:?})")]
    Failed { code: Option<i32>, stderr: String },

    #[error("Renderer did not finish within {0:?}")]
    TimedOut(Duration),
}

/// One invocation of the report tool
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub input: PathBuf,
    pub template: PathBuf,
    pub output_dir: PathBuf,
    pub params: String,
}

/// Anything able to turn a [`RenderJob`] into an artifact inside `output_dir`
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    /// Render the job, returning the tool's trimmed stdout on success
    async fn render(&self, job: &RenderJob) -> Result<String, RenderError>;
}

/// Executable plus the arguments that precede the job's positional arguments
#[derive(Debug, Clone)]
pub struct RendererCommand {
    pub program: PathBuf,
    pub leading_args: Vec<OsString>,
}

impl RendererCommand {
    /// `java -jar <jar>`
    pub fn java_jar(java: impl Into<PathBuf>, jar: impl AsRef<Path>) -> Self {
        Self {
            program: java.into(),
            leading_args: vec!["-jar".into(), jar.as_ref().as_os_str().to_owned()],
        }
    }

    fn display_with(&self, job: &RenderJob) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.leading_args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.push(job.input.display().to_string());
        parts.push(job.template.display().to_string());
        parts.push(job.output_dir.display().to_string());
        parts.push(job.params.clone());
        parts.join(" ")
    }
}

/// Subprocess-backed renderer
pub struct JarRenderer {
    command: RendererCommand,
    timeout: Duration,
}

impl JarRenderer {
    pub fn new(command: RendererCommand, timeout: Duration) -> Self {
        Self { command, timeout }
    }
}

#[async_trait::async_trait]
impl Renderer for JarRenderer {
    async fn render(&self, job: &RenderJob) -> Result<String, RenderError> {
        tracing::info!(command = %self.command.display_with(job), "Launching renderer");

        let mut child = Command::new(&self.command.program)
            .args(&self.command.leading_args)
            .arg(&job.input)
            .arg(&job.template)
            .arg(&job.output_dir)
            .arg(&job.params)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(RenderError::Spawn)?;

        // Drain both pipes while waiting so a chatty tool cannot block on a full pipe
        let readers = OutputReaders::spawn(&mut child);

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                readers.abort();
                return Err(RenderError::Wait(e));
            }
            Err(_) => {
                // kill() also reaps the child
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill timed out renderer");
                }
                // A grandchild may still hold the pipes open
                readers.abort();
                tracing::error!(
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Renderer timed out and was killed"
                );
                return Err(RenderError::TimedOut(self.timeout));
            }
        };

        let (stdout, stderr) = readers.collect().await;

        if !status.success() {
            tracing::error!(exit_code = ?status.code(), stderr = %stderr.trim(), "Renderer failed");
            return Err(RenderError::Failed {
                code: status.code(),
                stderr,
            });
        }

        tracing::info!(stdout = %stdout.trim(), stderr = %stderr.trim(), "Renderer finished");
        Ok(stdout.trim().to_string())
    }
}

/// Background tasks draining the child's stdout and stderr
struct OutputReaders {
    stdout: JoinHandle<String>,
    stderr: JoinHandle<String>,
}

impl OutputReaders {
    fn spawn(child: &mut Child) -> Self {
        Self {
            stdout: tokio::spawn(drain(child.stdout.take())),
            stderr: tokio::spawn(drain(child.stderr.take())),
        }
    }

    fn abort(&self) {
        self.stdout.abort();
        self.stderr.abort();
    }

    async fn collect(self) -> (String, String) {
        let stdout = self.stdout.await.unwrap_or_default();
        let stderr = self.stderr.await.unwrap_or_default();
        (stdout, stderr)
    }
}

async fn drain<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            tracing::warn!(error = %e, "Failed to read renderer output");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Render `job`, then delete its input document.
///
/// The deletion runs exactly once, after the renderer has returned, whatever
/// the outcome. A failed deletion is logged and never replaces the render
/// result.
pub async fn invoke(renderer: &dyn Renderer, job: &RenderJob) -> Result<String, RenderError> {
    let result = renderer.render(job).await;

    match tokio::fs::remove_file(&job.input).await {
        Ok(()) => tracing::info!(path = %job.input.display(), "Temporary XML removed"),
        Err(e) => tracing::error!(
            path = %job.input.display(),
            error = %e,
            "Failed to remove temporary XML"
        ),
    }

    result
}
