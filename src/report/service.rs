//! Report generation pipeline
//!
//! Materialize → invoke → resolve → finalize, inside a per-request job
//! workspace and behind a counting semaphore that caps how many renderer
//! processes run at once.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use super::finalize::finalize;
use super::renderer::{invoke, RenderJob, Renderer};
use super::resolver::most_recent_file;
use super::workspace::JobWorkspace;
use crate::config::Config;
use crate::error::{AppError, Result};

/// Extension of the artifacts the renderer produces
pub const ARTIFACT_EXTENSION: &str = "pdf";

#[derive(Clone)]
pub struct ReportService {
    renderer: Arc<dyn Renderer>,
    permits: Arc<Semaphore>,
    queue_timeout: Duration,
    output_dir: PathBuf,
    template: PathBuf,
    params: String,
}

impl ReportService {
    pub fn new(config: &Config, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            renderer,
            permits: Arc::new(Semaphore::new(config.renderer.max_concurrent)),
            queue_timeout: config.renderer.queue_timeout,
            output_dir: config.output.dir.clone(),
            template: config.renderer.template_path.clone(),
            params: config.renderer.params.clone(),
        }
    }

    /// Render `document` and return the finalized artifact's file name.
    ///
    /// The pipeline runs on its own task: once a permit is granted it runs to
    /// completion, including temp-file and workspace cleanup, even if the
    /// caller stops waiting.
    pub async fn generate(&self, document: &str) -> Result<String> {
        let permit = tokio::time::timeout(self.queue_timeout, self.permits.clone().acquire_owned())
            .await
            .map_err(|_| AppError::Busy)?
            .map_err(|_| AppError::Busy)?;

        let service = self.clone();
        let document = document.to_string();
        tokio::spawn(async move {
            let _permit = permit;
            service.generate_in_workspace(&document).await
        })
        .await?
    }

    async fn generate_in_workspace(&self, document: &str) -> Result<String> {
        let workspace = JobWorkspace::create(&self.output_dir).await?;
        tracing::info!(job_id = %workspace.id(), "Generating KUDE");

        let result = self.run(&workspace, document).await;
        workspace.cleanup().await;
        result
    }

    async fn run(&self, workspace: &JobWorkspace, document: &str) -> Result<String> {
        let input = workspace.materialize(document).await?;
        let job = RenderJob {
            input,
            template: self.template.clone(),
            output_dir: workspace.dir().to_path_buf(),
            params: self.params.clone(),
        };

        invoke(self.renderer.as_ref(), &job).await?;
        tracing::info!(job_id = %workspace.id(), "KUDE generation completed");

        let artifact = most_recent_file(workspace.dir(), ARTIFACT_EXTENSION)
            .await?
            .ok_or_else(|| AppError::ArtifactNotFound(workspace.dir().to_path_buf()))?;
        tracing::info!(job_id = %workspace.id(), artifact = %artifact.display(), "Newest PDF found");

        let file_name = finalize(&artifact, &self.output_dir, &workspace.id().simple().to_string()).await?;
        tracing::info!(job_id = %workspace.id(), file_name = %file_name, "KUDE generated");

        Ok(file_name)
    }
}
