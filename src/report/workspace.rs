//! Per-request scratch directories
//!
//! Every generation request gets its own `job_<uuid>` directory under the
//! output folder. The XML input is materialized there and the renderer is
//! pointed at it as its output directory, so the artifact it writes cannot
//! be confused with another request's.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

/// `{prefix}_{unix millis}.{extension}`
pub fn unique_file_name(prefix: &str, extension: &str) -> String {
    format!("{}_{}.{}", prefix, Utc::now().timestamp_millis(), extension)
}

#[derive(Debug)]
pub struct JobWorkspace {
    id: Uuid,
    dir: PathBuf,
}

impl JobWorkspace {
    /// Create a fresh workspace directory under `root`
    pub async fn create(root: &Path) -> io::Result<Self> {
        let id = Uuid::new_v4();
        let dir = root.join(format!("job_{}", id.simple()));
        tokio::fs::create_dir(&dir).await?;
        Ok(Self { id, dir })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the document to a temporary XML file inside the workspace
    pub async fn materialize(&self, document: &str) -> io::Result<PathBuf> {
        let path = self.dir.join(unique_file_name("temp", "xml"));
        tokio::fs::write(&path, document).await?;
        tracing::debug!(path = %path.display(), bytes = document.len(), "XML materialized");
        Ok(path)
    }

    /// Remove the workspace and anything left in it
    pub async fn cleanup(self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
            tracing::error!(
                job_id = %self.id,
                path = %self.dir.display(),
                error = %e,
                "Failed to remove job workspace"
            );
        }
    }
}
