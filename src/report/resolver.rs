//! Output resolver
//!
//! The report tool does not say which file it wrote, so the artifact is
//! recovered as the most recently modified file with the expected extension.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Newest regular file in `dir` whose extension is exactly `extension`
pub async fn most_recent_file(dir: &Path, extension: &str) -> io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut newest: Option<(PathBuf, SystemTime)> = None;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != extension) {
            continue;
        }

        // Follows symlinks; entries removed since listing are skipped
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata.modified()?;
        if newest.as_ref().map_or(true, |(_, best)| modified > *best) {
            newest = Some((path, modified));
        }
    }

    Ok(newest.map(|(path, _)| path))
}
