//! Artifact naming and hand-off

use std::io;
use std::path::Path;

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Move `source` into `target_dir` under its sanitized name.
///
/// An existing file is never replaced: when the sanitized name is taken,
/// `_{suffix}` is appended to its stem. Returns the name actually used.
pub async fn finalize(source: &Path, target_dir: &Path, suffix: &str) -> io::Result<String> {
    let raw_name = source
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "artifact path has no file name"))?
        .to_string_lossy();
    let sanitized = sanitize_file_name(&raw_name);

    let name = match claim(source, &target_dir.join(&sanitized)).await {
        Ok(()) => sanitized,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            let fallback = with_suffix(&sanitized, &sanitize_file_name(suffix));
            tracing::warn!(
                taken = %sanitized,
                name = %fallback,
                "Artifact name already in use, keeping both"
            );
            claim(source, &target_dir.join(&fallback)).await?;
            fallback
        }
        Err(e) => return Err(e),
    };

    tracing::info!(
        from = %source.display(),
        to = %target_dir.join(&name).display(),
        "Artifact finalized"
    );
    Ok(name)
}

/// Move `source` to `target` unless `target` already exists.
///
/// A hard link is the atomic no-clobber step; filesystems without hard links
/// fall back to an existence check followed by a rename.
async fn claim(source: &Path, target: &Path) -> io::Result<()> {
    match tokio::fs::hard_link(source, target).await {
        Ok(()) => tokio::fs::remove_file(source).await,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists || e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(_) => {
            if tokio::fs::try_exists(target).await? {
                return Err(io::Error::new(io::ErrorKind::AlreadyExists, "target exists"));
            }
            tokio::fs::rename(source, target).await
        }
    }
}

/// `name.pdf` + `abc` → `name_abc.pdf`
fn with_suffix(name: &str, suffix: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, suffix, ext),
        _ => format!("{}_{}", name, suffix),
    }
}
