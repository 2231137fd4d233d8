// retail-dwh-core/src/application/clean.rs

use crate::error::EtlError;
use crate::infrastructure::config::EtlConfig;
use crate::infrastructure::fs::is_contained;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Removes the configured build artifacts under `project_dir`.
/// Returns the paths that were actually deleted.
pub fn clean_project(project_dir: &Path, config: &EtlConfig) -> Result<Vec<PathBuf>, EtlError> {
    info!("Cleaning build artifacts");

    let targets = if config.clean_targets.is_empty() {
        vec![config.target_path.clone()]
    } else {
        config.clean_targets.clone()
    };

    // Refuse the whole request before touching anything.
    if let Some(bad) = targets.iter().find(|t| !is_contained(t)) {
        return Err(EtlError::UnsafePath(bad.clone()));
    }

    let mut removed = Vec::new();
    for target in targets {
        let full_path = project_dir.join(&target);
        if !full_path.exists() {
            continue;
        }
        if full_path.is_dir() {
            fs::remove_dir_all(&full_path)?;
        } else {
            fs::remove_file(&full_path)?;
        }
        info!(path = %full_path.display(), "Artifact removed");
        removed.push(full_path);
    }

    Ok(removed)
}
