// retail-dwh-core/src/infrastructure/fs.rs

use crate::infrastructure::error::InfrastructureError;
use serde::Serialize;
use std::io::Write;
use std::path::{Component, Path};

/// Writes `content` to `path` through a sibling temp file and a rename, so a
/// reader sees either the old file or the complete new one.
/// Missing parent directories are created.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(content.as_ref())?;
    temp_file.flush()?;
    temp_file
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;
    Ok(())
}

/// Pretty-printed JSON variant of [`atomic_write`].
pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), InfrastructureError> {
    let body = serde_json::to_vec_pretty(value)
        .map_err(|e| InfrastructureError::ConfigError(format!("Cannot serialize report: {}", e)))?;
    atomic_write(path, body)
}

/// True when `relative` stays inside the directory it is joined onto:
/// not absolute and no `..` component.
pub fn is_contained(relative: &str) -> bool {
    let p = Path::new(relative);
    !relative.trim().is_empty()
        && p.components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_creates_parents() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("target/batches/report.json");

        atomic_write(&file_path, "{}")?;
        assert_eq!(fs::read_to_string(&file_path)?, "{}");

        atomic_write(&file_path, "{\"v\":2}")?;
        assert_eq!(fs::read_to_string(&file_path)?, "{\"v\":2}");
        Ok(())
    }

    #[test]
    fn test_write_json() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("out.json");
        write_json(&file_path, &serde_json::json!({ "status": "SUCCESS" }))?;

        let back: serde_json::Value = serde_json::from_str(&fs::read_to_string(&file_path)?)?;
        assert_eq!(back["status"], "SUCCESS");
        Ok(())
    }

    #[test]
    fn test_containment() {
        assert!(is_contained("target"));
        assert!(is_contained("./target/batches"));
        assert!(!is_contained("../elsewhere"));
        assert!(!is_contained("target/../../x"));
        assert!(!is_contained("/etc"));
        assert!(!is_contained(""));
    }
}
