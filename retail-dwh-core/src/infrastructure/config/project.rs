// retail-dwh-core/src/infrastructure/config/project.rs

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use validator::Validate;

use crate::infrastructure::config::settings::EtlConfig;
use crate::infrastructure::error::InfrastructureError;

pub const CONFIG_CANDIDATES: [&str; 2] = ["retail_dwh.yaml", "retail_dwh_conf.yaml"];

pub const ENV_SOURCE_PATH: &str = "RETAIL_DWH_SOURCE_PATH";
pub const ENV_DB_PATH: &str = "RETAIL_DWH_DB_PATH";
pub const ENV_TARGET_PATH: &str = "RETAIL_DWH_TARGET_PATH";

// --- LOADER ---

/// Loads, layers and validates the project configuration.
///
/// `explicit` wins over discovery in `project_dir`. Relative paths in the file
/// are anchored on `project_dir`; environment overrides are applied last and
/// used verbatim.
#[instrument(skip(project_dir, explicit))]
pub fn load_etl_config(
    project_dir: &Path,
    explicit: Option<&Path>,
) -> Result<EtlConfig, InfrastructureError> {
    // 1. Discovery
    let config_path = match explicit {
        Some(p) if p.is_file() => p.to_path_buf(),
        Some(p) => return Err(InfrastructureError::ConfigNotFound(p.display().to_string())),
        None => find_main_config(project_dir)?,
    };
    info!(path = ?config_path, "Loading project configuration");

    // 2. Base YAML
    let content = fs::read_to_string(&config_path)?;
    let mut config: EtlConfig = serde_yaml::from_str(&content)?;
    config.resolve_paths(project_dir);

    // 3. Layering from the environment
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    // 4. Fail fast on invalid values
    config.validate()?;
    Ok(config)
}

fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    for filename in CONFIG_CANDIDATES {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "No configuration file found in {:?}. Checked: {:?}",
        root, CONFIG_CANDIDATES
    )))
}

/// Applies `RETAIL_DWH_*` overrides read through `lookup`.
pub fn apply_env_overrides<F>(config: &mut EtlConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup(ENV_SOURCE_PATH) {
        info!(old = ?config.source.path, new = ?val, "Overriding source path via ENV");
        config.source.path = val;
    }
    if let Some(val) = lookup(ENV_DB_PATH) {
        info!(old = ?config.warehouse.path, new = ?val, "Overriding warehouse path via ENV");
        config.warehouse.path = val;
    }
    if let Some(val) = lookup(ENV_TARGET_PATH) {
        info!(old = ?config.target_path, new = ?val, "Overriding target path via ENV");
        config.target_path = val;
    }
}
