// retail-dwh/src/commands/clean.rs
//
// USE CASE: Clean build artifacts.

use retail_dwh_core::application::clean_project;

use crate::cli::ProjectArgs;
use crate::commands::load_config;

pub fn execute(project: ProjectArgs) -> anyhow::Result<()> {
    let config = load_config(&project)?;
    match clean_project(&project.project_dir, &config) {
        Ok(removed) if removed.is_empty() => println!("🧹 Nothing to clean."),
        Ok(removed) => {
            for path in removed {
                println!("   🗑️  Artifact removed: {}", path.display());
            }
        }
        Err(e) => {
            eprintln!("❌ Clean failed: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}
