// retail-dwh/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Args, Parser, Subcommand, ValueEnum};
use retail_dwh_core::domain::LoadMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "retail-dwh")]
#[command(about = "Retail staging ETL with data-quality quarantine and batch audit", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project directory (holds retail_dwh.yaml)
    #[arg(long, default_value = ".", env = "RETAIL_DWH_PROJECT_DIR")]
    pub project_dir: PathBuf,

    /// Explicit configuration file, instead of discovery in the project directory
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Reload the whole source and refresh staging
    Full,
    /// Load only records newer than the last successful batch
    Incremental,
}

impl From<ModeArg> for LoadMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Full => LoadMode::Full,
            ModeArg::Incremental => LoadMode::Incremental,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🚀 Runs one ETL batch (extract -> quality rules -> classify -> load)
    Run {
        #[arg(long, value_enum, default_value_t = ModeArg::Full)]
        mode: ModeArg,

        #[command(flatten)]
        project: ProjectArgs,
    },

    /// 🏗️  Creates the warehouse schema and tables
    Provision {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// 📜 Shows the batch log, newest first
    Batches {
        #[command(flatten)]
        project: ProjectArgs,

        /// Number of batches to display
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// 🔬 Shows data-quality metrics of one batch
    Quality {
        #[command(flatten)]
        project: ProjectArgs,

        #[arg(long)]
        batch_id: String,
    },

    /// 🧹 Cleans build artifacts (target/ folder)
    Clean {
        #[command(flatten)]
        project: ProjectArgs,
    },
}
