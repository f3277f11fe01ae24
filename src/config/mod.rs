pub mod batch_config;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "campus-enroll")]
#[command(about = "Bulk enrollment runner for the campus management backend")]
pub struct CliConfig {
    /// Batch description file (TOML)
    #[arg(long, default_value = "./batch.toml")]
    pub batch_file: String,

    /// Override the API base URL from the batch file
    #[arg(long)]
    pub base_url: Option<String>,

    /// Size of the locally cached enrollment window
    #[arg(long, default_value = "100")]
    pub window_size: u32,

    /// Proceed even when some students are rejected by local validation
    #[arg(long)]
    pub yes: bool,

    /// Partition only; never dispatch creation requests
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}
