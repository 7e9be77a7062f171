use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "compat-checkr",
    about = "Check whether a codebase's NuGet dependencies are usable on a target platform",
    version
)]
pub struct Cli {
    /// Directory the report files are written to
    pub output: PathBuf,

    /// Directories to scan for project manifests
    #[arg(required = true, num_args = 1..)]
    pub dirs: Vec<PathBuf>,

    /// Look packages up in the NuGet registry
    #[arg(long)]
    pub online: bool,

    /// Offline metadata catalog (TOML), consulted before the registry
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Config file [default: <first dir>/.compat-checkr/config.toml, fallback ~/.config/compat-checkr/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seconds before a single metadata lookup is abandoned (overrides config)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Report printed to stdout in addition to the output files
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Show compatible packages and diagnostics; repeat for more log output
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print the summary line
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
    None,
}
