use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.4.2" for releases, "0.4.2@abc1234 2024-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "mrml", bin_name = "mrml", version = get_version())]
#[command(about = "Inspect, check and normalize MRML scene files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding mrml.json (defaults to the user config directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the nodes of a scene file
    Inspect {
        file: PathBuf,

        /// Print the node list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report dangling references and reference-table problems
    Check { file: PathBuf },

    /// Re-write a scene file in canonical form
    Normalize {
        file: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}
