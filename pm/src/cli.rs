//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// pm - feedback prioritization and plan approval for product managers
#[derive(Parser)]
#[command(
    name = "pm",
    about = "Prioritize user feedback and turn it into an approved product plan",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Gather feedback, classify sentiment and rank feature requests
    Analyze {
        /// Where to write the analysis (defaults to the configured output path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only read the chat channel, skip the bundled web/social/email feedback
        #[arg(long)]
        no_fixtures: bool,
    },

    /// Pick a ranked feature request and plan it
    Select {
        /// Analysis file to read (defaults to the configured output path)
        #[arg(short, long)]
        analysis: Option<PathBuf>,
    },

    /// Generate, review and approve a plan for a goal
    Plan {
        /// The goal to plan; asked for interactively when omitted
        goal: Option<String>,
    },
}

/// Path of the log file
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pmagent")
        .join("logs")
        .join("pmagent.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// The after_help text: config search order and log location
pub fn generate_after_help() -> String {
    debug!("generate_after_help: called");
    let mut help = String::new();

    help.push_str("Config is read from (first found):\n");
    help.push_str("  --config <PATH>\n");
    help.push_str("  ./.pmagent.yml\n");
    if let Some(dir) = dirs::config_dir() {
        help.push_str(&format!("  {}\n", dir.join("pmagent").join("pmagent.yml").display()));
    }

    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));
    help
}
