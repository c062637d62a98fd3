use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pblink")]
#[command(version, about = "pblink - link ProductBoard stories to Azure DevOps work items")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (defaults to ~/.pblink/pblink.db)
    #[arg(long, global = true, env = "PBLINK_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Also log to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Link a ProductBoard story to an existing ADO work item
    Link(LinkArgs),

    /// Captured ProductBoard sessions
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Show the UI step plan
    Plan(PlanArgs),

    /// Check that Node.js and Playwright are available
    Probe,

    /// Show recent link runs
    Runs {
        /// Maximum number of runs to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct LinkArgs {
    /// ProductBoard story URL
    pub url: String,

    /// ADO work item ID
    pub story_id: String,

    /// ADO project name (falls back to the configured default project)
    #[arg(short, long)]
    pub project: Option<String>,

    /// Auth bundle JSON file; the latest stored session is used otherwise
    #[arg(long)]
    pub auth_file: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Do not record the run in the history
    #[arg(long)]
    pub no_record: bool,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store an auth bundle or a browser cookie export
    Import {
        /// JSON file with `{cookies, localStorage}` or a bare cookie array
        file: PathBuf,
        /// Label stored with the session
        #[arg(long, default_value = "import")]
        source: String,
    },

    /// Show the latest stored session (metadata only)
    Show,

    /// List stored sessions (metadata only)
    List,

    /// Log in interactively and store the resulting session
    Capture {
        /// Page to open for the login
        #[arg(long)]
        login_url: Option<String>,
    },

    /// Delete all but the newest sessions
    Prune {
        #[arg(long, default_value_t = 5)]
        keep: usize,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Validate and show this plan file instead of the configured one
    #[arg(long)]
    pub file: Option<PathBuf>,
}
