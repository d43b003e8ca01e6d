use clap::{Parser, Subcommand};
use clap_complete::Shell;

use secretary_core::VERSION;

/// Secretary - a passphrase-protected store of secrets
#[derive(Parser)]
#[command(name = "secretary")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database used by `db create` and `db read` when no file is given
    #[arg(short, long, global = true, env = "SECRETARY_DB")]
    pub database: Option<String>,

    /// Config file (defaults to $XDG_CONFIG_HOME/secretary/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Start with command tracing enabled
    #[arg(long)]
    pub trace: bool,

    /// Quiet mode (only warnings and errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Run a command and exit; may be repeated
    #[arg(short = 'c', long = "command", value_name = "COMMAND")]
    pub commands: Vec<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
