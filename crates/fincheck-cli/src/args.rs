use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fincheck - plausibility checks for bank transactions
#[derive(Parser, Debug)]
#[command(name = "fincheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path (default: ./config/fincheck.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Rule file, overrides `rules.path`
    #[arg(short, long, global = true)]
    pub rules: Option<PathBuf>,

    /// Reject rules whose condition cannot match
    #[arg(long, global = true)]
    pub strict: bool,

    /// Reload the rule file when it changes, overrides `rules.watch`
    #[arg(short, long, global = true)]
    pub watch: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load and validate the rule file
    Check,

    /// Evaluate one transaction or a JSON array of transactions
    Eval {
        /// JSON file, `-` reads stdin
        #[arg(short, long, default_value = "-")]
        transaction: String,
    },

    /// Evaluate JSON lines from stdin (hot reload with `rules.watch`)
    Stream,

    /// Print the effective configuration as TOML
    Config,
}
