//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - fetch: drain a list of tabs through the rate limiter
//! - preview: load a single tab
//! - config: print the effective configuration

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use tabfetch::domain::{FetchMode, TabRef};

/// tabfetch - rate-limited stash tab fetching
#[derive(Parser, Debug)]
#[command(name = "tabfetch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Options shared by every command that talks to the API
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// League the tabs belong to
    #[arg(short, long)]
    pub league: String,

    /// Fetch a derived sample instead of the full content
    #[arg(short, long)]
    pub sample: bool,

    /// Answer from an in-memory provider instead of the network
    #[arg(long)]
    pub dry_run: bool,
}

impl FetchArgs {
    pub fn mode(&self) -> FetchMode {
        if self.sample {
            FetchMode::DerivedSample
        } else {
            FetchMode::FullContent
        }
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a batch of tabs, one at a time
    Fetch {
        #[command(flatten)]
        args: FetchArgs,

        /// Tabs to fetch, as ID or ID=NAME
        #[arg(required = true)]
        tabs: Vec<String>,
    },

    /// Load a single tab
    Preview {
        #[command(flatten)]
        args: FetchArgs,

        /// Tab ID
        id: String,
    },

    /// Print the effective configuration
    Config,
}

/// Parse `ID` or `ID=NAME`.
pub fn parse_tab(arg: &str) -> TabRef {
    match arg.split_once('=') {
        Some((id, name)) if !name.is_empty() => TabRef::new(id, name),
        Some((id, _)) => TabRef::new(id, id),
        None => TabRef::new(arg, arg),
    }
}
