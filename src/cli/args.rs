//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Vitrine live preview server CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: vitrine.toml)
    #[arg(short = 'C', long, default_value = "vitrine.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the preview server with live content sync
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable content watching for auto-refresh
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },

    /// Resolve an entry and print its view model once
    #[command(visible_alias = "q")]
    Query {
        #[command(flatten)]
        args: QueryArgs,
    },
}

/// Query command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct QueryArgs {
    /// Content type to query (defaults to site.content_type)
    #[arg(value_name = "CONTENT_TYPE")]
    pub content_type: Option<String>,

    /// Explicit entry id to fetch instead of resolving one
    #[arg(short, long)]
    pub entry: Option<String>,

    /// Page URL to resolve the entry from (query string carries the
    /// entry id and preview signals)
    #[arg(short, long, value_hint = clap::ValueHint::Url)]
    pub url: Option<String>,

    /// Fetch the draft shape instead of the published one
    #[arg(short = 'P', long)]
    pub preview: bool,

    /// Attach edit tag tables as if an editor session were active
    #[arg(short, long)]
    pub tags: bool,

    /// Output the normalized entry instead of the mapped view model
    #[arg(short, long)]
    pub raw: bool,

    /// Pretty-print JSON output
    #[arg(short = 'y', long)]
    pub pretty: bool,

    /// Write output to file instead of stdout
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[allow(unused)]
impl Cli {
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
    pub const fn is_query(&self) -> bool {
        matches!(self.command, Commands::Query { .. })
    }
}
