//! Vitrine - live preview sync engine for CMS-backed marketing pages.

#![allow(dead_code)]

mod cli;
mod config;
mod content;
mod core;
mod edit;
mod entry;
mod logger;
mod model;
mod preview;
mod session;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::{Config, init_config};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    logger::set_verbose(cli.verbose);

    let config = init_config(Config::load(cli)?);

    match &cli.command {
        Commands::Serve { .. } => cli::serve::run(),
        Commands::Query { args } => cli::query::run_query(args, &config),
    }
}
