//! roam - Jump between, create and keep in sync many local git repositories
//!
//! Repositories live under `<workspace>/<remote>/<owner>/<name>` and are
//! ranked by frecency, so a couple of keystrokes usually find the right one.
//! `roam home` prints the chosen path for a shell function to `cd` into.

mod batch;
mod commands;
mod config;
mod error;
mod git;
mod remote;
mod resolve;
mod selector;
mod store;
mod sync;
mod term;
mod ui;
mod workspace;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use commands::Context;
use commands::attach::AttachArgs;
use commands::home::HomeArgs;
use commands::list::ListArgs;
use commands::remove::RemoveArgs;
use commands::sync::SyncArgs;

/// Exit status after the user backs out of a prompt or chooser
const CANCELLED_EXIT_CODE: i32 = 130;

/// roam - Jump between and sync local git repositories
#[derive(Parser, Debug)]
#[command(name = "roam")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Config file (defaults to $ROAM_CONFIG, then the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Resolve a repository, create it if needed and print its path
    Home(HomeArgs),
    /// Push, pull and prune branches against origin
    Sync(SyncArgs),
    /// Bind the current directory to a repository id
    Attach(AttachArgs),
    /// Forget the current repository, keeping its files
    Detach,
    /// Delete repositories from disk and from the store
    Remove(RemoveArgs),
    /// List stored repositories
    List(ListArgs),
    /// Show local branches of the current repository
    Branch,
    /// Show tags of the current repository
    Tag,
    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::install()?;
    init_tracing(&args)?;

    match run(&args) {
        Err(e) if e.is_cancelled() => std::process::exit(CANCELLED_EXIT_CODE),
        result => Ok(result?),
    }
}

fn init_tracing(args: &Args) -> Result<()> {
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    match &args.log_file {
        Some(path) => {
            let log_file = std::fs::File::create(path)
                .wrap_err_with(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(log_file),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
    Ok(())
}

fn run(args: &Args) -> error::Result<()> {
    let refresh_api = matches!(&args.command, Cmd::Home(home) if home.refresh);
    let ctx = Context::load(args.config.as_deref(), refresh_api)?;

    match &args.command {
        Cmd::Home(home) => commands::home::run(&ctx, home),
        Cmd::Sync(sync) => commands::sync::run(&ctx, sync),
        Cmd::Attach(attach) => commands::attach::attach(&ctx, attach),
        Cmd::Detach => commands::attach::detach(&ctx),
        Cmd::Remove(remove) => commands::remove::run(&ctx, remove),
        Cmd::List(list) => commands::list::run(&ctx, list),
        Cmd::Branch => commands::inspect::branches(&ctx),
        Cmd::Tag => commands::inspect::tags(&ctx),
        Cmd::Config => commands::config::run(&ctx),
    }
}
