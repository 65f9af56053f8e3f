//! Funkliner - JavaScript Function Inliner
//!
//! CLI driver for inlining library functions into a JavaScript snippet.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use crate::config::Config;

/// JavaScript Function Inliner
#[derive(Parser, Debug)]
#[command(name = "funkliner")]
#[command(author, version, about = "Inline JavaScript library functions into their call sites")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format [default: text]
    #[arg(long, global = true)]
    format: Option<OutputFormat>,

    /// Configuration file (defaults to ./funkliner.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inline library functions into a snippet
    Inline(commands::inline::InlineArgs),

    /// Explain a diagnostic code
    Explain(commands::explain::ExplainArgs),
}

/// Check if the first non-flag argument looks like a JavaScript file
fn is_legacy_invocation(args: &[String]) -> bool {
    for arg in args.iter().skip(1) {
        if arg.starts_with('-') {
            continue;
        }
        if arg.ends_with(".js") {
            return true;
        }
        if matches!(arg.as_str(), "inline" | "explain" | "help") {
            return false;
        }
        break;
    }
    false
}

/// Transform legacy args (funkliner lib.js snippet.js) to subcommand form
fn transform_legacy_args(args: Vec<String>) -> Vec<String> {
    let mut args = args.into_iter();
    let program = args.next().unwrap_or_else(|| "funkliner".to_string());
    let mut new_args = vec![program, "inline".to_string()];
    new_args.extend(args);
    new_args
}

fn log_level(verbose: u8, quiet: bool) -> log::LevelFilter {
    if quiet {
        return log::LevelFilter::Error;
    }
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn main() -> Result<()> {
    // Handle legacy invocation (funkliner lib.js snippet.js)
    let args: Vec<String> = std::env::args().collect();
    let effective_args = if is_legacy_invocation(&args) {
        transform_legacy_args(args)
    } else {
        args
    };

    let cli = Cli::parse_from(effective_args);

    // RUST_LOG, when set, wins over -v/-q
    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose, cli.quiet))
        .parse_default_env()
        .init();

    // Determine if colors should be used
    let use_color = !cli.no_color && !cli.quiet && atty::is(atty::Stream::Stdout);

    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load(cli.config.as_deref())?;
    let format = cli.format.or(config.output.format).unwrap_or_default();

    match command {
        Commands::Inline(args) => commands::inline::run(args, &config, format, use_color, cli.verbose),
        Commands::Explain(args) => commands::explain::run(args, format, use_color),
    }
}
