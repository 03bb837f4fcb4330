//! hacenada - do-nothing scripts for your terminal.
//!
//! Walks an operator through a runbook one step at a time, remembering the
//! answers between invocations.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hacenada::config::Config;
use hacenada::render::ConsoleRenderer;
use hacenada::report::OutputFormat;
use hacenada::{App, RunOutcome, APP_NAME, VERSION};

const SEPARATOR: &str = "---------------";

/// Do-nothing scripts: step through a runbook, one pause at a time
#[derive(Parser)]
#[command(name = APP_NAME)]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding session stores
    #[arg(long, global = true, env = "HACENADA_HOME")]
    home: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session for a script
    Start {
        /// Script file
        file: PathBuf,

        /// Archive and discard an ongoing session first
        #[arg(long)]
        start_over: bool,
    },

    /// Continue a session
    Next {
        /// Script file (defaults to the only session under the current directory)
        file: Option<PathBuf>,
    },

    /// Print a script and its answers
    Print {
        /// Script file (defaults to the only session under the current directory)
        file: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Toml)]
        format: OutputFormat,

        /// Leave the answers out
        #[arg(long)]
        no_answers: bool,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries prompts and printed scripts
    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
    tracing::debug!(version = VERSION, "Starting {APP_NAME}");

    match cli.command {
        Commands::Start { file, start_over } => cmd_start(cli.home, &file, start_over),
        Commands::Next { file } => cmd_next(cli.home, file.as_deref()),
        Commands::Print { file, format, no_answers } => {
            cmd_print(cli.home, file.as_deref(), format, !no_answers)
        }
        Commands::Config { path } => cmd_config(path),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

fn load_app(home: Option<PathBuf>) -> Result<App> {
    let config = Config::load()?;
    App::new(config, home)
}

fn console(app: &App) -> ConsoleRenderer<io::StdinLock<'static>, io::Stdout> {
    let render = &app.config().render;
    ConsoleRenderer::stdio(render.editor.clone(), render.color)
}

/// Start a session.
fn cmd_start(home: Option<PathBuf>, file: &Path, start_over: bool) -> Result<()> {
    let app = load_app(home)?;
    let outcome = app.start(file, start_over, console(&app))?;
    report_outcome(&outcome);
    Ok(())
}

/// Continue a session.
fn cmd_next(home: Option<PathBuf>, file: Option<&Path>) -> Result<()> {
    let app = load_app(home)?;
    let cwd = std::env::current_dir()?;
    let outcome = app.next(file, &cwd, console(&app))?;
    report_outcome(&outcome);
    Ok(())
}

/// Print a script.
fn cmd_print(
    home: Option<PathBuf>,
    file: Option<&Path>,
    format: OutputFormat,
    with_answers: bool,
) -> Result<()> {
    let app = load_app(home)?;
    let cwd = std::env::current_dir()?;
    let text = app.print(file, &cwd, format, with_answers)?;
    print!("{text}");
    if !text.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// Show configuration.
fn cmd_config(show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::active_path() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let config = Config::load()?;
    println!("{}", config.to_toml()?);

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
}

fn report_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Paused { .. } => println!("{SEPARATOR}"),
        RunOutcome::Canceled { label, .. } => println!("** Canceled at {label}"),
        RunOutcome::Finished { script, log } => {
            println!("{}: Cleaning up.  Log: {}", script.display(), log.human.display());
        }
    }
}
