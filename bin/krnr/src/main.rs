//! krnr - run saved shell command sequences
//!
//! Command-line front end over the library's streaming runner.
//!
//! ```bash
//! # Run two command lines in order, streaming their output
//! krnr run "echo hello" "ls -la"
//!
//! # Show what would run without running it
//! krnr run --dry-run --verbose "make deploy"
//!
//! # Validate command lines without running them
//! krnr check "rm -rf ./build"
//! ```

use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use krnr::{
    prepare_command, AdapterOptions, Config, ConfigLoader, Executor, ExecutorAdapter, InputMode,
    RunEvent, StreamingRunner,
};

/// Exit status used when the run hits its deadline
const EXIT_TIMEOUT: u8 = 124;

/// Exit status used when the user interrupts the run
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "krnr",
    about = "Run named sequences of shell commands with live, sanitized output",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (also KRNR_DEBUG=1)
    #[arg(short, long, global = true)]
    debug: bool,

    /// Configuration file (also KRNR_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run command lines in order, stopping at the first failure
    Run(RunArgs),
    /// Sanitize and validate command lines without running them
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Validate and announce commands without running them
    #[arg(long)]
    dry_run: bool,

    /// Report dry-run commands
    #[arg(short, long)]
    verbose: bool,

    /// Shell to run commands with (bash, zsh, pwsh, powershell, ...)
    #[arg(long, value_name = "SHELL")]
    shell: Option<String>,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Do not print the "-> command" announcement lines
    #[arg(long)]
    suppress_command: bool,

    /// Working directory for every command
    #[arg(long, value_name = "DIR")]
    cwd: Option<PathBuf>,

    /// Print one JSON object per event
    #[arg(long)]
    json: bool,

    /// Command lines, one per argument
    #[arg(required = true, value_name = "COMMAND")]
    commands: Vec<String>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Command lines, one per argument
    #[arg(required = true, value_name = "COMMAND")]
    commands: Vec<String>,
}

/// How a subcommand ended
enum Outcome {
    Completed,
    Failed(u8),
    TimedOut(Duration),
    Interrupted,
}

fn env_debug() -> bool {
    env::var("KRNR_DEBUG")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn init_logging(debug: bool, config: Option<&Config>) {
    let fallback = if debug {
        "debug".to_string()
    } else {
        config
            .map(|c| c.logging.level.clone())
            .unwrap_or_else(|| "warn".to_string())
    };
    let env_filter = env::var("RUST_LOG").unwrap_or(fallback);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from(env_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = ConfigLoader::resolve(cli.config.as_deref());
    init_logging(cli.debug || env_debug(), loaded.as_ref().ok());
    debug!("Parsed CLI arguments: {:?}", cli);

    let outcome = match (loaded, cli.command) {
        (_, Commands::Check(args)) => Ok(check(&args)),
        (Ok(config), Commands::Run(args)) => run(config, args).await,
        (Err(e), Commands::Run(_)) => Err(anyhow::Error::from(e).context("failed to load configuration")),
    };

    match outcome {
        Ok(Outcome::Completed) => ExitCode::SUCCESS,
        Ok(Outcome::Failed(code)) => ExitCode::from(code),
        Ok(Outcome::TimedOut(after)) => {
            eprintln!("krnr: timed out after {}s", after.as_secs());
            ExitCode::from(EXIT_TIMEOUT)
        }
        Ok(Outcome::Interrupted) => {
            eprintln!("krnr: interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(e) => {
            error!("krnr failed: {:?}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// `krnr check`: report every command, fail if any is rejected
fn check(args: &CheckArgs) -> Outcome {
    let mut failed = false;
    for raw in &args.commands {
        match prepare_command(raw) {
            Ok(cmd) => println!("ok: {}", cmd),
            Err(e) => {
                failed = true;
                println!("rejected: {}", e);
            }
        }
    }
    if failed {
        Outcome::Failed(1)
    } else {
        Outcome::Completed
    }
}

/// `krnr run`
async fn run(mut config: Config, args: RunArgs) -> Result<Outcome> {
    config.execution.dry_run |= args.dry_run;
    config.execution.verbose |= args.verbose;
    if args.shell.is_some() {
        config.execution.shell = args.shell.clone();
    }
    if let Some(secs) = args.timeout {
        config.run.timeout_secs = secs;
    }
    config.validate().context("invalid run options")?;

    let executor = Executor::new(config.execution.clone())
        .with_poll_interval(config.run.poll_interval());
    let options = AdapterOptions {
        input: InputMode::Inherit,
        cwd: args.cwd.clone(),
        ..AdapterOptions::from(&config.run)
    };
    let adapter = ExecutorAdapter::with_options(Arc::new(executor), options);

    let token = CancellationToken::new();
    let mut handle = adapter
        .run(&token, args.commands.clone())
        .context("failed to start run")?;
    info!("Started run {}", handle.id());

    let timeout = config.run.timeout();
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let mut stopped_by: Option<Outcome> = None;
    let mut outcome = Outcome::Completed;
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            event = handle.next_event() => {
                let Some(event) = event else { break };
                if let RunEvent::Failed(err) = &event {
                    let code = err
                        .exit_code()
                        .and_then(|c| u8::try_from(c).ok())
                        .filter(|c| *c != 0);
                    outcome = Outcome::Failed(code.unwrap_or(1));
                }
                print_event(&mut stdout, &event, &args).context("failed to write output")?;
            }
            _ = &mut deadline, if stopped_by.is_none() => {
                debug!("Run deadline of {:?} reached", timeout);
                stopped_by = Some(Outcome::TimedOut(timeout));
                token.cancel();
            }
            _ = tokio::signal::ctrl_c(), if stopped_by.is_none() => {
                stopped_by = Some(Outcome::Interrupted);
                token.cancel();
            }
        }
    }

    Ok(stopped_by.unwrap_or(outcome))
}

fn print_event(out: &mut impl Write, event: &RunEvent, args: &RunArgs) -> std::io::Result<()> {
    if args.suppress_command && event.is_announcement() {
        return Ok(());
    }
    if args.json {
        return writeln!(out, "{}", event.to_json());
    }
    match event {
        RunEvent::Command(line) | RunEvent::Line(line) => writeln!(out, "{}", line),
        RunEvent::Failed(err) => {
            out.flush()?;
            eprintln!("Error: {}", err);
            Ok(())
        }
    }
}
