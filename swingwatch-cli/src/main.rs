//! SwingWatch CLI: run, reset, state and config commands.
//!
//! Commands:
//! - `run`: evaluate the watchlist once (`--mode scan|monitor`)
//! - `reset`: queue manual resets, applied at the start of the next run
//! - `state`: print the persisted state book
//! - `init-config`: write the default config file

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use swingwatch_runner::{
    init_logging, provider_from_config, sink_from_config, AppConfig, JsonFileStore, LogFormat,
    LogSink, MemoryStore, ResetInbox, RunMode, Runner, StateStore,
};

const DEFAULT_CONFIG: &str = "swingwatch.toml";

#[derive(Parser)]
#[command(
    name = "swingwatch",
    version,
    about = "SwingWatch: swing-trade signal watcher for a stock watchlist"
)]
struct Cli {
    /// Config file. Defaults to ./swingwatch.toml, or built-in defaults if that is absent.
    #[arg(long, global = true, env = "SWINGWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "SWINGWATCH_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every watched ticker once.
    Run {
        /// scan: trend + trigger bars, entries allowed.
        /// monitor: open positions, trigger bars only.
        #[arg(long, default_value = "scan", env = "SWINGWATCH_MODE")]
        mode: RunMode,

        /// Log alerts instead of sending them and do not write state.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Force tickers flat on the next run.
    Reset {
        #[arg(required = true)]
        symbols: Vec<String>,
    },
    /// Print the state book as JSON.
    State {
        /// Only tickers with an open position.
        #[arg(long, default_value_t = false)]
        open: bool,
    },
    /// Write the default configuration.
    InitConfig {
        #[arg(default_value = DEFAULT_CONFIG)]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(LogFormat::from_flag(cli.log_json));

    match cli.command {
        Commands::Run { mode, dry_run } => run_watchlist(cli.config.as_deref(), mode, dry_run),
        Commands::Reset { symbols } => run_reset(cli.config.as_deref(), &symbols),
        Commands::State { open } => run_state(cli.config.as_deref(), open),
        Commands::InitConfig { path, force } => run_init_config(&path, force),
    }
}

/// An explicit path must exist; the implicit default may be absent.
fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            AppConfig::from_file(Path::new(DEFAULT_CONFIG))?
        }
        None => {
            info!("no {DEFAULT_CONFIG} found, using built-in defaults");
            AppConfig::default()
        }
    };
    Ok(config)
}

fn run_watchlist(config_path: Option<&Path>, mode: RunMode, dry_run: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let provider = provider_from_config(&config).context("bar source")?;

    let summary = if dry_run {
        // Seeded copy: the run sees real state but nothing is written back.
        let memory = MemoryStore::new(JsonFileStore::read_only(&config.paths.state_file).load()?);
        let sink = LogSink { intentional: true };
        Runner::new(&config, provider.as_ref(), &sink, &memory)?.run(mode)?
    } else {
        let file_store = JsonFileStore::new(&config.paths.state_file);
        let sink = sink_from_config(&config.alerts).context("alert sink")?;
        let inbox = ResetInbox::new(&config.paths.reset_file);
        Runner::new(&config, provider.as_ref(), sink.as_ref(), &file_store)?
            .with_reset_inbox(&inbox)
            .run(mode)?
    };

    println!("{mode}: {summary}");
    Ok(())
}

fn run_reset(config_path: Option<&Path>, symbols: &[String]) -> Result<()> {
    let config = load_config(config_path)?;
    let symbols: Vec<String> = symbols.iter().map(|s| s.trim().to_uppercase()).collect();
    if symbols.iter().any(|s| s.is_empty()) {
        bail!("empty symbol");
    }
    let unknown: Vec<&str> = symbols
        .iter()
        .map(String::as_str)
        .filter(|s| !config.symbols().contains(s))
        .collect();
    if !unknown.is_empty() {
        info!(symbols = ?unknown, "not in the watchlist, reset still queued");
    }

    let inbox = ResetInbox::new(&config.paths.reset_file);
    inbox.request(&symbols, Utc::now())?;
    println!(
        "Queued reset for {} (applied on the next run): {}",
        symbols.join(", "),
        inbox.path().display()
    );
    Ok(())
}

fn run_state(config_path: Option<&Path>, open_only: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let mut book = JsonFileStore::read_only(&config.paths.state_file).load()?;
    if open_only {
        book.retain(|_, state| state.is_open());
    }
    println!("{}", serde_json::to_string_pretty(&book)?);
    Ok(())
}

fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let text = AppConfig::default().to_toml()?;
    std::fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
