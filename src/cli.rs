//! CLI definition and dispatch.

use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvQuoteReader;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sqlite_adapter::SqliteAdapter;
use crate::domain::config_validation::load_engine_config;
use crate::domain::engine::{self, EngineConfig};
use crate::domain::error::PapertraderError;
use crate::domain::portfolio::{PortfolioSnapshot, StrategyBreakdown};
use crate::domain::position::Position;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;

#[derive(Parser, Debug)]
#[command(name = "papertrader", about = "Paper-trading signal and execution engine")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true, default_value = "papertrader.ini")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database schema
    Init,
    /// Import quotes from a CSV file
    Import {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Compute indicators and generate strategy signals
    Signals,
    /// Reconcile signals against positions and execute paper trades
    Execute,
    /// Aggregate the portfolio into a summary snapshot
    Portfolio,
    /// Run signals, execute and portfolio in sequence
    All,
    /// Show the latest portfolio snapshot and open positions
    Status {
        #[arg(long)]
        json: bool,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match load_config(&cli.config) {
        Ok(c) => c,
        Err(code) => return code,
    };
    init_logging(&config);

    match dispatch(&cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured `[logging] level`. Logs go to stderr.
pub fn init_logging(config: &dyn ConfigPort) {
    let level = config
        .get_string("logging", "level")
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    let ansi = config.get_bool("logging", "ansi", true);
    let json = config
        .get_string("logging", "format")
        .is_some_and(|f| f.eq_ignore_ascii_case("json"));

    // A subscriber may already be installed when run more than once per process.
    let _ = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(ansi)
            .with_writer(std::io::stderr)
            .try_init()
    };
}

fn open_store(config: &dyn ConfigPort) -> Result<SqliteAdapter, PapertraderError> {
    let store = SqliteAdapter::from_config(config)?;
    store.initialize_schema()?;
    Ok(store)
}

fn dispatch(command: &Command, config: &FileConfigAdapter) -> Result<(), PapertraderError> {
    let engine_config = load_engine_config(config)?;
    tracing::debug!(
        symbols = engine_config.universe.count(),
        pairs = engine_config.universe.pairs.len(),
        "configuration loaded and validated"
    );

    match command {
        Command::Init => run_init(config),
        Command::Import { file } => run_import(config, file),
        Command::Signals => run_signals(&open_store(config)?, &engine_config),
        Command::Execute => run_execute(&open_store(config)?, &engine_config),
        Command::Portfolio => run_portfolio(&open_store(config)?, &engine_config),
        Command::All => run_all(&open_store(config)?, &engine_config),
        Command::Status { json } => run_status(&open_store(config)?, *json),
    }
}

fn run_init(config: &dyn ConfigPort) -> Result<(), PapertraderError> {
    open_store(config)?;
    let path = config
        .get_string("database", "path")
        .unwrap_or_default();
    eprintln!("Initialized database at {path}");
    Ok(())
}

fn run_import(config: &dyn ConfigPort, file: &Path) -> Result<(), PapertraderError> {
    let quotes = CsvQuoteReader::read_file(file)?;
    let store = open_store(config)?;
    let written = store.insert_quotes(&quotes)?;
    tracing::info!(file = %file.display(), quotes = written, "quotes imported");
    eprintln!("Imported {written} quotes from {}", file.display());
    Ok(())
}

fn run_signals(store: &SqliteAdapter, config: &EngineConfig) -> Result<(), PapertraderError> {
    let report = engine::generate_signals(store, store, config, Utc::now())?;
    eprintln!(
        "Signals: {} symbols evaluated, {} skipped, {} signals written",
        report.symbols_evaluated,
        report.symbols_skipped.len(),
        report.signals_written
    );
    for (strategy, count) in &report.by_strategy {
        eprintln!("  {strategy}: {count}");
    }
    Ok(())
}

fn run_execute(store: &SqliteAdapter, config: &EngineConfig) -> Result<(), PapertraderError> {
    let report = engine::execute_trades(store, store, config, Utc::now())?;
    eprintln!(
        "Execution: {} opened, {} closed, {} conflicts, {} positions marked",
        report.opened,
        report.closed,
        report.conflicts.len(),
        report.positions_refreshed
    );
    Ok(())
}

fn run_portfolio(store: &SqliteAdapter, config: &EngineConfig) -> Result<(), PapertraderError> {
    let report = engine::aggregate_portfolio(store, config, Utc::now())?;
    print_snapshot(&report.snapshot);
    Ok(())
}

fn run_all(store: &SqliteAdapter, config: &EngineConfig) -> Result<(), PapertraderError> {
    let steps: [(&str, fn(&SqliteAdapter, &EngineConfig) -> Result<(), PapertraderError>); 3] = [
        ("signals", run_signals),
        ("execute", run_execute),
        ("portfolio", run_portfolio),
    ];
    for (name, step) in steps {
        tracing::info!(step = name, "starting");
        if let Err(e) = step(store, config) {
            tracing::error!(step = name, error = %e, "pipeline stopped");
            return Err(e);
        }
    }
    eprintln!("Pipeline completed successfully");
    Ok(())
}

#[derive(Debug, Serialize)]
struct StatusReport {
    snapshot: Option<PortfolioSnapshot>,
    positions: Vec<Position>,
    breakdown: Vec<StrategyBreakdown>,
}

fn run_status(store: &SqliteAdapter, json: bool) -> Result<(), PapertraderError> {
    let status = StatusReport {
        snapshot: store.latest_portfolio_snapshot()?,
        positions: store.open_positions()?,
        breakdown: store.latest_strategy_breakdown()?,
    };

    if json {
        let out = serde_json::to_string_pretty(&status).map_err(std::io::Error::from)?;
        println!("{out}");
        return Ok(());
    }

    match &status.snapshot {
        Some(snapshot) => print_snapshot(snapshot),
        None => println!("No portfolio snapshot yet"),
    }

    println!("\n=== Open Positions ({}) ===", status.positions.len());
    for p in &status.positions {
        let pnl_sign = if p.unrealized_pnl >= 0.0 { "+" } else { "" };
        println!(
            "  {:<8} {:>6} @ {:>10.2}  now {:>10.2}  {}{:.2}  [{}]",
            p.symbol, p.quantity, p.entry_price, p.current_price, pnl_sign, p.unrealized_pnl, p.strategy
        );
    }

    if !status.breakdown.is_empty() {
        println!("\n=== By Strategy ===");
        for b in &status.breakdown {
            println!(
                "  {}: {} positions, value {:.2}, unrealized {:.2}",
                b.strategy, b.num_positions, b.total_position_value, b.total_unrealized_pnl
            );
        }
    }
    Ok(())
}

fn print_snapshot(snapshot: &PortfolioSnapshot) {
    println!("=== Portfolio ({}) ===", snapshot.timestamp.format("%Y-%m-%d %H:%M:%S"));
    println!("Total Value:      {:.2}", snapshot.total_value);
    println!("Total Return:     {:.2}%", snapshot.total_return_pct);
    println!("Realized P&L:     {:.2}", snapshot.realized_pnl);
    println!("Unrealized P&L:   {:.2}", snapshot.unrealized_pnl);
    println!("Win Rate:         {:.1}%", snapshot.win_rate);
    println!("Sharpe (simpl.):  {:.2}", snapshot.sharpe_ratio_simplified);
    println!("Max DD (simpl.):  {:.1}%", snapshot.max_drawdown_simplified);
    println!("Positions:        {}", snapshot.num_positions);
    println!("Trades:           {}", snapshot.num_trades);
}
