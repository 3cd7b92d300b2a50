//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::BacktestResult;
use crate::domain::bar::DateWindow;
use crate::domain::config_validation::{
    optional_date, parse_symbols, validate_all, validate_data_config,
    validate_monte_carlo_config, validate_strategy_config,
};
use crate::domain::error::MeanrevError;
use crate::domain::metrics::{top_losers, top_winners, SymbolSummary, TradeStats};
use crate::domain::monte_carlo::{run_monte_carlo_with_progress, McConfig, McReport};
use crate::domain::portfolio::{Portfolio, MIN_BARS};
use crate::domain::position::StopRule;
use crate::domain::squeeze::{BollingerSqueeze, SqueezeParams};
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const TOP_TRADES: usize = 5;

#[derive(Parser, Debug)]
#[command(
    name = "meanrev",
    about = "Mean-reversion backtester with Monte Carlo validation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over the configured portfolio
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Backtest a single symbol instead of the configured list
        #[arg(long)]
        symbol: Option<String>,
        /// Directory for trades.csv and transactions.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare the real return against synthetic random-walk portfolios
    MonteCarlo {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        iterations: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        /// Run trials on a single thread
        #[arg(long)]
        sequential: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbol,
            output,
        } => run_backtest(&config, symbol.as_deref(), output.as_deref()),
        Command::MonteCarlo {
            config,
            iterations,
            seed,
            sequential,
        } => run_mc(&config, iterations, seed, sequential),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
    }
}

fn fail(err: MeanrevError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

pub fn build_strategy(config: &dyn ConfigPort) -> Strategy {
    let defaults = SqueezeParams::default();
    let params = SqueezeParams {
        window: config.get_int("strategy", "window", defaults.window as i64) as usize,
        width: config.get_double("strategy", "width", defaults.width),
        bandwidth_window: config.get_int(
            "strategy",
            "bandwidth_window",
            defaults.bandwidth_window as i64,
        ) as usize,
        squeeze_factor: config.get_double("strategy", "squeeze_factor", defaults.squeeze_factor),
        squeeze_lookback: config.get_int(
            "strategy",
            "squeeze_lookback",
            defaults.squeeze_lookback as i64,
        ) as usize,
        expansion_factor: config.get_double(
            "strategy",
            "expansion_factor",
            defaults.expansion_factor,
        ),
        perc_b_upper_threshold: config.get_double(
            "strategy",
            "perc_b_upper_threshold",
            defaults.perc_b_upper_threshold,
        ),
        perc_b_lower_threshold: config.get_double(
            "strategy",
            "perc_b_lower_threshold",
            defaults.perc_b_lower_threshold,
        ),
    };

    let stop = if config.get_bool("strategy", "stop_loss", false) {
        StopRule::FixedPercent(config.get_double("strategy", "stop_loss_perc", 0.1))
    } else {
        StopRule::None
    };

    let name = config
        .get_string("strategy", "name")
        .unwrap_or_else(|| "Bollinger Squeeze".to_string());

    Strategy::new(name, Box::new(BollingerSqueeze::new(params)), stop)
}

/// `[monte_carlo]` settings with command-line overrides applied.
pub fn build_mc_config(
    config: &dyn ConfigPort,
    iterations: Option<usize>,
    seed: Option<u64>,
    sequential: bool,
) -> McConfig {
    let defaults = McConfig::default();
    McConfig {
        iterations: iterations.unwrap_or_else(|| {
            config.get_int("monte_carlo", "iterations", defaults.iterations as i64) as usize
        }),
        seed: seed.unwrap_or_else(|| config.get_u64("monte_carlo", "seed", defaults.seed)),
        parallel: !sequential && config.get_bool("monte_carlo", "parallel", defaults.parallel),
    }
}

pub fn build_date_window(config: &dyn ConfigPort) -> Result<DateWindow, MeanrevError> {
    Ok(DateWindow {
        start: optional_date(config, "start_date")?,
        end: optional_date(config, "end_date")?,
    })
}

/// The override, else `[data] symbols`, else every symbol the data port has.
pub fn resolve_symbols(
    symbol_override: Option<&str>,
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
) -> Result<Vec<String>, MeanrevError> {
    if let Some(s) = symbol_override {
        return Ok(vec![s.trim().to_uppercase()]);
    }
    match config.get_string("data", "symbols") {
        Some(list) => Ok(parse_symbols(&list)),
        None => data_port.list_symbols(),
    }
}

/// Fetch every symbol, skipping those without usable data, then optionally
/// drop instruments whose length differs from the rest.
pub fn load_portfolio(
    data_port: &dyn DataPort,
    symbols: &[String],
    window: &DateWindow,
    cleanse: bool,
) -> Result<Portfolio, MeanrevError> {
    let mut portfolio = Portfolio::new();

    for symbol in symbols {
        let bars = match data_port.fetch_bars(symbol, window) {
            Ok(bars) => bars,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "skipping symbol");
                continue;
            }
        };
        if bars.len() < MIN_BARS {
            let e = MeanrevError::InsufficientData {
                symbol: symbol.clone(),
                bars: bars.len(),
                minimum: MIN_BARS,
            };
            warn!(symbol = %symbol, error = %e, "skipping symbol");
            continue;
        }
        portfolio.insert(symbol.as_str(), bars);
    }

    if cleanse {
        let dropped = portfolio.cleanse();
        if !dropped.is_empty() {
            warn!(
                dropped = %dropped.join(", "),
                "dropped instruments with non-modal bar counts"
            );
        }
    }

    if portfolio.is_empty() {
        return Err(MeanrevError::EmptyPortfolio);
    }
    Ok(portfolio)
}

/// Config, strategy and cleaned portfolio shared by `backtest` and
/// `monte-carlo`.
fn prepare(
    config_path: &Path,
    symbol_override: Option<&str>,
) -> Result<(FileConfigAdapter, Strategy, Portfolio), ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;
    validate_all(&config).map_err(fail)?;

    let strategy = build_strategy(&config);
    eprintln!("Loading strategy: {}", strategy.name);

    let window = build_date_window(&config).map_err(fail)?;
    let directory = config
        .get_string("data", "directory")
        .map(PathBuf::from)
        .unwrap_or_default();
    let data_port = CsvAdapter::new(directory);

    let symbols = resolve_symbols(symbol_override, &config, &data_port).map_err(fail)?;
    let cleanse = config.get_bool("data", "cleanse", true);
    let portfolio = load_portfolio(&data_port, &symbols, &window, cleanse).map_err(fail)?;
    eprintln!(
        "Loaded {} of {} instruments",
        portfolio.len(),
        symbols.len()
    );

    Ok((config, strategy, portfolio))
}

fn run_backtest(
    config_path: &Path,
    symbol_override: Option<&str>,
    output: Option<&Path>,
) -> ExitCode {
    let (config, strategy, portfolio) = match prepare(config_path, symbol_override) {
        Ok(p) => p,
        Err(code) => return code,
    };

    eprintln!("Running backtest: {} instruments", portfolio.len());
    let result = strategy.backtest(&portfolio);
    print_backtest_summary(&result);

    let output_dir = output
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("report", "output_dir").map(PathBuf::from));
    if let Some(dir) = output_dir {
        if let Err(e) = CsvReportAdapter::new().write_backtest(&result, &dir) {
            return fail(e);
        }
        eprintln!("\nReport written to: {}", dir.display());
    }

    ExitCode::SUCCESS
}

pub fn print_backtest_summary(result: &BacktestResult) {
    let stats = TradeStats::compute(&result.trades);

    eprintln!("\n=== Aggregate Results ===");
    eprintln!("Cumulative Return: {:.2}%", result.cumulative_return * 100.0);
    eprintln!("Total Trades:      {}", stats.total_trades);
    eprintln!("Win Rate:          {:.1}%", stats.win_rate * 100.0);
    eprintln!("Mean Return:       {:.2}%", stats.mean_return * 100.0);
    eprintln!("Profit Factor:     {:.2}", stats.profit_factor);
    match stats.mean_days_held {
        Some(days) => eprintln!("Mean Days Held:    {days:.1}"),
        None => eprintln!("Mean Days Held:    n/a"),
    }

    let summaries = SymbolSummary::compute_per_symbol(&result.trades);
    if !summaries.is_empty() {
        eprintln!("\n=== Per-Symbol Summary ===");
        for s in &summaries {
            let sign = if s.total_return >= 0.0 { "+" } else { "" };
            eprintln!(
                "  {}:  {} trades, {:.1}% win rate, {}{:.2}%",
                s.symbol,
                s.total_trades,
                s.win_rate * 100.0,
                sign,
                s.total_return * 100.0,
            );
        }
    }

    for (title, trades) in [
        ("Top Winners", top_winners(&result.trades, TOP_TRADES)),
        ("Top Losers", top_losers(&result.trades, TOP_TRADES)),
    ] {
        if trades.is_empty() {
            continue;
        }
        eprintln!("\n=== {title} ===");
        for t in trades {
            eprintln!(
                "  {} {} {} -> {}: {:+.2}%",
                t.symbol,
                t.direction,
                t.entry_date,
                t.close_date,
                t.trade_return * 100.0,
            );
        }
    }

    if !result.open_at_end.is_empty() {
        let open: Vec<&str> = result.open_at_end.iter().map(String::as_str).collect();
        eprintln!("\nOpen at end of window: {}", open.join(", "));
    }
    if !result.failed.is_empty() {
        eprintln!("\nFailed instruments: {}", result.instruments_failed());
        for f in &result.failed {
            eprintln!("  {}: {}", f.symbol, f.error);
        }
    }
}

fn run_mc(
    config_path: &Path,
    iterations: Option<usize>,
    seed: Option<u64>,
    sequential: bool,
) -> ExitCode {
    let (config, strategy, portfolio) = match prepare(config_path, None) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let mc_config = build_mc_config(&config, iterations, seed, sequential);
    eprintln!(
        "Running Monte Carlo: {} iterations, seed {}{}",
        mc_config.iterations,
        mc_config.seed,
        if mc_config.parallel { "" } else { " (sequential)" },
    );

    let done = AtomicUsize::new(0);
    let step = (mc_config.iterations / 10).max(1);
    let report = run_monte_carlo_with_progress(&strategy, &portfolio, mc_config, |_, total| {
        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
        if n % step == 0 || n == total {
            eprintln!("  Completed: {n}/{total}");
        }
    });

    match report {
        Ok(report) => {
            print_mc_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

pub fn format_success_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{:.1}%", r * 100.0),
        None => "undefined".to_string(),
    }
}

pub fn print_mc_summary(report: &McReport) {
    eprintln!("\n=== Monte Carlo Results ===");
    eprintln!("Real Return:     {:.2}%", report.real_return * 100.0);
    eprintln!("Real Trades:     {}", report.real_trades);
    eprintln!("Iterations:      {}", report.iterations);
    eprintln!("Valid Trials:    {}", report.valid_trials);
    eprintln!("Skipped Trials:  {}", report.skipped_trials);
    eprintln!("Successes:       {}", report.success_count);
    eprintln!(
        "Success Rate:    {}",
        format_success_rate(report.success_rate)
    );
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    for check in [
        validate_data_config,
        validate_strategy_config,
        validate_monte_carlo_config,
    ] {
        if let Err(e) = check(&config) {
            return fail(e);
        }
    }

    let strategy = build_strategy(&config);
    let mc = build_mc_config(&config, None, None, false);

    eprintln!("\nStrategy: {}", strategy.name);
    eprintln!("  features: {}", strategy.features.name());
    match strategy.stop {
        StopRule::None => eprintln!("  stop:     none"),
        StopRule::FixedPercent(p) => eprintln!("  stop:     {:.1}% from entry", p * 100.0),
    }
    eprintln!("  columns:  {}", strategy.features.feature_names().join(", "));

    eprintln!("\nMonte Carlo:");
    eprintln!("  iterations: {}", mc.iterations);
    eprintln!("  seed:       {}", mc.seed);
    eprintln!("  parallel:   {}", mc.parallel);

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_list_symbols(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_data_config(&config) {
        return fail(e);
    }

    let directory = config
        .get_string("data", "directory")
        .map(PathBuf::from)
        .unwrap_or_default();
    let symbols = match CsvAdapter::new(directory.clone()).list_symbols() {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", directory.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}
