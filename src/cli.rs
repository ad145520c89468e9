//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_price_cache::CsvPriceCache;
use crate::adapters::csv_report_adapter::{CsvReportAdapter, read_equity_curve, read_rebalance_log};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::universe_cache_adapter::CachedUniverseAdapter;
use crate::domain::analyzer::{DEFAULT_RISK_FREE_RATE, ResultAnalyzer};
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, OrderRequest};
use crate::domain::broker::DEFAULT_COST_RATE;
use crate::domain::config_validation::{
    parse_date, parse_rate, validate_backtest_config, validate_data_config,
};
use crate::domain::equity::EquityCurve;
use crate::domain::error::EquisimError;
use crate::domain::price::{DEFAULT_MARKET_SUFFIX, PriceBook};
use crate::domain::rebalance::RebalanceLog;
use crate::domain::universe::Universe;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;
use crate::ports::report_port::ReportPort;
use crate::ports::universe_port::UniversePort;

pub const DEFAULT_CACHE_DIR: &str = "cache";
pub const DEFAULT_UNIVERSE: &str = "nifty500";
pub const DEFAULT_OUTPUT_DIR: &str = "reports";

#[derive(Parser, Debug)]
#[command(name = "equisim", about = "Equity backtesting broker and result analyzer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay an order file through the simulated broker
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        orders: PathBuf,
        #[arg(long)]
        rebalance_log: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Analyze an existing equity curve
    Report {
        #[arg(long)]
        equity: PathBuf,
        #[arg(long)]
        benchmark: Option<PathBuf>,
        #[arg(long)]
        rebalance_log: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the constituents of the configured universe
    Universe {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            orders,
            rebalance_log,
            output,
        } => run_backtest(&config, &orders, rebalance_log.as_deref(), output.as_deref()),
        Command::Report {
            equity,
            benchmark,
            rebalance_log,
            output,
        } => run_report(
            &equity,
            benchmark.as_deref(),
            rebalance_log.as_deref(),
            output.as_deref(),
        ),
        Command::Universe { config } => run_universe(&config),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = EquisimError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Where price and universe data live, from the `[data]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub cache_dir: PathBuf,
    pub market_suffix: String,
    pub caching: bool,
}

impl DataSettings {
    pub fn price_dir(&self) -> PathBuf {
        self.cache_dir.join("stock")
    }
}

pub fn build_data_settings(adapter: &dyn ConfigPort) -> DataSettings {
    DataSettings {
        cache_dir: PathBuf::from(adapter.get_string_or("data", "cache_dir", DEFAULT_CACHE_DIR)),
        market_suffix: adapter
            .get_string("data", "market_suffix")
            .unwrap_or_else(|| DEFAULT_MARKET_SUFFIX.to_string()),
        caching: adapter.get_bool("data", "caching", true),
    }
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, EquisimError> {
    let start_date = parse_date(
        adapter.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        adapter.get_string("backtest", "end_date").as_deref(),
        "end_date",
    )?;
    let initial_capital = adapter
        .get_string("backtest", "initial_capital")
        .ok_or_else(|| EquisimError::ConfigMissing {
            section: "backtest".into(),
            key: "initial_capital".into(),
        })?
        .trim()
        .parse::<f64>()
        .map_err(|e| EquisimError::ConfigInvalid {
            section: "backtest".into(),
            key: "initial_capital".into(),
            reason: e.to_string(),
        })?;

    Ok(BacktestConfig {
        start_date,
        end_date,
        initial_capital,
        cost_rate: parse_rate(adapter, "cost_rate", DEFAULT_COST_RATE)?,
        risk_free_rate: parse_rate(adapter, "risk_free_rate", DEFAULT_RISK_FREE_RATE)?,
        benchmark: adapter
            .get_string("backtest", "benchmark")
            .filter(|b| !b.trim().is_empty()),
    })
}

pub fn build_universe(adapter: &dyn ConfigPort) -> Result<Universe, EquisimError> {
    Ok(Universe::parse(
        &adapter.get_string_or("universe", "name", DEFAULT_UNIVERSE),
    )?)
}

pub fn read_orders(path: &Path) -> Result<Vec<OrderRequest>, EquisimError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let orders = rdr
        .deserialize::<OrderRequest>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(orders)
}

/// Load every symbol the run needs, trying the bare symbol first and then
/// the suffixed one.
///
/// Symbols the port already lists as invalid are skipped; symbols with no
/// data are reported, recorded as invalid and skipped.
pub fn load_price_book(
    price_port: &dyn PricePort,
    symbols: &[String],
    market_suffix: &str,
) -> Result<PriceBook, EquisimError> {
    let invalid = price_port.invalid_symbols()?;
    let mut book = PriceBook::new(market_suffix);
    for symbol in symbols {
        let suffixed = format!("{symbol}{market_suffix}");
        if invalid.contains(symbol) || invalid.contains(&suffixed) {
            eprintln!("warning: skipping {symbol} (known invalid symbol)");
            continue;
        }
        let mut series = price_port.fetch_prices(symbol)?;
        if series.is_none() && !symbol.starts_with('^') && !symbol.ends_with(market_suffix) {
            series = price_port.fetch_prices(&suffixed)?;
        }
        match series {
            Some(s) if !s.is_empty() => book.insert(s),
            _ => {
                eprintln!("warning: no price data for {symbol}");
                price_port.record_invalid_symbol(symbol)?;
            }
        }
    }
    Ok(book)
}

/// Benchmark closes inside the backtest window, as an equity curve.
pub fn benchmark_curve(
    prices: &PriceBook,
    bt_config: &BacktestConfig,
) -> Result<Option<EquityCurve>, EquisimError> {
    let Some(symbol) = bt_config.benchmark.as_deref() else {
        return Ok(None);
    };
    let Some(series) = prices.get(symbol) else {
        return Err(EquisimError::NoData {
            symbol: symbol.to_string(),
        });
    };
    let curve = EquityCurve::from_pairs(
        series
            .bars
            .iter()
            .filter(|b| bt_config.contains(b.date))
            .map(|b| (b.date, b.close)),
    )?;
    Ok(Some(curve))
}

fn run_backtest(
    config_path: &Path,
    orders_path: &Path,
    rebalance_path: Option<&Path>,
    output_path: Option<&Path>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_backtest_config(&adapter).and_then(|_| validate_data_config(&adapter))
    {
        eprintln!("error: {e}");
        return (&e).into();
    }
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let data = build_data_settings(&adapter);

    // Stage 2: Read orders and the optional rebalance log
    let orders = match read_orders(orders_path) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: failed to read {}: {e}", orders_path.display());
            return (&e).into();
        }
    };
    let rebalance_log = match rebalance_path.map(read_rebalance_log).transpose() {
        Ok(log) => log,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let output_dir = output_path.map(Path::to_path_buf).unwrap_or_else(|| {
        PathBuf::from(adapter.get_string_or("report", "output_dir", DEFAULT_OUTPUT_DIR))
    });
    let cache = CsvPriceCache::new(data.price_dir());

    run_backtest_pipeline(
        &cache,
        &bt_config,
        &orders,
        rebalance_log,
        &data.market_suffix,
        &output_dir,
    )
}

pub fn run_backtest_pipeline(
    price_port: &dyn PricePort,
    bt_config: &BacktestConfig,
    orders: &[OrderRequest],
    rebalance_log: Option<RebalanceLog>,
    market_suffix: &str,
    output_dir: &Path,
) -> ExitCode {
    // Stage 3: Load prices for every ordered symbol plus the benchmark
    let mut symbols: Vec<String> = Vec::new();
    for order in orders {
        if !symbols.contains(&order.symbol) {
            symbols.push(order.symbol.clone());
        }
    }
    if let Some(benchmark) = &bt_config.benchmark {
        if !symbols.contains(benchmark) {
            symbols.push(benchmark.clone());
        }
    }

    let prices = match load_price_book(price_port, &symbols, market_suffix) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if prices.is_empty() {
        eprintln!("error: no symbols with price data to backtest");
        return ExitCode::from(5);
    }

    // Stage 4: Replay
    eprintln!(
        "Running backtest: {} orders, {} to {}",
        orders.len(),
        bt_config.start_date,
        bt_config.end_date,
    );
    let mut broker = bt_config.broker();
    let result = match backtest_engine::replay(&mut broker, orders, &prices, bt_config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    for rejected in &result.rejected {
        eprintln!(
            "  rejected {} {} {} on {}: {}",
            rejected.order.action,
            rejected.order.quantity,
            rejected.order.symbol,
            rejected.order.date,
            rejected.reason,
        );
    }
    eprintln!(
        "  Filled: {}, rejected: {}, final cash: {:.2}",
        result.filled.len(),
        result.rejected.len(),
        broker.cash_balance(),
    );

    // Stage 5: Analyze
    let benchmark = match benchmark_curve(&prices, bt_config) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("warning: benchmark skipped ({e})");
            None
        }
    };
    let mut analyzer =
        ResultAnalyzer::new(result.equity_curve).with_risk_free_rate(bt_config.risk_free_rate);
    if let Some(b) = benchmark {
        analyzer = analyzer.with_benchmark(b);
    }
    if let Some(log) = rebalance_log {
        analyzer = analyzer.with_rebalance_log(log);
    }

    // Stage 6: Report
    print_summaries(&analyzer);
    match CsvReportAdapter.write_with_transactions(&analyzer, broker.transactions(), output_dir) {
        Ok(()) => {
            eprintln!("\nReport written to: {}", output_dir.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to write report: {e}");
            (&e).into()
        }
    }
}

fn print_summaries(analyzer: &ResultAnalyzer) {
    eprintln!("\n=== Portfolio Summary ===");
    eprint!("{}", analyzer.portfolio_summary());
    match analyzer.benchmark_summary() {
        Some(benchmark) => {
            eprintln!("\n=== Benchmark Summary ===");
            eprint!("{benchmark}");
        }
        None => eprintln!("\n(no benchmark)"),
    }
}

/// Analyzer over previously written curve and log files.
pub fn load_analyzer(
    equity_path: &Path,
    benchmark_path: Option<&Path>,
    rebalance_path: Option<&Path>,
) -> Result<ResultAnalyzer, EquisimError> {
    let mut analyzer = ResultAnalyzer::new(read_equity_curve(equity_path)?);
    if let Some(path) = benchmark_path {
        analyzer = analyzer.with_benchmark(read_equity_curve(path)?);
    }
    if let Some(path) = rebalance_path {
        analyzer = analyzer.with_rebalance_log(read_rebalance_log(path)?);
    }
    Ok(analyzer)
}

fn run_report(
    equity_path: &Path,
    benchmark_path: Option<&Path>,
    rebalance_path: Option<&Path>,
    output_path: Option<&Path>,
) -> ExitCode {
    let analyzer = match load_analyzer(equity_path, benchmark_path, rebalance_path) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    print_summaries(&analyzer);

    let Some(output_dir) = output_path else {
        return ExitCode::SUCCESS;
    };
    match CsvReportAdapter.write(&analyzer, output_dir) {
        Ok(()) => {
            eprintln!("\nReport written to: {}", output_dir.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to write report: {e}");
            (&e).into()
        }
    }
}

fn run_universe(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let data = build_data_settings(&adapter);

    let result = build_universe(&adapter).and_then(|universe| {
        eprintln!("Loading universe {}", universe.name);
        universe_port(&data)?.symbols(&universe)
    });
    match result {
        Ok(symbols) => {
            for symbol in &symbols {
                println!("{symbol}");
            }
            eprintln!("{} symbols", symbols.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

#[cfg(feature = "http")]
fn universe_port(data: &DataSettings) -> Result<impl UniversePort, EquisimError> {
    use crate::adapters::nse_http_adapter::NseHttpAdapter;
    Ok(CachedUniverseAdapter::new(
        data.cache_dir.clone(),
        data.caching,
        NseHttpAdapter::new()?,
    ))
}

#[cfg(not(feature = "http"))]
fn universe_port(data: &DataSettings) -> Result<impl UniversePort, EquisimError> {
    use crate::adapters::universe_cache_adapter::OfflineUniverse;
    // Without HTTP support only a pre-filled cache can answer.
    Ok(CachedUniverseAdapter::new(
        data.cache_dir.clone(),
        true,
        OfflineUniverse,
    ))
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let result = validate_backtest_config(&adapter)
        .and_then(|_| validate_data_config(&adapter))
        .and_then(|_| build_backtest_config(&adapter));
    match result {
        Ok(bt_config) => {
            eprintln!("  Capital:    {:.2}", bt_config.initial_capital);
            eprintln!("  Cost rate:  {}", bt_config.cost_rate);
            eprintln!("  Window:     {} to {}", bt_config.start_date, bt_config.end_date);
            if let Some(benchmark) = &bt_config.benchmark {
                eprintln!("  Benchmark:  {benchmark}");
            }
            eprintln!("Config is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
