use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::info;
use signal_backtest::{
    commands::{compare, export_market_data, generate_sample_data, run},
    config::{BacktestConfig, CalendarPolicy, DEFAULT_DATA_DIR},
    context::AppContext,
    strategy::STRATEGY_NAMES,
};
use std::path::PathBuf;

const DEFAULT_MARKET_DATA_FILE: &str = "market-data.bin";

#[derive(Parser)]
#[command(name = "signal-backtest")]
#[command(about = "Backtest rule-based trading signals over a universe of daily price series")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct RunOptions {
    /// Directory of <TICKER>.csv price files
    #[arg(long = "data-dir", value_name = "PATH")]
    data_dir: Option<PathBuf>,
    /// Read prices from a market data snapshot instead of the CSV directory
    #[arg(long, value_name = "PATH", conflicts_with = "data_dir")]
    snapshot: Option<PathBuf>,
    /// Comma separated tickers (defaults to every ticker in the data source)
    #[arg(long, value_delimiter = ',')]
    tickers: Option<Vec<String>>,
    /// Where reports are written
    #[arg(long = "output-dir", value_name = "PATH")]
    output_dir: Option<PathBuf>,
    /// Starting cash of each simulated security
    #[arg(long)]
    initial_cash: Option<f64>,
    /// Capital added to cash and total assets in reports
    #[arg(long)]
    baseline: Option<f64>,
    /// Shares bought on the first day by the benchmark strategy
    #[arg(long)]
    benchmark_quantity: Option<i64>,
    /// How differing trading calendars are handled: strict or carry-forward
    #[arg(long, value_parser = parse_calendar_policy)]
    calendar: Option<CalendarPolicy>,
    /// Worker threads for the per-security pipeline
    #[arg(long)]
    threads: Option<usize>,
    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one strategy and write its reports
    Run {
        /// Strategy name, e.g. MovingAverageStrategy or moving_average
        strategy: String,
        #[command(flatten)]
        options: RunOptions,
    },
    /// Backtest every registered strategy over the same universe
    Compare {
        #[command(flatten)]
        options: RunOptions,
    },
    /// Export a CSV price directory as a market data snapshot
    ExportMarketData {
        /// Directory of <TICKER>.csv price files
        #[arg(long = "data-dir", value_name = "PATH")]
        data_dir: Option<PathBuf>,
        /// Destination file for the snapshot
        #[arg(short, long = "output", value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Write seeded random-walk price files for demos
    GenerateSampleData {
        /// Destination directory
        #[arg(long = "output-dir", value_name = "PATH")]
        output_dir: Option<PathBuf>,
        /// Number of tickers
        #[arg(long, default_value_t = 5)]
        tickers: usize,
        /// Trading days per ticker
        #[arg(long, default_value_t = 500)]
        days: usize,
        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// List registered strategies
    Strategies,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting signal-backtest. Historical simulation only, not financial advice.");

    match cli.command {
        Commands::Run { strategy, options } => {
            let app = build_context(&options)?;
            run::run(&app, &strategy, options.tickers.as_deref())?;
        }
        Commands::Compare { options } => {
            let app = build_context(&options)?;
            compare::run(&app, options.tickers.as_deref())?;
        }
        Commands::ExportMarketData { data_dir, output } => {
            let data_dir = data_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
            let output = output.unwrap_or_else(|| PathBuf::from(DEFAULT_MARKET_DATA_FILE));
            export_market_data::run(&data_dir, &output)?;
        }
        Commands::GenerateSampleData {
            output_dir,
            tickers,
            days,
            seed,
        } => {
            let output_dir = output_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
            let options = generate_sample_data::SampleDataOptions {
                tickers,
                days,
                seed,
                ..Default::default()
            };
            generate_sample_data::run(&output_dir, &options)?;
        }
        Commands::Strategies => {
            for name in STRATEGY_NAMES {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

/// Environment settings first, then command-line overrides.
fn build_context(options: &RunOptions) -> Result<AppContext> {
    let mut config = BacktestConfig::from_env()?;
    if let Some(data_dir) = &options.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(output_dir) = &options.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(initial_cash) = options.initial_cash {
        config.initial_cash = initial_cash;
    }
    if let Some(baseline) = options.baseline {
        config.baseline_capital = baseline;
    }
    if let Some(quantity) = options.benchmark_quantity {
        config.benchmark_quantity = quantity;
    }
    if let Some(policy) = options.calendar {
        config.calendar_policy = policy;
    }
    if let Some(threads) = options.threads {
        config.threads = threads.max(1);
    }
    if options.no_progress {
        config.show_progress = false;
    }

    AppContext::initialize(config, options.snapshot.as_deref())
}

fn parse_calendar_policy(raw: &str) -> std::result::Result<CalendarPolicy, String> {
    CalendarPolicy::parse(raw).map_err(|err| err.to_string())
}
