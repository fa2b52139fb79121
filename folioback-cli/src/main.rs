//! FolioBack CLI — run portfolio backtests from the command line.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config against a CSV data dir
//! - `synth` — generate seeded synthetic CSV fixtures for demos and tests

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use folioback_runner::{
    generate_synthetic, load_market, run_backtest, write_artifacts, write_market,
    BacktestConfig, BacktestReport, SyntheticSpec,
};

#[derive(Parser)]
#[command(name = "folioback", about = "FolioBack — portfolio backtesting engine")]
struct Cli {
    /// Verbose logging (-v: debug, -vv: trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Data directory containing prices.csv (+ optional dividends.csv).
        #[arg(long, default_value = "data")]
        data: PathBuf,

        /// Output directory for report.json and equity.csv. Without it,
        /// only the summary is printed.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate seeded synthetic CSV fixtures.
    Synth {
        /// Output directory for prices.csv and dividends.csv.
        #[arg(long, default_value = "data")]
        out: PathBuf,

        /// Tickers to generate.
        #[arg(long, value_delimiter = ',', default_value = "AAA,BBB,CCC")]
        tickers: Vec<String>,

        /// First date of the series (YYYY-MM-DD).
        #[arg(long, default_value = "2020-01-02")]
        start: NaiveDate,

        /// Number of trading days per ticker.
        #[arg(long, default_value_t = 504)]
        days: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { config, data, out } => cmd_run(&config, &data, out.as_deref()),
        Commands::Synth {
            out,
            tickers,
            start,
            days,
            seed,
        } => cmd_synth(&out, tickers, start, days, seed),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn cmd_run(config_path: &std::path::Path, data: &std::path::Path, out: Option<&std::path::Path>) -> Result<()> {
    let text = std::fs::read_to_string(config_path)
        .with_context(|| format!("failed to read config {}", config_path.display()))?;
    let config = BacktestConfig::from_toml_str(&text)
        .with_context(|| format!("invalid config {}", config_path.display()))?;
    let market = load_market(data)?;
    let report = run_backtest(&config, &market)?;

    print_summary(&report);

    if let Some(dir) = out {
        let paths = write_artifacts(&report, dir)?;
        for path in paths {
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn cmd_synth(
    out: &std::path::Path,
    tickers: Vec<String>,
    start: NaiveDate,
    days: usize,
    seed: u64,
) -> Result<()> {
    let spec = SyntheticSpec {
        tickers,
        start,
        trading_days: days,
        seed,
    };
    let market = generate_synthetic(&spec);
    write_market(out, &market)?;
    println!(
        "wrote {} tickers x {} trading days to {}",
        spec.tickers.len(),
        spec.trading_days,
        out.display()
    );
    Ok(())
}

fn print_summary(report: &BacktestReport) {
    let m = &report.metrics;
    println!("run id           {}", &report.run_id[..16]);
    println!("window           {} .. {}", report.start_date, report.end_date);
    println!("final value      {:>14.2} {}", m.final_value, report.base_currency);
    println!("contributions    {:>14.2}", m.total_contributions);
    println!("gain             {:>14.2}", m.cumulative_gain);
    println!("cumulative ret   {:>13.2}%", m.cumulative_return * 100.0);
    println!("cagr             {:>13.2}%", m.cagr * 100.0);
    println!("volatility       {:>13.2}%", m.volatility * 100.0);
    println!("sharpe           {:>14.2}", m.sharpe);
    println!("max drawdown     {:>13.2}%", report.max_drawdown.max_drawdown * 100.0);
    println!(
        "monthly win rate {:>13.2}%  ({} up / {} down)",
        report.monthly_win_lose_analysis.win_rate * 100.0,
        report.monthly_win_lose_analysis.winning_months,
        report.monthly_win_lose_analysis.losing_months
    );
}
