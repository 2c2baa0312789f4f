//! edgelab CLI — simulate and optimize commands.
//!
//! Commands:
//! - `simulate` — run the margin simulator over a forecast CSV (or synthetic
//!   data) using thresholds from a TOML config; writes trades/ledger CSVs
//! - `optimize` — walk-forward threshold calibration with the recency gate;
//!   consults the threshold cache and prints the decision

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use edgelab_core::domain::Side;
use edgelab_core::edge::EdgeSeries;
use edgelab_core::signal;
use edgelab_core::sim::{simulate, SimRun};
use edgelab_runner::{
    generate_synthetic, load_csv, optimize, save_artifacts, CacheKey, CachedEntry, LoadedSeries,
    OptimizeReport, RunConfig, RunMetrics, SelectionTier, SyntheticConfig, ThresholdCache,
    SCHEMA_VERSION,
};

#[derive(Parser)]
#[command(name = "edgelab", about = "edgelab CLI — CFD strategy evaluation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the margin simulator with fixed thresholds from the config file.
    Simulate {
        /// TOML config with [account] and [thresholds] sections.
        #[arg(long)]
        config: PathBuf,

        /// Forecast CSV (date,spot,forecast_price,sigma). Omit for synthetic.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Use synthetic data instead of a CSV.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Forecast horizon in trading days.
        #[arg(long, default_value_t = 16)]
        horizon: u32,

        /// First date to include (YYYY-MM-DD). Defaults to all data.
        #[arg(long)]
        start: Option<String>,

        /// Last date to include (YYYY-MM-DD). Defaults to all data.
        #[arg(long)]
        end: Option<String>,

        /// Output directory for trades.csv / ledger.csv.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Walk-forward threshold optimization with the recency gate.
    Optimize {
        /// TOML config with [account] and optional [optimizer] sections.
        #[arg(long)]
        config: PathBuf,

        /// Forecast CSV (date,spot,forecast_price,sigma). Omit for synthetic.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Use synthetic data instead of a CSV.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Forecast horizon in trading days.
        #[arg(long, default_value_t = 16)]
        horizon: u32,

        /// First date to include (YYYY-MM-DD). Defaults to all data.
        #[arg(long)]
        start: Option<String>,

        /// Last date to include (YYYY-MM-DD). Defaults to all data.
        #[arg(long)]
        end: Option<String>,

        /// Symbol label used in the cache key.
        #[arg(long, default_value = "SYNTH")]
        symbol: String,

        /// Threshold cache directory.
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,

        /// Output path for the decision JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            data,
            synthetic,
            horizon,
            start,
            end,
            output_dir,
        } => run_simulate(config, data, synthetic, horizon, start, end, output_dir),
        Commands::Optimize {
            config,
            data,
            synthetic,
            horizon,
            start,
            end,
            symbol,
            cache_dir,
            output,
        } => run_optimize(
            config, data, synthetic, horizon, start, end, symbol, cache_dir, output,
        ),
    }
}

/// Restrict loaded rows to `[start, end]`, parsed as YYYY-MM-DD.
fn apply_date_range(
    loaded: &mut LoadedSeries,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<()> {
    let start = start
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("invalid --start date")?;
    let end = end
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("invalid --end date")?;

    loaded.rows.retain(|row| {
        start.map_or(true, |s| row.date >= s) && end.map_or(true, |e| row.date <= e)
    });
    if loaded.rows.is_empty() {
        bail!("no data remains after applying the date range");
    }
    Ok(())
}

fn load_series(
    data: Option<PathBuf>,
    synthetic: bool,
    horizon: u32,
) -> Result<LoadedSeries> {
    match (data, synthetic) {
        (Some(_), true) => bail!("--data and --synthetic are mutually exclusive"),
        (Some(path), false) => Ok(load_csv(&path)?),
        (None, true) => Ok(generate_synthetic(&SyntheticConfig {
            horizon,
            ..SyntheticConfig::default()
        })),
        (None, false) => bail!("one of --data or --synthetic is required"),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_simulate(
    config_path: PathBuf,
    data: Option<PathBuf>,
    synthetic: bool,
    horizon: u32,
    start: Option<String>,
    end: Option<String>,
    output_dir: PathBuf,
) -> Result<()> {
    let config = RunConfig::from_file(&config_path)?;
    let thresholds = config
        .thresholds
        .context("simulate requires a [thresholds] section in the config")?;

    let mut loaded = load_series(data, synthetic, horizon)?;
    apply_date_range(&mut loaded, start.as_deref(), end.as_deref())?;
    for warn in &loaded.warnings {
        eprintln!("WARNING: {warn}");
    }

    let series = EdgeSeries::build(&loaded.rows, horizon);
    let prices: Vec<f64> = loaded.rows.iter().map(|r| r.spot).collect();
    let days = signal::run(series.points(), Side::Flat, &thresholds);
    let bars = signal::tag_bars(series.points(), &prices, &days);

    let run = simulate(&bars, &config.account)?;
    print_run_summary(&run, loaded.synthetic);

    let out = save_artifacts(&run, &output_dir)?;
    println!("Artifacts saved to: {}", out.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_optimize(
    config_path: PathBuf,
    data: Option<PathBuf>,
    synthetic: bool,
    horizon: u32,
    start: Option<String>,
    end: Option<String>,
    symbol: String,
    cache_dir: PathBuf,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = RunConfig::from_file(&config_path)?;
    let mut loaded = load_series(data, synthetic, horizon)?;
    apply_date_range(&mut loaded, start.as_deref(), end.as_deref())?;
    for warn in &loaded.warnings {
        eprintln!("WARNING: {warn}");
    }

    let series = EdgeSeries::build(&loaded.rows, horizon);
    let prices: Vec<f64> = loaded.rows.iter().map(|r| r.spot).collect();
    let data_end = loaded
        .rows
        .last()
        .context("forecast series is empty")?
        .date;

    let cache = ThresholdCache::new(&cache_dir)?;
    let key = CacheKey::new(
        symbol,
        data_end,
        horizon,
        series.len(),
        config.account,
        config.optimizer.clone(),
    );

    if let Some(entry) = cache.get(&key)? {
        println!("Cache hit: {}", key.key_string());
        print_decision(&entry.thresholds, &entry.decision);
        return Ok(());
    }

    let report = optimize(&series, &prices, &config.account, &config.optimizer, None)?;
    cache.put(
        &key,
        &CachedEntry {
            schema_version: SCHEMA_VERSION,
            thresholds: report.recommended,
            decision: report.decision,
        },
    )?;

    print_report(&report, loaded.synthetic);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)?;
        println!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn print_run_summary(run: &SimRun, has_synthetic: bool) {
    let metrics = RunMetrics::compute(&run.equity_curve(), &run.trades);
    println!();
    println!("=== Simulation Result ===");
    println!("Days:           {}", run.snapshots.len());
    println!("Trades:         {}", metrics.trade_count);
    println!("Stop-outs:      {}", metrics.stop_outs);
    println!("Margin calls:   {}", run.margin_calls.len());
    println!();
    println!("--- Performance ---");
    println!("Total Return:   {:.2}%", metrics.total_return * 100.0);
    println!("Max Drawdown:   {:.2}%", metrics.max_drawdown * 100.0);
    println!("Sharpe:         {:.3}", metrics.sharpe);
    println!("Sortino:        {:.3}", metrics.sortino);
    println!("Score:          {:.3}", metrics.score);
    println!("Win Rate:       {:.1}%", metrics.win_rate * 100.0);
    if has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}

fn print_report(report: &OptimizeReport, has_synthetic: bool) {
    print_decision(&report.recommended, &report.decision);
    let scored = report
        .folds
        .iter()
        .filter(|f| matches!(f, edgelab_runner::FoldOutcome::Scored(_)))
        .count();
    println!(
        "Folds:          {} scored / {} total",
        scored,
        report.folds.len()
    );
    if has_synthetic {
        println!("WARNING: Results based on SYNTHETIC data");
    }
}

fn print_decision(
    thresholds: &Option<edgelab_core::domain::ThresholdSet>,
    decision: &edgelab_runner::Decision,
) {
    println!();
    println!("=== Optimizer Decision ===");
    match thresholds {
        Some(t) => {
            println!(
                "Thresholds:     enter {:.3}/{:.3}  exit {:.3}/{:.3}  flip {:.3}/{:.3}",
                t.enter_long, t.enter_short, t.exit_long, t.exit_short, t.flip_long, t.flip_short
            );
        }
        None => println!("Thresholds:     (none)"),
    }
    let tier = match decision.tier {
        SelectionTier::Strict => "strict",
        SelectionTier::StrictLenient => "strict (lenient pass)",
        SelectionTier::NotApplied => "not applied",
    };
    println!("Tier:           {tier}");
    println!("Hard pass:      {}", decision.hard_pass);
    println!("Applied:        {}", decision.applied);
    if let Some(reason) = decision.reason {
        println!("Reason:         {reason}");
    }
    if let Some(recency) = decision.recency {
        println!(
            "Recency:        {} days, {:.0}% flat, score {:.3} vs baseline {}",
            recency.window_len,
            recency.flat_fraction * 100.0,
            recency.recommended_score,
            recency
                .baseline_score
                .map_or("n/a".to_string(), |s| format!("{s:.3}")),
        );
    }
    println!();
}
