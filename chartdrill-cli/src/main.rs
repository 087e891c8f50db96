//! ChartDrill CLI: venue, shortlist and sampling commands.
//!
//! Commands:
//! - `venue`: resolve the market source (derivatives, else spot)
//! - `symbols`: print the practice shortlist
//! - `sample`: draw one random segment and print or export it
//! - `config`: print the effective configuration as TOML

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::RngCore;
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use chartdrill_core::config::{clamp_bar_count, clamp_window_days, ChartDrillConfig};
use chartdrill_core::domain::Segment;
use chartdrill_core::export::save_segment;
use chartdrill_core::rng::SampleSeed;
use chartdrill_core::service::ChartService;
use chartdrill_core::session::SegmentParams;

#[derive(Parser)]
#[command(
    name = "chartdrill",
    about = "ChartDrill CLI: random crypto candlestick segments for pattern practice"
)]
struct Cli {
    /// Config file. Defaults to {config_dir}/chartdrill/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the market source and report which one is in use.
    Venue,
    /// Print the symbol shortlist.
    Symbols {
        /// Emit JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Draw one random segment.
    Sample {
        /// Display symbol, e.g. BTC/USDT. Defaults to the shortlist default.
        #[arg(long)]
        symbol: Option<String>,

        /// Bars in the segment (20-300).
        #[arg(long)]
        bars: Option<usize>,

        /// Lookback window in days (7-2000).
        #[arg(long)]
        window_days: Option<u32>,

        /// Attempts before giving up.
        #[arg(long)]
        retries: Option<u32>,

        /// Master seed for a reproducible draw.
        #[arg(long)]
        seed: Option<u64>,

        /// Draw number under --seed; each number is an independent segment.
        #[arg(long, default_value_t = 0)]
        draw: u64,

        /// Write the segment as CSV into this directory.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Print the effective configuration.
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(ChartDrillConfig::default_path);
    let config = ChartDrillConfig::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    match cli.command {
        Commands::Venue => run_venue(config),
        Commands::Symbols { json } => run_symbols(config, json),
        Commands::Sample {
            symbol,
            bars,
            window_days,
            retries,
            seed,
            draw,
            export,
        } => run_sample(
            config,
            SampleArgs {
                symbol,
                bars,
                window_days,
                retries,
                seed,
                draw,
                export,
            },
        ),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn run_venue(config: ChartDrillConfig) -> Result<()> {
    let mut service = ChartService::from_config(config)?;
    let resolved = service.resolve()?;
    println!("Mode:    {}", resolved.mode);
    println!("Source:  {}", resolved.mode.source_label());
    println!("Markets: {}", resolved.venue.markets().len());
    Ok(())
}

#[derive(Serialize)]
struct SymbolRow<'a> {
    display: &'a str,
    id: &'a str,
}

#[derive(Serialize)]
struct SymbolsReport<'a> {
    mode: String,
    source: &'a str,
    default: Option<&'a str>,
    symbols: Vec<SymbolRow<'a>>,
}

fn run_symbols(config: ChartDrillConfig, json: bool) -> Result<()> {
    let mut service = ChartService::from_config(config)?;
    let choices = service.symbol_choices()?;

    let symbols: Vec<SymbolRow> = choices
        .ordered
        .iter()
        .map(|d| SymbolRow {
            display: d,
            id: choices.id_for(d).unwrap_or(""),
        })
        .collect();

    if json {
        let report = SymbolsReport {
            mode: choices.mode.to_string(),
            source: choices.mode.source_label(),
            default: choices.ordered.get(choices.default_index()).map(String::as_str),
            symbols,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Source: {}", choices.mode.source_label());
    println!();
    println!("{:>3}  {:<14} {:<18}", "#", "Symbol", "Venue ID");
    println!("{}", "-".repeat(37));
    let default_index = choices.default_index();
    for (i, row) in symbols.iter().enumerate() {
        let marker = if i == default_index { "*" } else { " " };
        println!("{:>3}{} {:<14} {:<18}", i + 1, marker, row.display, row.id);
    }
    Ok(())
}

struct SampleArgs {
    symbol: Option<String>,
    bars: Option<usize>,
    window_days: Option<u32>,
    retries: Option<u32>,
    seed: Option<u64>,
    draw: u64,
    export: Option<PathBuf>,
}

fn run_sample(mut config: ChartDrillConfig, args: SampleArgs) -> Result<()> {
    if let Some(retries) = args.retries {
        if retries == 0 {
            bail!("--retries must be at least 1");
        }
        config.max_retries = retries;
    }
    let export_dir = args.export;
    let mut service = ChartService::from_config(config)?;

    let mut params = service.default_params()?;
    if let Some(symbol) = args.symbol {
        params.symbol_display = symbol.to_uppercase();
    }
    if let Some(bars) = args.bars {
        params.bar_count = clamped("--bars", bars, clamp_bar_count(bars));
    }
    if let Some(days) = args.window_days {
        params.window_days = clamped("--window-days", days, clamp_window_days(days));
    }

    let segment = match args.seed {
        Some(seed) => {
            let mut rng: StdRng = SampleSeed::new(seed).rng_for(&params.symbol_display, args.draw);
            service.sample_segment(&params, &mut rng)?
        }
        None => {
            let mut rng = rand::thread_rng();
            // Log the seed actually used so a good segment can be drawn again.
            let seed = rng.next_u64();
            tracing::info!(seed, "no --seed given, using a random one");
            let mut rng = SampleSeed::new(seed).rng_for(&params.symbol_display, args.draw);
            service.sample_segment(&params, &mut rng)?
        }
    };

    print_segment(&params, &segment);

    if let Some(dir) = export_dir {
        let path = save_segment(&dir, &params.symbol_display, &segment)?;
        println!("Saved to: {}", path.display());
    }
    Ok(())
}

fn clamped<T: PartialEq + std::fmt::Display + Copy>(flag: &str, given: T, clamped: T) -> T {
    if given != clamped {
        warn!("{flag} {given} out of range, using {clamped}");
    }
    clamped
}

fn print_segment(params: &SegmentParams, segment: &Segment) {
    let (low, high) = segment.price_range();
    let up = segment.bars().iter().filter(|b| b.is_up()).count();

    println!("=== {} | {} ===", params.symbol_display, params.mode.source_label());
    println!("Timeframe:   {}", segment.timeframe());
    println!("Bars:        {} ({} up, {} down)", segment.len(), up, segment.len() - up);
    println!("Start:       {}", segment.start().format("%Y-%m-%d %H:%M %:z"));
    println!("End:         {}", segment.end().format("%Y-%m-%d %H:%M %:z"));
    println!("Range:       {low} - {high}");
    println!();
    println!(
        "{:<17} {:>14} {:>14} {:>14} {:>14} {:>16}",
        "Time", "Open", "High", "Low", "Close", "Volume"
    );
    println!("{}", "-".repeat(94));
    for bar in segment.bars() {
        println!(
            "{:<17} {:>14} {:>14} {:>14} {:>14} {:>16}",
            bar.time.format("%Y-%m-%d %H:%M"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_flags_parse() {
        let cli = Cli::try_parse_from([
            "chartdrill", "--config", "c.toml", "sample", "--symbol", "eth/usdt", "--bars", "60",
            "--seed", "42", "--draw", "3",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        match cli.command {
            Commands::Sample { symbol, bars, seed, draw, window_days, .. } => {
                assert_eq!(symbol.as_deref(), Some("eth/usdt"));
                assert_eq!(bars, Some(60));
                assert_eq!(seed, Some(42));
                assert_eq!(draw, 3);
                assert_eq!(window_days, None);
            }
            _ => panic!("expected sample"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["chartdrill", "symbols", "--json", "--config", "x.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Symbols { json: true }));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["chartdrill", "backtest"]).is_err());
    }
}
