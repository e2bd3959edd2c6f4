#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use lockin::logistic::{DEFAULT_BASE_YEAR, LogisticAnchor, exact_anchor_growth_rate};
use lockin::odds::{UnitPolicy, aggregate_odds, geometric_mean_odds};
use lockin::scenario::Scenario;

#[derive(Parser)]
#[command(
    name = "lockin",
    about = "Probability-combination toolkit for long-horizon event forecasts",
    long_about = "Combines survey and forecaster estimates by geometric mean of odds, \
                 extends single anchor points into logistic curves, and evaluates \
                 conditional probability tables over independent risk factors."
)]
struct Cli {
    /// Log per-computation detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
pub struct AggregateArgs {
    /// Probability estimates of the same event, each in [0, 1]
    #[arg(value_name = "P", required = true, num_args = 1..)]
    pub probabilities: Vec<f64>,

    /// Fail on estimates of exactly 1 (the default)
    #[arg(long, conflicts_with = "sentinel")]
    pub reject_certain: bool,

    /// Finite odds substituted for estimates of exactly 1
    #[arg(long, value_name = "ODDS")]
    pub sentinel: Option<f64>,

    /// Print the aggregate in odds space instead of as a probability
    #[arg(long)]
    pub odds: bool,
}

#[derive(Args)]
pub struct LogisticArgs {
    /// Years to evaluate the curve at
    #[arg(value_name = "YEAR", required = true, num_args = 1..)]
    pub years: Vec<i32>,

    /// Year of the known probability
    #[arg(long)]
    pub anchor_year: i32,

    /// Known probability at the anchor year, in (0, 1]
    #[arg(long)]
    pub anchor_probability: f64,

    /// Growth rate k of the logistic curve
    #[arg(long, required_unless_present = "exact", conflicts_with = "exact")]
    pub growth_rate: Option<f64>,

    /// Use the growth rate that passes exactly through the anchor
    #[arg(long)]
    pub exact: bool,

    /// Zero point of the time axis
    #[arg(long, default_value_t = DEFAULT_BASE_YEAR)]
    pub base_year: i32,
}

#[derive(Args)]
pub struct RunArgs {
    /// Path to the scenario file (.toml)
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Also write the report as a TSV file
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Combine estimates by geometric mean of odds
    #[command(about = "Aggregate probability estimates by geometric mean of odds")]
    Aggregate(AggregateArgs),

    /// Extend one anchor point into a logistic curve
    #[command(about = "Evaluate an anchored logistic curve at the given years")]
    Logistic(LogisticArgs),

    /// Evaluate a scenario's outcome table
    #[command(about = "Run a scenario file (outputs: report table, optional TSV)")]
    Run(RunArgs),

    /// Display version and build information
    #[command(about = "Display version and build information")]
    Version,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn aggregate(args: AggregateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let policy = match (args.reject_certain, args.sentinel) {
        (false, Some(odds)) => UnitPolicy::saturate(odds)?,
        _ => UnitPolicy::Reject,
    };

    if args.odds {
        let odds = geometric_mean_odds(&args.probabilities, policy)?;
        println!("{odds:.6}");
    } else {
        let probability = aggregate_odds(&args.probabilities, policy)?;
        println!("{probability:.6}");
    }
    Ok(())
}

fn logistic(args: LogisticArgs) -> Result<(), Box<dyn std::error::Error>> {
    let growth_rate = match (args.exact, args.growth_rate) {
        (false, Some(k)) => k,
        _ => exact_anchor_growth_rate(),
    };
    let curve = LogisticAnchor::new(args.anchor_year, args.anchor_probability, growth_rate)?
        .with_base_year(args.base_year);

    println!("{:<6}  {:>12}  {:>12}", "year", "probability", "percentage");
    for point in curve.forecast(&args.years) {
        println!(
            "{:<6}  {:>12.6}  {:>11.2}%",
            point.year, point.probability, point.probability_percentage
        );
    }
    println!(
        "Value at anchor year {} deviates from {} by {:+.2}%",
        curve.anchor_year(),
        curve.anchor_probability(),
        curve.anchor_error() * 100.0
    );
    Ok(())
}

fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = Scenario::load(&args.scenario)?;
    let report = scenario.run()?;

    println!("Scenario: {}", scenario.name);
    print!("{report}");

    if let Some(path) = &args.out {
        report.write_tsv(path)?;
        println!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn print_version_info() {
    let version = env!("CARGO_PKG_VERSION");
    let build_timestamp: u64 = env!("LOCKIN_BUILD_TIMESTAMP").parse().unwrap_or(0);

    println!("lockin {version}");

    if build_timestamp > 0 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        if now > build_timestamp {
            println!("Built: {}", format_duration_ago(now - build_timestamp));
        } else {
            println!("Built: just now");
        }
    }
}

/// Format seconds into a human-readable duration like "2.4 hours ago"
fn format_duration_ago(seconds: u64) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    if seconds < MINUTE {
        format!("{seconds} seconds ago")
    } else if seconds < HOUR {
        format!("{:.1} minutes ago", seconds as f64 / MINUTE as f64)
    } else if seconds < DAY {
        format!("{:.1} hours ago", seconds as f64 / HOUR as f64)
    } else {
        format!("{:.1} days ago", seconds as f64 / DAY as f64)
    }
}

fn main() {
    let Cli { verbose, command } = Cli::parse();
    init_logging(verbose);

    let result = match command {
        Some(Commands::Aggregate(args)) => aggregate(args),
        Some(Commands::Logistic(args)) => logistic(args),
        Some(Commands::Run(args)) => run(args),
        Some(Commands::Version) => {
            print_version_info();
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map(|()| println!())
            .map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
