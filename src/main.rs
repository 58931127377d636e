use anyhow::{Context, Result};
use statline::config::{Config, LoggingConfig};
use statline::engine::{season_label, season_of, BoxScoreStats, Venue};
use statline::feed::aggregator::SeasonAggregator;
use statline::feed::balldontlie::BalldontlieFeed;
use statline::feed::types::GameRecord;
use statline::session::GameLogSession;
use statline::{DisplayTuple, FilterContext, WindowResolver, WindowSpec};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: statline <player_id> [--window last:N|h2h|season|last-season] \
[--opponent ABBR] [--venue home|away] [--metric KEY] [--season YEAR] [--team ABBR] \
[--input FILE.json] [--config PATH]";

/// Value following `flag`, if present.
fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// First argument that is neither a flag nor a flag's value.
fn positional(args: &[String]) -> Option<&str> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            iter.next();
            continue;
        }
        return Some(arg);
    }
    None
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .with_context(|| format!("invalid log filter: {}", config.filter))?;
    match &config.file {
        Some(path) => {
            let log_file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(log_file)
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn build_context(args: &[String]) -> Result<FilterContext> {
    let mut ctx = FilterContext::default();
    if let Some(team) = arg_value(args, "--team") {
        ctx = ctx.with_team(team.to_uppercase());
    }
    if let Some(opponent) = arg_value(args, "--opponent") {
        ctx = ctx.with_opponent(opponent);
    }
    if let Some(venue) = arg_value(args, "--venue") {
        ctx = ctx.with_venue(venue.parse::<Venue>()?);
    }
    Ok(ctx)
}

fn print_series(tuples: &[DisplayTuple], metric: &str) {
    if tuples.is_empty() {
        println!("  (no games)");
        return;
    }
    println!("  {:>3}  {:<7} {:<8} {:<12} {:>7}", "#", "DATE", "OPP", "KEY", metric.to_uppercase());
    for t in tuples {
        println!("  {:>3}  {:<7} {:<8} {:<12} {:>7.1}", t.index, t.date, t.opponent, t.key, t.value);
    }
    let avg = tuples.iter().map(|t| t.value).sum::<f64>() / tuples.len() as f64;
    println!();
    println!("  {} games, avg {:.1}", tuples.len(), avg);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let config_path = arg_value(&args, "--config").unwrap_or("config.toml");
    let config = Config::load_or_default(Path::new(config_path))?;
    init_logging(&config.logging)?;

    // Load saved keys from .env (real env vars take precedence)
    Config::load_env_file();

    let window = match arg_value(&args, "--window") {
        Some(w) => w.parse::<WindowSpec>()?,
        None => WindowSpec::LastN(config.window.default_last_n),
    };
    let current_season = match arg_value(&args, "--season") {
        Some(s) => s.parse::<i32>().with_context(|| format!("invalid season: {}", s))?,
        None => season_of(chrono::Local::now().date_naive()),
    };
    let metric = arg_value(&args, "--metric").unwrap_or("pts");
    let ctx = build_context(&args)?;
    let resolver = WindowResolver::from_config(&config);

    println!();
    println!("  {} | {} | {}", season_label(current_season), window, metric);
    println!();

    let tuples = if let Some(input) = arg_value(&args, "--input") {
        let content = std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read input file: {}", input))?;
        let records: Vec<GameRecord> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse game records from {}", input))?;
        tracing::info!(rows = records.len(), input, "loaded game records");
        resolver.resolve_window(&records, window, &ctx, current_season, metric, &BoxScoreStats)?
    } else {
        let player_id = positional(&args).unwrap_or_default();
        let feed = BalldontlieFeed::new(Config::api_key()?, &config.provider)?;
        let session = GameLogSession::new(SeasonAggregator::new(Arc::new(feed)), resolver.clone());

        let handle = session.load(player_id, window, &ctx, current_season).await?;
        let early = session.snapshot().resolve_window(&resolver, &ctx, metric, &BoxScoreStats)?;
        tracing::info!(games = early.len(), "current season resolved");

        if let Some(backfill) = handle.backfill {
            let outcome = backfill.await.context("background backfill task failed")?;
            tracing::info!(?outcome, "prior season merge finished");
        }
        session.snapshot().resolve_window(&resolver, &ctx, metric, &BoxScoreStats)?
    };

    print_series(&tuples, metric);
    Ok(())
}
