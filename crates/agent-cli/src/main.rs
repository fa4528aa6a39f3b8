//! Command-line interface for agent-rs stock analysis
//!
//! Offline tools over the deterministic parts of the stack: intent routing,
//! score synthesis and portfolio decisions.

mod render;

use agent_stock::intent::{Intent, IntentKind};
use agent_stock::portfolio::{Holding, HoldingAnalysis, PortfolioReport, decide};
use agent_stock::router::IntentRouter;
use agent_stock::synthesis::{Horizon, ScoreInputs, synthesize};
use agent_utils::LogConfig;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "agent-cli")]
#[command(about = "Stock analysis routing, synthesis and portfolio decisions", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter, e.g. "debug" or "agent_stock=trace"
    #[arg(long, global = true)]
    log: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the execution path an intent is routed to
    Route {
        /// Intent kind, e.g. full_analysis or comparison
        kind: IntentKind,
        /// One or two tickers
        tickers: Vec<String>,
    },
    /// Combine component scores into a weighted final score
    Synthesize(SynthesizeArgs),
    /// Decide the action for a single holding
    Decide(DecideArgs),
    /// Decide every holding of a portfolio file and aggregate
    Portfolio {
        /// JSON array of holdings with optional `fundamental_score` and `technical_score`
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct SynthesizeArgs {
    #[arg(long)]
    fundamental: Option<u8>,
    #[arg(long)]
    technical: Option<u8>,
    #[arg(long)]
    sentiment: Option<u8>,
    /// Risk score, higher is riskier
    #[arg(long)]
    risk: Option<u8>,
    /// Fundamental rating, e.g. BUY
    #[arg(long)]
    rating: Option<String>,
    /// Technical signal, e.g. BULLISH
    #[arg(long)]
    signal: Option<String>,
    /// Sentiment label, e.g. NEGATIVE
    #[arg(long)]
    sentiment_label: Option<String>,
    /// short, medium or long
    #[arg(long, default_value = "medium")]
    horizon: String,
}

#[derive(Args, Debug)]
struct DecideArgs {
    #[arg(long, default_value = "TICKER")]
    ticker: String,
    #[arg(long, default_value_t = 1.0)]
    quantity: f64,
    #[arg(long)]
    avg_price: f64,
    #[arg(long)]
    current_price: f64,
    #[arg(long)]
    stop_loss: Option<f64>,
    #[arg(long)]
    target_price: Option<f64>,
    #[arg(long)]
    fundamental: Option<u8>,
    #[arg(long)]
    technical: Option<u8>,
}

/// One portfolio file entry
#[derive(Debug, Deserialize)]
struct PortfolioEntry {
    #[serde(flatten)]
    holding: Holding,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    fundamental_score: Option<u8>,
    #[serde(default)]
    technical_score: Option<u8>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env().with_json(cli.json_logs);
    if let Some(filter) = &cli.log {
        log_config = log_config.with_filter(filter);
    }
    agent_utils::init_tracing_with(&log_config)?;

    info!("Starting agent-cli");

    match cli.command {
        Commands::Route { kind, tickers } => route(kind, &tickers, cli.json),
        Commands::Synthesize(args) => synthesize_scores(&args, cli.json),
        Commands::Decide(args) => decide_holding(&args, cli.json),
        Commands::Portfolio { file } => portfolio(&file, cli.json),
    }
}

fn route(kind: IntentKind, tickers: &[String], json: bool) -> anyhow::Result<()> {
    let intent = Intent::certain(kind, tickers);
    let route = IntentRouter::new().route(&intent)?;
    debug!("Route: {:?}", route);

    if json {
        println!("{}", serde_json::to_string_pretty(&route)?);
    } else {
        println!("{}", render::route_table(&route));
    }
    Ok(())
}

fn synthesize_scores(args: &SynthesizeArgs, json: bool) -> anyhow::Result<()> {
    let inputs = ScoreInputs {
        fundamental_score: args.fundamental,
        technical_score: args.technical,
        sentiment_score: args.sentiment,
        risk_score: args.risk,
        fundamental_rating: args.rating.clone(),
        technical_signal: args.signal.clone(),
        sentiment_label: args.sentiment_label.clone(),
    };
    let result = synthesize(&inputs, Horizon::parse(&args.horizon));

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render::synthesis_table(&result));
        for conflict in &result.conflicts {
            println!("⚠️ {}", conflict.message);
        }
    }
    Ok(())
}

fn decide_holding(args: &DecideArgs, json: bool) -> anyhow::Result<()> {
    let mut holding = Holding::new(&args.ticker, args.quantity, args.avg_price)?
        .with_current_price(args.current_price)?;
    if let Some(stop) = args.stop_loss {
        holding = holding.with_stop_loss(stop)?;
    }
    if let Some(target) = args.target_price {
        holding = holding.with_target_price(target)?;
    }

    let decision = decide(&holding, holding.pnl_percent(), args.fundamental, args.technical);
    let analysis = HoldingAnalysis::priced(
        &holding,
        None,
        args.fundamental,
        args.technical,
        decision,
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        println!("{}", render::holdings_table(std::slice::from_ref(&analysis)));
        for note in &analysis.decision.notes {
            println!("  • {note}");
        }
    }
    Ok(())
}

fn portfolio(file: &Path, json: bool) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let entries: Vec<PortfolioEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid portfolio file {}", file.display()))?;
    info!("Loaded {} holdings from {}", entries.len(), file.display());

    let analyses = entries
        .iter()
        .map(|entry| {
            let holding = &entry.holding;
            let decision = decide(
                holding,
                holding.pnl_percent(),
                entry.fundamental_score,
                entry.technical_score,
            );
            HoldingAnalysis::priced(
                holding,
                entry.name.clone(),
                entry.fundamental_score,
                entry.technical_score,
                decision,
            )
        })
        .collect();
    let holdings: Vec<Holding> = entries.into_iter().map(|entry| entry.holding).collect();
    let report = PortfolioReport::new(&holdings, analyses);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render::holdings_table(&report.holdings));
        println!("{}", render::portfolio_summary(&report));
    }
    Ok(())
}
