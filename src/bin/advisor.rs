use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use eyre::{Result, eyre};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use yield_allocation_advisor::AdvisorService;
use yield_allocation_advisor::config;
use yield_allocation_advisor::error::AdvisorError;
use yield_allocation_advisor::logging;
use yield_allocation_advisor::strategy::types::{AllocationRequest, StrategyWeight};

/// Yield allocation advisor
#[derive(Parser)]
#[command(name = "advisor")]
#[command(about = "Yield allocation advisory queries and planning", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate capital across the given strategies and store the result
    Optimize {
        /// Total capital in smallest units
        #[arg(long)]
        amount: u128,

        /// Requested strategy as `<id>:<weight>`, repeatable
        #[arg(long = "strategy", required = true, value_parser = parse_strategy_weight)]
        strategies: Vec<StrategyWeight>,

        #[arg(long, default_value_t = 0.5)]
        risk_tolerance: f64,

        #[arg(long, default_value_t = 0.01)]
        max_slippage: f64,

        #[arg(long)]
        user_id: Option<i32>,
    },

    /// Plan deposits/withdrawals moving a user's holdings onto target weights
    Rebalance {
        #[arg(long)]
        user_id: i32,

        /// Target as `<id>:<weight>`, repeatable
        #[arg(long = "target", required = true, value_parser = parse_strategy_weight)]
        targets: Vec<StrategyWeight>,
    },

    /// Highest-apy active strategies
    TopYields {
        #[arg(long, default_value_t = 10)]
        limit: usize,

        #[arg(long)]
        network: Option<String>,
    },

    SystemAnalytics {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },

    /// Daily apy/tvl trend over the observation history
    Trends {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },

    UserAnalytics {
        #[arg(long)]
        user_id: i32,

        /// Recompute from current holdings before reading
        #[arg(long)]
        refresh: bool,
    },

    /// Fetch every external source once and store the observations
    Refresh,

    /// One strategy's observations, newest first
    History {
        #[arg(long)]
        strategy_id: i32,

        #[arg(long, default_value_t = 30)]
        days: i64,
    },
}

fn parse_strategy_weight(raw: &str) -> Result<StrategyWeight, String> {
    let (id, weight) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected <id>:<weight>, got '{}'", raw))?;
    Ok(StrategyWeight {
        strategy_id: id.trim().parse().map_err(|e| format!("bad strategy id '{}': {}", id, e))?,
        weight: weight.trim().parse().map_err(|e| format!("bad weight '{}': {}", weight, e))?,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Client-facing errors print their reason; everything else stays opaque
fn report(e: AdvisorError) -> eyre::Report {
    if e.is_client_error() {
        eyre!("Request rejected: {}", e)
    } else {
        error!(error = %e, "Advisor operation failed");
        eyre!("Internal error")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenv().ok();
    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME").to_string()) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    let cfg = config::Config::load()?;
    let service = AdvisorService::connect(&cfg).await?;
    info!("Advisor service initialized");

    match cli.command {
        Commands::Optimize {
            amount,
            strategies,
            risk_tolerance,
            max_slippage,
            user_id,
        } => {
            service.warm_up().await;
            let request = AllocationRequest {
                user_id,
                total_amount: amount,
                strategies,
                risk_tolerance,
                max_slippage,
            };
            let result = service.optimize(&request).await.map_err(report)?;
            print_json(&result)?;
        }
        Commands::Rebalance { user_id, targets } => {
            let plan = service.rebalance(user_id, &targets).await.map_err(report)?;
            print_json(&plan)?;
        }
        Commands::TopYields { limit, network } => {
            let strategies = service.get_top_yields(limit, network.as_deref()).await.map_err(report)?;
            print_json(&strategies)?;
        }
        Commands::SystemAnalytics { days } => {
            print_json(&service.get_system_analytics(days).await.map_err(report)?)?;
        }
        Commands::Trends { days } => {
            print_json(&service.get_yield_trends(days).await.map_err(report)?)?;
        }
        Commands::UserAnalytics { user_id, refresh } => {
            let snapshot = if refresh {
                service.update_user_analytics(user_id).await
            } else {
                service.get_user_analytics(user_id).await
            }
            .map_err(report)?;
            print_json(&snapshot)?;
        }
        Commands::Refresh => {
            let (observations, aggregation) = service.fetch_all_yield_data_with_report().await.map_err(report)?;
            let failed: Vec<_> = aggregation
                .outcomes
                .iter()
                .filter_map(|o| o.result.as_ref().err().map(|e| json!({ "source": o.source, "error": e.to_string() })))
                .collect();
            print_json(&json!({
                "observations": observations.len(),
                "succeeded": aggregation.succeeded_sources(),
                "failed": failed,
            }))?;
        }
        Commands::History { strategy_id, days } => {
            print_json(&service.get_yield_history(strategy_id, days).await.map_err(report)?)?;
        }
    }

    Ok(())
}
