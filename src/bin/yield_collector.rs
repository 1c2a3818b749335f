use dotenvy::dotenv;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, instrument, warn};

use yield_allocation_advisor::AdvisorService;
use yield_allocation_advisor::config;
use yield_allocation_advisor::logging;

#[instrument(name = "yield_collector_main")]
#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME").to_string()) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    let cfg = config::Config::load()?;
    let collection_interval = cfg.settings.collection_interval;
    info!(interval_secs = collection_interval.as_secs(), "Configuration loaded and logging initialized");

    let service = AdvisorService::connect(&cfg).await?;
    info!(sources = ?service.source_keys(), "Advisor service initialized");

    service.warm_up().await;

    let mut ticker = interval(collection_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Starting yield collection loop");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received; stopping collector");
                break;
            }
        }

        run_cycle(&service).await;
    }

    Ok(())
}

/// One collection round. Failures are logged and the loop carries on.
#[instrument(skip(service), fields(on_close = true))]
async fn run_cycle(service: &AdvisorService) {
    info!("Collection cycle started");

    match service.fetch_all_yield_data_with_report().await {
        Ok((observations, report)) => {
            let failed = report.failed_sources();
            if !failed.is_empty() {
                warn!(?failed, "Some sources failed this cycle");
            }
            info!(observations = observations.len(), "External yields collected");
        }
        Err(e) => {
            error!(error = %e, "Failed to collect external yields");
            return;
        }
    }

    match service.update_system_metrics().await {
        Ok(stats) => info!(networks = stats.len(), "System metrics refreshed"),
        Err(e) => error!(error = %e, "Failed to update system metrics"),
    }

    match service.check_risk_alerts().await {
        Ok(alerts) => info!(alerts = alerts.len(), "Risk alerts checked"),
        Err(e) => error!(error = %e, "Failed to check risk alerts"),
    }
}
