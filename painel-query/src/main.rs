//! Painel Query - Headless dashboard session.
//!
//! Keeps the backend health check and the home rankings subscribed and logs
//! every state change until interrupted.

use anyhow::{anyhow, Result};
use painel_common::config::Config;
use painel_common::logging::init_logging;
use painel_query::{build_client, ScreeningFanOut, SectorFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();

    // Load configuration
    let config = Config::load_with_env()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Painel Query v{}", env!("CARGO_PKG_VERSION"));

    let sector = config.dashboard.sector.as_deref();
    let filter = SectorFilter::parse(sector)
        .ok_or_else(|| anyhow!("Unknown dashboard sector: {}", sector.unwrap_or_default()))?;

    let (market, _session) = build_client(&config)?;

    let mut health = market
        .health()
        .subscribe()
        .ok_or_else(|| anyhow!("Health query is disabled"))?;
    let mut rankings = ScreeningFanOut::home(market.clone()).subscribe(filter);

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        filter = %filter,
        "Dashboard session started in {:?}",
        startup_duration
    );

    loop {
        tokio::select! {
            alive = health.changed() => {
                if !alive {
                    break;
                }
                let state = health.state();
                match (&state.data, &state.error) {
                    (_, Some(err)) if state.is_error() => {
                        tracing::warn!(error = %err, "Backend health check failed");
                    }
                    (Some(status), _) => {
                        tracing::info!(
                            healthy = status.is_healthy(),
                            service = status.service.as_deref().unwrap_or("-"),
                            "Backend health"
                        );
                    }
                    _ => {}
                }
            }
            alive = rankings.changed() => {
                if !alive {
                    break;
                }
                let result = rankings.result();
                if result.state.is_loading {
                    continue;
                }
                for (name, rows) in &result.data {
                    tracing::info!(ranking = %name, rows = rows.len(), "Ranking updated");
                }
                for (name, err) in &result.errors {
                    tracing::warn!(ranking = %name, error = %err, "Ranking failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    let stats = market.orchestrator().stats();
    tracing::info!(
        entries = stats.total_entries,
        subscribed = stats.subscribed_entries,
        "Cache at shutdown"
    );
    Ok(())
}
