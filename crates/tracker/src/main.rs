use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use field_tracker::config::Config;
use field_tracker::jobs;
use field_tracker::logging::init_logging;
use field_tracker::replay::ReplayPositionSource;
use field_tracker::{TrackingDeps, TrackingSessionManager};
use persistence::repositories::{AssetRepository, ZoneRepository};
use persistence::PgTelemetrySink;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    init_logging(&config.logging);

    info!("Starting field tracker v{}", env!("CARGO_PKG_VERSION"));

    if config.metrics.prometheus_port != 0 {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.metrics.prometheus_port))
            .install()?;
        info!(port = config.metrics.prometheus_port, "Prometheus exporter listening");
    }

    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let source = Arc::new(ReplayPositionSource::from_file(
        &config.replay.file,
        config.replay.default_delay(),
    )?);
    info!(file = %config.replay.file, fixes = source.len(), "Loaded fix replay");

    let manager = TrackingSessionManager::new(
        &config,
        TrackingDeps {
            zone_store: Arc::new(ZoneRepository::new(pool.clone())),
            asset_catalog: Arc::new(AssetRepository::new(pool.clone())),
            sink: Arc::new(PgTelemetrySink::new(pool.clone())),
            position_source: source,
        },
    );

    let _alerts = manager.listeners().geofence.subscribe(|event| {
        if event.notify {
            info!(
                zone = event.zone_name.as_deref().unwrap_or(&event.zone_id),
                event_type = %event.event_type,
                user_id = %event.user_id,
                "Zone alert"
            );
        }
        Ok(())
    });

    let mut scheduler = jobs::standard_jobs(&config, &manager);
    scheduler.start();

    manager
        .start_tracking(&config.replay.user_id, &config.replay.farm_id)
        .await?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted, stopping session"),
        _ = manager.source_closed() => info!("Replay finished, stopping session"),
    }

    let session = manager.stop_tracking().await?;
    info!(
        session_id = %session.id,
        locations = session.location_count,
        distance_meters = session.total_distance_meters,
        average_accuracy_meters = session.average_accuracy_meters,
        zones_visited = ?session.zones_visited,
        "Session summary"
    );

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(10)).await;
    pool.close().await;

    Ok(())
}
