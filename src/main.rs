use anyhow::Result;
use hostwatch::*;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let history_repo = Arc::new(
        history_repo::HistoryRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
            app_config.database.retention_days,
        )
        .await?,
    );
    history_repo.init().await?;

    let index = if app_config.engine.index_bucket_secs > 0 {
        let index = Arc::new(series::PopulatedIndex::new(
            app_config.engine.index_bucket_secs,
        ));
        maintenance::hydrate_index(&history_repo, &index).await?;
        Some(index)
    } else {
        None
    };

    let mut engine = series::SeriesEngine::new(history_repo.clone(), app_config.engine_settings());
    if let Some(index) = &index {
        engine = engine.with_index(index.clone());
    }
    let engine = Arc::new(engine);

    let (ingest_tx, ingest_rx) = mpsc::channel::<models::Sample>(
        ingest::writer_channel_capacity(app_config.ingest.flush_rate),
    );
    let writer_handle = ingest::spawn_ingest_writer(
        ingest_rx,
        ingest::IngestDeps {
            history_repo: history_repo.clone(),
            engine: engine.clone(),
            index: index.clone(),
            samples_saved_total: Arc::new(AtomicU64::new(0)),
        },
        ingest::IngestWriterConfig {
            flush_rate: app_config.ingest.flush_rate,
            flush_interval_secs: app_config.ingest.flush_interval_secs,
        },
    );

    let maintenance_handle = maintenance::spawn(
        history_repo.clone(),
        index,
        maintenance::MaintenanceWorkerConfig {
            prune_interval_secs: app_config.maintenance.prune_interval_secs,
            vacuum_schedule: app_config.maintenance.vacuum_schedule.clone(),
            vacuum_interval_secs: app_config.maintenance.vacuum_interval_secs,
        },
    );

    let app = routes::app(history_repo, engine, ingest_tx);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        retention_days = app_config.database.retention_days,
        "Listening on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Received shutdown signal");
    maintenance_handle.abort();
    // The router (and with it every ingest sender) is gone; the writer drains and exits.
    let _ = writer_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
