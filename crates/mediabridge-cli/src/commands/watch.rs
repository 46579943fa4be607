use color_eyre::Result;
use media_catalog_config::Config;
use media_catalog_core::{CatalogSynchronizer, LogNotifier, MemoryCatalogStore};
use media_catalog_servers::MediaServer;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Reconnect health check cadence: every ten minutes.
const RECONNECT_SCHEDULE: &str = "0 */10 * * * *";

type SharedServer = Arc<RwLock<Box<dyn MediaServer>>>;

pub async fn run(config: Config, schedule: Option<String>, no_startup_sync: bool) -> Result<()> {
    let scheduler_config = config.scheduler.clone().unwrap_or_default();
    let schedule = schedule.unwrap_or(scheduler_config.schedule);

    let server: SharedServer = Arc::new(RwLock::new(super::active_server(&config).await?));
    let store = MemoryCatalogStore::new();
    let synchronizer = Arc::new(CatalogSynchronizer::new(
        Arc::new(store),
        Arc::new(LogNotifier),
    ));

    if scheduler_config.run_on_startup && !no_startup_sync {
        info!("Running initial sync on startup");
        run_sync(&synchronizer, &server).await;
    }

    let mut scheduler = JobScheduler::new().await?;

    let sync_job = Job::new_async(schedule.as_str(), {
        let synchronizer = Arc::clone(&synchronizer);
        let server = Arc::clone(&server);
        move |_uuid, _lock| {
            let synchronizer = Arc::clone(&synchronizer);
            let server = Arc::clone(&server);
            Box::pin(async move {
                info!("Starting scheduled sync");
                run_sync(&synchronizer, &server).await;
            })
        }
    })?;
    scheduler.add(sync_job).await?;

    // Rebuild the backend connection when the health check finds it
    // unreachable.
    let reconnect_job = Job::new_async(RECONNECT_SCHEDULE, {
        let server = Arc::clone(&server);
        move |_uuid, _lock| {
            let server = Arc::clone(&server);
            Box::pin(async move {
                let mut guard = server.write().await;
                if !guard.is_reachable() {
                    guard.reconnect().await;
                }
            })
        }
    })?;
    scheduler.add(reconnect_job).await?;

    scheduler.start().await?;
    info!(schedule = %schedule, "Watch mode started");

    // The scheduler runs on the runtime; keep the foreground task parked.
    loop {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
    }
}

async fn run_sync(synchronizer: &CatalogSynchronizer, server: &SharedServer) {
    let guard = server.read().await;
    match synchronizer.sync(guard.as_ref()).await {
        Ok(report) => {
            info!(
                items = report.items,
                libraries = report.libraries,
                duration_ms = report.duration.as_millis(),
                "Sync completed"
            );
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "Sync failed");
        }
    }
}
