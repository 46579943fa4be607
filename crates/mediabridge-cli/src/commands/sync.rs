use crate::output::OutputFormat;
use color_eyre::Result;
use media_catalog_config::Config;
use media_catalog_core::{CatalogSynchronizer, LogNotifier, MemoryCatalogStore};
use std::sync::Arc;

pub async fn run(config: &Config, output: OutputFormat) -> Result<()> {
    let server = super::active_server(config).await?;
    let synchronizer =
        CatalogSynchronizer::new(Arc::new(MemoryCatalogStore::new()), Arc::new(LogNotifier));

    let report = synchronizer
        .sync(server.as_ref())
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Catalog sync failed: {:#}", e))?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Human => println!(
            "Synced {} items from {} libraries on {} in {:.1}s",
            report.items,
            report.libraries,
            report.server,
            report.duration.as_secs_f64()
        ),
    }
    Ok(())
}
