use color_eyre::Result;
use media_catalog_config::Config;
use media_catalog_models::RefreshTarget;
use media_catalog_servers::MediaServer;
use std::path::PathBuf;

pub async fn run(config: &Config, paths: Vec<PathBuf>) -> Result<()> {
    let server = super::active_server(config).await?;
    // Refresh planning needs the current section list cached
    server.list_libraries().await;

    let targets: Vec<RefreshTarget> = paths.into_iter().map(RefreshTarget::new).collect();
    server.refresh_targets(&targets).await;
    println!("Refresh requests issued for {} path(s)", targets.len());
    Ok(())
}
