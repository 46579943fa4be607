pub mod exists;
pub mod libraries;
pub mod refresh;
pub mod sync;
pub mod watch;
pub mod webhook;

use color_eyre::Result;
use media_catalog_config::Config;
use media_catalog_servers::{MediaServer, ServerFactoryRegistry};

/// Build the backend named by the configuration's `mediaserver` key.
pub async fn active_server(config: &Config) -> Result<Box<dyn MediaServer>> {
    let registry = ServerFactoryRegistry::new();
    Ok(registry.create_active(config).await?)
}
