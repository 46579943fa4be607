use crate::output::OutputFormat;
use color_eyre::eyre::Context;
use color_eyre::Result;
use media_catalog_config::Config;
use media_catalog_servers::{MediaServer, WebhookRequest};
use std::collections::HashMap;
use std::path::PathBuf;

/// Normalize a captured webhook delivery through the active backend.
///
/// The file holds the JSON document the server posted; it is offered to
/// the backend both as a request body (Emby convention) and as the
/// `payload` form field (Plex convention).
pub async fn run(config: &Config, output: OutputFormat, file: PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read webhook capture {:?}", file))?;
    let request = WebhookRequest {
        body: Some(content.clone()),
        form: HashMap::from([("payload".to_string(), content)]),
    };

    let server = super::active_server(config).await?;
    match server.parse_webhook(&request).await {
        Some(event) => match output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&event)?),
            OutputFormat::Human => {
                println!(
                    "[{}] {} {}",
                    event.event,
                    event
                        .item_type
                        .map(|item_type| item_type.as_str())
                        .unwrap_or(""),
                    event.item_name.as_deref().unwrap_or("")
                );
                if let Some(overview) = &event.overview {
                    println!("  {}", overview);
                }
                if let Some(user) = &event.user_name {
                    println!("  played by {}", user);
                }
            }
        },
        None => println!("Not a recognizable {} event", server.server_name()),
    }
    Ok(())
}
