use crate::output::OutputFormat;
use color_eyre::Result;
use media_catalog_config::Config;
use media_catalog_core::media_exists;
use media_catalog_models::{MediaLookup, MediaType};

pub async fn run(
    config: &Config,
    output: OutputFormat,
    lookup: MediaLookup,
    item_ids: Vec<String>,
    season: Option<u32>,
) -> Result<()> {
    let server = super::active_server(config).await?;
    let found = media_exists(server.as_ref(), &lookup, &item_ids, season).await;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&found)?),
        OutputFormat::Human => match found {
            None => println!("{}: not present", lookup.title),
            Some(existing) if existing.media_type == MediaType::Movie => {
                println!("{}: present", lookup.title)
            }
            Some(existing) => {
                println!("{}: present", lookup.title);
                for (season, episodes) in &existing.seasons {
                    let episodes: Vec<String> =
                        episodes.iter().map(|episode| episode.to_string()).collect();
                    println!("  season {}: episodes {}", season, episodes.join(", "));
                }
            }
        },
    }
    Ok(())
}
