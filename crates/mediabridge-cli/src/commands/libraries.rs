use crate::output::OutputFormat;
use color_eyre::Result;
use comfy_table::Table;
use media_catalog_config::Config;
use media_catalog_servers::MediaServer;

pub async fn run(config: &Config, output: OutputFormat, stats: bool) -> Result<()> {
    let server = super::active_server(config).await?;
    let libraries = server.list_libraries().await;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&libraries)?),
        OutputFormat::Human => {
            let mut table = Table::new();
            table.set_header(vec!["ID", "Name", "Type", "Locations"]);
            for library in &libraries {
                let locations: Vec<String> = library
                    .locations
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect();
                table.add_row(vec![
                    library.id.clone(),
                    library.name.clone(),
                    library.media_type.to_string(),
                    locations.join("\n"),
                ]);
            }
            println!("{table}");
        }
    }

    if stats {
        match server.media_statistics().await {
            Some(totals) => match output {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({
                        "movie_count": totals.movie_count,
                        "show_count": totals.show_count,
                        "episode_count": totals.episode_count,
                    })
                ),
                OutputFormat::Human => println!(
                    "{} movies, {} shows, {} episodes",
                    totals.movie_count, totals.show_count, totals.episode_count
                ),
            },
            None => eprintln!("Statistics unavailable"),
        }
    }
    Ok(())
}
