use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use media_catalog_config::{Config, PathManager};
use media_catalog_models::MediaType;
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "mediabridge")]
#[command(about = "Bridge Plex and Emby media servers into a local media pipeline")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the local catalog from the active media server
    #[command(
        long_about = "Run one full erase-and-repopulate synchronization cycle: every movie and show the active media server reports, with per-season episode maps for shows."
    )]
    Sync,

    /// List the active server's library sections
    Libraries {
        /// Also fetch movie/show/episode totals
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
    },

    /// Check whether a title already exists on the active server
    #[command(
        long_about = "Existence check against the live server catalog: known item IDs first, then title/year search with an original-title union and tmdb cross-check. For shows, prints the already-present season/episode map."
    )]
    Exists {
        #[arg(long)]
        title: String,

        #[arg(long)]
        original_title: Option<String>,

        #[arg(long)]
        year: Option<u32>,

        #[arg(long = "type", value_enum, default_value = "movie")]
        media_type: MediaTypeArg,

        #[arg(long)]
        tmdb_id: Option<u32>,

        /// Restrict the show check to one season
        #[arg(long)]
        season: Option<u32>,

        /// Known native item IDs, checked before any title search
        #[arg(long = "item-id")]
        item_ids: Vec<String>,
    },

    /// Ask the server to pick up freshly placed files
    #[command(
        long_about = "Resolve each path to its owning library section and issue one targeted refresh per directory. If any path falls outside all configured library roots, the whole catalog is refreshed instead."
    )]
    Refresh {
        /// Target paths
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Normalize a captured webhook delivery through the active backend
    Webhook {
        /// Path to the captured JSON document
        file: PathBuf,
    },

    /// Run in the foreground with scheduled syncs and reconnect checks
    Watch {
        /// Cron schedule expression (e.g. '0 0 */6 * * *' for every 6 hours)
        #[arg(long, value_name = "SCHEDULE")]
        schedule: Option<String>,

        /// Skip the initial sync on startup
        #[arg(long, action = ArgAction::SetTrue)]
        no_startup_sync: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MediaTypeArg {
    Movie,
    Show,
}

impl From<MediaTypeArg> for MediaType {
    fn from(arg: MediaTypeArg) -> Self {
        match arg {
            MediaTypeArg::Movie => MediaType::Movie,
            MediaTypeArg::Show => MediaType::Show,
        }
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // Watch mode logs to a rolling file; everything else to stderr
    let log_file = matches!(cli.command, Commands::Watch { .. })
        .then(|| PathManager::default().watch_log_file());
    logging::init_logging_with_file(cli.verbose, cli.quiet, log_file)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let config = Config::load_default().map_err(|e| {
        color_eyre::eyre::eyre!(
            "Failed to load configuration ({:#}); place a config.toml in the mediabridge config directory",
            e
        )
    })?;

    match cli.command {
        Commands::Sync => commands::sync::run(&config, cli.output).await,
        Commands::Libraries { stats } => commands::libraries::run(&config, cli.output, stats).await,
        Commands::Exists {
            title,
            original_title,
            year,
            media_type,
            tmdb_id,
            season,
            item_ids,
        } => {
            let lookup = media_catalog_models::MediaLookup {
                title,
                original_title,
                year,
                media_type: media_type.into(),
                tmdb_id,
            };
            commands::exists::run(&config, cli.output, lookup, item_ids, season).await
        }
        Commands::Refresh { paths } => commands::refresh::run(&config, paths).await,
        Commands::Webhook { file } => commands::webhook::run(&config, cli.output, file).await,
        Commands::Watch {
            schedule,
            no_startup_sync,
        } => commands::watch::run(config, schedule, no_startup_sync).await,
    }
}
