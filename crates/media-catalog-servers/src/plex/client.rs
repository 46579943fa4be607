use crate::guid::resolve_external_ids;
use crate::matching::{dedup_by_item_id, filter_by_tmdb, fold_episodes};
use crate::paths::{plan_refresh, RefreshPlan};
use crate::plex::api::{PlexHttpClient, PlexMetadata, SectionInfo};
use crate::plex::webhook;
use crate::traits::{ArtworkKind, EpisodeQuery, MediaServer, MediaStatistics, WebhookRequest};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use media_catalog_config::PlexConfig;
use media_catalog_models::{
    LibrarySection, MediaLookup, MediaType, RefreshTarget, SeasonEpisodes, ServerItem,
    WebhookEvent,
};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

pub const SERVER_NAME: &str = "plex";

/// Plex backend speaking the native container API.
///
/// Holds no state beyond the connection handle and the section cache
/// refreshed on every library listing; everything else is a live read
/// against the server.
pub struct PlexServer {
    host: String,
    token: String,
    api: Option<PlexHttpClient>,
    sections: RwLock<Vec<LibrarySection>>,
}

impl PlexServer {
    /// Build the backend and attempt the initial connection. A failed
    /// attempt leaves the instance unreachable; operations degrade to
    /// empty results until `reconnect` succeeds.
    pub async fn connect(config: &PlexConfig) -> Self {
        let mut server = Self {
            host: config.normalized_host(),
            token: config.token.clone(),
            api: None,
            sections: RwLock::new(Vec::new()),
        };
        server.establish().await;
        server
    }

    async fn establish(&mut self) {
        self.api = None;
        if self.host.is_empty() || self.token.is_empty() {
            return;
        }
        let api = match PlexHttpClient::new(&self.host, &self.token) {
            Ok(api) => api,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Failed to build Plex HTTP client");
                return;
            }
        };
        match api.identity().await {
            Ok(machine_id) => {
                info!(machine_id = %machine_id, "Connected to Plex server");
                self.api = Some(api);
                let sections = self.fetch_sections().await;
                *self.sections.write().await = sections;
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "Plex server connection failed");
            }
        }
    }

    async fn fetch_sections(&self) -> Vec<LibrarySection> {
        let Some(api) = self.api.as_ref() else {
            return Vec::new();
        };
        match api.get_sections().await {
            Ok(sections) => sections
                .into_iter()
                .filter_map(section_to_library)
                .collect(),
            Err(e) => {
                error!(error = %format!("{e:#}"), "Failed to list Plex library sections");
                Vec::new()
            }
        }
    }

    /// Title search plus original-title union, converted to catalog
    /// records.
    async fn search_movies(&self, lookup: &MediaLookup) -> Vec<ServerItem> {
        let Some(api) = self.api.as_ref() else {
            return Vec::new();
        };
        let mut hits = match api.search(&lookup.title, lookup.year, MediaType::Movie).await {
            Ok(hits) => hits,
            Err(e) => {
                error!(error = %format!("{e:#}"), title = %lookup.title, "Plex movie search failed");
                Vec::new()
            }
        };
        if let Some(original) = lookup.original_title.as_deref() {
            if original != lookup.title {
                match api.search(original, lookup.year, MediaType::Movie).await {
                    Ok(more) => hits.extend(more),
                    Err(e) => {
                        error!(error = %format!("{e:#}"), title = original, "Plex movie search failed");
                    }
                }
            }
        }
        hits.into_iter().map(|meta| convert_item(None, meta)).collect()
    }

    /// Resolve the show a query points at: exact by native ID when IDs
    /// were supplied, otherwise approximate by title then original title
    /// where the first hit wins.
    async fn resolve_show(&self, query: &EpisodeQuery) -> Option<PlexMetadata> {
        let api = self.api.as_ref()?;
        if !query.item_ids.is_empty() {
            for item_id in &query.item_ids {
                match api.get_metadata(item_id).await {
                    Ok(Some(meta)) => return Some(meta),
                    Ok(None) => continue,
                    Err(e) => {
                        error!(error = %format!("{e:#}"), item_id = %item_id, "Plex item lookup failed");
                        return None;
                    }
                }
            }
            return None;
        }

        let title = query.title.as_deref()?;
        let mut hits = match api.search(title, query.year, MediaType::Show).await {
            Ok(hits) => hits,
            Err(e) => {
                error!(error = %format!("{e:#}"), title = %title, "Plex show search failed");
                Vec::new()
            }
        };
        if hits.is_empty() {
            if let Some(original) = query.original_title.as_deref() {
                if original != title {
                    hits = api
                        .search(original, query.year, MediaType::Show)
                        .await
                        .unwrap_or_else(|e| {
                            error!(error = %format!("{e:#}"), title = original, "Plex show search failed");
                            Vec::new()
                        });
                }
            }
        }
        hits.into_iter().next()
    }
}

#[async_trait]
impl MediaServer for PlexServer {
    fn server_name(&self) -> &str {
        SERVER_NAME
    }

    fn is_reachable(&self) -> bool {
        self.api.is_some()
    }

    async fn reconnect(&mut self) {
        info!("Rebuilding Plex server connection");
        self.establish().await;
    }

    async fn list_libraries(&self) -> Vec<LibrarySection> {
        let sections = self.fetch_sections().await;
        *self.sections.write().await = sections.clone();
        sections
    }

    async fn list_items(&self, library_id: &str) -> BoxStream<'static, ServerItem> {
        let Some(api) = self.api.clone() else {
            return stream::empty().boxed();
        };
        let items = match api.get_section_items(library_id).await {
            Ok(items) => items,
            Err(e) => {
                error!(error = %format!("{e:#}"), library_id = %library_id, "Failed to list Plex library items");
                Vec::new()
            }
        };
        let library_id = library_id.to_string();
        stream::iter(items)
            .map(move |meta| convert_item(Some(&library_id), meta))
            .boxed()
    }

    async fn get_item(&self, item_id: &str) -> Option<ServerItem> {
        let api = self.api.as_ref()?;
        match api.get_metadata(item_id).await {
            Ok(meta) => meta.map(|meta| convert_item(None, meta)),
            Err(e) => {
                error!(error = %format!("{e:#}"), item_id = %item_id, "Plex item lookup failed");
                None
            }
        }
    }

    async fn find_movies(&self, lookup: &MediaLookup) -> Vec<ServerItem> {
        let candidates = dedup_by_item_id(self.search_movies(lookup).await);
        filter_by_tmdb(candidates, lookup.tmdb_id)
    }

    async fn list_episodes(&self, query: &EpisodeQuery) -> SeasonEpisodes {
        let mut seasons = SeasonEpisodes::new();
        let Some(show) = self.resolve_show(query).await else {
            return seasons;
        };

        // Identifier precision is authoritative: a contradicted tmdb id
        // aborts the lookup instead of falling back to the fuzzy match.
        let show_ids = resolve_external_ids(&show.guids);
        if let (Some(expected), Some(found)) = (query.tmdb_id, show_ids.tmdb_id) {
            if expected != found {
                debug!(
                    title = %show.title,
                    expected,
                    found,
                    "Resolved show contradicts the expected tmdb id, aborting episode lookup"
                );
                return seasons;
            }
        }

        let api = match self.api.as_ref() {
            Some(api) => api,
            None => return seasons,
        };
        let episodes = match api.get_all_episodes(&show.rating_key).await {
            Ok(episodes) => episodes,
            Err(e) => {
                error!(error = %format!("{e:#}"), show = %show.title, "Failed to list Plex episodes");
                return seasons;
            }
        };
        seasons = fold_episodes(
            episodes
                .into_iter()
                .map(|episode| (episode.parent_index, episode.index)),
            query.season,
        );
        seasons
    }

    async fn refresh_targets(&self, items: &[RefreshTarget]) {
        let Some(api) = self.api.as_ref() else {
            return;
        };
        let sections = self.sections.read().await.clone();
        match plan_refresh(items, &sections) {
            RefreshPlan::Full => {
                info!("Refreshing whole Plex catalog");
                if let Err(e) = api.refresh_all_sections().await {
                    error!(error = %format!("{e:#}"), "Plex full refresh failed");
                }
            }
            RefreshPlan::Targeted(calls) => {
                for (library_id, path) in calls {
                    info!(library_id = %library_id, path = %path.display(), "Refreshing Plex library path");
                    if let Err(e) = api
                        .refresh_section_path(&library_id, &path.to_string_lossy())
                        .await
                    {
                        error!(error = %format!("{e:#}"), library_id = %library_id, "Plex path refresh failed");
                    }
                }
            }
        }
    }

    async fn refresh_all(&self) -> bool {
        let Some(api) = self.api.as_ref() else {
            return false;
        };
        match api.refresh_all_sections().await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Plex full refresh failed");
                false
            }
        }
    }

    async fn parse_webhook(&self, request: &WebhookRequest) -> Option<WebhookEvent> {
        let mut event = webhook::parse_form(&request.form)?;
        if let Some(item_id) = event.item_id.clone() {
            event.image_url = self
                .remote_artwork_url(&item_id, ArtworkKind::Backdrop)
                .await;
        }
        Some(event)
    }

    async fn remote_artwork_url(&self, item_id: &str, kind: ArtworkKind) -> Option<String> {
        let api = self.api.as_ref()?;
        match api.artwork_url(item_id, kind).await {
            Ok(url) => url,
            Err(e) => {
                debug!(error = %format!("{e:#}"), item_id = %item_id, "Plex artwork lookup failed");
                None
            }
        }
    }

    async fn media_statistics(&self) -> Option<MediaStatistics> {
        let api = self.api.as_ref()?;
        let sections = match api.get_sections().await {
            Ok(sections) => sections,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Failed to list Plex sections for statistics");
                return None;
            }
        };
        let mut stats = MediaStatistics::default();
        for section in &sections {
            match section.type_.as_str() {
                "movie" => {
                    stats.movie_count += api.section_size(&section.key, false).await.unwrap_or(0);
                }
                "show" => {
                    stats.show_count += api.section_size(&section.key, false).await.unwrap_or(0);
                    stats.episode_count += api.section_size(&section.key, true).await.unwrap_or(0);
                }
                _ => {}
            }
        }
        Some(stats)
    }
}

fn section_to_library(section: SectionInfo) -> Option<LibrarySection> {
    let media_type = match section.type_.as_str() {
        "movie" => MediaType::Movie,
        "show" => MediaType::Show,
        // Music and photo sections are outside the catalog
        _ => return None,
    };
    Some(LibrarySection {
        server: SERVER_NAME.to_string(),
        id: section.key,
        name: section.title,
        media_type,
        locations: section.locations.into_iter().map(PathBuf::from).collect(),
    })
}

fn convert_item(library_id: Option<&str>, meta: PlexMetadata) -> ServerItem {
    let ids = resolve_external_ids(&meta.guids);
    ServerItem {
        item_id: meta.rating_key,
        library_id: library_id
            .map(str::to_string)
            .or(meta.library_section_id)
            .unwrap_or_default(),
        item_type: meta.type_,
        title: meta.title,
        original_title: meta.original_title,
        year: meta.year,
        ids,
        path: meta.locations.first().map(PathBuf::from),
    }
}
