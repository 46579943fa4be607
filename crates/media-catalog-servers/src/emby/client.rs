use crate::emby::api::{external_ids_from_provider_map, EmbyHttpClient, EmbyItem, MediaFolder};
use crate::emby::webhook;
use crate::matching::{dedup_by_item_id, filter_by_tmdb, fold_episodes};
use crate::paths::{plan_refresh, RefreshPlan};
use crate::traits::{ArtworkKind, EpisodeQuery, MediaServer, MediaStatistics, WebhookRequest};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use media_catalog_config::EmbyConfig;
use media_catalog_models::{
    LibrarySection, MediaLookup, MediaType, RefreshTarget, SeasonEpisodes, ServerItem,
    WebhookEvent,
};
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

pub const SERVER_NAME: &str = "emby";

/// Emby backend speaking the native REST API under an admin user
/// context.
pub struct EmbyServer {
    host: String,
    api_key: String,
    api: Option<EmbyHttpClient>,
    sections: RwLock<Vec<LibrarySection>>,
}

impl EmbyServer {
    pub async fn connect(config: &EmbyConfig) -> Self {
        let mut server = Self {
            host: config.normalized_host(),
            api_key: config.api_key.clone(),
            api: None,
            sections: RwLock::new(Vec::new()),
        };
        server.establish().await;
        server
    }

    async fn establish(&mut self) {
        self.api = None;
        if self.host.is_empty() || self.api_key.is_empty() {
            return;
        }
        let mut api = match EmbyHttpClient::new(&self.host, &self.api_key) {
            Ok(api) => api,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Failed to build Emby HTTP client");
                return;
            }
        };
        let server_id = match api.system_id().await {
            Ok(id) => id,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Emby server connection failed");
                return;
            }
        };
        match api.admin_user().await {
            Ok(Some(user_id)) => api.set_user(user_id),
            Ok(None) => {
                error!("No Emby administrator account found");
                return;
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "Failed to resolve Emby administrator");
                return;
            }
        }
        info!(server_id = %server_id, "Connected to Emby server");
        self.api = Some(api);
        let sections = self.fetch_sections().await;
        *self.sections.write().await = sections;
    }

    /// Sections come from the admin views; their filesystem locations
    /// come from the selectable media folders, joined by library id.
    async fn fetch_sections(&self) -> Vec<LibrarySection> {
        let Some(api) = self.api.as_ref() else {
            return Vec::new();
        };
        let views = match api.views().await {
            Ok(views) => views,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Failed to list Emby views");
                return Vec::new();
            }
        };
        let folders = match api.media_folders().await {
            Ok(folders) => folders,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Failed to list Emby media folders");
                Vec::new()
            }
        };
        views
            .into_iter()
            .filter_map(|view| {
                let media_type = match view.collection_type.as_deref() {
                    Some("movies") => MediaType::Movie,
                    Some("tvshows") => MediaType::Show,
                    _ => return None,
                };
                Some(LibrarySection {
                    server: SERVER_NAME.to_string(),
                    locations: folder_locations(&folders, &view.id, &view.name),
                    id: view.id,
                    name: view.name,
                    media_type,
                })
            })
            .collect()
    }

    /// Walk a library's folder tree down to its movie/series stubs. The
    /// cheap container calls are eager; per-item detail fetches stay
    /// lazy in the returned stream.
    async fn collect_item_stubs(&self, api: &EmbyHttpClient, library_id: &str) -> Vec<String> {
        let mut queue = vec![library_id.to_string()];
        let mut stubs = Vec::new();
        while let Some(parent) = queue.pop() {
            let children = match api.children(&parent).await {
                Ok(children) => children,
                Err(e) => {
                    error!(error = %format!("{e:#}"), parent = %parent, "Failed to list Emby items");
                    continue;
                }
            };
            for child in children {
                match child.type_.as_str() {
                    "Movie" | "Series" => stubs.push(child.id),
                    type_ if type_.contains("Folder") => queue.push(child.id),
                    _ => {}
                }
            }
        }
        stubs
    }

    async fn search_movies(&self, lookup: &MediaLookup) -> Vec<ServerItem> {
        let Some(api) = self.api.as_ref() else {
            return Vec::new();
        };
        let mut titles = vec![lookup.title.clone()];
        if let Some(original) = lookup.original_title.as_deref() {
            if original != lookup.title {
                titles.push(original.to_string());
            }
        }
        let mut candidates = Vec::new();
        for title in titles {
            let hits = match api.search_items("Movie", &title).await {
                Ok(hits) => hits,
                Err(e) => {
                    error!(error = %format!("{e:#}"), title = %title, "Emby movie search failed");
                    continue;
                }
            };
            candidates.extend(
                hits.into_iter()
                    .filter(|hit| {
                        hit.name == title
                            && match (lookup.year, hit.production_year) {
                                (Some(wanted), Some(found)) => wanted == found,
                                _ => true,
                            }
                    })
                    .map(convert_item),
            );
        }
        candidates
    }

    /// Resolve the series a query points at, exact IDs first, then name
    /// search where the first exact-name hit wins.
    async fn resolve_series(&self, query: &EpisodeQuery) -> Option<EmbyItem> {
        let api = self.api.as_ref()?;
        if !query.item_ids.is_empty() {
            for item_id in &query.item_ids {
                match api.item_info(item_id).await {
                    Ok(Some(item)) => return Some(item),
                    Ok(None) => continue,
                    Err(e) => {
                        error!(error = %format!("{e:#}"), item_id = %item_id, "Emby item lookup failed");
                        return None;
                    }
                }
            }
            return None;
        }

        let mut titles = Vec::new();
        if let Some(title) = query.title.as_deref() {
            titles.push(title.to_string());
        }
        if let Some(original) = query.original_title.as_deref() {
            if Some(original) != query.title.as_deref() {
                titles.push(original.to_string());
            }
        }
        for title in titles {
            let hits = match api.search_items("Series", &title).await {
                Ok(hits) => hits,
                Err(e) => {
                    error!(error = %format!("{e:#}"), title = %title, "Emby series search failed");
                    continue;
                }
            };
            if let Some(hit) = hits.into_iter().find(|hit| hit.name == title) {
                return Some(hit);
            }
        }
        None
    }
}

#[async_trait]
impl MediaServer for EmbyServer {
    fn server_name(&self) -> &str {
        SERVER_NAME
    }

    fn is_reachable(&self) -> bool {
        self.api.is_some()
    }

    async fn reconnect(&mut self) {
        info!("Rebuilding Emby server connection");
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
        let stubs = self.collect_item_stubs(&api, library_id).await;
        stream::iter(stubs)
            .filter_map(move |item_id| {
                let api = api.clone();
                async move {
                    match api.item_info(&item_id).await {
                        Ok(Some(item)) => Some(convert_item(item)),
                        Ok(None) => None,
                        Err(e) => {
                            error!(error = %format!("{e:#}"), item_id = %item_id, "Emby item lookup failed");
                            None
                        }
                    }
                }
            })
            .boxed()
    }

    async fn get_item(&self, item_id: &str) -> Option<ServerItem> {
        let api = self.api.as_ref()?;
        match api.item_info(item_id).await {
            Ok(item) => item.map(convert_item),
            Err(e) => {
                error!(error = %format!("{e:#}"), item_id = %item_id, "Emby item lookup failed");
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
        let Some(series) = self.resolve_series(query).await else {
            return seasons;
        };

        // A contradicted tmdb id aborts the lookup; absence passes.
        let series_ids = external_ids_from_provider_map(&series.provider_ids);
        if let (Some(expected), Some(found)) = (query.tmdb_id, series_ids.tmdb_id) {
            if expected != found {
                debug!(
                    title = %series.name,
                    expected,
                    found,
                    "Resolved series contradicts the expected tmdb id, aborting episode lookup"
                );
                return seasons;
            }
        }

        let api = match self.api.as_ref() {
            Some(api) => api,
            None => return seasons,
        };
        let episodes = match api.show_episodes(&series.id, query.season).await {
            Ok(episodes) => episodes,
            Err(e) => {
                error!(error = %format!("{e:#}"), series = %series.name, "Failed to list Emby episodes");
                return seasons;
            }
        };
        seasons = fold_episodes(
            episodes
                .into_iter()
                .map(|episode| (episode.parent_index_number, episode.index_number)),
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
                info!("Refreshing whole Emby library");
                if let Err(e) = api.refresh_library().await {
                    error!(error = %format!("{e:#}"), "Emby full refresh failed");
                }
            }
            RefreshPlan::Targeted(calls) => {
                // Emby refreshes per library item, not per path; distinct
                // libraries collapse to one call each.
                let libraries: HashSet<String> =
                    calls.into_iter().map(|(library_id, _)| library_id).collect();
                for library_id in libraries {
                    info!(library_id = %library_id, "Refreshing Emby library");
                    if let Err(e) = api.refresh_item(&library_id).await {
                        error!(error = %format!("{e:#}"), library_id = %library_id, "Emby library refresh failed");
                    }
                }
            }
        }
    }

    async fn refresh_all(&self) -> bool {
        let Some(api) = self.api.as_ref() else {
            return false;
        };
        match api.refresh_library().await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Emby full refresh failed");
                false
            }
        }
    }

    async fn parse_webhook(&self, request: &WebhookRequest) -> Option<WebhookEvent> {
        let body = request.body.as_deref()?;
        let mut event = webhook::parse_body(body)?;
        if let Some(item_id) = event.item_id.clone() {
            event.image_url = self
                .remote_artwork_url(&item_id, ArtworkKind::Backdrop)
                .await;
        }
        Some(event)
    }

    async fn remote_artwork_url(&self, item_id: &str, kind: ArtworkKind) -> Option<String> {
        let api = self.api.as_ref()?;
        let image_type = match kind {
            ArtworkKind::Poster => "Primary",
            ArtworkKind::Backdrop => "Backdrop",
        };
        match api.remote_image_url(item_id, image_type).await {
            Ok(url) => url,
            Err(e) => {
                debug!(error = %format!("{e:#}"), item_id = %item_id, "Emby artwork lookup failed");
                None
            }
        }
    }

    async fn media_statistics(&self) -> Option<MediaStatistics> {
        let api = self.api.as_ref()?;
        match api.item_counts().await {
            Ok(counts) => Some(MediaStatistics {
                movie_count: counts.movie_count,
                show_count: counts.series_count,
                episode_count: counts.episode_count,
            }),
            Err(e) => {
                error!(error = %format!("{e:#}"), "Failed to fetch Emby item counts");
                None
            }
        }
    }
}

fn folder_locations(folders: &[MediaFolder], view_id: &str, view_name: &str) -> Vec<PathBuf> {
    folders
        .iter()
        .find(|folder| folder.id == view_id || folder.name == view_name)
        .map(|folder| {
            folder
                .sub_folders
                .iter()
                .filter_map(|sub| sub.path.as_deref().map(PathBuf::from))
                .collect()
        })
        .unwrap_or_default()
}

fn convert_item(item: EmbyItem) -> ServerItem {
    let ids = external_ids_from_provider_map(&item.provider_ids);
    ServerItem {
        item_id: item.id,
        library_id: item.parent_id.unwrap_or_default(),
        item_type: item.type_,
        title: item.name,
        original_title: item.original_title,
        year: item.production_year,
        ids,
        path: item.path.map(PathBuf::from),
    }
}
