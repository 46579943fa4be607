use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use media_catalog_models::{
    LibrarySection, MediaLookup, RefreshTarget, SeasonEpisodes, ServerItem, WebhookEvent,
};
use media_catalog_servers::{
    ArtworkKind, EpisodeQuery, MediaServer, MediaStatistics, WebhookRequest,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Canned media server for core tests: fixed libraries, items and
/// episode maps, with call recording for the matcher and synchronizer
/// assertions.
pub struct MockServer {
    pub name: String,
    pub libraries: Vec<LibrarySection>,
    pub items: HashMap<String, Vec<ServerItem>>,
    pub known_items: HashMap<String, ServerItem>,
    pub movie_hits: Vec<ServerItem>,
    pub episodes: SeasonEpisodes,
    /// Per-item delay in `list_items`, to widen interleaving windows in
    /// concurrency tests.
    pub item_delay: Option<Duration>,
    pub find_movies_calls: AtomicUsize,
    pub episode_queries: Mutex<Vec<EpisodeQuery>>,
}

impl MockServer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            libraries: Vec::new(),
            items: HashMap::new(),
            known_items: HashMap::new(),
            movie_hits: Vec::new(),
            episodes: SeasonEpisodes::new(),
            item_delay: None,
            find_movies_calls: AtomicUsize::new(0),
            episode_queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MediaServer for MockServer {
    fn server_name(&self) -> &str {
        &self.name
    }

    fn is_reachable(&self) -> bool {
        true
    }

    async fn reconnect(&mut self) {}

    async fn list_libraries(&self) -> Vec<LibrarySection> {
        self.libraries.clone()
    }

    async fn list_items(&self, library_id: &str) -> BoxStream<'static, ServerItem> {
        let items = self.items.get(library_id).cloned().unwrap_or_default();
        let delay = self.item_delay;
        stream::iter(items)
            .then(move |item| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                item
            })
            .boxed()
    }

    async fn get_item(&self, item_id: &str) -> Option<ServerItem> {
        self.known_items.get(item_id).cloned()
    }

    async fn find_movies(&self, _lookup: &MediaLookup) -> Vec<ServerItem> {
        self.find_movies_calls.fetch_add(1, Ordering::SeqCst);
        self.movie_hits.clone()
    }

    async fn list_episodes(&self, query: &EpisodeQuery) -> SeasonEpisodes {
        self.episode_queries
            .lock()
            .expect("episode query log poisoned")
            .push(query.clone());
        let mut seasons = self.episodes.clone();
        if let Some(only) = query.season {
            seasons.retain(|season, _| *season == only);
        }
        seasons
    }

    async fn refresh_targets(&self, _items: &[RefreshTarget]) {}

    async fn refresh_all(&self) -> bool {
        true
    }

    async fn parse_webhook(&self, _request: &WebhookRequest) -> Option<WebhookEvent> {
        None
    }

    async fn remote_artwork_url(&self, _item_id: &str, _kind: ArtworkKind) -> Option<String> {
        None
    }

    async fn media_statistics(&self) -> Option<MediaStatistics> {
        None
    }
}
