use async_trait::async_trait;
use futures::stream::BoxStream;
use media_catalog_models::{
    LibrarySection, MediaLookup, RefreshTarget, SeasonEpisodes, ServerItem, WebhookEvent,
};
use std::collections::HashMap;

/// Raw inbound webhook delivery, before any backend has claimed it.
///
/// Plex delivers a form with a `payload` field; Emby posts the JSON
/// document as the request body. Both shapes are carried so the active
/// backend can pick the one its transport convention uses.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    pub body: Option<String>,
    pub form: HashMap<String, String>,
}

impl WebhookRequest {
    pub fn from_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            form: HashMap::new(),
        }
    }

    pub fn from_form(form: HashMap<String, String>) -> Self {
        Self { body: None, form }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtworkKind {
    Poster,
    Backdrop,
}

/// Inputs for resolving a show's season → episode map.
///
/// `item_ids` resolves by native ID (exact); otherwise the title/year
/// fields drive an approximate search where the first match wins.
#[derive(Debug, Clone, Default)]
pub struct EpisodeQuery {
    pub item_ids: Vec<String>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub year: Option<u32>,
    pub tmdb_id: Option<u32>,
    pub season: Option<u32>,
}

/// Totals reported by a backend, for operator-facing summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaStatistics {
    pub movie_count: u64,
    pub show_count: u64,
    pub episode_count: u64,
}

/// Capability interface over one media-server backend.
///
/// All read operations fail soft: a transport error is logged at the
/// adapter boundary and degraded to an empty or `None` result, never
/// raised to the caller. The refresh operations are the only calls that
/// mutate backend state; the adapter itself only mutates its cached
/// section list and reachability flag.
#[async_trait]
pub trait MediaServer: Send + Sync {
    fn server_name(&self) -> &str;

    /// Whether the last connection attempt to the backend succeeded.
    ///
    /// Consulted by a periodic health check owned by the caller; the
    /// adapter schedules nothing itself.
    fn is_reachable(&self) -> bool;

    /// Rebuild the backend connection after a failed health check.
    async fn reconnect(&mut self);

    /// All movie/show library sections, in provider order.
    async fn list_libraries(&self) -> Vec<LibrarySection>;

    /// One-shot lazy stream over a library's items. Not restartable;
    /// callers needing multiple passes must materialize it.
    async fn list_items(&self, library_id: &str) -> BoxStream<'static, ServerItem>;

    /// Direct lookup by native item ID.
    async fn get_item(&self, item_id: &str) -> Option<ServerItem>;

    /// Title/year movie search with original-title union, deduplication
    /// and the tmdb cross-check applied (candidates exposing no tmdb id
    /// pass through unfiltered).
    async fn find_movies(&self, lookup: &MediaLookup) -> Vec<ServerItem>;

    /// Season → episode numbers for a show. Empty on no match, or when
    /// the resolved show's own tmdb id contradicts `query.tmdb_id`.
    async fn list_episodes(&self, query: &EpisodeQuery) -> SeasonEpisodes;

    /// Targeted refresh per distinct (library, directory) pair; one
    /// unresolved target path forces a whole-catalog refresh instead.
    async fn refresh_targets(&self, items: &[RefreshTarget]);

    /// Whole-catalog refresh. Returns whether the call was issued.
    async fn refresh_all(&self) -> bool;

    /// Parse a provider-native playback event into the canonical shape,
    /// with best-effort backdrop artwork resolution.
    async fn parse_webhook(&self, request: &WebhookRequest) -> Option<WebhookEvent>;

    /// Best-effort remote artwork URL lookup.
    async fn remote_artwork_url(&self, item_id: &str, kind: ArtworkKind) -> Option<String>;

    /// Movie/show/episode totals, best-effort.
    async fn media_statistics(&self) -> Option<MediaStatistics>;
}
