use crate::store::CatalogStore;
use media_catalog_models::{CatalogItem, ExistingMedia, MediaLookup, MediaType};
use media_catalog_servers::{EpisodeQuery, MediaServer};
use tracing::info;

/// Decide whether the given media already exists in the server's catalog.
///
/// Movies: any direct hit on a known native item ID is existence proof
/// and short-circuits the search; otherwise a title/year search (with
/// original-title union and tmdb cross-check inside the adapter) decides.
/// Shows: the adapter's episode listing decides, and the already-present
/// season → episode map is returned verbatim so the caller can compute
/// the missing remainder.
pub async fn media_exists(
    server: &dyn MediaServer,
    lookup: &MediaLookup,
    item_ids: &[String],
    season: Option<u32>,
) -> Option<ExistingMedia> {
    match lookup.media_type {
        MediaType::Movie => {
            for item_id in item_ids {
                if let Some(item) = server.get_item(item_id).await {
                    info!(title = %item.title, item_id = %item.item_id, "Movie already present in media library");
                    return Some(ExistingMedia::movie());
                }
            }
            let movies = server.find_movies(lookup).await;
            if movies.is_empty() {
                info!(title = %lookup.title, "Movie not present in media library");
                None
            } else {
                info!(title = %lookup.title, candidates = movies.len(), "Movie already present in media library");
                Some(ExistingMedia::movie())
            }
        }
        MediaType::Show => {
            let query = EpisodeQuery {
                item_ids: item_ids.to_vec(),
                title: Some(lookup.title.clone()),
                original_title: lookup.original_title.clone(),
                year: lookup.year,
                tmdb_id: lookup.tmdb_id,
                season,
            };
            let seasons = server.list_episodes(&query).await;
            if seasons.is_empty() {
                info!(title = %lookup.title, "Show not present in media library");
                None
            } else {
                info!(title = %lookup.title, seasons = seasons.len(), "Show already present in media library");
                Some(ExistingMedia::show(seasons))
            }
        }
    }
}

/// Store-backed lookup with the same identifier-first, text-fallback
/// ordering as the live check.
pub fn find_in_catalog(store: &dyn CatalogStore, lookup: &MediaLookup) -> Option<CatalogItem> {
    if let Some(tmdb_id) = lookup.tmdb_id {
        if let Some(found) = store.find_by_tmdb_id(tmdb_id, lookup.media_type) {
            return Some(found);
        }
    }
    if let Some(found) = store.find_by_title(&lookup.title, lookup.media_type, lookup.year) {
        return Some(found);
    }
    lookup
        .original_title
        .as_deref()
        .filter(|original| *original != lookup.title)
        .and_then(|original| store.find_by_title(original, lookup.media_type, lookup.year))
}
