use anyhow::Result;
use media_catalog_models::{CatalogItem, MediaType};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// One repopulation pass against the catalog store.
///
/// Sessions are independent of any caller's in-flight transaction; a
/// synchronization cycle opens its own and releases it on completion or
/// failure.
pub trait CatalogSession: Send {
    /// Drop every row tagged with the given server.
    fn erase_all(&mut self, server: &str) -> Result<()>;

    /// Insert unless a row with the same `(server, item_id)` key exists.
    /// Returns whether the row was inserted; a duplicate within one
    /// cycle is dropped, not overwritten.
    fn insert_if_absent(&mut self, item: CatalogItem) -> Result<bool>;
}

/// Persistent keyed storage of canonical catalog records, partitioned by
/// server tag.
pub trait CatalogStore: Send + Sync {
    fn open_session(&self) -> Result<Box<dyn CatalogSession>>;

    fn find_by_tmdb_id(&self, tmdb_id: u32, media_type: MediaType) -> Option<CatalogItem>;

    fn find_by_title(
        &self,
        title: &str,
        media_type: MediaType,
        year: Option<u32>,
    ) -> Option<CatalogItem>;
}

type Rows = Arc<Mutex<BTreeMap<(String, String), CatalogItem>>>;

/// In-process catalog store. Rows are keyed by `(server, item_id)` in a
/// sorted map so lookups scan in a deterministic order.
#[derive(Default, Clone)]
pub struct MemoryCatalogStore {
    rows: Rows,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item_count(&self) -> usize {
        self.rows.lock().expect("catalog store lock poisoned").len()
    }

    pub fn get(&self, server: &str, item_id: &str) -> Option<CatalogItem> {
        self.rows
            .lock()
            .expect("catalog store lock poisoned")
            .get(&(server.to_string(), item_id.to_string()))
            .cloned()
    }

    pub fn items(&self) -> Vec<CatalogItem> {
        self.rows
            .lock()
            .expect("catalog store lock poisoned")
            .values()
            .cloned()
            .collect()
    }
}

struct MemorySession {
    rows: Rows,
}

impl CatalogSession for MemorySession {
    fn erase_all(&mut self, server: &str) -> Result<()> {
        self.rows
            .lock()
            .expect("catalog store lock poisoned")
            .retain(|(row_server, _), _| row_server != server);
        Ok(())
    }

    fn insert_if_absent(&mut self, item: CatalogItem) -> Result<bool> {
        let (server, item_id) = item.key();
        let key = (server.to_string(), item_id.to_string());
        let mut rows = self.rows.lock().expect("catalog store lock poisoned");
        if rows.contains_key(&key) {
            return Ok(false);
        }
        rows.insert(key, item);
        Ok(true)
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn open_session(&self) -> Result<Box<dyn CatalogSession>> {
        Ok(Box::new(MemorySession {
            rows: Arc::clone(&self.rows),
        }))
    }

    fn find_by_tmdb_id(&self, tmdb_id: u32, media_type: MediaType) -> Option<CatalogItem> {
        self.rows
            .lock()
            .expect("catalog store lock poisoned")
            .values()
            .find(|item| item.item_type == media_type && item.ids.tmdb_id == Some(tmdb_id))
            .cloned()
    }

    fn find_by_title(
        &self,
        title: &str,
        media_type: MediaType,
        year: Option<u32>,
    ) -> Option<CatalogItem> {
        self.rows
            .lock()
            .expect("catalog store lock poisoned")
            .values()
            .find(|item| {
                item.item_type == media_type
                    && (item.title == title || item.original_title.as_deref() == Some(title))
                    && match (year, item.year) {
                        (Some(wanted), Some(found)) => wanted == found,
                        _ => true,
                    }
            })
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_catalog_models::{ExternalIds, SeasonEpisodes};

    fn item(server: &str, item_id: &str, title: &str, tmdb_id: Option<u32>) -> CatalogItem {
        CatalogItem {
            server: server.to_string(),
            item_id: item_id.to_string(),
            item_type: MediaType::Movie,
            title: title.to_string(),
            original_title: None,
            year: Some(1999),
            ids: ExternalIds {
                tmdb_id,
                ..Default::default()
            },
            path: None,
            seasons: SeasonEpisodes::new(),
        }
    }

    #[test]
    fn insert_if_absent_drops_duplicates() {
        let store = MemoryCatalogStore::new();
        let mut session = store.open_session().unwrap();
        assert!(session.insert_if_absent(item("plex", "1", "Heat", None)).unwrap());
        assert!(!session
            .insert_if_absent(item("plex", "1", "Heat again", None))
            .unwrap());
        assert_eq!(store.item_count(), 1);
        assert_eq!(store.get("plex", "1").unwrap().title, "Heat");
    }

    #[test]
    fn erase_all_is_partitioned_by_server() {
        let store = MemoryCatalogStore::new();
        let mut session = store.open_session().unwrap();
        session.insert_if_absent(item("plex", "1", "Heat", None)).unwrap();
        session.insert_if_absent(item("emby", "1", "Heat", None)).unwrap();
        session.erase_all("plex").unwrap();
        assert!(store.get("plex", "1").is_none());
        assert!(store.get("emby", "1").is_some());
    }

    #[test]
    fn lookup_by_tmdb_id_and_title() {
        let store = MemoryCatalogStore::new();
        let mut session = store.open_session().unwrap();
        session
            .insert_if_absent(item("plex", "1", "The Matrix", Some(603)))
            .unwrap();
        session.insert_if_absent(item("plex", "2", "Heat", None)).unwrap();

        assert_eq!(
            store.find_by_tmdb_id(603, MediaType::Movie).unwrap().item_id,
            "1"
        );
        assert!(store.find_by_tmdb_id(603, MediaType::Show).is_none());
        assert_eq!(
            store
                .find_by_title("Heat", MediaType::Movie, Some(1999))
                .unwrap()
                .item_id,
            "2"
        );
        assert!(store
            .find_by_title("Heat", MediaType::Movie, Some(1995))
            .is_none());
    }
}
