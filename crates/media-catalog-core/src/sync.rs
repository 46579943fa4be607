use crate::notify::{Notification, Notifier};
use crate::store::CatalogStore;
use anyhow::{Context, Result};
use futures::StreamExt;
use media_catalog_models::{CatalogItem, MediaType, SeasonEpisodes};
use media_catalog_servers::{EpisodeQuery, MediaServer};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Provider type tags that classify an item as a show; anything else is
/// treated as a movie.
const SHOW_TYPE_TAGS: [&str; 2] = ["show", "Series"];

/// Observable phase of the current (or last) synchronization cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleState {
    Idle,
    Running,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub server: String,
    pub libraries: usize,
    pub items: usize,
    #[serde(skip)]
    pub duration: Duration,
}

/// Drains one provider's full catalog into the catalog store.
///
/// The cycle lock is scoped to the synchronizer as a whole, not per
/// provider, and is held for the full listing + writing duration: two
/// cycles racing the erase-then-repopulate sequence would leave the
/// store in an interleaved partial state.
pub struct CatalogSynchronizer {
    store: Arc<dyn CatalogStore>,
    notifier: Arc<dyn Notifier>,
    cycle_lock: tokio::sync::Mutex<()>,
    state: Mutex<CycleState>,
}

impl CatalogSynchronizer {
    pub fn new(store: Arc<dyn CatalogStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            cycle_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(CycleState::Idle),
        }
    }

    pub fn state(&self) -> CycleState {
        *self.state.lock().expect("cycle state lock poisoned")
    }

    fn set_state(&self, state: CycleState) {
        *self.state.lock().expect("cycle state lock poisoned") = state;
    }

    /// Run one erase-and-repopulate cycle for the given server.
    ///
    /// The store is always rebuilt from a clean slate; one library's
    /// failed enumeration (degraded to an empty stream by the adapter)
    /// does not abort the rest, while a storage fault fails the whole
    /// cycle.
    pub async fn sync(&self, server: &dyn MediaServer) -> Result<SyncReport> {
        let _cycle = self.cycle_lock.lock().await;
        self.set_state(CycleState::Running);
        let start = Instant::now();
        let server_name = server.server_name().to_string();

        self.notifier
            .send(Notification::new(
                "catalog",
                "Media server sync started ...",
            ))
            .await;
        info!(server = %server_name, "Starting catalog sync");

        let result = self.run_cycle(server, &server_name).await;
        match result {
            Ok((libraries, items)) => {
                let duration = start.elapsed();
                self.set_state(CycleState::Complete);
                info!(
                    server = %server_name,
                    items,
                    duration_ms = duration.as_millis(),
                    "Catalog sync complete"
                );
                self.notifier
                    .send(Notification::new(
                        "catalog",
                        format!("Media server sync complete, {} items", items),
                    ))
                    .await;
                Ok(SyncReport {
                    server: server_name,
                    libraries,
                    items,
                    duration,
                })
            }
            Err(e) => {
                self.set_state(CycleState::Failed);
                self.notifier
                    .send(Notification::new("catalog", "Media server sync failed"))
                    .await;
                Err(e)
            }
        }
    }

    async fn run_cycle(&self, server: &dyn MediaServer, server_name: &str) -> Result<(usize, usize)> {
        // Independent session, isolated from any caller's transaction
        let mut session = self
            .store
            .open_session()
            .context("Failed to open catalog session")?;
        session
            .erase_all(server_name)
            .with_context(|| format!("Failed to erase catalog rows for {}", server_name))?;

        let mut libraries_synced = 0usize;
        let mut total = 0usize;
        for library in server.list_libraries().await {
            info!(library = %library.name, "Syncing library");
            libraries_synced += 1;
            let mut library_count = 0usize;
            let mut items = server.list_items(&library.id).await;
            while let Some(item) = items.next().await {
                if item.item_id.is_empty() {
                    continue;
                }
                let item_type = if SHOW_TYPE_TAGS.contains(&item.item_type.as_str()) {
                    MediaType::Show
                } else {
                    MediaType::Movie
                };
                let seasons = if item_type == MediaType::Show {
                    server
                        .list_episodes(&EpisodeQuery {
                            item_ids: vec![item.item_id.clone()],
                            ..Default::default()
                        })
                        .await
                } else {
                    SeasonEpisodes::new()
                };
                let record = CatalogItem {
                    server: server_name.to_string(),
                    item_id: item.item_id,
                    item_type,
                    title: item.title,
                    original_title: item.original_title,
                    year: item.year,
                    ids: item.ids,
                    path: item.path,
                    seasons,
                };
                let inserted = session
                    .insert_if_absent(record)
                    .context("Failed to insert catalog row")?;
                if inserted {
                    library_count += 1;
                } else {
                    debug!(server = %server_name, "Dropped duplicate catalog key");
                }
            }
            info!(library = %library.name, count = library_count, "Library sync complete");
            total += library_count;
        }
        Ok((libraries_synced, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notifier;
    use crate::store::{CatalogSession, MemoryCatalogStore};
    use crate::testutil::MockServer;
    use async_trait::async_trait;
    use media_catalog_models::{ExternalIds, LibrarySection, ServerItem};
    use std::collections::HashSet;

    struct RecordingNotifier {
        titles: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, notification: Notification) {
            self.titles
                .lock()
                .expect("notifier lock poisoned")
                .push(notification.title);
        }
    }

    fn library(server: &str, id: &str, media_type: MediaType) -> LibrarySection {
        LibrarySection {
            server: server.to_string(),
            id: id.to_string(),
            name: format!("Library {}", id),
            media_type,
            locations: Vec::new(),
        }
    }

    fn server_item(item_id: &str, item_type: &str, title: &str) -> ServerItem {
        ServerItem {
            item_id: item_id.to_string(),
            library_id: "1".to_string(),
            item_type: item_type.to_string(),
            title: title.to_string(),
            original_title: None,
            year: Some(2021),
            ids: ExternalIds::default(),
            path: None,
        }
    }

    fn synchronizer(store: MemoryCatalogStore) -> (CatalogSynchronizer, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier {
            titles: Mutex::new(Vec::new()),
        });
        let sync = CatalogSynchronizer::new(Arc::new(store), notifier.clone());
        (sync, notifier)
    }

    #[tokio::test]
    async fn cycle_rebuilds_catalog_with_unique_keys() {
        let mut server = MockServer::new("plex");
        server.libraries = vec![
            library("plex", "1", MediaType::Movie),
            library("plex", "2", MediaType::Show),
        ];
        server.items.insert(
            "1".to_string(),
            vec![
                server_item("100", "movie", "Heat"),
                // Missing native ID: skipped
                server_item("", "movie", "Unidentified"),
                // Duplicate key within the cycle: dropped, not overwritten
                server_item("100", "movie", "Heat duplicate"),
            ],
        );
        server
            .items
            .insert("2".to_string(), vec![server_item("200", "Series", "Show")]);
        server.episodes = SeasonEpisodes::from([(1, vec![1, 2])]);

        let store = MemoryCatalogStore::new();
        let (sync, _) = synchronizer(store.clone());
        let report = sync.sync(&server).await.unwrap();

        assert_eq!(report.libraries, 2);
        assert_eq!(report.items, 2);
        assert_eq!(store.item_count(), 2);
        assert_eq!(sync.state(), CycleState::Complete);

        let heat = store.get("plex", "100").unwrap();
        assert_eq!(heat.title, "Heat");
        assert_eq!(heat.item_type, MediaType::Movie);
        assert!(heat.seasons.is_empty());

        let show = store.get("plex", "200").unwrap();
        assert_eq!(show.item_type, MediaType::Show);
        assert_eq!(show.seasons, SeasonEpisodes::from([(1, vec![1, 2])]));

        // Keys unique across the whole produced set
        let keys: HashSet<(String, String)> = store
            .items()
            .into_iter()
            .map(|item| (item.server, item.item_id))
            .collect();
        assert_eq!(keys.len(), store.item_count());

        // Show episodes were resolved by native ID, not by title search
        let queries = server.episode_queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].item_ids, vec!["200".to_string()]);
        assert!(queries[0].title.is_none());
    }

    #[tokio::test]
    async fn cycle_replaces_previous_rows_for_the_same_server_only() {
        let store = MemoryCatalogStore::new();
        {
            let mut session = store.open_session().unwrap();
            session
                .insert_if_absent(CatalogItem {
                    server: "plex".to_string(),
                    item_id: "stale".to_string(),
                    item_type: MediaType::Movie,
                    title: "Removed Movie".to_string(),
                    original_title: None,
                    year: None,
                    ids: ExternalIds::default(),
                    path: None,
                    seasons: SeasonEpisodes::new(),
                })
                .unwrap();
            session
                .insert_if_absent(CatalogItem {
                    server: "emby".to_string(),
                    item_id: "kept".to_string(),
                    item_type: MediaType::Movie,
                    title: "Other Server Movie".to_string(),
                    original_title: None,
                    year: None,
                    ids: ExternalIds::default(),
                    path: None,
                    seasons: SeasonEpisodes::new(),
                })
                .unwrap();
        }

        let mut server = MockServer::new("plex");
        server.libraries = vec![library("plex", "1", MediaType::Movie)];
        server
            .items
            .insert("1".to_string(), vec![server_item("100", "movie", "Heat")]);

        let (sync, _) = synchronizer(store.clone());
        sync.sync(&server).await.unwrap();

        assert!(store.get("plex", "stale").is_none());
        assert!(store.get("emby", "kept").is_some());
        assert!(store.get("plex", "100").is_some());
    }

    #[tokio::test]
    async fn notifications_bracket_the_cycle() {
        let mut server = MockServer::new("plex");
        server.libraries = vec![library("plex", "1", MediaType::Movie)];
        server
            .items
            .insert("1".to_string(), vec![server_item("100", "movie", "Heat")]);

        let (sync, notifier) = synchronizer(MemoryCatalogStore::new());
        sync.sync(&server).await.unwrap();

        let titles = notifier.titles.lock().unwrap();
        assert_eq!(titles.len(), 2);
        assert!(titles[0].contains("started"));
        assert!(titles[1].contains("complete"));
        assert!(titles[1].contains('1'));
    }

    struct FailingStore;

    impl CatalogStore for FailingStore {
        fn open_session(&self) -> Result<Box<dyn CatalogSession>> {
            Err(anyhow::anyhow!("catalog database is gone"))
        }

        fn find_by_tmdb_id(&self, _: u32, _: MediaType) -> Option<CatalogItem> {
            None
        }

        fn find_by_title(&self, _: &str, _: MediaType, _: Option<u32>) -> Option<CatalogItem> {
            None
        }
    }

    #[tokio::test]
    async fn storage_fault_fails_the_cycle_and_releases_the_lock() {
        let server = MockServer::new("plex");
        let notifier = Arc::new(RecordingNotifier {
            titles: Mutex::new(Vec::new()),
        });
        let sync = CatalogSynchronizer::new(Arc::new(FailingStore), notifier);

        assert!(sync.sync(&server).await.is_err());
        assert_eq!(sync.state(), CycleState::Failed);

        // Lock was released: the next cycle runs (and fails the same way)
        // instead of deadlocking.
        assert!(sync.sync(&server).await.is_err());
    }

    /// Store that logs the order of erase/insert operations across
    /// cycles.
    #[derive(Clone, Default)]
    struct EventLogStore {
        events: Arc<Mutex<Vec<(String, String)>>>,
    }

    struct EventLogSession {
        events: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl CatalogSession for EventLogSession {
        fn erase_all(&mut self, server: &str) -> Result<()> {
            self.events
                .lock()
                .unwrap()
                .push(("erase".to_string(), server.to_string()));
            Ok(())
        }

        fn insert_if_absent(&mut self, item: CatalogItem) -> Result<bool> {
            self.events
                .lock()
                .unwrap()
                .push(("insert".to_string(), item.server));
            Ok(true)
        }
    }

    impl CatalogStore for EventLogStore {
        fn open_session(&self) -> Result<Box<dyn CatalogSession>> {
            Ok(Box::new(EventLogSession {
                events: Arc::clone(&self.events),
            }))
        }

        fn find_by_tmdb_id(&self, _: u32, _: MediaType) -> Option<CatalogItem> {
            None
        }

        fn find_by_title(&self, _: &str, _: MediaType, _: Option<u32>) -> Option<CatalogItem> {
            None
        }
    }

    #[tokio::test]
    async fn concurrent_cycles_serialize_on_the_cycle_lock() {
        fn slow_server(name: &'static str) -> Arc<MockServer> {
            let mut server = MockServer::new(name);
            server.libraries = vec![library(name, "1", MediaType::Movie)];
            server.items.insert(
                "1".to_string(),
                (0..5)
                    .map(|i| server_item(&format!("{}", i), "movie", "Movie"))
                    .collect(),
            );
            server.item_delay = Some(Duration::from_millis(5));
            Arc::new(server)
        }

        let store = EventLogStore::default();
        let sync = Arc::new(CatalogSynchronizer::new(
            Arc::new(store.clone()),
            Arc::new(crate::notify::LogNotifier),
        ));

        let first = tokio::spawn({
            let sync = Arc::clone(&sync);
            let server = slow_server("plex");
            async move { sync.sync(server.as_ref()).await.unwrap() }
        });
        let second = tokio::spawn({
            let sync = Arc::clone(&sync);
            let server = slow_server("emby");
            async move { sync.sync(server.as_ref()).await.unwrap() }
        });
        let (first, second) = tokio::join!(first, second);
        first.unwrap();
        second.unwrap();

        // The second cycle must not start erasing until the first has
        // fully repopulated: server tags never interleave.
        let events = store.events.lock().unwrap();
        let mut tags: Vec<String> = events.iter().map(|(_, server)| server.clone()).collect();
        tags.dedup();
        assert_eq!(tags.len(), 2, "cycles interleaved: {:?}", *events);
        assert_eq!(events.iter().filter(|(op, _)| op == "erase").count(), 2);
    }
}
