pub mod exists;
pub mod notify;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod testutil;

pub use exists::{find_in_catalog, media_exists};
pub use notify::{LogNotifier, Notification, Notifier};
pub use store::{CatalogSession, CatalogStore, MemoryCatalogStore};
pub use sync::{CatalogSynchronizer, CycleState, SyncReport};
