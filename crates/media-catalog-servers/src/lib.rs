pub mod emby;
pub mod error;
pub mod factory;
pub mod guid;
pub mod matching;
pub mod paths;
pub mod plex;
pub mod traits;

pub use emby::EmbyServer;
pub use error::ServerError;
pub use factory::{ServerFactory, ServerFactoryRegistry};
pub use guid::{resolve_external_ids, GuidEntry};
pub use paths::{find_owning_library, plan_refresh, LibraryMatch, RefreshPlan};
pub use plex::PlexServer;
pub use traits::{ArtworkKind, EpisodeQuery, MediaServer, MediaStatistics, WebhookRequest};
