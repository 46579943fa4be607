pub mod ids;
pub mod item;
pub mod library;
pub mod lookup;
pub mod media;
pub mod refresh;
pub mod webhook;

pub use ids::ExternalIds;
pub use item::{merge_episode, CatalogItem, SeasonEpisodes, ServerItem};
pub use library::LibrarySection;
pub use lookup::{ExistingMedia, MediaLookup};
pub use media::MediaType;
pub use refresh::RefreshTarget;
pub use webhook::{clip_overview, WebhookEvent, WebhookItemType};
