use crate::MediaType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One library section as reported by a media server.
///
/// Owned by the provider; refreshed on every library listing call and only
/// persisted through the catalog store snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibrarySection {
    pub server: String,
    pub id: String,
    pub name: String,
    pub media_type: MediaType,
    /// Root directories backing the section, in provider order.
    pub locations: Vec<PathBuf>,
}
