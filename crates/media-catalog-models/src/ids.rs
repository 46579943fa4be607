use serde::{Deserialize, Serialize};

/// Canonical cross-reference identifier triple.
///
/// Each field is absent when the provider did not expose that identifier
/// for the item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalIds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvdb_id: Option<u32>,
}

impl ExternalIds {
    pub fn is_empty(&self) -> bool {
        self.imdb_id.is_none() && self.tmdb_id.is_none() && self.tvdb_id.is_none()
    }
}
