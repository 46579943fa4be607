use crate::{MediaType, SeasonEpisodes};
use serde::{Deserialize, Serialize};

/// Identified media a caller wants to check against a server's catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaLookup {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    pub media_type: MediaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u32>,
}

/// Positive result of an existence check.
///
/// For shows, `seasons` carries the already-present season → episode set
/// verbatim so a caller can compute the missing remainder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExistingMedia {
    pub media_type: MediaType,
    #[serde(default)]
    pub seasons: SeasonEpisodes,
}

impl ExistingMedia {
    pub fn movie() -> Self {
        Self {
            media_type: MediaType::Movie,
            seasons: SeasonEpisodes::new(),
        }
    }

    pub fn show(seasons: SeasonEpisodes) -> Self {
        Self {
            media_type: MediaType::Show,
            seasons,
        }
    }
}
