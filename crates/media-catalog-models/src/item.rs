use crate::{ExternalIds, MediaType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Season number → episode numbers present for that season.
pub type SeasonEpisodes = BTreeMap<u32, Vec<u32>>;

/// Record an episode in a season map, keeping each episode number at most
/// once per season.
pub fn merge_episode(seasons: &mut SeasonEpisodes, season: u32, episode: u32) {
    let entry = seasons.entry(season).or_default();
    if !entry.contains(&episode) {
        entry.push(episode);
    }
}

/// One item as yielded by a provider's library listing.
///
/// `item_type` is the provider's native type tag ("movie", "show",
/// "Movie", "Series", ...); classification into a [`MediaType`] happens
/// during synchronization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerItem {
    pub item_id: String,
    pub library_id: String,
    pub item_type: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default)]
    pub ids: ExternalIds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Canonical catalog record, uniquely identified by `(server, item_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    pub server: String,
    pub item_id: String,
    pub item_type: MediaType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default)]
    pub ids: ExternalIds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Empty for movies.
    #[serde(default)]
    pub seasons: SeasonEpisodes,
}

impl CatalogItem {
    /// The catalog's dedup key.
    pub fn key(&self) -> (&str, &str) {
        (&self.server, &self.item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_episode_keeps_numbers_unique_per_season() {
        let mut seasons = SeasonEpisodes::new();
        merge_episode(&mut seasons, 1, 1);
        merge_episode(&mut seasons, 1, 2);
        merge_episode(&mut seasons, 1, 2);
        merge_episode(&mut seasons, 2, 1);

        assert_eq!(seasons.get(&1), Some(&vec![1, 2]));
        assert_eq!(seasons.get(&2), Some(&vec![1]));
    }
}
