use media_catalog_models::{merge_episode, SeasonEpisodes, ServerItem};
use std::collections::HashSet;
use tracing::debug;

/// Drop candidates that duplicate an earlier candidate's native ID,
/// keeping first-seen order. Title and original-title searches routinely
/// return the same record twice.
pub fn dedup_by_item_id(candidates: Vec<ServerItem>) -> Vec<ServerItem> {
    let mut seen: HashSet<String> = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.item_id.clone()))
        .collect()
}

/// Apply the identifier cross-check to search candidates.
///
/// A candidate exposing a tmdb id that contradicts the expected one is
/// rejected; a candidate exposing no tmdb id passes through unfiltered —
/// identifier absence is not treated as mismatch.
pub fn filter_by_tmdb(candidates: Vec<ServerItem>, tmdb_id: Option<u32>) -> Vec<ServerItem> {
    let Some(expected) = tmdb_id else {
        return candidates;
    };
    candidates
        .into_iter()
        .filter(|candidate| match candidate.ids.tmdb_id {
            Some(found) if found != expected => {
                debug!(
                    title = %candidate.title,
                    found,
                    expected,
                    "Rejecting search candidate on tmdb id mismatch"
                );
                false
            }
            _ => true,
        })
        .collect()
}

/// Fold provider episode records into the canonical season map.
///
/// Records missing either number are skipped; an optional season filter
/// restricts the result to that season's key.
pub fn fold_episodes<I>(records: I, season_filter: Option<u32>) -> SeasonEpisodes
where
    I: IntoIterator<Item = (Option<u32>, Option<u32>)>,
{
    let mut seasons = SeasonEpisodes::new();
    for (season, episode) in records {
        let (Some(season), Some(episode)) = (season, episode) else {
            continue;
        };
        if season_filter.is_some_and(|only| only != season) {
            continue;
        }
        merge_episode(&mut seasons, season, episode);
    }
    seasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_catalog_models::ExternalIds;

    fn candidate(item_id: &str, tmdb_id: Option<u32>) -> ServerItem {
        ServerItem {
            item_id: item_id.to_string(),
            library_id: "1".to_string(),
            item_type: "movie".to_string(),
            title: format!("Movie {}", item_id),
            original_title: None,
            year: Some(1999),
            ids: ExternalIds {
                tmdb_id,
                ..Default::default()
            },
            path: None,
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let deduped = dedup_by_item_id(vec![
            candidate("10", None),
            candidate("11", None),
            candidate("10", Some(603)),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].item_id, "10");
        assert_eq!(deduped[1].item_id, "11");
    }

    #[test]
    fn mismatching_tmdb_id_is_rejected_absence_passes() {
        let filtered = filter_by_tmdb(
            vec![candidate("a", Some(604)), candidate("b", None), candidate("c", Some(603))],
            Some(603),
        );
        let ids: Vec<&str> = filtered.iter().map(|c| c.item_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn no_expected_id_means_no_filtering() {
        let filtered = filter_by_tmdb(vec![candidate("a", Some(604))], None);
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn fold_restricts_to_requested_season() {
        let records = vec![
            (Some(1), Some(1)),
            (Some(2), Some(1)),
            (Some(2), Some(2)),
            (Some(3), Some(1)),
        ];
        let seasons = fold_episodes(records, Some(2));
        assert_eq!(seasons.len(), 1);
        assert_eq!(seasons.get(&2), Some(&vec![1, 2]));
    }

    #[test]
    fn fold_skips_records_without_both_numbers() {
        let records = vec![(Some(1), Some(1)), (None, Some(2)), (Some(1), None)];
        let seasons = fold_episodes(records, None);
        assert_eq!(seasons.get(&1), Some(&vec![1]));
        assert_eq!(seasons.len(), 1);
    }

    #[test]
    fn fold_deduplicates_episode_numbers() {
        let records = vec![(Some(1), Some(4)), (Some(1), Some(4))];
        let seasons = fold_episodes(records, None);
        assert_eq!(seasons.get(&1), Some(&vec![4]));
    }
}
