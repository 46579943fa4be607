use media_catalog_models::ExternalIds;

/// One provider-native cross-reference identifier entry.
///
/// Backends hand these over in two representations, sometimes mixed
/// within one item: a bare tagged string (`"imdb://tt1234567"`) or a
/// structured record carrying the same string under an `id` field, as
/// Plex webhook metadata does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuidEntry {
    Raw(String),
    Keyed { id: String },
}

impl GuidEntry {
    pub fn id(&self) -> &str {
        match self {
            GuidEntry::Raw(id) => id,
            GuidEntry::Keyed { id } => id,
        }
    }
}

/// Extract the canonical identifier triple from provider GUID entries.
///
/// Schemes are tried in fixed priority order; for each scheme the first
/// entry carrying it wins and unmatched schemes stay absent. Agent-style
/// GUIDs (`com.plexapp.agents.imdb://tt...?lang=en`) and query-string
/// suffixes are tolerated.
pub fn resolve_external_ids(entries: &[GuidEntry]) -> ExternalIds {
    let mut ids = ExternalIds::default();

    ids.imdb_id = entries
        .iter()
        .find_map(|entry| scheme_value(entry.id(), "imdb://"))
        .map(|value| value.to_string());
    ids.tmdb_id = entries
        .iter()
        .find_map(|entry| scheme_value(entry.id(), "tmdb://"))
        .and_then(|value| value.parse().ok());
    ids.tvdb_id = entries
        .iter()
        .find_map(|entry| scheme_value(entry.id(), "tvdb://"))
        .and_then(|value| value.parse().ok());

    ids
}

/// Pull the value out of a `scheme://value` GUID, stripping any query
/// suffix.
fn scheme_value<'a>(guid: &'a str, scheme: &str) -> Option<&'a str> {
    let start = guid.find(scheme)?;
    let value = &guid[start + scheme.len()..];
    let value = value.split(['?', '&']).next().unwrap_or(value).trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_all_three_schemes() {
        let entries = vec![
            GuidEntry::Raw("imdb://tt14765720".to_string()),
            GuidEntry::Raw("tmdb://3087250".to_string()),
            GuidEntry::Raw("tvdb://8530933".to_string()),
        ];
        let ids = resolve_external_ids(&entries);
        assert_eq!(ids.imdb_id.as_deref(), Some("tt14765720"));
        assert_eq!(ids.tmdb_id, Some(3087250));
        assert_eq!(ids.tvdb_id, Some(8530933));
    }

    #[test]
    fn first_entry_wins_per_scheme() {
        let entries = vec![
            GuidEntry::Raw("tmdb://100".to_string()),
            GuidEntry::Raw("tmdb://200".to_string()),
        ];
        assert_eq!(resolve_external_ids(&entries).tmdb_id, Some(100));
    }

    #[test]
    fn tolerates_mixed_representations() {
        let entries = vec![
            GuidEntry::Keyed {
                id: "imdb://tt9362722".to_string(),
            },
            GuidEntry::Raw("tmdb://569094".to_string()),
        ];
        let ids = resolve_external_ids(&entries);
        assert_eq!(ids.imdb_id.as_deref(), Some("tt9362722"));
        assert_eq!(ids.tmdb_id, Some(569094));
        assert_eq!(ids.tvdb_id, None);
    }

    #[test]
    fn strips_agent_prefix_and_query_suffix() {
        let entries = vec![GuidEntry::Raw(
            "com.plexapp.agents.imdb://tt1234567?lang=en".to_string(),
        )];
        let ids = resolve_external_ids(&entries);
        assert_eq!(ids.imdb_id.as_deref(), Some("tt1234567"));
    }

    #[test]
    fn unmatched_schemes_stay_absent() {
        let entries = vec![GuidEntry::Raw(
            "plex://movie/5d776b5e1e5c36001f8e9b8a".to_string(),
        )];
        let ids = resolve_external_ids(&entries);
        assert!(ids.is_empty());
    }

    #[test]
    fn non_numeric_tmdb_value_is_ignored() {
        let entries = vec![GuidEntry::Raw("tmdb://abc".to_string())];
        assert_eq!(resolve_external_ids(&entries).tmdb_id, None);
    }
}
