use crate::guid::{resolve_external_ids, GuidEntry};
use media_catalog_models::{clip_overview, WebhookEvent, WebhookItemType};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// The JSON document Plex posts inside the `payload` form field.
#[derive(Debug, Deserialize)]
struct PlexPayload {
    event: Option<String>,
    #[serde(rename = "Metadata")]
    metadata: Option<PayloadMetadata>,
    #[serde(rename = "Player")]
    player: Option<PayloadPlayer>,
    #[serde(rename = "Account")]
    account: Option<PayloadAccount>,
}

#[derive(Debug, Deserialize)]
struct PayloadMetadata {
    #[serde(rename = "type")]
    type_: Option<String>,
    title: Option<String>,
    year: Option<u32>,
    summary: Option<String>,
    #[serde(rename = "ratingKey")]
    rating_key: Option<String>,
    #[serde(rename = "grandparentTitle")]
    grandparent_title: Option<String>,
    #[serde(rename = "parentIndex")]
    parent_index: Option<u32>,
    index: Option<u32>,
    #[serde(rename = "Guid", default)]
    guids: Vec<PayloadGuid>,
}

#[derive(Debug, Deserialize)]
struct PayloadGuid {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PayloadPlayer {
    #[serde(rename = "publicAddress")]
    public_address: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PayloadAccount {
    title: Option<String>,
}

/// Normalize a Plex webhook form into the canonical event shape.
///
/// Webhook delivery is untrusted input: a missing `payload` field,
/// malformed JSON, or an absent event type all fail soft.
pub fn parse_form(form: &HashMap<String, String>) -> Option<WebhookEvent> {
    let payload = form.get("payload")?;
    let message: PlexPayload = match serde_json::from_str(payload) {
        Ok(message) => message,
        Err(e) => {
            debug!(error = %e, "Failed to parse plex webhook payload");
            return None;
        }
    };
    let event_type = message.event.filter(|event| !event.is_empty())?;
    info!(event = %event_type, "Received plex webhook");

    let mut event = WebhookEvent::new(event_type, "plex");
    if let Some(metadata) = message.metadata {
        let guids: Vec<GuidEntry> = metadata
            .guids
            .iter()
            .map(|guid| GuidEntry::Keyed {
                id: guid.id.clone(),
            })
            .collect();
        event.tmdb_id = resolve_external_ids(&guids).tmdb_id.map(|id| id.to_string());

        if metadata.type_.as_deref() == Some("episode") {
            event.item_type = Some(WebhookItemType::Tv);
            event.item_name = Some(format!(
                "{} S{}E{} {}",
                metadata.grandparent_title.as_deref().unwrap_or_default(),
                metadata.parent_index.map_or_else(String::new, |n| n.to_string()),
                metadata.index.map_or_else(String::new, |n| n.to_string()),
                metadata.title.as_deref().unwrap_or_default()
            ));
            event.season_id = metadata.parent_index;
            event.episode_id = metadata.index;
        } else {
            event.item_type = Some(if metadata.type_.as_deref() == Some("movie") {
                WebhookItemType::Movie
            } else {
                WebhookItemType::Show
            });
            event.item_name = Some(format!(
                "{} ({})",
                metadata.title.as_deref().unwrap_or_default(),
                metadata.year.map_or_else(String::new, |y| y.to_string())
            ));
        }
        event.item_id = metadata.rating_key;
        event.overview = metadata.summary.as_deref().map(clip_overview);
    }
    if let Some(player) = message.player {
        event.ip = player.public_address;
        event.client = player.title;
        // Blank placeholder so message rendering never sees a hole
        event.device_name = Some(" ".to_string());
    }
    if let Some(account) = message.account {
        event.user_name = account.title;
    }

    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form_with_payload(payload: String) -> HashMap<String, String> {
        let mut form = HashMap::new();
        form.insert("payload".to_string(), payload);
        form
    }

    fn scrobble_payload(summary: &str) -> String {
        json!({
            "event": "media.scrobble",
            "Account": {"id": 31646104, "title": "viewer"},
            "Player": {"local": false, "publicAddress": "203.0.113.9", "title": "MagicBook"},
            "Metadata": {
                "type": "episode",
                "ratingKey": "40294",
                "grandparentTitle": "Show",
                "parentIndex": 1,
                "index": 6,
                "title": "Ep",
                "summary": summary,
                "Guid": [
                    {"id": "imdb://tt14765720"},
                    {"id": "tmdb://3087250"},
                    {"id": "tvdb://8530933"}
                ]
            }
        })
        .to_string()
    }

    #[test]
    fn episode_scrobble_yields_canonical_event() {
        let form = form_with_payload(scrobble_payload("short summary"));
        let event = parse_form(&form).unwrap();

        assert_eq!(event.event, "media.scrobble");
        assert_eq!(event.channel, "plex");
        assert_eq!(event.item_type, Some(WebhookItemType::Tv));
        assert_eq!(event.item_name.as_deref(), Some("Show S1E6 Ep"));
        assert_eq!(event.item_id.as_deref(), Some("40294"));
        assert_eq!(event.season_id, Some(1));
        assert_eq!(event.episode_id, Some(6));
        assert_eq!(event.overview.as_deref(), Some("short summary"));
        assert_eq!(event.tmdb_id.as_deref(), Some("3087250"));
        assert_eq!(event.ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(event.client.as_deref(), Some("MagicBook"));
        assert_eq!(event.device_name.as_deref(), Some(" "));
        assert_eq!(event.user_name.as_deref(), Some("viewer"));
    }

    #[test]
    fn long_summary_is_clipped() {
        let form = form_with_payload(scrobble_payload(&"s".repeat(150)));
        let event = parse_form(&form).unwrap();
        let overview = event.overview.unwrap();
        assert_eq!(overview.chars().count(), 103);
        assert!(overview.ends_with("..."));
    }

    #[test]
    fn summary_of_exactly_limit_is_untouched() {
        let form = form_with_payload(scrobble_payload(&"s".repeat(100)));
        let event = parse_form(&form).unwrap();
        assert_eq!(event.overview.unwrap().chars().count(), 100);
    }

    #[test]
    fn movie_event_names_title_and_year() {
        let payload = json!({
            "event": "media.play",
            "Metadata": {
                "type": "movie",
                "ratingKey": "1201",
                "title": "Heat",
                "year": 1995,
                "summary": "Los Angeles."
            }
        })
        .to_string();
        let event = parse_form(&form_with_payload(payload)).unwrap();
        assert_eq!(event.item_type, Some(WebhookItemType::Movie));
        assert_eq!(event.item_name.as_deref(), Some("Heat (1995)"));
        assert_eq!(event.item_id.as_deref(), Some("1201"));
    }

    #[test]
    fn non_movie_non_episode_classifies_as_show() {
        let payload = json!({
            "event": "library.new",
            "Metadata": {"type": "show", "ratingKey": "7", "title": "Show", "year": 2021, "summary": ""}
        })
        .to_string();
        let event = parse_form(&form_with_payload(payload)).unwrap();
        assert_eq!(event.item_type, Some(WebhookItemType::Show));
    }

    #[test]
    fn malformed_input_fails_soft() {
        // No payload field
        assert!(parse_form(&HashMap::new()).is_none());
        // Unparsable JSON
        assert!(parse_form(&form_with_payload("{not json".to_string())).is_none());
        // Missing event type
        let payload = json!({"Metadata": {"type": "movie", "ratingKey": "1"}}).to_string();
        assert!(parse_form(&form_with_payload(payload)).is_none());
    }
}
