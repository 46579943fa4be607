use crate::emby::api::external_ids_from_provider_map;
use media_catalog_models::{clip_overview, WebhookEvent, WebhookItemType};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// The JSON document Emby posts as the webhook request body.
#[derive(Debug, Deserialize)]
struct EmbyMessage {
    #[serde(rename = "Event", default)]
    event: String,
    #[serde(rename = "Item")]
    item: Option<MessageItem>,
    #[serde(rename = "Session")]
    session: Option<MessageSession>,
    #[serde(rename = "User")]
    user: Option<MessageUser>,
    #[serde(rename = "PlaybackInfo")]
    playback_info: Option<MessagePlayback>,
    #[serde(rename = "TranscodingInfo")]
    transcoding_info: Option<MessageTranscoding>,
}

#[derive(Debug, Deserialize)]
struct MessageItem {
    #[serde(rename = "Id")]
    id: Option<String>,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Type", default)]
    type_: String,
    #[serde(rename = "ProductionYear")]
    production_year: Option<u32>,
    #[serde(rename = "Overview")]
    overview: Option<String>,
    #[serde(rename = "Path")]
    path: Option<String>,
    #[serde(rename = "SeriesName")]
    series_name: Option<String>,
    #[serde(rename = "SeriesId")]
    series_id: Option<String>,
    #[serde(rename = "ParentIndexNumber")]
    parent_index_number: Option<u32>,
    #[serde(rename = "IndexNumber")]
    index_number: Option<u32>,
    #[serde(rename = "Album")]
    album: Option<String>,
    #[serde(rename = "AlbumId")]
    album_id: Option<String>,
    #[serde(rename = "FileName")]
    file_name: Option<String>,
    #[serde(rename = "RunTimeTicks")]
    run_time_ticks: Option<u64>,
    #[serde(rename = "ProviderIds", default)]
    provider_ids: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct MessageSession {
    #[serde(rename = "RemoteEndPoint")]
    remote_end_point: Option<String>,
    #[serde(rename = "DeviceName")]
    device_name: Option<String>,
    #[serde(rename = "Client")]
    client: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageUser {
    #[serde(rename = "Name")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagePlayback {
    #[serde(rename = "PositionTicks")]
    position_ticks: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MessageTranscoding {
    #[serde(rename = "CompletionPercentage")]
    completion_percentage: Option<f64>,
}

/// Normalize an Emby webhook body into the canonical event shape.
pub fn parse_body(body: &str) -> Option<WebhookEvent> {
    let message: EmbyMessage = match serde_json::from_str(body) {
        Ok(message) => message,
        Err(e) => {
            debug!(error = %e, "Failed to parse emby webhook body");
            return None;
        }
    };
    if message.event.is_empty() {
        debug!("Emby webhook carried no event type");
        return None;
    }
    info!(event = %message.event, "Received emby webhook");

    let mut event = WebhookEvent::new(message.event, "emby");
    if let Some(item) = message.item {
        match item.type_.as_str() {
            "Episode" => {
                event.item_type = Some(WebhookItemType::Tv);
                event.item_name = match (
                    item.series_name.as_deref(),
                    item.parent_index_number,
                    item.index_number,
                ) {
                    (Some(series), Some(season), Some(episode)) => {
                        Some(format!("{} S{}E{} {}", series, season, episode, item.name))
                    }
                    _ => Some(item.name.clone()),
                };
                event.item_id = item.series_id.clone();
                event.season_id = item.parent_index_number;
                event.episode_id = item.index_number;
            }
            "Audio" => {
                event.item_type = Some(WebhookItemType::Audio);
                event.item_name = item.album.clone();
                event.overview = item.file_name.clone();
                event.item_id = item.album_id.clone();
            }
            _ => {
                event.item_type = Some(WebhookItemType::Movie);
                event.item_name = Some(format!(
                    "{} ({})",
                    item.name,
                    item.production_year
                        .map_or_else(String::new, |y| y.to_string())
                ));
                event.item_path = item.path.as_deref().map(PathBuf::from);
                event.item_id = item.id.clone();
            }
        }

        event.tmdb_id = external_ids_from_provider_map(&item.provider_ids)
            .tmdb_id
            .map(|id| id.to_string());
        if let Some(overview) = item.overview.as_deref() {
            event.overview = Some(clip_overview(overview));
        }

        event.percentage = message
            .transcoding_info
            .and_then(|info| info.completion_percentage)
            .or_else(|| {
                let position = message.playback_info.and_then(|info| info.position_ticks)?;
                let runtime = item.run_time_ticks.filter(|ticks| *ticks > 0)?;
                Some(position as f64 / runtime as f64 * 100.0)
            });
    }
    if let Some(session) = message.session {
        event.ip = session.remote_end_point;
        event.device_name = session.device_name;
        event.client = session.client;
    }
    if let Some(user) = message.user {
        event.user_name = user.name;
    }

    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn movie_playback_stop_yields_canonical_event() {
        let body = json!({
            "Event": "playback.stop",
            "User": {"Name": "admin", "Id": "e6a9"},
            "Item": {
                "Name": "Across the Spider-Verse",
                "Id": "240270",
                "Type": "Movie",
                "ProductionYear": 2023,
                "Path": "/video/movies/Across the Spider-Verse (2023).mp4",
                "Overview": "Miles swings again.",
                "ProviderIds": {"Tmdb": "569094", "Imdb": "tt9362722"},
                "RunTimeTicks": 80439590000u64
            },
            "Session": {
                "RemoteEndPoint": "10.10.10.253",
                "Client": "Emby Web",
                "DeviceName": "Edge Windows"
            },
            "PlaybackInfo": {"PositionTicks": 17431791950u64}
        })
        .to_string();

        let event = parse_body(&body).unwrap();
        assert_eq!(event.event, "playback.stop");
        assert_eq!(event.channel, "emby");
        assert_eq!(event.item_type, Some(WebhookItemType::Movie));
        assert_eq!(
            event.item_name.as_deref(),
            Some("Across the Spider-Verse (2023)")
        );
        assert_eq!(event.item_id.as_deref(), Some("240270"));
        assert_eq!(event.tmdb_id.as_deref(), Some("569094"));
        assert_eq!(event.ip.as_deref(), Some("10.10.10.253"));
        assert_eq!(event.device_name.as_deref(), Some("Edge Windows"));
        assert_eq!(event.client.as_deref(), Some("Emby Web"));
        assert_eq!(event.user_name.as_deref(), Some("admin"));
        let percentage = event.percentage.unwrap();
        assert!((percentage - 21.67).abs() < 0.01);
    }

    #[test]
    fn episode_event_names_series_season_and_episode() {
        let body = json!({
            "Event": "playback.start",
            "Item": {
                "Name": "Episode 11",
                "Id": "240252",
                "Type": "Episode",
                "SeriesName": "Long Wind Ferry",
                "SeriesId": "240202",
                "ParentIndexNumber": 1,
                "IndexNumber": 11,
                "ProviderIds": {"Tmdb": "4533239"}
            }
        })
        .to_string();

        let event = parse_body(&body).unwrap();
        assert_eq!(event.item_type, Some(WebhookItemType::Tv));
        assert_eq!(
            event.item_name.as_deref(),
            Some("Long Wind Ferry S1E11 Episode 11")
        );
        assert_eq!(event.item_id.as_deref(), Some("240202"));
        assert_eq!(event.season_id, Some(1));
        assert_eq!(event.episode_id, Some(11));
    }

    #[test]
    fn episode_without_series_context_falls_back_to_item_name() {
        let body = json!({
            "Event": "playback.start",
            "Item": {"Name": "Orphan Episode", "Id": "9", "Type": "Episode"}
        })
        .to_string();
        let event = parse_body(&body).unwrap();
        assert_eq!(event.item_name.as_deref(), Some("Orphan Episode"));
    }

    #[test]
    fn audio_event_uses_album_and_file_name() {
        let body = json!({
            "Event": "playback.start",
            "Item": {
                "Name": "Track 1",
                "Id": "50",
                "Type": "Audio",
                "Album": "Greatest Hits",
                "AlbumId": "49",
                "FileName": "track01.flac"
            }
        })
        .to_string();
        let event = parse_body(&body).unwrap();
        assert_eq!(event.item_type, Some(WebhookItemType::Audio));
        assert_eq!(event.item_name.as_deref(), Some("Greatest Hits"));
        assert_eq!(event.overview.as_deref(), Some("track01.flac"));
        assert_eq!(event.item_id.as_deref(), Some("49"));
    }

    #[test]
    fn overview_is_clipped_at_limit() {
        let body = json!({
            "Event": "playback.start",
            "Item": {
                "Name": "Heat",
                "Id": "1",
                "Type": "Movie",
                "ProductionYear": 1995,
                "Overview": "o".repeat(150)
            }
        })
        .to_string();
        let overview = parse_body(&body).unwrap().overview.unwrap();
        assert_eq!(overview.chars().count(), 103);
        assert!(overview.ends_with("..."));
    }

    #[test]
    fn malformed_input_fails_soft() {
        assert!(parse_body("{not json").is_none());
        assert!(parse_body(&json!({"Item": {"Name": "x", "Id": "1"}}).to_string()).is_none());
    }
}
