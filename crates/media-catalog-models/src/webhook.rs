use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const OVERVIEW_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WebhookItemType {
    #[serde(rename = "TV")]
    Tv,
    #[serde(rename = "MOV")]
    Movie,
    #[serde(rename = "SHOW")]
    Show,
    #[serde(rename = "AUD")]
    Audio,
}

impl WebhookItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookItemType::Tv => "TV",
            WebhookItemType::Movie => "MOV",
            WebhookItemType::Show => "SHOW",
            WebhookItemType::Audio => "AUD",
        }
    }
}

/// Canonical playback event, one shape regardless of provider.
///
/// Transient: constructed per inbound call, never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<WebhookItemType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl WebhookEvent {
    pub fn new(event: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            channel: channel.into(),
            ..Default::default()
        }
    }
}

/// Clip summary text to 100 characters plus an ellipsis marker.
///
/// Counts characters, not bytes, so multi-byte titles are never split
/// mid-codepoint.
pub fn clip_overview(text: &str) -> String {
    if text.chars().count() > OVERVIEW_LIMIT {
        let clipped: String = text.chars().take(OVERVIEW_LIMIT).collect();
        format!("{}...", clipped)
    } else {
        text.to_string()
    }
}
