use crate::guid::GuidEntry;
use crate::traits::ArtworkKind;
use anyhow::{Context, Result};
use media_catalog_models::MediaType;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const CLIENT_IDENTIFIER: &str = "mediabridge";

/// Plex search type codes, per the server's SEARCHTYPES table
/// (1 movie, 2 show, 4 episode).
const SEARCH_TYPE_MOVIE: u32 = 1;
const SEARCH_TYPE_SHOW: u32 = 2;
const SEARCH_TYPE_EPISODE: u32 = 4;

#[derive(Debug, Deserialize)]
struct MediaContainer {
    #[serde(rename = "Metadata")]
    metadata: Option<Vec<Value>>,
    #[serde(rename = "Directory")]
    directory: Option<Vec<Value>>,
    #[serde(rename = "totalSize")]
    total_size: Option<u64>,
    #[serde(rename = "machineIdentifier")]
    machine_identifier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlexResponse {
    #[serde(rename = "MediaContainer")]
    media_container: MediaContainer,
}

#[derive(Debug, Clone)]
pub struct SectionInfo {
    pub key: String,
    pub type_: String,
    pub title: String,
    pub locations: Vec<String>,
}

/// One metadata record from a container response. Plex is loose about
/// which fields appear per record type, so construction probes a raw
/// `Value` rather than forcing a rigid schema.
#[derive(Debug, Clone)]
pub struct PlexMetadata {
    pub rating_key: String,
    pub type_: String,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<u32>,
    pub guids: Vec<GuidEntry>,
    pub locations: Vec<String>,
    pub library_section_id: Option<String>,
    pub parent_index: Option<u32>,
    pub index: Option<u32>,
}

impl PlexMetadata {
    fn from_value(value: &Value) -> Option<Self> {
        let rating_key = string_field(value, "ratingKey")?;
        let guids = value
            .get("Guid")
            .and_then(|g| g.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| string_field(entry, "id"))
                    .map(|id| GuidEntry::Keyed { id })
                    .collect()
            })
            .unwrap_or_default();

        // Shows carry Location entries; movies carry the file under
        // Media[].Part[].file.
        let mut locations: Vec<String> = value
            .get("Location")
            .and_then(|l| l.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| string_field(entry, "path"))
                    .collect()
            })
            .unwrap_or_default();
        if locations.is_empty() {
            if let Some(file) = value
                .get("Media")
                .and_then(|m| m.as_array())
                .and_then(|m| m.first())
                .and_then(|m| m.get("Part"))
                .and_then(|p| p.as_array())
                .and_then(|p| p.first())
                .and_then(|p| string_field(p, "file"))
            {
                locations.push(file);
            }
        }

        Some(Self {
            rating_key,
            type_: string_field(value, "type").unwrap_or_default(),
            title: string_field(value, "title").unwrap_or_default(),
            original_title: string_field(value, "originalTitle"),
            year: u32_field(value, "year"),
            guids,
            locations,
            library_section_id: string_field(value, "librarySectionID"),
            parent_index: u32_field(value, "parentIndex"),
            index: u32_field(value, "index"),
        })
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn u32_field(value: &Value, key: &str) -> Option<u32> {
    value.get(key)?.as_u64().and_then(|n| u32::try_from(n).ok())
}

#[derive(Clone)]
pub struct PlexHttpClient {
    client: Client,
    base_url: String,
}

impl PlexHttpClient {
    pub fn new(host: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::ACCEPT,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers.insert(
                    reqwest::header::HeaderName::from_static("x-plex-token"),
                    reqwest::header::HeaderValue::from_str(token).context("Invalid token format")?,
                );
                headers.insert(
                    reqwest::header::HeaderName::from_static("x-plex-client-identifier"),
                    reqwest::header::HeaderValue::from_static(CLIENT_IDENTIFIER),
                );
                headers
            })
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: host.trim_end_matches('/').to_string(),
        })
    }

    async fn get_container(&self, url: String) -> Result<MediaContainer> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Request to {} returned an error status", url))?;
        let parsed: PlexResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))?;
        Ok(parsed.media_container)
    }

    /// Lightweight connectivity probe; returns the server's machine
    /// identifier.
    pub async fn identity(&self) -> Result<String> {
        let container = self
            .get_container(format!("{}/identity", self.base_url))
            .await?;
        container
            .machine_identifier
            .ok_or_else(|| anyhow::anyhow!("Identity response carried no machine identifier"))
    }

    pub async fn get_sections(&self) -> Result<Vec<SectionInfo>> {
        let container = self
            .get_container(format!("{}/library/sections", self.base_url))
            .await?;
        let sections = container
            .directory
            .unwrap_or_default()
            .iter()
            .filter_map(|dir| {
                Some(SectionInfo {
                    key: string_field(dir, "key")?,
                    type_: string_field(dir, "type").unwrap_or_default(),
                    title: string_field(dir, "title").unwrap_or_default(),
                    locations: dir
                        .get("Location")
                        .and_then(|l| l.as_array())
                        .map(|entries| {
                            entries
                                .iter()
                                .filter_map(|entry| string_field(entry, "path"))
                                .collect()
                        })
                        .unwrap_or_default(),
                })
            })
            .collect();
        Ok(sections)
    }

    pub async fn get_section_items(&self, section_key: &str) -> Result<Vec<PlexMetadata>> {
        let container = self
            .get_container(format!(
                "{}/library/sections/{}/all",
                self.base_url, section_key
            ))
            .await?;
        Ok(collect_metadata(container))
    }

    pub async fn get_metadata(&self, rating_key: &str) -> Result<Option<PlexMetadata>> {
        let container = self
            .get_container(format!("{}/library/metadata/{}", self.base_url, rating_key))
            .await?;
        Ok(collect_metadata(container).into_iter().next())
    }

    /// All episodes of a show, across every season.
    pub async fn get_all_episodes(&self, rating_key: &str) -> Result<Vec<PlexMetadata>> {
        let container = self
            .get_container(format!(
                "{}/library/metadata/{}/allLeaves",
                self.base_url, rating_key
            ))
            .await?;
        Ok(collect_metadata(container))
    }

    pub async fn search(
        &self,
        title: &str,
        year: Option<u32>,
        media_type: MediaType,
    ) -> Result<Vec<PlexMetadata>> {
        let search_type = match media_type {
            MediaType::Movie => SEARCH_TYPE_MOVIE,
            MediaType::Show => SEARCH_TYPE_SHOW,
        };
        let mut url = format!(
            "{}/library/all?type={}&title={}",
            self.base_url,
            search_type,
            urlencoding::encode(title)
        );
        if let Some(year) = year {
            url.push_str(&format!("&year={}", year));
        }
        let container = self.get_container(url).await?;
        Ok(collect_metadata(container))
    }

    /// Remote artwork candidates for an item; returns the first
    /// fully-qualified URL.
    pub async fn artwork_url(&self, rating_key: &str, kind: ArtworkKind) -> Result<Option<String>> {
        let endpoint = match kind {
            ArtworkKind::Poster => "posters",
            ArtworkKind::Backdrop => "arts",
        };
        let container = self
            .get_container(format!(
                "{}/library/metadata/{}/{}",
                self.base_url, rating_key, endpoint
            ))
            .await?;
        let url = container
            .metadata
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| string_field(entry, "key"))
            .find(|key| key.starts_with("http"));
        Ok(url)
    }

    pub async fn refresh_section_path(&self, section_key: &str, path: &str) -> Result<()> {
        let url = format!(
            "{}/library/sections/{}/refresh?path={}",
            self.base_url,
            section_key,
            urlencoding::encode(path)
        );
        self.client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Refresh request to {} failed", url))?
            .error_for_status()
            .context("Refresh request returned an error status")?;
        Ok(())
    }

    pub async fn refresh_all_sections(&self) -> Result<()> {
        let url = format!("{}/library/sections/all/refresh", self.base_url);
        self.client
            .get(&url)
            .send()
            .await
            .context("Full refresh request failed")?
            .error_for_status()
            .context("Full refresh request returned an error status")?;
        Ok(())
    }

    /// Item count of a section without fetching its records.
    pub async fn section_size(&self, section_key: &str, episodes: bool) -> Result<u64> {
        let mut url = format!(
            "{}/library/sections/{}/all?X-Plex-Container-Start=0&X-Plex-Container-Size=0",
            self.base_url, section_key
        );
        if episodes {
            url.push_str(&format!("&type={}", SEARCH_TYPE_EPISODE));
        }
        let container = self.get_container(url).await?;
        Ok(container.total_size.unwrap_or(0))
    }
}

fn collect_metadata(container: MediaContainer) -> Vec<PlexMetadata> {
    let entries = container.metadata.unwrap_or_default();
    let parsed: Vec<PlexMetadata> = entries.iter().filter_map(PlexMetadata::from_value).collect();
    if parsed.len() < entries.len() {
        debug!(
            dropped = entries.len() - parsed.len(),
            "Dropped metadata records without a rating key"
        );
    }
    parsed
}
