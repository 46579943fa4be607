use anyhow::{Context, Result};
use media_catalog_models::ExternalIds;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

/// Map Emby's structured `ProviderIds` record onto the canonical triple.
pub fn external_ids_from_provider_map(provider_ids: &HashMap<String, String>) -> ExternalIds {
    ExternalIds {
        imdb_id: provider_ids.get("Imdb").cloned(),
        tmdb_id: provider_ids.get("Tmdb").and_then(|id| id.parse().ok()),
        tvdb_id: provider_ids.get("Tvdb").and_then(|id| id.parse().ok()),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbyItem {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Type", default)]
    pub type_: String,
    #[serde(rename = "OriginalTitle")]
    pub original_title: Option<String>,
    #[serde(rename = "ProductionYear")]
    pub production_year: Option<u32>,
    #[serde(rename = "ParentId")]
    pub parent_id: Option<String>,
    #[serde(rename = "Path")]
    pub path: Option<String>,
    #[serde(rename = "CollectionType")]
    pub collection_type: Option<String>,
    #[serde(rename = "ParentIndexNumber")]
    pub parent_index_number: Option<u32>,
    #[serde(rename = "IndexNumber")]
    pub index_number: Option<u32>,
    #[serde(rename = "ProviderIds", default)]
    pub provider_ids: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ItemsPage {
    #[serde(rename = "Items", default)]
    items: Vec<EmbyItem>,
}

#[derive(Debug, Deserialize)]
pub struct MediaFolder {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "SubFolders", default)]
    pub sub_folders: Vec<SubFolder>,
}

#[derive(Debug, Deserialize)]
pub struct SubFolder {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Path")]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbyUser {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Policy", default)]
    policy: UserPolicy,
}

#[derive(Debug, Deserialize, Default)]
struct UserPolicy {
    #[serde(rename = "IsAdministrator", default)]
    is_administrator: bool,
}

#[derive(Debug, Deserialize)]
struct SystemInfo {
    #[serde(rename = "Id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct RemoteImagesPage {
    #[serde(rename = "Images", default)]
    images: Vec<RemoteImage>,
}

#[derive(Debug, Deserialize)]
struct RemoteImage {
    #[serde(rename = "ProviderName", default)]
    provider_name: String,
    #[serde(rename = "Type", default)]
    type_: String,
    #[serde(rename = "Url")]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemCounts {
    #[serde(rename = "MovieCount", default)]
    pub movie_count: u64,
    #[serde(rename = "SeriesCount", default)]
    pub series_count: u64,
    #[serde(rename = "EpisodeCount", default)]
    pub episode_count: u64,
}

#[derive(Clone)]
pub struct EmbyHttpClient {
    client: Client,
    base_url: String,
    api_key: String,
    user_id: String,
}

impl EmbyHttpClient {
    pub fn new(host: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: host.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            user_id: String::new(),
        })
    }

    /// The user-scoped item endpoints need a user context; the admin
    /// account is resolved once after connecting.
    pub fn set_user(&mut self, user_id: String) {
        self.user_id = user_id;
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", redact(&url, &self.api_key)))?
            .error_for_status()
            .with_context(|| {
                format!(
                    "Request to {} returned an error status",
                    redact(&url, &self.api_key)
                )
            })?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", redact(&url, &self.api_key)))
    }

    async fn post(&self, url: String) -> Result<()> {
        self.client
            .post(&url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", redact(&url, &self.api_key)))?
            .error_for_status()
            .with_context(|| {
                format!(
                    "Request to {} returned an error status",
                    redact(&url, &self.api_key)
                )
            })?;
        Ok(())
    }

    /// Connectivity probe; returns the server id.
    pub async fn system_id(&self) -> Result<String> {
        let info: SystemInfo = self
            .get_json(format!(
                "{}/emby/System/Info?api_key={}",
                self.base_url, self.api_key
            ))
            .await?;
        Ok(info.id)
    }

    /// First administrator account, used for the user-scoped endpoints.
    pub async fn admin_user(&self) -> Result<Option<String>> {
        let users: Vec<EmbyUser> = self
            .get_json(format!("{}/Users?api_key={}", self.base_url, self.api_key))
            .await?;
        Ok(users
            .into_iter()
            .find(|user| user.policy.is_administrator)
            .map(|user| {
                tracing::debug!(user = %user.name, "Resolved Emby administrator account");
                user.id
            }))
    }

    pub async fn views(&self) -> Result<Vec<EmbyItem>> {
        let page: ItemsPage = self
            .get_json(format!(
                "{}/emby/Users/{}/Views?api_key={}",
                self.base_url, self.user_id, self.api_key
            ))
            .await?;
        Ok(page.items)
    }

    pub async fn media_folders(&self) -> Result<Vec<MediaFolder>> {
        self.get_json(format!(
            "{}/emby/Library/SelectableMediaFolders?api_key={}",
            self.base_url, self.api_key
        ))
        .await
    }

    pub async fn children(&self, parent_id: &str) -> Result<Vec<EmbyItem>> {
        let page: ItemsPage = self
            .get_json(format!(
                "{}/emby/Users/{}/Items?ParentId={}&api_key={}",
                self.base_url, self.user_id, parent_id, self.api_key
            ))
            .await?;
        Ok(page.items)
    }

    pub async fn item_info(&self, item_id: &str) -> Result<Option<EmbyItem>> {
        let url = format!(
            "{}/emby/Users/{}/Items/{}?api_key={}",
            self.base_url, self.user_id, item_id, self.api_key
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", redact(&url, &self.api_key)))?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let item = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", redact(&url, &self.api_key)))?;
        Ok(Some(item))
    }

    /// Recursive name search within one item kind ("Movie" or "Series").
    pub async fn search_items(&self, kind: &str, term: &str) -> Result<Vec<EmbyItem>> {
        let page: ItemsPage = self
            .get_json(format!(
                "{}/emby/Items?IncludeItemTypes={}&Fields=ProductionYear,ProviderIds,Path&StartIndex=0\
                 &Recursive=true&SearchTerm={}&Limit=10&IncludeSearchTypes=false&api_key={}",
                self.base_url,
                kind,
                urlencoding::encode(term),
                self.api_key
            ))
            .await?;
        Ok(page.items)
    }

    pub async fn show_episodes(&self, series_id: &str, season: Option<u32>) -> Result<Vec<EmbyItem>> {
        let season = season.map_or_else(String::new, |s| s.to_string());
        let page: ItemsPage = self
            .get_json(format!(
                "{}/emby/Shows/{}/Episodes?Season={}&IsMissing=false&api_key={}",
                self.base_url, series_id, season, self.api_key
            ))
            .await?;
        Ok(page.items)
    }

    /// First TMDB-sourced remote image of the requested kind.
    pub async fn remote_image_url(&self, item_id: &str, image_type: &str) -> Result<Option<String>> {
        let page: RemoteImagesPage = self
            .get_json(format!(
                "{}/emby/Items/{}/RemoteImages?api_key={}",
                self.base_url, item_id, self.api_key
            ))
            .await?;
        Ok(page
            .images
            .into_iter()
            .find(|image| image.provider_name == "TheMovieDb" && image.type_ == image_type)
            .and_then(|image| image.url))
    }

    pub async fn refresh_item(&self, item_id: &str) -> Result<()> {
        self.post(format!(
            "{}/emby/Items/{}/Refresh?Recursive=true&api_key={}",
            self.base_url, item_id, self.api_key
        ))
        .await
    }

    pub async fn refresh_library(&self) -> Result<()> {
        self.post(format!(
            "{}/emby/Library/Refresh?api_key={}",
            self.base_url, self.api_key
        ))
        .await
    }

    pub async fn item_counts(&self) -> Result<ItemCounts> {
        self.get_json(format!(
            "{}/emby/Items/Counts?api_key={}",
            self.base_url, self.api_key
        ))
        .await
    }
}

/// Keep the api key out of error messages.
fn redact(url: &str, api_key: &str) -> String {
    if api_key.is_empty() {
        url.to_string()
    } else {
        url.replace(api_key, "***")
    }
}
