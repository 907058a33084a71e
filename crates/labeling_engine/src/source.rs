use labeling_core::{FailureKind, ImageReference, RemoteFetchError, SourceMetadata};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::http::{self, HttpSettings};

/// Remote image search. `page` is 1-based; sources without pagination ignore it.
#[async_trait::async_trait]
pub trait ImageSource: Send + Sync {
    async fn search(&self, term: &str, page: u32) -> Result<Vec<ImageReference>, RemoteFetchError>;
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub base_url: String,
    pub search_path: String,
    pub api_key: String,
    pub api_host: String,
    pub page_size: u32,
    pub http: HttpSettings,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: "https://contextualwebsearch-websearch-v1.p.rapidapi.com".to_string(),
            search_path: "/api/Search/ImageSearchAPI".to_string(),
            api_key: String::new(),
            api_host: "contextualwebsearch-websearch-v1.p.rapidapi.com".to_string(),
            page_size: 50,
            http: HttpSettings::default(),
        }
    }
}

/// Image source backed by the RapidAPI image search endpoint.
#[derive(Debug, Clone)]
pub struct RapidApiImageSource {
    settings: SourceSettings,
    client: reqwest::Client,
}

impl RapidApiImageSource {
    pub fn new(settings: SourceSettings) -> Result<Self, RemoteFetchError> {
        let client = http::build_client(&settings.http)?;
        Ok(Self { settings, client })
    }

    fn search_url(&self, term: &str, page: u32) -> Result<url::Url, RemoteFetchError> {
        let base = self.settings.base_url.trim_end_matches('/');
        let mut url = http::parse_url(&format!("{base}{}", self.settings.search_path))?;
        url.query_pairs_mut()
            .append_pair("q", term)
            .append_pair("pageNumber", &page.to_string())
            .append_pair("pageSize", &self.settings.page_size.to_string())
            .append_pair("autoCorrect", "true");
        Ok(url)
    }
}

#[async_trait::async_trait]
impl ImageSource for RapidApiImageSource {
    async fn search(&self, term: &str, page: u32) -> Result<Vec<ImageReference>, RemoteFetchError> {
        let url = self.search_url(term, page)?;
        let response = self
            .client
            .get(url)
            .header("x-rapidapi-key", self.settings.api_key.as_str())
            .header("x-rapidapi-host", self.settings.api_host.as_str())
            .send()
            .await
            .map_err(http::map_reqwest_error)?;
        http::ensure_success(&response)?;

        let body = http::read_body(response, self.settings.http.max_bytes).await?;
        let decoded: SearchResponse = serde_json::from_slice(&body)
            .map_err(|err| RemoteFetchError::new(FailureKind::Decode, err.to_string()))?;

        Ok(decoded
            .value
            .into_iter()
            .filter_map(ImageResult::into_reference)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<ImageResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResult {
    url: Option<String>,
    title: Option<String>,
    webpage_url: Option<String>,
    thumbnail: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

impl ImageResult {
    fn into_reference(self) -> Option<ImageReference> {
        let url = self.url.filter(|url| !url.trim().is_empty())?;
        let metadata = SourceMetadata {
            title: self.title,
            webpage_url: self.webpage_url,
            thumbnail_url: self.thumbnail,
            width: self.width,
            height: self.height,
        };
        Some(ImageReference::new(image_id(&url), url).with_source(metadata))
    }
}

/// Deterministic short identifier for an image URL.
pub fn image_id(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
