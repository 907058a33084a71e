use std::fmt;
use std::sync::Arc;

use labeling_core::{FailureKind, ImageClass, ImageReference, RemoteFetchError};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use crate::http::{self, HttpSettings};

/// Records confirm decisions.
#[async_trait::async_trait]
pub trait ClassificationSink: Send + Sync {
    async fn classify(
        &self,
        image: &ImageReference,
        target: &ImageClass,
    ) -> Result<(), RemoteFetchError>;
}

/// Produces the `classifiedAt` timestamp sent with each decision.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Clone)]
pub struct SinkSettings {
    pub base_url: String,
    pub api_token: Option<String>,
    pub http: HttpSettings,
    pub clock: Option<Clock>,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_token: None,
            http: HttpSettings::default(),
            clock: None,
        }
    }
}

impl fmt::Debug for SinkSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkSettings")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .field("http", &self.http)
            .field("clock", &self.clock.is_some())
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassificationPayload<'a> {
    image_id: &'a str,
    url: &'a str,
    class_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    classified_at: Option<String>,
}

/// Posts decisions to `{base_url}/image-classes/{class_id}/images`.
#[derive(Debug, Clone)]
pub struct HttpClassificationSink {
    settings: SinkSettings,
    client: reqwest::Client,
}

impl HttpClassificationSink {
    pub fn new(settings: SinkSettings) -> Result<Self, RemoteFetchError> {
        let client = http::build_client(&settings.http)?;
        Ok(Self { settings, client })
    }
}

#[async_trait::async_trait]
impl ClassificationSink for HttpClassificationSink {
    async fn classify(
        &self,
        image: &ImageReference,
        target: &ImageClass,
    ) -> Result<(), RemoteFetchError> {
        let base = self.settings.base_url.trim_end_matches('/');
        let url = http::parse_url(&format!("{base}/image-classes/{}/images", target.id))?;

        let payload = ClassificationPayload {
            image_id: &image.id,
            url: &image.url,
            class_name: &target.name,
            classified_at: self.settings.clock.as_ref().map(|clock| clock()),
        };
        let body = serde_json::to_vec(&payload)
            .map_err(|err| RemoteFetchError::new(FailureKind::Decode, err.to_string()))?;

        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = &self.settings.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(http::map_reqwest_error)?;
        http::ensure_success(&response)
    }
}
