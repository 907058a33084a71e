use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use labeling_core::{FailureKind, RemoteFetchError};

/// Transport settings shared by the image source and the classification sink.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 2 * 1024 * 1024,
            user_agent: concat!("image-labeling/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

pub(crate) fn build_client(settings: &HttpSettings) -> Result<reqwest::Client, RemoteFetchError> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .user_agent(settings.user_agent.as_str())
        .build()
        .map_err(|err| RemoteFetchError::new(FailureKind::Network, err.to_string()))
}

pub(crate) fn parse_url(raw: &str) -> Result<url::Url, RemoteFetchError> {
    url::Url::parse(raw)
        .map_err(|err| RemoteFetchError::new(FailureKind::InvalidUrl, format!("{raw}: {err}")))
}

pub(crate) fn ensure_success(response: &reqwest::Response) -> Result<(), RemoteFetchError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(RemoteFetchError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ))
    }
}

/// Streams the response body, failing as soon as it exceeds `max_bytes`.
pub(crate) async fn read_body(
    response: reqwest::Response,
    max_bytes: u64,
) -> Result<Bytes, RemoteFetchError> {
    if let Some(content_len) = response.content_length() {
        if content_len > max_bytes {
            return Err(too_large(max_bytes, Some(content_len)));
        }
    }

    let mut body = BytesMut::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        let next_len = body.len() as u64 + chunk.len() as u64;
        if next_len > max_bytes {
            return Err(too_large(max_bytes, Some(next_len)));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> RemoteFetchError {
    if err.is_timeout() {
        return RemoteFetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return RemoteFetchError::new(FailureKind::Decode, err.to_string());
    }
    RemoteFetchError::new(FailureKind::Network, err.to_string())
}

fn too_large(max_bytes: u64, actual: Option<u64>) -> RemoteFetchError {
    RemoteFetchError::new(
        FailureKind::TooLarge { max_bytes, actual },
        "response too large",
    )
}
