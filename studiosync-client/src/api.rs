//! REST clients for the channels, sources and assets resources.
//!
//! Thin request wrappers: no retries, no caching. Every method performs one
//! request and maps the response onto the wire types in `studiosync-core`.

use reqwest::StatusCode;
use serde::Deserialize;

use studiosync_core::types::{AbuseReport, Channel, PrivacyProfanityReport};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Root of the remote API, e.g. `https://studio.example.org`.
    pub base_url: String,
}

/// Error types for API requests.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("unexpected status {status} from {url}")]
    Status { status: StatusCode, url: String },

    /// Connection failures and undecodable response bodies both surface
    /// here through reqwest.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// The three REST resources the sync layer talks to.
#[derive(Debug, Clone)]
pub struct Api {
    pub channels: ChannelsClient,
    pub sources: SourcesClient,
    pub assets: AssetsClient,
}

impl Api {
    pub fn new(config: ApiConfig) -> Self {
        let http = reqwest::Client::new();
        let base = config.base_url.trim_end_matches('/').to_string();
        Self {
            channels: ChannelsClient {
                http: http.clone(),
                base: format!("{base}/v3/channels"),
            },
            sources: SourcesClient {
                http: http.clone(),
                base: format!("{base}/v3/sources"),
            },
            assets: AssetsClient {
                http,
                base: format!("{base}/v3/assets"),
            },
        }
    }
}

async fn expect_ok(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(response.url().to_string()));
    }
    if !status.is_success() {
        return Err(ApiError::Status {
            status,
            url: response.url().to_string(),
        });
    }
    Ok(response)
}

/// Channel metadata resource.
#[derive(Debug, Clone)]
pub struct ChannelsClient {
    http: reqwest::Client,
    base: String,
}

impl ChannelsClient {
    pub async fn fetch(&self, id: &str) -> Result<Channel, ApiError> {
        let response = self.http.get(format!("{}/{id}", self.base)).send().await?;
        Ok(expect_ok(response).await?.json().await?)
    }

    pub async fn fetch_abuse(&self, id: &str) -> Result<AbuseReport, ApiError> {
        let response = self
            .http
            .get(format!("{}/{id}/abuse", self.base))
            .send()
            .await?;
        Ok(expect_ok(response).await?.json().await?)
    }

    pub async fn fetch_privacy_profanity(
        &self,
        id: &str,
    ) -> Result<PrivacyProfanityReport, ApiError> {
        let response = self
            .http
            .get(format!("{}/{id}/privacy-profanity", self.base))
            .send()
            .await?;
        Ok(expect_ok(response).await?.json().await?)
    }

    pub async fn create(&self, channel: &Channel) -> Result<Channel, ApiError> {
        let response = self.http.post(&self.base).json(channel).send().await?;
        Ok(expect_ok(response).await?.json().await?)
    }

    pub async fn update(&self, id: &str, channel: &Channel) -> Result<Channel, ApiError> {
        let response = self
            .http
            .put(format!("{}/{id}", self.base))
            .json(channel)
            .send()
            .await?;
        Ok(expect_ok(response).await?.json().await?)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let response = self.http.delete(format!("{}/{id}", self.base)).send().await?;
        expect_ok(response).await?;
        Ok(())
    }

    /// Admin-only: clear the abuse record for a channel.
    pub async fn delete_abuse(&self, id: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(format!("{}/{id}/abuse", self.base))
            .send()
            .await?;
        expect_ok(response).await?;
        Ok(())
    }
}

/// Response to a source upload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutSourceResponse {
    pub version_id: String,
}

/// Packed source-file resource, keyed by channel id and file name.
#[derive(Debug, Clone)]
pub struct SourcesClient {
    http: reqwest::Client,
    base: String,
}

impl SourcesClient {
    fn url(&self, channel_id: &str, filename: &str, version: Option<&str>) -> String {
        let mut url = format!("{}/{channel_id}/{filename}", self.base);
        if let Some(version) = version {
            url.push_str("?version=");
            url.push_str(version);
        }
        url
    }

    /// Fetch the raw packed source body.
    pub async fn fetch(
        &self,
        channel_id: &str,
        filename: &str,
        version: Option<&str>,
    ) -> Result<String, ApiError> {
        let response = self
            .http
            .get(self.url(channel_id, filename, version))
            .send()
            .await?;
        Ok(expect_ok(response).await?.text().await?)
    }

    /// Upload a packed source body. Passing a version overwrites that
    /// version in place; omitting it creates a new one.
    pub async fn put(
        &self,
        channel_id: &str,
        body: String,
        filename: &str,
        version: Option<&str>,
    ) -> Result<PutSourceResponse, ApiError> {
        let response = self
            .http
            .put(self.url(channel_id, filename, version))
            .body(body)
            .send()
            .await?;
        Ok(expect_ok(response).await?.json().await?)
    }
}

/// Binary-asset resource. Only bulk operations are needed here; individual
/// asset management belongs to the asset-manager dialog, not the sync layer.
#[derive(Debug, Clone)]
pub struct AssetsClient {
    http: reqwest::Client,
    base: String,
}

impl AssetsClient {
    /// Copy every asset from one channel to another.
    pub async fn copy_all(&self, src_channel: &str, dest_channel: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(format!(
                "{}/copy?src={src_channel}&dest={dest_channel}",
                self.base
            ))
            .send()
            .await?;
        expect_ok(response).await?;
        Ok(())
    }

    /// Apply a field update to every asset of a channel, e.g.
    /// `abuse_score=0`.
    pub async fn patch_all(&self, channel_id: &str, query: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .patch(format!("{}/{channel_id}?{query}", self.base))
            .send()
            .await?;
        expect_ok(response).await?;
        Ok(())
    }
}
