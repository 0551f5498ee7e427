//! Client for the remote quotation API.
//!
//! Quotation creation is not idempotent: a rate-limited or failed POST is
//! surfaced to the caller instead of retried, so a flaky network never
//! produces duplicate remote vouchers. Reads (article lookup, document
//! retrieval) are idempotent and retry with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use offerkit_core::catalog::{Article, ArticleLookup, LookupError};
use offerkit_core::config::ApiConfig;
use offerkit_core::domain::QuotationPayload;

use crate::rate_limit::OutboundRateLimiter;

const BASE_RETRY_DELAY_MS: u64 = 500;
const MAX_RETRY_DELAY_MS: u64 = 10_000;
const MAX_REMOTE_MESSAGE_LEN: usize = 512;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("remote API rate limit reached")]
    RateLimited,
    #[error("remote API rejected the request ({status}): {message}")]
    Remote { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("api.api_key is not configured")]
    MissingApiKey,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResource {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    pub document_file_id: String,
}

pub struct QuotationApi {
    http: Client,
    base_url: String,
    api_key: SecretString,
    limiter: OutboundRateLimiter,
    max_read_retries: u32,
}

impl QuotationApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        if config.api_key.expose_secret().trim().is_empty() {
            return Err(ApiError::MissingApiKey);
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            limiter: OutboundRateLimiter::with_min_interval(Duration::from_millis(
                config.min_request_interval_ms,
            )),
            max_read_retries: config.max_read_retries,
        })
    }

    pub async fn create_quotation(
        &self,
        payload: &QuotationPayload,
    ) -> Result<CreatedResource, ApiError> {
        self.limiter.acquire().await;
        let url = format!("{}/v1/quotations", self.base_url);
        info!(event_name = "api.quotation.create", url = %url, "submitting quotation");

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(payload)
            .send()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(
                event_name = "api.quotation.rate_limited",
                url = %url,
                "creation call was rate limited, not retrying"
            );
            return Err(ApiError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Remote {
                status: status.as_u16(),
                message: truncate_message(message),
            });
        }

        response
            .json::<CreatedResource>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }

    /// Triggers document rendering for a created quotation and returns the
    /// file reference to download it by.
    pub async fn render_document(
        &self,
        quotation_id: &str,
    ) -> Result<DocumentReference, ApiError> {
        let url = format!("{}/v1/quotations/{quotation_id}/document", self.base_url);
        self.get_with_retry(&url).await
    }

    pub async fn get_article(&self, article_id: &str) -> Result<Option<Article>, ApiError> {
        let url = format!("{}/v1/articles/{article_id}", self.base_url);
        match self.get_with_retry::<Article>(&url).await {
            Ok(article) => Ok(Some(article)),
            Err(ApiError::Remote { status: 404, .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn get_with_retry<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let mut attempt = 0u32;
        loop {
            match self.get_once(url).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_read_retries && is_retryable(&err) => {
                    let delay = backoff_delay(attempt);
                    debug!(
                        event_name = "api.read.retry",
                        url = %url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying idempotent read"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        self.limiter.acquire().await;
        let response = self
            .http
            .get(url)
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Remote {
                status: status.as_u16(),
                message: truncate_message(message),
            });
        }
        response.json::<T>().await.map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[async_trait]
impl ArticleLookup for QuotationApi {
    async fn article_by_id(&self, id: &str) -> Result<Option<Article>, LookupError> {
        self.get_article(id).await.map_err(|err| LookupError::Transport(err.to_string()))
    }
}

/// Rate limits and server-side or transport hiccups are worth retrying for
/// reads; client errors are not.
fn is_retryable(err: &ApiError) -> bool {
    match err {
        ApiError::RateLimited | ApiError::Transport(_) => true,
        ApiError::Remote { status, .. } => *status >= 500,
        ApiError::Decode(_) | ApiError::MissingApiKey => false,
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.min(16);
    let delay = BASE_RETRY_DELAY_MS.saturating_mul(1u64 << exponent);
    Duration::from_millis(delay.min(MAX_RETRY_DELAY_MS))
}

fn truncate_message(message: String) -> String {
    if message.len() <= MAX_REMOTE_MESSAGE_LEN {
        return message;
    }
    let mut cut = MAX_REMOTE_MESSAGE_LEN;
    while !message.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…", &message[..cut])
}
