//! Catalog lookup seam.
//!
//! The builder resolves article titles and fallback prices through this trait
//! so the core never owns an HTTP client; the transport crate implements it
//! against the remote API and tests implement it in memory.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Catalog price data for one article. Either side may be missing; the rate
/// defaults at resolution time when absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePrice {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<Decimal>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<ArticlePrice>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("catalog lookup failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait ArticleLookup: Send + Sync {
    /// `Ok(None)` means the article does not exist; `Err` means the catalog
    /// could not be asked at all.
    async fn article_by_id(&self, id: &str) -> Result<Option<Article>, LookupError>;
}

/// Lookup that knows nothing. Used when the caller validates without remote
/// access: auto-names fall back to placeholders and catalog-priced rows
/// surface as errors instead of silently passing.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineArticleLookup;

#[async_trait]
impl ArticleLookup for OfflineArticleLookup {
    async fn article_by_id(&self, _id: &str) -> Result<Option<Article>, LookupError> {
        Ok(None)
    }
}
