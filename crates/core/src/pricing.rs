//! Unit-price resolution.
//!
//! The tax type decides which side of the price is authoritative: a supplied
//! amount is the net amount under `net` taxation and the gross amount under
//! `gross`. When no amount is supplied the price falls back to catalog data,
//! deriving the missing side while holding the percentage rate invariant:
//! `gross = net * (1 + rate/100)`.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::catalog::ArticlePrice;
use crate::domain::{TaxType, UnitPrice};

pub fn default_tax_rate() -> Decimal {
    Decimal::from(19)
}

pub const DEFAULT_CURRENCY: &str = "EUR";

/// Typed price-resolution failures. Callers must branch on all of them: a
/// missing amount without a catalog reference is a hard validation error,
/// while catalog problems point at the article data instead of the sheet.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PriceError {
    #[error("no price supplied and no articleId to resolve a catalog price from")]
    MissingAmount,
    #[error("article `{0}` was not found in the catalog")]
    ArticleNotFound(String),
    #[error("article `{0}` has neither a net nor a gross catalog price")]
    IncompleteCatalogPrice(String),
    #[error("catalog lookup for article `{article_id}` failed: {message}")]
    Lookup { article_id: String, message: String },
}

/// Parses a numeric cell, accepting a comma as the decimal separator
/// (`"6,9"` reads as `6.9`). Unparseable input reads as absent, never as
/// zero.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = trimmed.replace(',', ".");
    normalized.parse::<Decimal>().ok()
}

/// Half-up rounding to two decimal places for monetary outputs.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn effective_rate(tax_rate: Option<Decimal>, default_rate: Decimal) -> Decimal {
    tax_rate.unwrap_or(default_rate)
}

fn rate_factor(rate: Decimal) -> Decimal {
    Decimal::ONE + rate / Decimal::from(100)
}

/// Builds a unit price from an explicitly supplied amount. The amount lands
/// on the side the tax type makes authoritative; the other side stays unset.
pub fn from_supplied_amount(
    tax_type: TaxType,
    amount: Decimal,
    tax_rate: Option<Decimal>,
    default_rate: Decimal,
    currency: &str,
) -> UnitPrice {
    let rate = effective_rate(tax_rate, default_rate);
    let (net_amount, gross_amount) = match tax_type {
        TaxType::Net => (Some(amount), None),
        TaxType::Gross => (None, Some(amount)),
    };
    UnitPrice {
        currency: currency.to_string(),
        net_amount,
        gross_amount,
        tax_rate_percentage: rate,
    }
}

/// Builds a unit price from catalog data, deriving the side the tax type
/// needs when the catalog only carries the other one.
pub fn from_catalog_price(
    tax_type: TaxType,
    article_id: &str,
    price: &ArticlePrice,
    default_rate: Decimal,
    currency: &str,
) -> Result<UnitPrice, PriceError> {
    let rate = effective_rate(price.tax_rate, default_rate);

    let amount = match (tax_type, price.net_price, price.gross_price) {
        (TaxType::Net, Some(net), _) => net,
        (TaxType::Net, None, Some(gross)) => round_money(gross / rate_factor(rate)),
        (TaxType::Gross, _, Some(gross)) => gross,
        (TaxType::Gross, Some(net), None) => round_money(net * rate_factor(rate)),
        (_, None, None) => {
            return Err(PriceError::IncompleteCatalogPrice(article_id.to_string()))
        }
    };

    let (net_amount, gross_amount) = match tax_type {
        TaxType::Net => (Some(amount), None),
        TaxType::Gross => (None, Some(amount)),
    };
    Ok(UnitPrice {
        currency: currency.to_string(),
        net_amount,
        gross_amount,
        tax_rate_percentage: rate,
    })
}
