//! Domain and wire types for the quotation payload.
//!
//! The wire structs serialize to the camelCase JSON the remote quotation API
//! expects; optional fields are omitted rather than sent as null.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxType {
    Net,
    Gross,
}

impl TaxType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "net" => Some(Self::Net),
            "gross" => Some(Self::Gross),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Net => "net",
            Self::Gross => "gross",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineItemType {
    Custom,
    Material,
    Service,
    Text,
}

impl LineItemType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "custom" => Some(Self::Custom),
            "material" => Some(Self::Material),
            "service" => Some(Self::Service),
            "text" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Material => "material",
            Self::Service => "service",
            Self::Text => "text",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArticleId(pub String);

/// Offer-level metadata extracted from the `Angebot` sheet.
#[derive(Clone, Debug, PartialEq)]
pub struct OfferMetadata {
    pub tax_type: TaxType,
    pub voucher_date: Option<String>,
    pub expiration_date: Option<String>,
    pub currency: String,
    pub tax_rate_default: Decimal,
    pub title: Option<String>,
    pub introduction: Option<String>,
    pub remark: Option<String>,
}

/// Customer extracted from the `Kunde` sheet.
///
/// `contact_id` and the freeform address fields are mutually exclusive in the
/// payload: when a contact reference exists it wins and the address fields are
/// not sent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Customer {
    pub name: String,
    pub contact_id: Option<String>,
    pub street: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub country_code: String,
    pub email: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitPrice {
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_amount: Option<Decimal>,
    pub tax_rate_percentage: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(rename = "type")]
    pub item_type: LineItemType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_id: Option<ArticleId>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<UnitPrice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Address {
    #[serde(rename_all = "camelCase")]
    Contact { contact_id: String },
    #[serde(rename_all = "camelCase")]
    Freeform {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        street: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        zip: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        city: Option<String>,
        country_code: String,
    },
}

impl Address {
    /// Builds the payload address, preferring the remote contact reference.
    pub fn from_customer(customer: &Customer) -> Self {
        match &customer.contact_id {
            Some(contact_id) => Self::Contact { contact_id: contact_id.clone() },
            None => Self::Freeform {
                name: customer.name.clone(),
                street: customer.street.clone(),
                zip: customer.zip.clone(),
                city: customer.city.clone(),
                country_code: customer.country_code.clone(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxConditions {
    pub tax_type: TaxType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalPrice {
    pub currency: String,
}

/// The complete, submit-ready quotation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voucher_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    pub address: Address,
    pub line_items: Vec<LineItem>,
    pub tax_conditions: TaxConditions,
    pub total_price: TotalPrice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub introduction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}
