pub mod builder;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;
pub mod sheet;

pub use builder::{BuildOutcome, BuilderPolicy, QuotationBuilder};
pub use catalog::{Article, ArticleLookup, ArticlePrice, LookupError, OfflineArticleLookup};
pub use domain::{
    Address, ArticleId, Customer, LineItem, LineItemType, OfferMetadata, QuotationPayload,
    TaxConditions, TaxType, TotalPrice, UnitPrice,
};
pub use errors::{AutoNamedLineItem, ValidationError, ValidationSummary, ValidationWarning};
pub use pricing::PriceError;
pub use sheet::{Sheet, Workbook, SHEET_CUSTOMER, SHEET_LINE_ITEMS, SHEET_OFFER};
