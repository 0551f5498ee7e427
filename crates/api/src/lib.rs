pub mod client;
pub mod rate_limit;

pub use client::{ApiError, CreatedResource, DocumentReference, QuotationApi};
pub use rate_limit::OutboundRateLimiter;
