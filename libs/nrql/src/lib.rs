//! Structured NRQL for network path trace queries.
//!
//! Queries are assembled as typed values ([`Query`], [`Condition`],
//! [`FilterExpr`]) and only turned into NRQL text by their `Display` impls,
//! so user supplied attribute names and values are always quoted and escaped
//! at the boundary.

pub mod filter;
pub mod query;
pub mod templates;
pub mod time;

pub use filter::*;
pub use query::*;
pub use time::*;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid time span {0:?}: {1}")]
    InvalidSpan(String, jiff::Error),
    #[error("time span must be positive: {0:?}")]
    NonPositiveSpan(String),
    #[error("invalid instant {0:?}: {1}")]
    InvalidInstant(String, jiff::Error),
    #[error("unknown filter operator: {0:?}")]
    UnknownOperator(String),
    #[error("unknown conjunction: {0:?}")]
    UnknownConjunction(String),
    #[error("invalid filter {0:?}: {1}")]
    InvalidFilter(String, &'static str),
}
