//! Faceted search gateway in front of an Elasticsearch-compatible engine.
//!
//! A structured [`IndexQuery`] is normalized against an [`IndexSpec`], turned
//! into one base search request plus one facet-count request per facet
//! (multi-select faceting), executed against a [`SearchEngine`], and the
//! returned buckets are merged into a stable, ordered result.

pub mod aggregations;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod index;
pub mod ordered;
pub mod query;

pub use config::Config;
pub use engine::{HttpEngine, SearchEngine};
pub use error::{Error, Result};
pub use gateway::{SearchGateway, SearchResult};
pub use index::{IndexField, IndexSpec};
pub use query::{IndexQuery, QueryNormalizer, SearchParams};
