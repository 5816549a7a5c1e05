//! Facet extraction from engine responses, multi-select merging and final
//! ordering/truncation

mod merger;
mod types;

pub use merger::{extract, finalize, merge};
pub use types::{BucketMap, DocCount, FacetValue, Facets, ParsedAggregation, RawBucket};
