//! Client query model, normalization and engine request building

mod builder;
mod normalizer;
mod types;

pub use builder::{
    build_base_query, build_facet_count_queries, logical_bucket_key, FacetCountRequest,
    SearchParams,
};
pub(crate) use builder::{DOCUMENTS_AGG, FILTER_AGG};
pub use normalizer::{NormalizedQuery, QueryNormalizer};
pub use types::{
    AggregationDirective, BucketOrder, FacetDirective, IndexQuery, IndexRange, SortOrder,
    TermFilter,
};
