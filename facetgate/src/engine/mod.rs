//! Wire boundary with the Elasticsearch-compatible document-search engine

mod client;
mod mapping;
mod request;
mod response;

pub use client::{EngineReply, HttpEngine, SearchEngine};
pub use mapping::build_index_mapping;
pub use request::{
    Aggregation, AggregationKind, AutoDateHistogramAgg, BoolQuery, Clause, DateHistogramAgg,
    EmptyObject, EngineRequest, Highlight, HighlightField, HighlightOptions, NestedAgg,
    NestedClause, QueryRoot, QueryString, RangeSpec, SortClause, TermsAgg,
};
pub use response::{EngineResponse, Hit, Hits};
