//! Search orchestration: normalize, build, execute, merge.

use crate::aggregations::{self, BucketMap, Facets};
use crate::engine::{
    Aggregation, AggregationKind, DateHistogramAgg, EngineRequest, EngineResponse, Hit,
    SearchEngine, TermsAgg,
};
use crate::index::{FieldKind, IndexSpec};
use crate::ordered::OrderedMap;
use crate::query::{
    build_base_query, build_facet_count_queries, IndexQuery, QueryNormalizer, SearchParams,
};
use crate::{Error, Result};
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

const OVERVIEW_TERMS_SIZE: usize = 100;
const OVERVIEW_DATE_INTERVAL: &str = "month";
const OVERVIEW_DATE_FORMAT: &str = "yyyy-MM";

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Engine `hits.total`, verbatim
    pub total: Value,
    pub results: Vec<HitResult>,
    pub aggs: Facets,
}

/// One hit: its id, highlight snippets and the configured fields present in
/// the source document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HitResult {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_hits", skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Value>,
    #[serde(flatten)]
    pub fields: OrderedMap<Value>,
}

impl HitResult {
    pub fn from_hit(index: &IndexSpec, hit: Hit) -> Self {
        let Hit {
            id,
            mut source,
            highlight,
        } = hit;

        let fields = index
            .fields
            .iter()
            .filter_map(|field| source.remove(&field.name).map(|value| (field.name.clone(), value)))
            .collect();

        Self {
            id,
            highlight,
            fields,
        }
    }
}

pub struct SearchGateway {
    engine: Arc<dyn SearchEngine>,
}

impl SearchGateway {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self { engine }
    }

    /// Run one faceted search: a base request for hits and facets plus one
    /// facet-count request per facet, all issued concurrently. Any failed
    /// round trip fails the whole search.
    pub async fn search(
        &self,
        index: &IndexSpec,
        query: IndexQuery,
        params: &SearchParams,
    ) -> Result<SearchResult> {
        let query = QueryNormalizer::new(index).normalize(query)?;
        let described = serde_json::to_string(&*query)?;

        let base = build_base_query(index, &query, params);
        let facet_counts = build_facet_count_queries(index, &query);

        tracing::debug!(
            index = %index.name,
            query = %*query,
            from = params.from,
            size = params.size,
            facet_counts = facet_counts.len(),
            "search"
        );

        let aux = try_join_all(
            facet_counts
                .iter()
                .map(|count| self.execute(&index.name, &count.request, &described)),
        );
        let (response, aux) = futures::try_join!(self.execute(&index.name, &base, &described), aux)?;

        let mut facets = aggregations::extract(index, &response)?;
        tracing::trace!(facets = ?facets.keys().collect::<Vec<_>>(), "base facets");

        for (count, reply) in facet_counts.iter().zip(aux) {
            let extracted = aggregations::extract(index, &reply)?;
            tracing::trace!(facet = %count.facet, found = !extracted.is_empty(), "facet count");
            aggregations::merge(&mut facets, extracted);
        }

        let aggs = aggregations::finalize(facets, index, &query);
        let EngineResponse { hits, .. } = response;
        let results = hits
            .hits
            .into_iter()
            .map(|hit| HitResult::from_hit(index, hit))
            .collect::<Vec<_>>();

        tracing::debug!(
            index = %index.name,
            results = results.len(),
            facets = aggs.len(),
            "search complete"
        );

        Ok(SearchResult {
            total: hits.total,
            results,
            aggs,
        })
    }

    /// Bucket counts over the whole index for every keyword and date field.
    /// Fields without buckets are reported empty.
    pub async fn facet_overview(&self, index: &IndexSpec) -> Result<OrderedMap<BucketMap>> {
        let aggs: OrderedMap<Aggregation> = index
            .fields
            .iter()
            .filter_map(|field| {
                let kind = match field.kind() {
                    FieldKind::Terms => AggregationKind::Terms(TermsAgg {
                        field: field.name.clone(),
                        size: Some(OVERVIEW_TERMS_SIZE),
                        order: None,
                    }),
                    FieldKind::Date => AggregationKind::DateHistogram(DateHistogramAgg {
                        field: field.name.clone(),
                        calendar_interval: OVERVIEW_DATE_INTERVAL.to_string(),
                        format: OVERVIEW_DATE_FORMAT.to_string(),
                    }),
                    _ => return None,
                };
                Some((field.name.clone(), Aggregation::new(kind)))
            })
            .collect();

        if aggs.is_empty() {
            return Ok(OrderedMap::new());
        }

        let request = EngineRequest::aggregations_only(None, aggs);
        let response = self
            .execute(&index.name, &request, &format!("facets of {}", index.name))
            .await?;
        let mut facets = aggregations::extract(index, &response)?;

        Ok(request
            .aggregations
            .keys()
            .map(|name| {
                let buckets = match facets.remove(name) {
                    Some(aggregations::FacetValue::Buckets(buckets)) => buckets,
                    _ => BucketMap::new(),
                };
                (name, buckets)
            })
            .collect())
    }

    pub async fn create_index(&self, index: &IndexSpec) -> Result<Value> {
        let reply = self.engine.create_index(index).await?;
        if !reply.is_success() {
            return Err(engine_error(reply.status, format!("create index {}", index.name), reply.body));
        }
        reply.json()
    }

    pub async fn delete_index(&self, name: &str) -> Result<Value> {
        let reply = self.engine.delete_index(name).await?;
        if !reply.is_success() {
            return Err(engine_error(reply.status, format!("delete index {}", name), reply.body));
        }
        reply.json()
    }

    async fn execute(&self, index: &str, request: &EngineRequest, query: &str) -> Result<EngineResponse> {
        tracing::trace!(
            index = %index,
            request = %serde_json::to_string(request).unwrap_or_default(),
            "engine request"
        );

        let reply = self.engine.search(index, request).await?;
        if !reply.is_success() {
            return Err(engine_error(reply.status, query.to_string(), reply.body));
        }

        tracing::trace!(index = %index, body = %reply.body, "engine response");
        reply.json()
    }
}

fn engine_error(status: u16, query: String, body: String) -> Error {
    tracing::warn!(status, query = %query, body = %body, "engine rejected request");
    Error::EngineRequest {
        status,
        query,
        body,
    }
}

/// Index name -> field name -> field type
pub fn describe_indices(indices: &[IndexSpec]) -> OrderedMap<OrderedMap<String>> {
    indices
        .iter()
        .map(|index| {
            let fields = index
                .fields
                .iter()
                .map(|field| (field.name.clone(), field.field_type.clone()))
                .collect();
            (index.name.clone(), fields)
        })
        .collect()
}
