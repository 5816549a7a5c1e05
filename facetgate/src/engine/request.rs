//! Search request DSL emitted towards the engine
//!
//! Only the subset the facet builder produces is modelled; every type
//! serializes to the engine's JSON shape.

use crate::ordered::OrderedMap;
use crate::query::SortOrder;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

/// Root search request body (`POST {index}/_search`)
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EngineRequest {
    #[serde(rename = "_source")]
    pub source: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_total_hits: Option<bool>,

    pub from: usize,

    pub size: usize,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortClause>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryRoot>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,

    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub aggregations: OrderedMap<Aggregation>,
}

impl EngineRequest {
    /// Request that returns no hits, only aggregations
    pub fn aggregations_only(query: Option<QueryRoot>, aggregations: OrderedMap<Aggregation>) -> Self {
        Self {
            source: false,
            track_total_hits: None,
            from: 0,
            size: 0,
            sort: Vec::new(),
            query,
            highlight: None,
            aggregations,
        }
    }
}

/// `{field: {"order": "asc"|"desc"}}`
#[derive(Debug, Clone, PartialEq)]
pub struct SortClause {
    pub field: String,
    pub order: SortOrder,
}

impl Serialize for SortClause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Order {
            order: SortOrder,
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.field, &Order { order: self.order })?;
        map.end()
    }
}

/// `{"bool": {"must": [...]}}`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryRoot {
    pub bool: BoolQuery,
}

impl QueryRoot {
    pub fn must(clauses: Vec<Clause>) -> Self {
        Self {
            bool: BoolQuery { must: clauses },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BoolQuery {
    pub must: Vec<Clause>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    Range(OrderedMap<RangeSpec>),
    Terms(OrderedMap<Vec<Value>>),
    Term(OrderedMap<Value>),
    QueryString(QueryString),
    Nested(NestedClause),
    MatchAll(EmptyObject),
}

impl Clause {
    pub fn terms(field: impl Into<String>, values: Vec<Value>) -> Self {
        let field: String = field.into();
        Self::Terms(std::iter::once((field, values)).collect())
    }

    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field: String = field.into();
        Self::Term(std::iter::once((field, value.into())).collect())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RangeSpec {
    pub relation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryString {
    pub query: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NestedClause {
    pub path: String,
    pub query: QueryRoot,
}

/// Serializes as `{}`
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct EmptyObject {}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Highlight {
    pub fields: OrderedMap<HighlightField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_query: Option<Clause>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HighlightField {
    #[serde(rename = "type")]
    pub highlighter: String,
    pub fragmenter: String,
    pub fragment_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_fragments: Option<usize>,
    pub options: HighlightOptions,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HighlightOptions {
    pub return_snippets_and_offsets: bool,
}

/// One named aggregation plus its sub-aggregations
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Aggregation {
    #[serde(flatten)]
    pub kind: AggregationKind,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub aggs: OrderedMap<Aggregation>,
}

impl Aggregation {
    pub fn new(kind: AggregationKind) -> Self {
        Self {
            kind,
            aggs: OrderedMap::new(),
        }
    }

    pub fn with_sub(mut self, name: impl Into<String>, sub: Aggregation) -> Self {
        self.aggs.insert(name, sub);
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    Terms(TermsAgg),
    AutoDateHistogram(AutoDateHistogramAgg),
    DateHistogram(DateHistogramAgg),
    Nested(NestedAgg),
    ReverseNested(EmptyObject),
    Filter(Clause),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TermsAgg {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AutoDateHistogramAgg {
    pub field: String,
    pub buckets: usize,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DateHistogramAgg {
    pub field: String,
    pub calendar_interval: String,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NestedAgg {
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_aggregation_with_sub_aggregations() {
        let agg = Aggregation::new(AggregationKind::Nested(NestedAgg {
            path: "persons".to_string(),
        }))
        .with_sub(
            "role",
            Aggregation::new(AggregationKind::Terms(TermsAgg {
                field: "persons.role".to_string(),
                size: Some(3),
                order: None,
            }))
            .with_sub(
                "documents",
                Aggregation::new(AggregationKind::ReverseNested(EmptyObject {})),
            ),
        );

        assert_eq!(
            serde_json::to_value(&agg).unwrap(),
            json!({
                "nested": {"path": "persons"},
                "aggs": {
                    "role": {
                        "terms": {"field": "persons.role", "size": 3},
                        "aggs": {"documents": {"reverse_nested": {}}}
                    }
                }
            })
        );
    }

    #[test]
    fn test_aggregations_only_request() {
        let mut aggs = OrderedMap::new();
        aggs.insert(
            "sessionWeekday",
            Aggregation::new(AggregationKind::Terms(TermsAgg {
                field: "sessionWeekday".to_string(),
                size: None,
                order: None,
            })),
        );
        let request = EngineRequest::aggregations_only(
            Some(QueryRoot::must(vec![Clause::term("a", "b")])),
            aggs,
        );

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "_source": false,
                "from": 0,
                "size": 0,
                "query": {"bool": {"must": [{"term": {"a": "b"}}]}},
                "aggregations": {"sessionWeekday": {"terms": {"field": "sessionWeekday"}}}
            })
        );
    }

    #[test]
    fn test_sort_clause_shape() {
        let sort = SortClause {
            field: "_score".to_string(),
            order: SortOrder::Desc,
        };
        assert_eq!(
            serde_json::to_value(&sort).unwrap(),
            json!({"_score": {"order": "desc"}})
        );
    }
}
