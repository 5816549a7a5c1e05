use crate::ordered::OrderedMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Structured search request as sent by a client.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<IndexRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<IndexRange>,

    /// Field name -> accepted values, in request order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<OrderedMap<TermFilter>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_views: Option<Vec<String>>,

    /// Facet name -> order/size directive, in request order
    #[serde(
        default,
        rename = "aggs",
        alias = "aggregations",
        skip_serializing_if = "Option::is_none"
    )]
    pub aggregations: Option<OrderedMap<AggregationDirective>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IndexRange {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// Accepted values for a field: a flat list, or per sub-field lists for
/// nested fields.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TermFilter {
    Values(Vec<Value>),
    Nested(OrderedMap<Vec<Value>>),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AggregationDirective {
    Facet(FacetDirective),
    /// Sub-field name -> directive, for nested fields
    Nested(OrderedMap<FacetDirective>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FacetDirective {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<BucketOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BucketOrder {
    KeyAsc,
    KeyDesc,
    CountAsc,
    CountDesc,
}

impl BucketOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyAsc => "keyAsc",
            Self::KeyDesc => "keyDesc",
            Self::CountAsc => "countAsc",
            Self::CountDesc => "countDesc",
        }
    }

    /// Engine `order` parameter for a terms aggregation
    pub fn to_engine(&self) -> Value {
        match self {
            Self::KeyAsc => json!({"_key": "asc"}),
            Self::KeyDesc => json!({"_key": "desc"}),
            Self::CountAsc => json!({"_count": "asc"}),
            Self::CountDesc => json!({"_count": "desc"}),
        }
    }
}

impl AggregationDirective {
    /// Directive for the whole facet, or for one sub-facet of a nested facet.
    /// A flat directive on a nested facet applies to every sub-facet.
    pub fn for_sub_facet(&self, sub: Option<&str>) -> FacetDirective {
        match (self, sub) {
            (Self::Facet(d), _) => *d,
            (Self::Nested(subs), Some(sub)) => subs.get(sub).copied().unwrap_or_default(),
            (Self::Nested(_), None) => FacetDirective::default(),
        }
    }

    pub fn order(&self) -> Option<BucketOrder> {
        self.for_sub_facet(None).order
    }

    pub fn size(&self) -> Option<usize> {
        self.for_sub_facet(None).size
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

impl IndexQuery {
    pub fn directive(&self, facet: &str) -> Option<&AggregationDirective> {
        self.aggregations.as_ref().and_then(|aggs| aggs.get(facet))
    }

    /// Nothing worth recording in the query log
    pub fn is_trivial(&self) -> bool {
        self.text.as_deref().map_or(true, |t| t.trim().is_empty())
            && self.terms.as_ref().map_or(true, |t| t.is_empty())
    }
}

/// Compact `text|terms|date|range|` rendering used in query logs.
impl fmt::Display for IndexQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = &self.text {
            write!(f, "{}", text)?;
        }
        write!(f, "|")?;
        if let Some(terms) = &self.terms {
            let rendered = serde_json::to_string(terms).map_err(|_| fmt::Error)?;
            write!(f, "{}", rendered)?;
        }
        write!(f, "|")?;
        for range in [&self.date, &self.range] {
            if let Some(r) = range {
                write!(
                    f,
                    "{}:[{},{}]",
                    r.name,
                    r.from.as_deref().unwrap_or(""),
                    r.to.as_deref().unwrap_or("")
                )?;
            }
            write!(f, "|")?;
        }
        Ok(())
    }
}
