//! Typed view of an engine search response

use crate::ordered::OrderedMap;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineResponse {
    #[serde(default)]
    pub hits: Hits,
    /// Raw aggregation payloads by name; interpreted by the merger
    #[serde(default)]
    pub aggregations: OrderedMap<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Hits {
    /// Passed through verbatim (a number or `{value, relation}`)
    #[serde(default)]
    pub total: Value,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: Map<String, Value>,
    #[serde(default)]
    pub highlight: Option<Value>,
}
