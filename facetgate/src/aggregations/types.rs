use crate::index::FieldKind;
use crate::ordered::OrderedMap;
use crate::query::{DOCUMENTS_AGG, FILTER_AGG};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bucket key -> document count, in engine-delivered order
pub type BucketMap = OrderedMap<u64>;

/// Facet name -> buckets, in output order
pub type Facets = OrderedMap<FacetValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FacetValue {
    Buckets(BucketMap),
    /// Sub-facet name -> buckets
    Nested(OrderedMap<BucketMap>),
}

impl FacetValue {
    pub fn len(&self) -> usize {
        match self {
            Self::Buckets(buckets) => buckets.len(),
            Self::Nested(subs) => subs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBucket {
    pub key: Value,
    #[serde(default)]
    pub key_as_string: Option<String>,
    #[serde(default)]
    pub doc_count: u64,
    /// Root-document count from a `reverse_nested` sub-aggregation
    #[serde(default)]
    pub documents: Option<DocCount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocCount {
    pub doc_count: u64,
}

impl RawBucket {
    pub fn display_key(&self) -> String {
        match (&self.key_as_string, &self.key) {
            (Some(key), _) => key.clone(),
            (None, Value::String(key)) => key.clone(),
            (None, key) => key.to_string(),
        }
    }

    pub fn count(&self) -> u64 {
        self.documents
            .as_ref()
            .map_or(self.doc_count, |d| d.doc_count)
    }
}

#[derive(Debug, Default, Deserialize)]
struct BucketList {
    #[serde(default)]
    buckets: Vec<RawBucket>,
}

/// One engine aggregation, interpreted once by shape.
#[derive(Debug, Clone)]
pub enum ParsedAggregation {
    Flat(Vec<RawBucket>),
    /// Sub-facet name -> buckets
    Nested(OrderedMap<Vec<RawBucket>>),
    /// Buckets found beneath a filter, under their `name@order` key
    Filtered { key: String, buckets: Vec<RawBucket> },
}

impl ParsedAggregation {
    /// Interpret `raw` according to the field kind. Unknown fields are
    /// recognised by the shape of the payload.
    pub fn parse(kind: Option<FieldKind<'_>>, raw: &Value) -> serde_json::Result<Self> {
        match kind {
            Some(FieldKind::Nested(_)) => Self::parse_nested(raw),
            Some(FieldKind::Logical(_)) => Self::parse_filtered(raw),
            Some(_) => Self::parse_flat(raw),
            None if raw.get("buckets").is_some() => Self::parse_flat(raw),
            None if raw.get(FILTER_AGG).is_some() => Self::parse_filtered(raw),
            None => Self::parse_nested(raw),
        }
    }

    fn parse_flat(raw: &Value) -> serde_json::Result<Self> {
        let list = BucketList::deserialize(raw)?;
        Ok(Self::Flat(list.buckets))
    }

    fn parse_nested(raw: &Value) -> serde_json::Result<Self> {
        let mut subs = OrderedMap::new();
        if let Some(object) = raw.as_object() {
            for (name, sub) in object {
                if name == "doc_count" || !sub.is_object() {
                    continue;
                }
                subs.insert(name.clone(), BucketList::deserialize(sub)?.buckets);
            }
        }
        Ok(Self::Nested(subs))
    }

    fn parse_filtered(raw: &Value) -> serde_json::Result<Self> {
        let inner = raw
            .get(FILTER_AGG)
            .and_then(Value::as_object)
            .and_then(|filter| {
                filter
                    .iter()
                    .find(|(name, sub)| name.as_str() != DOCUMENTS_AGG && sub.is_object())
            });

        match inner {
            Some((key, sub)) => Ok(Self::Filtered {
                key: key.clone(),
                buckets: BucketList::deserialize(sub)?.buckets,
            }),
            None => Ok(Self::Filtered {
                key: String::new(),
                buckets: Vec::new(),
            }),
        }
    }

    /// Output key and buckets. Facets without any bucket yield `None`.
    pub fn into_facet(self, name: &str) -> Option<(String, FacetValue)> {
        match self {
            Self::Flat(buckets) => {
                let map = bucket_map(&buckets);
                (!map.is_empty()).then(|| (name.to_string(), FacetValue::Buckets(map)))
            }
            Self::Nested(subs) => {
                let map: OrderedMap<BucketMap> = subs
                    .into_iter()
                    .map(|(sub, buckets)| (sub, bucket_map(&buckets)))
                    .filter(|(_, buckets)| !buckets.is_empty())
                    .collect();
                (!map.is_empty()).then(|| (name.to_string(), FacetValue::Nested(map)))
            }
            Self::Filtered { key, buckets } => {
                let map = bucket_map(&buckets);
                (!map.is_empty()).then(|| (key, FacetValue::Buckets(map)))
            }
        }
    }
}

fn bucket_map(buckets: &[RawBucket]) -> BucketMap {
    buckets.iter().map(|b| (b.display_key(), b.count())).collect()
}
