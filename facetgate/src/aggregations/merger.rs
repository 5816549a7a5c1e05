use super::types::{BucketMap, FacetValue, Facets, ParsedAggregation};
use crate::engine::EngineResponse;
use crate::index::{FieldKind, IndexField, IndexSpec, NestedSpec};
use crate::ordered::OrderedMap;
use crate::query::{logical_bucket_key, AggregationDirective, IndexQuery};
use crate::Result;

/// Facets found in one engine response. Facets without buckets are absent.
pub fn extract(index: &IndexSpec, response: &EngineResponse) -> Result<Facets> {
    let mut facets = OrderedMap::new();

    for (name, raw) in response.aggregations.iter() {
        let kind = index.field(name).map(IndexField::kind);
        let parsed = ParsedAggregation::parse(kind, raw)?;
        match parsed.into_facet(name) {
            Some((key, value)) => {
                facets.insert(key, value);
            }
            None => tracing::trace!(facet = %name, "no buckets"),
        }
    }

    Ok(facets)
}

/// Fold facet counts from an auxiliary request into `base`. Buckets are
/// added or overwritten, never removed; unseen facets are appended.
pub fn merge(base: &mut Facets, aux: Facets) {
    for (name, value) in aux {
        let Some(existing) = base.get_mut(&name) else {
            base.insert(name, value);
            continue;
        };

        match (existing, value) {
            (FacetValue::Buckets(existing), FacetValue::Buckets(buckets)) => {
                existing.extend(buckets);
            }
            (FacetValue::Nested(existing), FacetValue::Nested(subs)) => {
                for (sub, buckets) in subs {
                    match existing.get_mut(&sub) {
                        Some(current) => current.extend(buckets),
                        None => {
                            existing.insert(sub, buckets);
                        }
                    }
                }
            }
            (existing, value) => *existing = value,
        }
    }
}

/// Order facets by the requested aggregation names, else by declared field
/// order, dropping anything else, and apply explicit `size` directives.
/// Sub-facets follow the same rule within a nested facet. Facets left
/// without buckets are absent.
pub fn finalize(mut facets: Facets, index: &IndexSpec, query: &IndexQuery) -> Facets {
    let names: Vec<&str> = match &query.aggregations {
        Some(requested) => requested.keys().collect(),
        None => index.fields.iter().map(|f| f.name.as_str()).collect(),
    };

    let mut ordered = OrderedMap::new();
    for name in names {
        let directive = query.directive(name);
        let value = facets
            .remove(name)
            .or_else(|| facets.remove(&logical_bucket_key(name, directive)));

        let Some(mut value) = value else {
            continue;
        };

        if let (FacetValue::Nested(subs), Some(FieldKind::Nested(nested))) =
            (&mut value, index.field(name).map(IndexField::kind))
        {
            order_sub_facets(subs, nested, directive);
        }
        if let Some(directive) = directive {
            truncate(&mut value, directive);
        }
        if !value.is_empty() {
            ordered.insert(name, value);
        }
    }

    if !facets.is_empty() {
        tracing::trace!(dropped = ?facets.keys().collect::<Vec<_>>(), "facets not in output order");
    }
    ordered
}

/// Requested sub-facets first, in request order, else declared sub-fields;
/// anything the engine returned beyond those keeps its place at the end.
fn order_sub_facets(
    subs: &mut OrderedMap<BucketMap>,
    nested: &NestedSpec,
    directive: Option<&AggregationDirective>,
) {
    let names: Vec<&str> = match directive {
        Some(AggregationDirective::Nested(requested)) => requested.keys().collect(),
        _ => nested.fields.iter().map(String::as_str).collect(),
    };

    let mut ordered = OrderedMap::new();
    for name in names {
        if let Some(buckets) = subs.remove(name) {
            ordered.insert(name, buckets);
        }
    }
    ordered.extend(std::mem::take(subs));
    *subs = ordered;
}

/// Keep the first `size` buckets in their current order. Nested facets lose
/// sub-facets that end up empty.
fn truncate(value: &mut FacetValue, directive: &AggregationDirective) {
    match value {
        FacetValue::Buckets(buckets) => {
            if let Some(size) = directive.size() {
                buckets.truncate(size);
            }
        }
        FacetValue::Nested(subs) => {
            for (sub, buckets) in subs.iter_mut() {
                if let Some(size) = directive.for_sub_facet(Some(sub)).size {
                    buckets.truncate(size);
                }
            }
            let empty: Vec<String> = subs
                .iter()
                .filter(|(_, buckets)| buckets.is_empty())
                .map(|(sub, _)| sub.to_string())
                .collect();
            for sub in empty {
                subs.remove(&sub);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregations::BucketMap;
    use serde_json::json;

    fn index() -> IndexSpec {
        serde_yaml::from_str(
            r#"
name: resolutions
fields:
  - name: text
    type: text
  - name: sessionDate
    type: date
  - name: sessionWeekday
  - name: propositionType
  - name: persons
    nested:
      from: persons
      fields: [name, role]
  - name: personName
    logical:
      scope: entities
      path: .name
"#,
        )
        .unwrap()
    }

    fn response(aggregations: serde_json::Value) -> EngineResponse {
        serde_json::from_value(json!({ "aggregations": aggregations })).unwrap()
    }

    fn query(aggs: serde_json::Value) -> IndexQuery {
        serde_json::from_value(json!({ "aggs": aggs })).unwrap()
    }

    fn bucket_map(pairs: &[(&str, u64)]) -> BucketMap {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn buckets(pairs: &[(&str, u64)]) -> FacetValue {
        FacetValue::Buckets(bucket_map(pairs))
    }

    fn nested(subs: Vec<(&str, BucketMap)>) -> FacetValue {
        FacetValue::Nested(subs.into_iter().collect())
    }

    #[test]
    fn test_extract_all_shapes() {
        let facets = extract(
            &index(),
            &response(json!({
                "sessionWeekday": {"buckets": [{"key": "ma", "doc_count": 4}]},
                "sessionDate": {"buckets": []},
                "persons": {"doc_count": 3, "role": {"buckets": [
                    {"key": "president", "doc_count": 3, "documents": {"doc_count": 2}}
                ]}},
                "personName": {"doc_count": 9, "filter": {"doc_count": 9, "personName@countDesc": {"buckets": [
                    {"key": "Fagel", "doc_count": 9, "documents": {"doc_count": 7}}
                ]}}}
            })),
        )
        .unwrap();

        let names: Vec<&str> = facets.keys().collect();
        assert_eq!(names, vec!["sessionWeekday", "persons", "personName@countDesc"]);
        assert_eq!(facets.get("sessionWeekday"), Some(&buckets(&[("ma", 4)])));
        assert_eq!(
            serde_json::to_value(facets.get("persons").unwrap()).unwrap(),
            json!({"role": {"president": 2}})
        );
        assert_eq!(
            facets.get("personName@countDesc"),
            Some(&buckets(&[("Fagel", 7)]))
        );
    }

    #[test]
    fn test_merge_overwrites_and_appends_buckets() {
        let mut base: Facets = [("sessionWeekday", buckets(&[("ma", 4)]))].into_iter().collect();
        let aux: Facets = [
            ("sessionWeekday", buckets(&[("di", 9), ("ma", 5), ("wo", 1)])),
            ("propositionType", buckets(&[("missive", 2)])),
        ]
        .into_iter()
        .collect();

        merge(&mut base, aux);

        assert_eq!(
            base.get("sessionWeekday"),
            Some(&buckets(&[("ma", 5), ("di", 9), ("wo", 1)]))
        );
        assert_eq!(base.get("propositionType"), Some(&buckets(&[("missive", 2)])));
    }

    #[test]
    fn test_merge_nested_sub_facets() {
        let mut base: Facets = [(
            "persons",
            nested(vec![("role", bucket_map(&[("president", 1)]))]),
        )]
        .into_iter()
        .collect();
        let aux: Facets = [(
            "persons",
            nested(vec![
                ("role", bucket_map(&[("clerk", 4), ("president", 2)])),
                ("name", bucket_map(&[("Fagel", 3)])),
            ]),
        )]
        .into_iter()
        .collect();

        merge(&mut base, aux);

        assert_eq!(
            serde_json::to_string(base.get("persons").unwrap()).unwrap(),
            r#"{"role":{"president":2,"clerk":4},"name":{"Fagel":3}}"#
        );
    }

    #[test]
    fn test_finalize_follows_requested_order_and_truncates() {
        let facets: Facets = [
            ("sessionWeekday", buckets(&[("ma", 4), ("di", 3), ("wo", 2)])),
            ("propositionType", buckets(&[("a", 5), ("b", 4), ("c", 3), ("d", 2), ("e", 1)])),
            ("sessionDate", buckets(&[("1728-01-01", 1)])),
        ]
        .into_iter()
        .collect();

        let result = finalize(
            facets,
            &index(),
            &query(json!({"propositionType": {"size": 2}, "sessionWeekday": {}})),
        );

        let names: Vec<&str> = result.keys().collect();
        assert_eq!(names, vec!["propositionType", "sessionWeekday"]);
        assert_eq!(result.get("propositionType"), Some(&buckets(&[("a", 5), ("b", 4)])));
        assert_eq!(result.get("sessionWeekday").map(FacetValue::len), Some(3));
    }

    #[test]
    fn test_finalize_defaults_to_field_order_without_truncation() {
        let facets: Facets = [
            ("propositionType", buckets(&[("a", 5)])),
            ("unconfigured", buckets(&[("x", 1)])),
            ("sessionWeekday", buckets(&[("ma", 4)])),
        ]
        .into_iter()
        .collect();

        let result = finalize(facets, &index(), &IndexQuery::default());
        let names: Vec<&str> = result.keys().collect();
        assert_eq!(names, vec!["sessionWeekday", "propositionType"]);
    }

    #[test]
    fn test_finalize_resolves_order_suffixed_keys() {
        let facets: Facets = [("personName@keyAsc", buckets(&[("Aa", 1), ("Bb", 2), ("Cc", 3)]))]
            .into_iter()
            .collect();

        let result = finalize(
            facets,
            &index(),
            &query(json!({"personName": {"order": "keyAsc", "size": 2}})),
        );
        assert_eq!(result.get("personName"), Some(&buckets(&[("Aa", 1), ("Bb", 2)])));
    }

    #[test]
    fn test_finalize_truncates_nested_per_sub_facet() {
        let facets: Facets = [(
            "persons",
            nested(vec![
                ("role", bucket_map(&[("a", 3), ("b", 2), ("c", 1)])),
                ("name", bucket_map(&[("x", 3), ("y", 2), ("z", 1)])),
            ]),
        )]
        .into_iter()
        .collect();

        let result = finalize(facets, &index(), &query(json!({"persons": {"role": {"size": 1}}})));
        assert_eq!(
            serde_json::to_string(result.get("persons").unwrap()).unwrap(),
            r#"{"role":{"a":3},"name":{"x":3,"y":2,"z":1}}"#
        );
    }

    #[test]
    fn test_finalize_orders_sub_facets_by_declaration_or_request() {
        // sub-facets as a key-sorted engine payload delivers them
        let facets = || -> Facets {
            [(
                "persons",
                nested(vec![
                    ("name", bucket_map(&[("Fagel", 2)])),
                    ("role", bucket_map(&[("president", 1)])),
                ]),
            )]
            .into_iter()
            .collect()
        };
        let index: IndexSpec = serde_yaml::from_str(
            r#"
name: resolutions
fields:
  - name: persons
    nested:
      from: persons
      fields: [role, name]
"#,
        )
        .unwrap();

        let declared = finalize(facets(), &index, &IndexQuery::default());
        let FacetValue::Nested(subs) = declared.get("persons").unwrap() else {
            panic!("expected nested facet");
        };
        assert_eq!(subs.keys().collect::<Vec<_>>(), vec!["role", "name"]);

        let requested = finalize(
            facets(),
            &index,
            &query(json!({"persons": {"name": {}, "role": {}}})),
        );
        let FacetValue::Nested(subs) = requested.get("persons").unwrap() else {
            panic!("expected nested facet");
        };
        assert_eq!(subs.keys().collect::<Vec<_>>(), vec!["name", "role"]);
    }

    #[test]
    fn test_finalize_drops_facets_truncated_to_nothing() {
        let facets: Facets = [
            ("sessionWeekday", buckets(&[("ma", 4)])),
            (
                "persons",
                nested(vec![
                    ("role", bucket_map(&[("a", 3)])),
                    ("name", bucket_map(&[("x", 3)])),
                ]),
            ),
        ]
        .into_iter()
        .collect();

        let result = finalize(
            facets,
            &index(),
            &query(json!({"sessionWeekday": {"size": 0}, "persons": {"role": {"size": 0}}})),
        );

        assert!(result.get("sessionWeekday").is_none());
        assert_eq!(
            serde_json::to_string(result.get("persons").unwrap()).unwrap(),
            r#"{"name":{"x":3}}"#
        );
    }
}
