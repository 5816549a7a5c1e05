use crate::index::{FieldKind, IndexSpec};
use serde_json::{json, Map, Value};

/// Index creation body (`PUT {index}`) derived from an index spec.
///
/// The implicit `text` field is always present, analyzed with a lowercase
/// analyzer and stored with offsets so highlights can return them.
pub fn build_index_mapping(spec: &IndexSpec) -> Value {
    let mut properties = Map::new();
    properties.insert(
        "text".to_string(),
        json!({
            "type": "text",
            "fields": {
                "tokenCount": {
                    "type": "token_count",
                    "analyzer": "fulltext_analyzer"
                }
            },
            "index_options": "offsets",
            "analyzer": "fulltext_analyzer"
        }),
    );

    for field in &spec.fields {
        match field.kind() {
            FieldKind::Nested(nested) => {
                let sub: Map<String, Value> = nested
                    .fields
                    .iter()
                    .map(|name| (name.clone(), json!({"type": "keyword"})))
                    .collect();
                properties.insert(
                    nested.from.clone(),
                    json!({"type": "nested", "properties": sub}),
                );
            }
            FieldKind::Logical(logical) => {
                // virtual: only the scope it lives in needs a mapping
                properties
                    .entry(logical.scope.clone())
                    .or_insert_with(|| json!({"type": "nested"}));
            }
            _ => {
                properties
                    .entry(field.name.clone())
                    .or_insert_with(|| json!({"type": field.field_type}));
            }
        }
    }

    json!({
        "mappings": {"properties": properties},
        "settings": {
            "analysis": {
                "analyzer": {
                    "fulltext_analyzer": {
                        "type": "custom",
                        "tokenizer": "standard",
                        "filter": ["lowercase"]
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_covers_all_field_shapes() {
        let spec: IndexSpec = serde_yaml::from_str(
            r#"
name: resolutions
fields:
  - name: sessionDate
    type: date
  - name: sessionWeekday
  - name: summary
    type: text
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
        .unwrap();

        let mapping = build_index_mapping(&spec);
        let props = &mapping["mappings"]["properties"];

        assert_eq!(props["text"]["index_options"], "offsets");
        assert_eq!(props["sessionDate"]["type"], "date");
        assert_eq!(props["sessionWeekday"]["type"], "keyword");
        assert_eq!(props["summary"]["type"], "text");
        assert_eq!(props["persons"]["type"], "nested");
        assert_eq!(props["persons"]["properties"]["role"]["type"], "keyword");
        assert_eq!(props["entities"]["type"], "nested");
        assert!(props.get("personName").is_none());
        assert_eq!(
            mapping["settings"]["analysis"]["analyzer"]["fulltext_analyzer"]["filter"][0],
            "lowercase"
        );
    }
}
