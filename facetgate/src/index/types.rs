use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Static description of a searchable collection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexSpec {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<IndexField>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexField {
    pub name: String,

    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,

    /// Source path used when the field is filled from annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical: Option<LogicalSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<NestedSpec>,
}

fn default_field_type() -> String {
    "keyword".to_string()
}

/// A virtual field: values live inside a nested `scope`, optionally restricted
/// to entries whose `fixed.path` equals `fixed.value`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LogicalSpec {
    /// Nested collection, e.g. `entities`
    pub scope: String,
    /// Value path relative to the scope, e.g. `.name`
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed: Option<FixedValue>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FixedValue {
    /// Discriminator path relative to the scope, e.g. `.category`
    pub path: String,
    pub value: String,
}

/// A joined sub-collection faceted per sub-field.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NestedSpec {
    pub from: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// How a field participates in querying and aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind<'a> {
    Logical(&'a LogicalSpec),
    Nested(&'a NestedSpec),
    Text,
    Date,
    Terms,
}

impl LogicalSpec {
    /// Fully qualified value field, e.g. `entities.name`
    pub fn value_field(&self) -> String {
        join_path(&self.scope, &self.path)
    }

    /// Fully qualified discriminator field and its required value.
    pub fn fixed_term(&self) -> Option<(String, &str)> {
        self.fixed
            .as_ref()
            .map(|f| (join_path(&self.scope, &f.path), f.value.as_str()))
    }
}

impl NestedSpec {
    pub fn sub_field(&self, name: &str) -> String {
        join_path(&self.from, name)
    }
}

fn join_path(base: &str, rel: &str) -> String {
    format!("{}.{}", base, rel.trim_start_matches('.'))
}

impl IndexField {
    pub fn kind(&self) -> FieldKind<'_> {
        if let Some(logical) = &self.logical {
            return FieldKind::Logical(logical);
        }
        if let Some(nested) = &self.nested {
            return FieldKind::Nested(nested);
        }
        match self.field_type.as_str() {
            "text" => FieldKind::Text,
            "date" => FieldKind::Date,
            _ => FieldKind::Terms,
        }
    }

    pub fn is_text(&self) -> bool {
        self.field_type == "text"
    }

    /// Text fields are searched, not faceted.
    pub fn is_facet(&self) -> bool {
        !matches!(self.kind(), FieldKind::Text)
    }
}

impl IndexSpec {
    pub fn field(&self, name: &str) -> Option<&IndexField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Names of the fields a free-text query may be distributed over.
    pub fn text_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.is_text())
            .map(|f| f.name.clone())
            .collect()
    }

    pub fn facet_fields(&self) -> impl Iterator<Item = &IndexField> {
        self.fields.iter().filter(|f| f.is_facet())
    }

    /// Report modelling problems. Loading does not reject on these.
    pub fn lint(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                issues.push(format!("duplicate field '{}'", field.name));
            }

            let shapes = [
                field.path.is_some(),
                field.logical.is_some(),
                field.nested.is_some(),
            ]
            .iter()
            .filter(|set| **set)
            .count();
            if shapes > 1 {
                issues.push(format!(
                    "field '{}' sets more than one of path/logical/nested",
                    field.name
                ));
            }

            if let Some(nested) = &field.nested {
                if nested.fields.is_empty() {
                    issues.push(format!("nested field '{}' declares no sub-fields", field.name));
                }
            }
        }

        issues
    }
}
