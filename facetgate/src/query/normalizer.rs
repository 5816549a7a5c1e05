use crate::index::IndexSpec;
use crate::query::{AggregationDirective, IndexQuery};
use crate::{Error, Result};
use regex::Regex;
use std::ops::Deref;
use std::sync::LazyLock;

/// Text that already names a field, e.g. `invNr:123`
static FIELD_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z]+:").expect("valid field prefix pattern"));

/// Implicit full-text field searched when no views are requested
const DEFAULT_VIEW: &str = "text";

/// An [`IndexQuery`] whose text views are resolved and whose free text has
/// been distributed over them. Only [`QueryNormalizer`] creates these, so a
/// query cannot be normalized twice.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedQuery(IndexQuery);

impl NormalizedQuery {
    pub fn into_inner(self) -> IndexQuery {
        self.0
    }
}

impl Deref for NormalizedQuery {
    type Target = IndexQuery;

    fn deref(&self) -> &IndexQuery {
        &self.0
    }
}

pub struct QueryNormalizer<'a> {
    index: &'a IndexSpec,
}

impl<'a> QueryNormalizer<'a> {
    pub fn new(index: &'a IndexSpec) -> Self {
        Self { index }
    }

    pub fn normalize(&self, query: IndexQuery) -> Result<NormalizedQuery> {
        check_sizes(&query)?;

        let available = self.index.text_fields();

        let views = match &query.text_views {
            Some(requested) => {
                let unknown: Vec<String> = requested
                    .iter()
                    .filter(|v| !available.contains(v))
                    .cloned()
                    .collect();
                if !unknown.is_empty() {
                    return Err(Error::UnknownView {
                        unknown,
                        requested: requested.clone(),
                        available,
                    });
                }
                requested.clone()
            }
            None => std::iter::once(DEFAULT_VIEW.to_string())
                .chain(available.iter().filter(|v| *v != DEFAULT_VIEW).cloned())
                .collect(),
        };

        tracing::trace!(
            available = ?available,
            requested = ?query.text_views,
            views = ?views,
            "computed views"
        );

        let text = query
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| distribute(t, &views));

        tracing::trace!(text = ?text, "computed text");

        Ok(NormalizedQuery(IndexQuery {
            text,
            text_views: Some(views),
            ..query
        }))
    }
}

/// The engine rejects `terms.size: 0`, so an empty facet cannot be requested.
fn check_sizes(query: &IndexQuery) -> Result<()> {
    let Some(aggregations) = &query.aggregations else {
        return Ok(());
    };

    for (name, directive) in aggregations.iter() {
        let zero = match directive {
            AggregationDirective::Facet(facet) => facet.size == Some(0),
            AggregationDirective::Nested(subs) => subs.values().any(|sub| sub.size == Some(0)),
        };
        if zero {
            return Err(Error::InvalidParam(format!(
                "aggs.{}: size must be at least 1",
                name
            )));
        }
    }
    Ok(())
}

fn distribute(text: &str, views: &[String]) -> String {
    if FIELD_PREFIX.is_match(text) {
        return text.to_string();
    }
    views
        .iter()
        .map(|view| format!("{}:{}", view, text))
        .collect::<Vec<_>>()
        .join(" OR ")
}
