//! Translates a normalized query into engine requests.
//!
//! One base request carries the hits, highlights and every facet
//! aggregation. One facet-count request per facet repeats all filters except
//! that facet's own term filter, so a facet keeps reporting its sibling
//! values after one of them is selected (multi-select faceting).

use crate::config::SearchDefaults;
use crate::engine::{
    Aggregation, AggregationKind, AutoDateHistogramAgg, Clause, EmptyObject, EngineRequest,
    Highlight, HighlightField, HighlightOptions, NestedAgg, NestedClause, QueryRoot, QueryString,
    RangeSpec, SortClause, TermsAgg,
};
use crate::index::{FieldKind, IndexField, IndexSpec};
use crate::ordered::OrderedMap;
use crate::query::{
    AggregationDirective, BucketOrder, FacetDirective, IndexRange, NormalizedQuery, SortOrder,
    TermFilter,
};

const HIGHLIGHT_FIELD: &str = "text";
const DATE_BUCKETS: usize = 10;
const DATE_FORMAT: &str = "yyyy-MM-dd";
/// Sub-aggregation counting root documents per nested bucket
pub(crate) const DOCUMENTS_AGG: &str = "documents";
/// Filter aggregation wrapping a logical facet
pub(crate) const FILTER_AGG: &str = "filter";

/// Paging, sorting and highlighting for one search call
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub from: usize,
    pub size: usize,
    pub sort_by: String,
    pub sort_order: SortOrder,
    pub fragment_size: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::from(&SearchDefaults::default())
    }
}

impl From<&SearchDefaults> for SearchParams {
    fn from(defaults: &SearchDefaults) -> Self {
        Self {
            from: defaults.from,
            size: defaults.size,
            sort_by: defaults.sort_by.clone(),
            sort_order: defaults.sort_order,
            fragment_size: defaults.fragment_size,
        }
    }
}

/// Auxiliary request counting a single facet
#[derive(Debug, Clone, PartialEq)]
pub struct FacetCountRequest {
    pub facet: String,
    pub request: EngineRequest,
}

/// Name of the terms aggregation inside a logical facet's filter,
/// e.g. `personName@countDesc`
pub fn logical_bucket_key(name: &str, directive: Option<&AggregationDirective>) -> String {
    let order = directive
        .and_then(|d| d.order())
        .unwrap_or(BucketOrder::CountDesc);
    format!("{}@{}", name, order.as_str())
}

pub fn build_base_query(
    index: &IndexSpec,
    query: &NormalizedQuery,
    params: &SearchParams,
) -> EngineRequest {
    let aggregations: OrderedMap<Aggregation> = facet_fields(index, query)
        .into_iter()
        .filter_map(|field| {
            facet_aggregation(field, query.directive(&field.name)).map(|agg| (field.name.clone(), agg))
        })
        .collect();

    EngineRequest {
        source: true,
        track_total_hits: Some(true),
        from: params.from,
        size: params.size,
        sort: vec![SortClause {
            field: sort_field(index, &params.sort_by),
            order: params.sort_order,
        }],
        query: Some(QueryRoot::must(must_clauses(index, query, None))),
        highlight: query
            .text
            .as_deref()
            .map(|text| highlight(text, query.text_views.as_deref(), params.fragment_size)),
        aggregations,
    }
}

pub fn build_facet_count_queries(
    index: &IndexSpec,
    query: &NormalizedQuery,
) -> Vec<FacetCountRequest> {
    facet_fields(index, query)
        .into_iter()
        .filter_map(|field| {
            let agg = facet_aggregation(field, query.directive(&field.name))?;
            let mut aggregations = OrderedMap::new();
            aggregations.insert(field.name.clone(), agg);

            let clauses = must_clauses(index, query, Some(&field.name));
            Some(FacetCountRequest {
                facet: field.name.clone(),
                request: EngineRequest::aggregations_only(Some(QueryRoot::must(clauses)), aggregations),
            })
        })
        .collect()
}

/// Requested facets in request order, else every facet-eligible field in
/// declaration order. Unknown and text fields are skipped.
fn facet_fields<'a>(index: &'a IndexSpec, query: &NormalizedQuery) -> Vec<&'a IndexField> {
    match &query.aggregations {
        Some(requested) => requested
            .keys()
            .filter_map(|name| match index.field(name) {
                Some(field) if field.is_facet() => Some(field),
                _ => {
                    tracing::debug!(facet = %name, "requested aggregation is not a facet field, skipped");
                    None
                }
            })
            .collect(),
        None => index.facet_fields().collect(),
    }
}

fn sort_field(index: &IndexSpec, sort_by: &str) -> String {
    if sort_by == "date" && index.has_field("dateSortable") {
        "dateSortable".to_string()
    } else {
        sort_by.to_string()
    }
}

/// Filter clauses for the query, leaving out the term filter on `except`.
fn must_clauses(index: &IndexSpec, query: &NormalizedQuery, except: Option<&str>) -> Vec<Clause> {
    let mut clauses: Vec<Clause> = Vec::new();
    // (scope, fixed term) -> position of the nested clause shared by those
    // logical filters, so one entity has to match all of them
    let mut logical_groups: Vec<((&str, Option<(String, &str)>), usize)> = Vec::new();

    if let Some(terms) = &query.terms {
        for (name, filter) in terms.iter() {
            if except == Some(name) {
                continue;
            }
            let field = index.field(name);

            if let (Some(FieldKind::Logical(logical)), TermFilter::Values(values)) =
                (field.map(IndexField::kind), filter)
            {
                let group = (logical.scope.as_str(), logical.fixed_term());
                if let Some(&(_, pos)) = logical_groups.iter().find(|(key, _)| *key == group) {
                    if let Some(Clause::Nested(nested)) = clauses.get_mut(pos) {
                        nested
                            .query
                            .bool
                            .must
                            .push(Clause::terms(logical.value_field(), values.clone()));
                    }
                    continue;
                }
                logical_groups.push((group, clauses.len()));
            }

            if let Some(clause) = term_clause(field, name, filter) {
                clauses.push(clause);
            }
        }
    }

    for range in [&query.date, &query.range].into_iter().flatten() {
        clauses.push(range_clause(range));
    }

    if let Some(text) = &query.text {
        clauses.push(Clause::QueryString(QueryString {
            query: text.clone(),
            query_type: None,
        }));
    }

    clauses
}

fn term_clause(field: Option<&IndexField>, name: &str, filter: &TermFilter) -> Option<Clause> {
    let kind = field.map(IndexField::kind);

    match (kind, filter) {
        (Some(FieldKind::Logical(logical)), TermFilter::Values(values)) => {
            let mut must = Vec::new();
            if let Some((fixed_field, value)) = logical.fixed_term() {
                must.push(Clause::term(fixed_field, value));
            }
            must.push(Clause::terms(logical.value_field(), values.clone()));
            Some(Clause::Nested(NestedClause {
                path: logical.scope.clone(),
                query: QueryRoot::must(must),
            }))
        }
        (Some(FieldKind::Nested(nested)), TermFilter::Nested(subs)) => Some(nested_clause(
            &nested.from,
            subs.iter().map(|(sub, values)| (nested.sub_field(sub), values)),
        )),
        (Some(FieldKind::Nested(_)), TermFilter::Values(_))
        | (Some(FieldKind::Logical(_)), TermFilter::Nested(_)) => {
            tracing::debug!(field = %name, "term filter shape does not match field, ignored");
            None
        }
        (_, TermFilter::Values(values)) => Some(Clause::terms(name, values.clone())),
        // no nested config: the field name is the nested path
        (_, TermFilter::Nested(subs)) => Some(nested_clause(
            name,
            subs.iter().map(|(sub, values)| (format!("{}.{}", name, sub), values)),
        )),
    }
}

fn nested_clause<'a>(
    path: &str,
    subs: impl Iterator<Item = (String, &'a Vec<serde_json::Value>)>,
) -> Clause {
    let must = subs
        .map(|(field, values)| Clause::terms(field, values.clone()))
        .collect();
    Clause::Nested(NestedClause {
        path: path.to_string(),
        query: QueryRoot::must(must),
    })
}

fn range_clause(range: &IndexRange) -> Clause {
    let mut spec = OrderedMap::new();
    spec.insert(
        range.name.clone(),
        RangeSpec {
            relation: "intersects".to_string(),
            gte: range.from.clone(),
            lte: range.to.clone(),
        },
    );
    Clause::Range(spec)
}

fn highlight(text: &str, views: Option<&[String]>, fragment_size: usize) -> Highlight {
    let field = HighlightField {
        highlighter: "experimental".to_string(),
        fragmenter: "scan".to_string(),
        fragment_size,
        number_of_fragments: None,
        options: HighlightOptions {
            return_snippets_and_offsets: true,
        },
    };

    let mut fields = OrderedMap::new();
    fields.insert(HIGHLIGHT_FIELD, field.clone());
    for view in views.unwrap_or_default() {
        if !fields.contains_key(view) {
            fields.insert(view.clone(), field.clone());
        }
    }

    Highlight {
        fields,
        highlight_query: Some(Clause::QueryString(QueryString {
            query: text.to_string(),
            query_type: Some("phrase_prefix".to_string()),
        })),
    }
}

fn facet_aggregation(field: &IndexField, directive: Option<&AggregationDirective>) -> Option<Aggregation> {
    let flat = directive.map(|d| d.for_sub_facet(None)).unwrap_or_default();

    match field.kind() {
        FieldKind::Text => None,
        FieldKind::Terms => Some(terms_aggregation(&field.name, flat)),
        FieldKind::Date => Some(Aggregation::new(AggregationKind::AutoDateHistogram(
            AutoDateHistogramAgg {
                field: field.name.clone(),
                buckets: DATE_BUCKETS,
                format: DATE_FORMAT.to_string(),
            },
        ))),
        FieldKind::Nested(nested) => {
            let subs: Vec<String> = match directive {
                Some(AggregationDirective::Nested(requested)) => {
                    requested.keys().map(String::from).collect()
                }
                _ => nested.fields.clone(),
            };

            let mut agg = Aggregation::new(AggregationKind::Nested(NestedAgg {
                path: nested.from.clone(),
            }));
            for sub in subs {
                let sub_directive = directive
                    .map(|d| d.for_sub_facet(Some(&sub)))
                    .unwrap_or_default();
                let terms = terms_aggregation(&nested.sub_field(&sub), sub_directive)
                    .with_sub(DOCUMENTS_AGG, reverse_nested());
                agg = agg.with_sub(sub, terms);
            }
            Some(agg)
        }
        FieldKind::Logical(logical) => {
            let filter = match logical.fixed_term() {
                Some((fixed_field, value)) => Clause::term(fixed_field, value),
                None => Clause::MatchAll(EmptyObject {}),
            };
            let terms = terms_aggregation(&logical.value_field(), flat)
                .with_sub(DOCUMENTS_AGG, reverse_nested());
            let filtered = Aggregation::new(AggregationKind::Filter(filter))
                .with_sub(logical_bucket_key(&field.name, directive), terms);

            Some(
                Aggregation::new(AggregationKind::Nested(NestedAgg {
                    path: logical.scope.clone(),
                }))
                .with_sub(FILTER_AGG, filtered),
            )
        }
    }
}

/// Size and order are forwarded to the engine; absent ones use engine defaults.
fn terms_aggregation(field: &str, directive: FacetDirective) -> Aggregation {
    Aggregation::new(AggregationKind::Terms(TermsAgg {
        field: field.to_string(),
        size: directive.size,
        order: directive.order.map(|o| o.to_engine()),
    }))
}

fn reverse_nested() -> Aggregation {
    Aggregation::new(AggregationKind::ReverseNested(EmptyObject {}))
}
