use crate::aggregations::BucketMap;
use crate::gateway::{describe_indices, SearchGateway, SearchResult};
use crate::ordered::OrderedMap;
use crate::query::{IndexQuery, SearchParams, SortOrder};
use crate::{Config, Error, IndexSpec, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const SORT_BY_SCORE: &str = "_score";
const SORT_BY_INDEX_ORDER: &str = "_doc";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<SearchGateway>,
}

/// Query-string parameters of `POST /search`; absent ones fall back to the
/// configured search defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQueryParams {
    pub index: Option<String>,
    pub from: Option<usize>,
    pub size: Option<usize>,
    pub fragment_size: Option<usize>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl SearchQueryParams {
    fn resolve(self, config: &Config, index: &IndexSpec) -> Result<SearchParams> {
        let defaults = SearchParams::from(&config.search);
        let sort_by = self.sort_by.unwrap_or(defaults.sort_by);

        if sort_by != SORT_BY_SCORE && sort_by != SORT_BY_INDEX_ORDER && !index.has_field(&sort_by) {
            return Err(Error::InvalidParam(format!(
                "sortBy: '{}' not in [{}, {}, {}]",
                sort_by,
                SORT_BY_SCORE,
                SORT_BY_INDEX_ORDER,
                index.field_names().join(", ")
            )));
        }

        Ok(SearchParams {
            from: self.from.unwrap_or(defaults.from),
            size: self.size.unwrap_or(defaults.size),
            sort_by,
            sort_order: self.sort_order.unwrap_or(defaults.sort_order),
            fragment_size: self.fragment_size.unwrap_or(defaults.fragment_size),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct IndexParam {
    pub index: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQueryParams>,
    Json(query): Json<IndexQuery>,
) -> Result<Json<SearchResult>> {
    let index = state.config.index(params.index.as_deref())?;
    let params = params.resolve(&state.config, index)?;

    if !query.is_trivial() {
        tracing::info!(index = %index.name, query = %query, "query");
    }

    let result = state.gateway.search(index, query, &params).await?;
    Ok(Json(result))
}

/// Index name -> field name -> field type
pub async fn list_indices(State(state): State<AppState>) -> Json<OrderedMap<OrderedMap<String>>> {
    Json(describe_indices(&state.config.indices))
}

pub async fn facet_overview(
    State(state): State<AppState>,
    Query(param): Query<IndexParam>,
) -> Result<Json<OrderedMap<BucketMap>>> {
    let index = state.config.index(param.index.as_deref())?;
    let overview = state.gateway.facet_overview(index).await?;
    Ok(Json(overview))
}

pub async fn create_index(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>> {
    let index = state.config.index(Some(&name))?;
    let reply = state.gateway.create_index(index).await?;
    Ok(Json(reply))
}

pub async fn delete_index(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>> {
    let index = state.config.index(Some(&name))?;
    let reply = state.gateway.delete_index(&index.name).await?;
    Ok(Json(reply))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
