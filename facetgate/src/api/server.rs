use crate::api::routes::{self, AppState};
use crate::config::CorsConfig;
use crate::gateway::SearchGateway;
use crate::{Config, Error, Result};
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct ApiServer {
    config: Arc<Config>,
    gateway: Arc<SearchGateway>,
}

impl ApiServer {
    pub fn new(config: Arc<Config>, gateway: Arc<SearchGateway>) -> Self {
        Self { config, gateway }
    }

    fn build_cors_layer(cors_config: &CorsConfig) -> CorsLayer {
        if !cors_config.enabled {
            return CorsLayer::new();
        }

        let origins: Vec<HeaderValue> = cors_config
            .origins
            .iter()
            .filter(|o| o.as_str() != "*")
            .filter_map(|o| o.parse().ok())
            .collect();

        let has_wildcard = cors_config.origins.iter().any(|o| o == "*");

        let cors = if has_wildcard {
            CorsLayer::new().allow_origin(tower_http::cors::Any)
        } else if origins.is_empty() {
            CorsLayer::new()
        } else {
            CorsLayer::new().allow_origin(origins)
        };

        cors.allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(tower_http::cors::Any)
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            config: self.config.clone(),
            gateway: self.gateway.clone(),
        };

        Router::new()
            .route("/search", post(routes::search))
            .route("/indices", get(routes::list_indices))
            .route(
                "/indices/:name",
                put(routes::create_index).delete(routes::delete_index),
            )
            .route("/facets", get(routes::facet_overview))
            .route("/health", get(routes::health))
            .with_state(state)
            .layer(Self::build_cors_layer(&self.config.server.cors))
            .layer(TraceLayer::new_for_http())
    }

    pub async fn serve(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, self.router())
            .await
            .map_err(Error::Io)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineReply, EngineRequest, SearchEngine};
    use crate::IndexSpec;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct EmptyEngine;

    #[async_trait]
    impl SearchEngine for EmptyEngine {
        async fn search(&self, _index: &str, _request: &EngineRequest) -> Result<EngineReply> {
            Ok(EngineReply {
                status: 200,
                body: json!({"hits": {"total": {"value": 0, "relation": "eq"}, "hits": []}})
                    .to_string(),
            })
        }

        async fn create_index(&self, _spec: &IndexSpec) -> Result<EngineReply> {
            Ok(EngineReply {
                status: 200,
                body: r#"{"acknowledged":true}"#.to_string(),
            })
        }

        async fn delete_index(&self, _index: &str) -> Result<EngineReply> {
            Ok(EngineReply {
                status: 200,
                body: r#"{"acknowledged":true}"#.to_string(),
            })
        }
    }

    fn router() -> Router {
        let config: Config = toml::from_str(
            r#"
[[indices]]
name = "resolutions"

[[indices.fields]]
name = "text"
type = "text"

[[indices.fields]]
name = "sessionWeekday"
"#,
        )
        .unwrap();

        ApiServer::new(
            Arc::new(config),
            Arc::new(SearchGateway::new(Arc::new(EmptyEngine))),
        )
        .router()
    }

    async fn call(method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let resp = router().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_search_route() {
        let (status, body) = call("POST", "/search?size=5&sortOrder=asc", json!({"text": "paard"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], json!({"value": 0, "relation": "eq"}));
        assert_eq!(body["results"], json!([]));
        assert_eq!(body["aggs"], json!({}));
    }

    #[tokio::test]
    async fn test_search_rejects_unknown_sort_field() {
        let (status, body) = call("POST", "/search?sortBy=nope", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert!(body["error"].as_str().unwrap().contains("sortBy"));
    }

    #[tokio::test]
    async fn test_search_rejects_unknown_view() {
        let (status, body) = call("POST", "/search", json!({"textViews": ["x"]})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("available: [text]"));
    }

    #[tokio::test]
    async fn test_unknown_index_is_not_found() {
        let (status, _) = call("POST", "/search?index=letters", json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call("DELETE", "/indices/letters", Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_index_routes() {
        let (status, body) = call("GET", "/indices", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"resolutions": {"text": "text", "sessionWeekday": "keyword"}})
        );

        let (status, body) = call("PUT", "/indices/resolutions", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["acknowledged"], true);

        let (status, _) = call("GET", "/facets", Value::Null).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call("GET", "/health", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
    }
}
