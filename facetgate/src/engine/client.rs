use crate::config::EngineConfig;
use crate::engine::{build_index_mapping, EngineRequest};
use crate::index::IndexSpec;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Status and body of one engine round trip.
///
/// Non-success statuses are returned, not raised, so the caller can attach
/// its own query context when reporting them.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineReply {
    pub status: u16,
    pub body: String,
}

impl EngineReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// The external document-search engine.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// `POST {index}/_search`
    async fn search(&self, index: &str, request: &EngineRequest) -> Result<EngineReply>;

    /// `PUT {index}` with a mapping derived from the spec
    async fn create_index(&self, spec: &IndexSpec) -> Result<EngineReply>;

    /// `DELETE {index}`
    async fn delete_index(&self, index: &str) -> Result<EngineReply>;
}

/// Engine reached over HTTP. Timeouts are the only cancellation mechanism.
pub struct HttpEngine {
    client: Client,
    url: String,
}

impl HttpEngine {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: config.uri.trim_end_matches('/').to_string(),
        })
    }

    async fn reply(response: reqwest::Response) -> Result<EngineReply> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(EngineReply { status, body })
    }
}

#[async_trait]
impl SearchEngine for HttpEngine {
    async fn search(&self, index: &str, request: &EngineRequest) -> Result<EngineReply> {
        let response = self
            .client
            .post(format!("{}/{}/_search", self.url, index))
            .json(request)
            .send()
            .await?;

        Self::reply(response).await
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<EngineReply> {
        let mapping = build_index_mapping(spec);
        tracing::info!(index = %spec.name, mapping = %mapping, "creating index");

        let response = self
            .client
            .put(format!("{}/{}", self.url, spec.name))
            .json(&mapping)
            .send()
            .await?;

        let reply = Self::reply(response).await?;
        tracing::info!(index = %spec.name, status = reply.status, body = %reply.body, "create index");
        Ok(reply)
    }

    async fn delete_index(&self, index: &str) -> Result<EngineReply> {
        tracing::warn!(index = %index, "deleting index");

        let response = self
            .client
            .delete(format!("{}/{}", self.url, index))
            .send()
            .await?;

        let reply = Self::reply(response).await?;
        tracing::info!(index = %index, status = reply.status, body = %reply.body, "delete index");
        Ok(reply)
    }
}
