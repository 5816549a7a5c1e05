use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(
        "Unknown textView(s): [{}], requested: [{}], available: [{}]",
        .unknown.join(", "),
        .requested.join(", "),
        .available.join(", ")
    )]
    UnknownView {
        unknown: Vec<String>,
        requested: Vec<String>,
        available: Vec<String>,
    },

    #[error("Query not understood: {query} (engine status {status}: {body})")]
    EngineRequest {
        status: u16,
        query: String,
        body: String,
    },

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    status: u16,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownView { .. } | Self::EngineRequest { .. } | Self::InvalidParam(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::IndexNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
            status: status.as_u16(),
        };

        (status, axum::Json(body)).into_response()
    }
}
