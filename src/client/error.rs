// src/client/error.rs
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cluster returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tls setup failed: {0}")]
    Tls(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}
