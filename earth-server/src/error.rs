use std::path::PathBuf;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use earth_catalog::{IdentifierError, OptionsError};
use earth_db::{MigrationError, RepositoryError};
use thiserror::Error;

/// Errors that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid configuration value
    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] MigrationError),

    #[error("Startup task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Bind or serve failure
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Errors from a single request. Rendered as a JSON string body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Identifier(_) | Self::Options(_) => StatusCode::BAD_REQUEST,
            Self::Repository(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Repository(_) | Self::Pool(_) | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("[http] {self}");
            return (status, Json("internal server error")).into_response();
        }
        (status, Json(self.to_string())).into_response()
    }
}
