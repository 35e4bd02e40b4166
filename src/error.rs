use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub const MISSING_QUERY_MESSAGE: &str = "Query parameter \"q\" is required";

const SERVER_ERROR_DETAILS: &str = "Check server logs for more information";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Configuration(String),

    #[error("Failed to get Spotify access token: {0}")]
    UpstreamAuth(u16),

    #[error("Spotify search failed: {0}")]
    UpstreamSearch(u16),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Validation(String),
}

impl AppError {
    pub fn missing_credentials() -> Self {
        AppError::Configuration(
            "Spotify credentials not configured. Please set SPOTIFY_CLIENT_ID and \
             SPOTIFY_CLIENT_SECRET environment variables."
                .to_string(),
        )
    }

    pub fn missing_query() -> Self {
        AppError::Validation(MISSING_QUERY_MESSAGE.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_)
            | AppError::UpstreamAuth(_)
            | AppError::UpstreamSearch(_)
            | AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = if status.is_server_error() {
            tracing::error!("Search request failed: {}", self);
            Json(json!({
                "error": self.to_string(),
                "details": SERVER_ERROR_DETAILS,
            }))
        } else {
            Json(json!({
                "error": self.to_string(),
            }))
        };

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
