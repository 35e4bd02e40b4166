use crate::api::cors::preflight;
use crate::config::Config;
use crate::error::AppError;
use crate::models::{SearchParams, SearchResponse};
use crate::services::{http_client, token_source, SpotifyClient};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{Method, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

pub struct AppState {
    pub spotify: Arc<SpotifyClient>,
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = http_client(config)?;
        let tokens = token_source(client.clone(), config);

        Ok(AppState {
            spotify: Arc::new(SpotifyClient::new(client, tokens, config)),
        })
    }
}

/// Answers every path not claimed by another route, like the deployed edge function.
pub fn search_routes() -> Router<Arc<AppState>> {
    Router::new().fallback(search_or_preflight)
}

async fn search_or_preflight(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    pairs: QueryPairs,
) -> Response {
    if method == Method::OPTIONS {
        return preflight().await.into_response();
    }

    tracing::info!("Spotify search called: {} {}", method, uri.path());

    search_tracks(&state, pairs).await.into_response()
}

async fn search_tracks(
    state: &AppState,
    pairs: QueryPairs,
) -> crate::error::Result<Json<SearchResponse>> {
    let Query(pairs) = pairs.map_err(|e| {
        tracing::warn!("Rejected query string: {}", e);
        AppError::missing_query()
    })?;

    let params = SearchParams::from_pairs(pairs);
    params.validate().map_err(|_| {
        tracing::warn!("Missing query parameter");
        AppError::missing_query()
    })?;

    let query = params.q.ok_or_else(AppError::missing_query)?;
    let tracks = state.spotify.search_tracks(&query).await?;

    tracing::info!("Returning {} formatted tracks", tracks.len());

    Ok(Json(SearchResponse { tracks }))
}
