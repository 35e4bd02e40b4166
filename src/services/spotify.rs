use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{TrackResult, UNKNOWN_ARTIST};
use crate::services::TokenSource;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

/// Only the first page is ever requested.
pub const SEARCH_LIMIT: usize = 10;

pub struct SpotifyClient {
    search_url: String,
    tokens: Arc<dyn TokenSource>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    external_urls: ExternalUrls,
}

impl From<SpotifyTrack> for TrackResult {
    fn from(track: SpotifyTrack) -> Self {
        let artist = track
            .artists
            .into_iter()
            .next()
            .map(|a| a.name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        TrackResult {
            id: track.id,
            name: track.name,
            artist,
            spotify_url: track.external_urls.spotify,
        }
    }
}

impl SpotifyClient {
    pub fn new(client: Client, tokens: Arc<dyn TokenSource>, config: &Config) -> Self {
        Self {
            search_url: format!("{}/v1/search", config.spotify_api_url),
            tokens,
            client,
        }
    }

    pub async fn search_tracks(&self, query: &str) -> Result<Vec<TrackResult>> {
        let token = self.tokens.access_token().await?;
        let limit = SEARCH_LIMIT.to_string();

        tracing::debug!("Searching Spotify for: {}", query);

        let response = self
            .client
            .get(&self.search_url)
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Spotify search request failed: {}", e);
                AppError::Upstream("Failed to reach Spotify".to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Spotify search failed: {} - {}", status, body);
            return Err(AppError::UpstreamSearch(status.as_u16()));
        }

        let data: SearchResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Spotify search response: {}", e);
            AppError::Upstream("Invalid response from Spotify search".to_string())
        })?;

        tracing::debug!("Found {} tracks", data.tracks.items.len());

        Ok(data
            .tracks
            .items
            .into_iter()
            .take(SEARCH_LIMIT)
            .map(TrackResult::from)
            .collect())
    }
}
