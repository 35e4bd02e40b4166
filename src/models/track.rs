use serde::{Deserialize, Serialize};

/// Placeholder used when the upstream track lists no artists.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackResult {
    pub id: String,
    pub name: String,
    pub artist: String,
    #[serde(rename = "spotifyUrl")]
    pub spotify_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub tracks: Vec<TrackResult>,
}
