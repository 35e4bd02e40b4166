use crate::services::token::Credentials;
use std::env;
use std::time::Duration;

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    /// Base URL of the OAuth accounts service (token endpoint lives at `/api/token`)
    pub spotify_accounts_url: String,
    /// Base URL of the Web API (search lives at `/v1/search`)
    pub spotify_api_url: String,
    /// Reuse access tokens until shortly before expiry instead of granting one per search.
    pub token_cache: bool,
    pub http_timeout: Option<Duration>,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values behave like unset ones
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        // Credentials are opaque; only the empty string counts as absent
        let present = |key: &str| var(key).filter(|v| !v.is_empty());

        let token_cache = match non_empty("SPOTIFY_TOKEN_CACHE") {
            Some(value) => parse_flag(&value).ok_or_else(|| {
                anyhow::anyhow!("SPOTIFY_TOKEN_CACHE must be true or false, got {:?}", value)
            })?,
            None => false,
        };

        let http_timeout = non_empty("SPOTIFY_HTTP_TIMEOUT_SECS")
            .map(|value| {
                value.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                    anyhow::anyhow!(
                        "SPOTIFY_HTTP_TIMEOUT_SECS must be a whole number of seconds, got {:?}",
                        value
                    )
                })
            })
            .transpose()?;

        Ok(Config {
            spotify_client_id: present("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: present("SPOTIFY_CLIENT_SECRET"),
            spotify_accounts_url: trim_base_url(
                non_empty("SPOTIFY_ACCOUNTS_URL").unwrap_or_else(|| DEFAULT_ACCOUNTS_URL.to_string()),
            ),
            spotify_api_url: trim_base_url(
                non_empty("SPOTIFY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            ),
            token_cache,
            http_timeout,
            server_host: non_empty("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: non_empty("SERVER_PORT")
                .and_then(|port| port.trim().parse().ok())
                .unwrap_or(8000),
        })
    }

    /// Both halves of the client-credentials pair, or `None` if either is missing.
    pub fn spotify_credentials(&self) -> Option<Credentials> {
        match (&self.spotify_client_id, &self.spotify_client_secret) {
            (Some(id), Some(secret)) => Some(Credentials::new(id.clone(), secret.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
impl Config {
    /// Test credentials pointed at mock upstream servers.
    pub fn for_upstream(accounts_url: &str, api_url: &str) -> Self {
        Config {
            spotify_client_id: Some("test-id".to_string()),
            spotify_client_secret: Some("test-secret".to_string()),
            spotify_accounts_url: trim_base_url(accounts_url.to_string()),
            spotify_api_url: trim_base_url(api_url.to_string()),
            token_cache: false,
            http_timeout: None,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn trim_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
