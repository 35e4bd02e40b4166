use crate::config::Config;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use reqwest::{header, Client};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

const GRANT_BODY: &str = "grant_type=client_credentials";

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;
const MAX_EXPIRES_IN_SECS: i64 = 86_400;

/// Cached tokens are replaced this long before they actually expire.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Clone)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }

    /// Value for the `Authorization` header of a client-credentials grant.
    fn basic_authorization(&self) -> String {
        let encoded = STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret));
        format!("Basic {}", encoded)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// Bearer token for the Web API. Deliberately has no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: String) -> Self {
        Self(token)
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub token: AccessToken,
    pub expires_at: DateTime<Utc>,
}

impl TokenGrant {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken>;
}

/// Performs one client-credentials grant per call.
#[derive(Debug, Clone)]
pub struct ClientCredentialsFetcher {
    token_url: String,
    credentials: Option<Credentials>,
    client: Client,
}

impl ClientCredentialsFetcher {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            token_url: format!("{}/api/token", config.spotify_accounts_url),
            credentials: config.spotify_credentials(),
            client,
        }
    }

    pub async fn fetch_grant(&self) -> Result<TokenGrant> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            tracing::error!("Missing Spotify credentials");
            AppError::missing_credentials()
        })?;

        tracing::debug!("Requesting Spotify access token from {}", self.token_url);

        let response = self
            .client
            .post(&self.token_url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::AUTHORIZATION, credentials.basic_authorization())
            .body(GRANT_BODY)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Spotify token request failed: {}", e);
                AppError::Upstream("Failed to reach Spotify accounts service".to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Spotify token request failed: {} - {}", status, body);
            return Err(AppError::UpstreamAuth(status.as_u16()));
        }

        let data: TokenResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Spotify token response: {}", e);
            AppError::Upstream("Invalid response from Spotify accounts service".to_string())
        })?;

        let expires_in = data
            .expires_in
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS)
            .clamp(0, MAX_EXPIRES_IN_SECS);

        tracing::debug!("Obtained Spotify access token (expires in {}s)", expires_in);

        Ok(TokenGrant {
            token: AccessToken::new(data.access_token),
            expires_at: Utc::now() + Duration::seconds(expires_in),
        })
    }
}

#[async_trait]
impl TokenSource for ClientCredentialsFetcher {
    async fn access_token(&self) -> Result<AccessToken> {
        Ok(self.fetch_grant().await?.token)
    }
}

/// Reuses a granted token until it is about to expire.
pub struct CachedTokenSource {
    fetcher: ClientCredentialsFetcher,
    cached: Mutex<Option<TokenGrant>>,
}

impl CachedTokenSource {
    pub fn new(fetcher: ClientCredentialsFetcher) -> Self {
        Self {
            fetcher,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenSource for CachedTokenSource {
    async fn access_token(&self) -> Result<AccessToken> {
        // Held across the grant so concurrent callers wait for one refresh
        let mut cached = self.cached.lock().await;

        if let Some(grant) = cached.as_ref().filter(|grant| grant.is_fresh(Utc::now())) {
            tracing::debug!("Reusing cached Spotify access token");
            return Ok(grant.token.clone());
        }

        let grant = self.fetcher.fetch_grant().await?;
        let token = grant.token.clone();
        *cached = Some(grant);

        Ok(token)
    }
}

pub fn token_source(client: Client, config: &Config) -> Arc<dyn TokenSource> {
    let fetcher = ClientCredentialsFetcher::new(client, config);

    if config.token_cache {
        Arc::new(CachedTokenSource::new(fetcher))
    } else {
        Arc::new(fetcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // base64("test-id:test-secret")
    const TEST_BASIC: &str = "Basic dGVzdC1pZDp0ZXN0LXNlY3JldA==";

    fn fetcher_for(server: &MockServer) -> ClientCredentialsFetcher {
        let config = Config::for_upstream(&server.uri(), &server.uri());
        ClientCredentialsFetcher::new(Client::new(), &config)
    }

    async fn mount_token(server: &MockServer, token: &str, expires_in: i64, calls: u64) {
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(header_eq("authorization", TEST_BASIC))
            .and(header_eq("content-type", "application/x-www-form-urlencoded"))
            .and(body_string(GRANT_BODY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": token,
                "token_type": "Bearer",
                "expires_in": expires_in,
            })))
            .expect(calls)
            .mount(server)
            .await;
    }

    #[test]
    fn test_basic_authorization() {
        let credentials = Credentials::new("test-id".to_string(), "test-secret".to_string());
        assert_eq!(credentials.basic_authorization(), TEST_BASIC);
    }

    #[test]
    fn test_secrets_are_redacted() {
        let credentials = Credentials::new("test-id".to_string(), "test-secret".to_string());
        let token = AccessToken::new("BQDsecret".to_string());

        assert!(!format!("{:?}", credentials).contains("test-secret"));
        assert!(!format!("{:?}", token).contains("BQDsecret"));
    }

    #[test]
    fn test_grant_freshness() {
        let now = Utc::now();
        let grant = |secs| TokenGrant {
            token: AccessToken::new("t".to_string()),
            expires_at: now + Duration::seconds(secs),
        };

        assert!(grant(3600).is_fresh(now));
        assert!(!grant(REFRESH_MARGIN_SECS - 1).is_fresh(now));
        assert!(!grant(-5).is_fresh(now));
    }

    #[tokio::test]
    async fn test_fetches_token_with_client_credentials() {
        let server = MockServer::start().await;
        mount_token(&server, "token-1", 3600, 1).await;

        let grant = fetcher_for(&server).fetch_grant().await.unwrap();

        assert_eq!(grant.token.secret(), "token-1");
        assert!(grant.expires_at > Utc::now() + Duration::seconds(3500));
    }

    #[tokio::test]
    async fn test_missing_expiry_uses_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "t" })))
            .mount(&server)
            .await;

        let grant = fetcher_for(&server).fetch_grant().await.unwrap();

        assert!(grant.expires_at > Utc::now() + Duration::seconds(DEFAULT_EXPIRES_IN_SECS - 60));
    }

    #[tokio::test]
    async fn test_rejected_grant_is_upstream_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid_client" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = fetcher_for(&server).access_token().await.unwrap_err();

        assert!(matches!(err, AppError::UpstreamAuth(401)));
        assert_eq!(err.to_string(), "Failed to get Spotify access token: 401");
    }

    #[tokio::test]
    async fn test_missing_credentials_never_contacts_upstream() {
        let server = MockServer::start().await;
        mount_token(&server, "unused", 3600, 0).await;

        let mut config = Config::for_upstream(&server.uri(), &server.uri());
        config.spotify_client_secret = None;
        let fetcher = ClientCredentialsFetcher::new(Client::new(), &config);

        let err = fetcher.access_token().await.unwrap_err();

        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unparsable_token_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).access_token().await.unwrap_err();

        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_uncached_source_grants_every_time() {
        let server = MockServer::start().await;
        mount_token(&server, "token-1", 3600, 2).await;

        let config = Config::for_upstream(&server.uri(), &server.uri());
        let source = token_source(Client::new(), &config);

        source.access_token().await.unwrap();
        source.access_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_cached_source_reuses_fresh_token() {
        let server = MockServer::start().await;
        mount_token(&server, "token-1", 3600, 1).await;

        let mut config = Config::for_upstream(&server.uri(), &server.uri());
        config.token_cache = true;
        let source = token_source(Client::new(), &config);

        let first = source.access_token().await.unwrap();
        let second = source.access_token().await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_cached_source_refreshes_expiring_token() {
        let server = MockServer::start().await;
        // Inside the refresh margin, so never considered fresh
        mount_token(&server, "short-lived", 30, 2).await;

        let source = CachedTokenSource::new(fetcher_for(&server));

        source.access_token().await.unwrap();
        source.access_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_cached_source_does_not_keep_failed_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        mount_token(&server, "token-2", 3600, 1).await;

        let source = CachedTokenSource::new(fetcher_for(&server));

        let err = source.access_token().await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamAuth(401)));

        let token = source.access_token().await.unwrap();
        assert_eq!(token.secret(), "token-2");
    }

    #[tokio::test]
    async fn test_cached_source_grants_once_for_concurrent_callers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "shared", "expires_in": 3600 }))
                    .set_delay(std::time::Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let source = CachedTokenSource::new(fetcher_for(&server));

        let (first, second) = tokio::join!(source.access_token(), source.access_token());

        assert_eq!(first.unwrap().secret(), "shared");
        assert_eq!(second.unwrap().secret(), "shared");
    }
}
