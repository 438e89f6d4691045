// Upstream session acquisition and caching
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::domain::error::GatewayError;

const SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);
const SESSION_TIMEOUT: Duration = Duration::from_secs(10);

/// How the gateway authenticates against the upstream API.
#[derive(Debug, Clone)]
pub enum AuthMode {
    ApiKey(String),
    Password { username: String, password: String },
}

/// A live credential for one upstream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    ApiKey(String),
    Session(String),
}

impl Credential {
    /// Header name/value pair the upstream expects for this credential.
    pub fn header(&self) -> (&'static str, &str) {
        match self {
            Credential::ApiKey(key) => ("x-api-key", key),
            Credential::Session(token) => ("x-metabase-session", token),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
}

/// Owns the single cached upstream credential. A static API key never
/// expires; session tokens are reused until their expiry and replaced
/// wholesale on refresh.
pub struct SessionManager {
    base_url: String,
    mode: Option<AuthMode>,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl SessionManager {
    pub fn new(base_url: String, mode: Option<AuthMode>) -> Self {
        Self {
            base_url,
            mode,
            http: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    /// Current credential, refreshing the cached session token when it is
    /// absent, expired, or a refresh is forced. On refresh failure the
    /// cached token is cleared and the error propagates.
    pub async fn credential(&self, force_refresh: bool) -> Result<Credential, GatewayError> {
        let (username, password) = match &self.mode {
            Some(AuthMode::ApiKey(key)) => return Ok(Credential::ApiKey(key.clone())),
            Some(AuthMode::Password { username, password }) => (username.clone(), password.clone()),
            None => {
                return Err(GatewayError::Auth(
                    "no username/password or API key configured".to_string(),
                ));
            }
        };

        let mut cached = self.cached.lock().await;
        if !force_refresh {
            if let Some(entry) = cached.as_ref() {
                if Instant::now() < entry.expires_at {
                    return Ok(Credential::Session(entry.token.clone()));
                }
            }
        }

        tracing::info!("authenticating with upstream at {}", self.base_url);
        match self.authenticate(&username, &password).await {
            Ok(token) => {
                *cached = Some(CachedToken {
                    token: token.clone(),
                    expires_at: Instant::now() + SESSION_TTL,
                });
                Ok(Credential::Session(token))
            }
            Err(err) => {
                *cached = None;
                Err(err)
            }
        }
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<String, GatewayError> {
        let response = self
            .http
            .post(format!("{}/api/session", self.base_url))
            .timeout(SESSION_TIMEOUT)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Auth(format!(
                "session request rejected with {status}: {body}"
            )));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Auth(e.to_string()))?;
        Ok(session.id)
    }

    #[cfg(test)]
    pub async fn seed_token(&self, token: &str, expires_at: Instant) {
        *self.cached.lock().await = Some(CachedToken {
            token: token.to_string(),
            expires_at,
        });
    }

    #[cfg(test)]
    pub async fn cached_token(&self) -> Option<String> {
        self.cached.lock().await.as_ref().map(|c| c.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password_manager(base_url: &str) -> SessionManager {
        SessionManager::new(
            base_url.to_string(),
            Some(AuthMode::Password {
                username: "user".to_string(),
                password: "pass".to_string(),
            }),
        )
    }

    #[tokio::test]
    async fn api_key_is_returned_without_any_upstream_call() {
        let manager = SessionManager::new(
            "http://127.0.0.1:1".to_string(),
            Some(AuthMode::ApiKey("mb_key".to_string())),
        );
        let credential = manager.credential(false).await.unwrap();
        assert_eq!(credential, Credential::ApiKey("mb_key".to_string()));
        assert_eq!(credential.header().0, "x-api-key");

        // Forcing a refresh is a no-op for API keys.
        assert_eq!(manager.credential(true).await.unwrap(), credential);
    }

    #[tokio::test]
    async fn missing_credentials_fail_without_an_upstream_call() {
        let manager = SessionManager::new("http://127.0.0.1:1".to_string(), None);
        assert!(matches!(
            manager.credential(false).await,
            Err(GatewayError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn fresh_cached_token_is_reused() {
        let manager = password_manager("http://127.0.0.1:1");
        manager
            .seed_token("cached", Instant::now() + Duration::from_secs(60))
            .await;

        let credential = manager.credential(false).await.unwrap();
        assert_eq!(credential, Credential::Session("cached".to_string()));
        assert_eq!(credential.header().0, "x-metabase-session");
    }

    #[tokio::test]
    async fn failed_refresh_clears_the_cached_token() {
        // Port 1 refuses connections, so the refresh attempt fails fast.
        let manager = password_manager("http://127.0.0.1:1");
        manager
            .seed_token("stale", Instant::now() - Duration::from_secs(1))
            .await;

        assert!(manager.credential(false).await.is_err());
        assert_eq!(manager.cached_token().await, None);
    }
}
