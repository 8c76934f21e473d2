use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// OpenSky OAuth2 token endpoint (Keycloak realm)
pub const DEFAULT_TOKEN_URL: &str =
    "https://auth.opensky-network.org/auth/realms/opensky-network/protocol/openid-connect/token";

/// Tokens are refreshed this long before they actually expire
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(30);

/// Credentials used to authenticate against the upstream API
#[derive(Clone, PartialEq, Eq)]
pub enum SourceCredentials {
    /// API client id/secret, exchanged for a short-lived bearer token
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
    /// Legacy account username/password sent as HTTP basic auth
    Basic { username: String, password: String },
    /// No credentials configured; requests are made anonymously
    Anonymous,
}

impl SourceCredentials {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceCredentials::ClientCredentials { .. } => "client_credentials",
            SourceCredentials::Basic { .. } => "basic",
            SourceCredentials::Anonymous => "anonymous",
        }
    }
}

impl std::fmt::Debug for SourceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceCredentials::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
            SourceCredentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            SourceCredentials::Anonymous => write!(f, "Anonymous"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Lifetime in seconds
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    300
}

/// A bearer token together with the instant it stops being valid
#[derive(Debug, Clone)]
pub struct BearerToken {
    pub value: String,
    pub expires_at: Instant,
}

impl BearerToken {
    pub fn new(value: String, lifetime: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + lifetime,
        }
    }

    /// A token is usable while more than `margin` of its lifetime remains
    pub fn is_usable_at(&self, now: Instant, margin: Duration) -> bool {
        now + margin < self.expires_at
    }
}

/// Lazily refreshed cache for the client-credentials bearer token
///
/// `acquire` is the only entry point: it returns the cached token while it is
/// comfortably within its lifetime and performs the credential exchange
/// otherwise.
pub struct TokenCache {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_margin: Duration,
    cached: Mutex<Option<BearerToken>>,
}

impl TokenCache {
    pub fn new(
        client: Client,
        token_url: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            client,
            token_url,
            client_id,
            client_secret,
            refresh_margin: DEFAULT_REFRESH_MARGIN,
            cached: Mutex::new(None),
        }
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Return a valid bearer token, exchanging credentials if needed
    pub async fn acquire(&self) -> Result<String> {
        // Held across the exchange so concurrent callers share one refresh
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref()
            && token.is_usable_at(Instant::now(), self.refresh_margin)
        {
            metrics::counter!("opensky.token.cache_hit_total").increment(1);
            return Ok(token.value.clone());
        }

        let token = self.exchange().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Drop the cached token, e.g. after the API rejected it
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn exchange(&self) -> Result<BearerToken> {
        debug!("Requesting OpenSky access token for client {}", self.client_id);

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .context("Failed to send token request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            metrics::counter!("opensky.token.failed_total").increment(1);
            anyhow::bail!(
                "Token exchange failed with {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            );
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        metrics::counter!("opensky.token.refreshed_total").increment(1);
        info!(
            "Obtained OpenSky access token (expires in {}s)",
            token.expires_in
        );

        Ok(BearerToken::new(
            token.access_token,
            Duration::from_secs(token.expires_in),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usable_well_before_expiry() {
        let now = Instant::now();
        let token = BearerToken {
            value: "abc".to_string(),
            expires_at: now + Duration::from_secs(1800),
        };
        assert!(token.is_usable_at(now, DEFAULT_REFRESH_MARGIN));
    }

    #[test]
    fn test_token_not_usable_inside_margin() {
        let now = Instant::now();
        let token = BearerToken {
            value: "abc".to_string(),
            expires_at: now + Duration::from_secs(20),
        };
        assert!(!token.is_usable_at(now, DEFAULT_REFRESH_MARGIN));
        assert!(token.is_usable_at(now, Duration::from_secs(5)));
    }

    #[test]
    fn test_token_response_defaults_lifetime() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"xyz","token_type":"Bearer"}"#).unwrap();
        assert_eq!(response.access_token, "xyz");
        assert_eq!(response.expires_in, 300);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = SourceCredentials::ClientCredentials {
            client_id: "tracker-api".to_string(),
            client_secret: "s3cret".to_string(),
        };
        let printed = format!("{:?}", creds);
        assert!(printed.contains("tracker-api"));
        assert!(!printed.contains("s3cret"));

        let creds = SourceCredentials::Basic {
            username: "pilot".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
