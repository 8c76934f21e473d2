use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::bounding_box::BoundingBox;
use crate::opensky_auth::{DEFAULT_TOKEN_URL, SourceCredentials, TokenCache};
use crate::raw_state::RawState;

pub const DEFAULT_BASE_URL: &str = "https://opensky-network.org/api";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub fn default_user_agent() -> String {
    format!(
        "SwissFlightTracker/{} (+https://opensky-network.org)",
        env!("CARGO_PKG_VERSION")
    )
}

/// Result of one snapshot fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The upstream returned at least one state vector
    States(Vec<RawState>),
    /// Nothing to ingest this cycle.
    ///
    /// Covers both "the source was reachable and no aircraft were in the box"
    /// and "the fetch failed" (network error, timeout, authentication
    /// failure, non-2xx status, undecodable body). Callers cannot currently
    /// tell the two apart.
    Empty,
}

impl FetchOutcome {
    pub fn len(&self) -> usize {
        match self {
            FetchOutcome::States(states) => states.len(),
            FetchOutcome::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_states(self) -> Vec<RawState> {
        match self {
            FetchOutcome::States(states) => states,
            FetchOutcome::Empty => Vec::new(),
        }
    }
}

/// A source of aircraft state snapshots
///
/// `fetch` never fails: every transient problem is logged and surfaces as
/// [`FetchOutcome::Empty`].
#[async_trait]
pub trait StateSource: Send + Sync {
    async fn fetch(&self, bbox: &BoundingBox) -> FetchOutcome;
}

/// Configuration for the OpenSky client
#[derive(Debug, Clone)]
pub struct OpenSkyConfig {
    /// API base URL, without trailing slash
    pub base_url: String,
    /// OAuth2 token endpoint for client credentials
    pub token_url: String,
    pub credentials: SourceCredentials,
    /// Bound on every upstream request, including the token exchange
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for OpenSkyConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            credentials: SourceCredentials::Anonymous,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: default_user_agent(),
        }
    }
}

/// `/states/all` response body
#[derive(Debug, Deserialize)]
struct StatesResponse {
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    states: Option<Vec<RawState>>,
}

enum Authentication {
    Bearer(TokenCache),
    Basic { username: String, password: String },
    Anonymous,
}

/// OpenSky Network REST client for aircraft state snapshots
pub struct OpenSkyClient {
    client: Client,
    states_url: String,
    auth: Authentication,
}

impl OpenSkyClient {
    pub fn new(config: OpenSkyConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to create HTTP client")?;

        let auth = match config.credentials {
            SourceCredentials::ClientCredentials {
                client_id,
                client_secret,
            } => {
                info!("Using OpenSky client credentials for {}", client_id);
                Authentication::Bearer(TokenCache::new(
                    client.clone(),
                    config.token_url,
                    client_id,
                    client_secret,
                ))
            }
            SourceCredentials::Basic { username, password } => {
                info!("Using legacy OpenSky basic auth for {}", username);
                Authentication::Basic { username, password }
            }
            SourceCredentials::Anonymous => {
                info!("No OpenSky credentials configured, requests will be anonymous");
                Authentication::Anonymous
            }
        };

        Ok(Self {
            client,
            states_url: format!("{}/states/all", config.base_url.trim_end_matches('/')),
            auth,
        })
    }

    /// Fetch a snapshot, surfacing every failure as an error
    async fn fetch_states(&self, bbox: &BoundingBox) -> Result<Option<Vec<RawState>>> {
        let mut request = self.client.get(&self.states_url).query(&bbox.query_params());

        request = match &self.auth {
            Authentication::Bearer(tokens) => {
                let token = tokens
                    .acquire()
                    .await
                    .context("Failed to obtain OpenSky access token")?;
                request.bearer_auth(token)
            }
            Authentication::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            Authentication::Anonymous => request,
        };

        debug!("Fetching states for bounding box {}", bbox);

        let response = request
            .send()
            .await
            .context("Failed to send request to OpenSky API")?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED
                && let Authentication::Bearer(tokens) = &self.auth
            {
                tokens.invalidate().await;
            }
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "OpenSky API error {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            );
        }

        let data: StatesResponse = response
            .json()
            .await
            .context("Failed to parse OpenSky states response")?;

        debug!(
            "OpenSky snapshot time={:?}, states={}",
            data.time,
            data.states.as_ref().map_or(0, Vec::len)
        );

        Ok(data.states)
    }
}

#[async_trait]
impl StateSource for OpenSkyClient {
    #[tracing::instrument(skip(self), fields(bbox = %bbox))]
    async fn fetch(&self, bbox: &BoundingBox) -> FetchOutcome {
        match self.fetch_states(bbox).await {
            Ok(Some(states)) if !states.is_empty() => {
                metrics::counter!("opensky.fetch.success_total").increment(1);
                info!("Fetched {} states from OpenSky", states.len());
                FetchOutcome::States(states)
            }
            Ok(_) => {
                metrics::counter!("opensky.fetch.empty_total").increment(1);
                info!("OpenSky returned no states for {}", bbox);
                FetchOutcome::Empty
            }
            Err(e) => {
                metrics::counter!("opensky.fetch.failed_total").increment(1);
                warn!("OpenSky fetch failed: {:#}", e);
                FetchOutcome::Empty
            }
        }
    }
}
