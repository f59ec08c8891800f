//! External identity provider integration.
//!
//! The backend never handles credentials. Clients obtain an access token
//! from the identity provider and send it as a bearer token; we verify it
//! against the provider's userinfo endpoint and cache verified claims with
//! a short TTL so hot clients do not hit the provider on every request.

use async_trait::async_trait;
use moka::sync::Cache;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// How long a verified token stays cached. A revoked token remains usable
/// for at most this window.
const CLAIMS_TTL: Duration = Duration::from_secs(60);

/// Claims returned by the provider for a verified access token.
#[derive(Clone, Debug, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "picture")]
    pub avatar_url: Option<String>,
}

/// Errors from token verification.
#[derive(Debug, derive_more::Display)]
pub enum IdentityError {
    /// The provider rejected the token.
    #[display(fmt = "token rejected by identity provider")]
    Rejected,
    /// The provider could not be reached or answered garbage.
    #[display(fmt = "identity provider unreachable: {}", _0)]
    Unreachable(String),
}

impl std::error::Error for IdentityError {}

/// Verifies bearer tokens. Object-safe so the app can inject either the
/// HTTP-backed provider or a fixed-claims provider in tests.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, IdentityError>;
}

/// Identity provider backed by an OIDC-style userinfo endpoint.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    userinfo_url: url::Url,
    claims_cache: Cache<String, IdentityClaims>,
}

impl HttpIdentityProvider {
    pub fn new(userinfo_url: url::Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            userinfo_url,
            claims_cache: Cache::builder()
                .time_to_live(CLAIMS_TTL)
                .max_capacity(10_000)
                .build(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, IdentityError> {
        if let Some(claims) = self.claims_cache.get(token) {
            return Ok(claims);
        }

        let response = self
            .client
            .get(self.userinfo_url.clone())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| IdentityError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdentityError::Rejected);
        }

        let claims: IdentityClaims = response
            .json()
            .await
            .map_err(|e| IdentityError::Unreachable(e.to_string()))?;

        self.claims_cache.insert(token.to_owned(), claims.clone());
        Ok(claims)
    }
}

/// Fixed-claims provider for tests and local development.
/// Knows a static set of tokens; everything else is rejected.
#[derive(Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, IdentityClaims>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, claims: IdentityClaims) -> Self {
        self.tokens.insert(token.to_owned(), claims);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, IdentityError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(IdentityError::Rejected)
    }
}
