//! Bearer token authentication (spec §1 "out of scope: authentication and
//! the identity provider"; spec §6 "All endpoints require a bearer token;
//! the authenticated identity yields the owner_id used for scoping").
//!
//! The identity provider itself is an external collaborator; this module
//! is only the seam that verifies its tokens and resolves the `owner_id`
//! the rest of the core scopes everything by (spec §9 Open Question: the
//! identity-provider-only model, no local user mirror).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use hx_models::OwnerId;

use crate::error::ApiError;
use crate::state::AppState;

const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Decoded bearer-token claims. Shaped after a Firebase/OIDC ID token,
/// since that is the identity-provider contract spec §1 treats as external.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub email: Option<String>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// The owner scoping every query and mutation (spec §3 "Owner").
///
/// `sub` in the token is an opaque string in the general OIDC case, not
/// necessarily a UUID, so the owner id the core actually stores is a
/// deterministic UUIDv5 derived from it — stable across requests and
/// workers without requiring a local `users` table mirror.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub owner_id: OwnerId,
    pub subject: String,
    pub email: Option<String>,
}

/// Namespace for deriving a stable owner UUID from an identity-provider
/// subject claim (spec §9 Open Question 1: "owner_id is opaque and sourced
/// from the bearer-token subject").
const OWNER_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x4d, 0x4d, 0xa8, 0x13, 0x5b, 0x57, 0x4e, 0x5b, 0x9b, 0x9d, 0x53, 0xc4, 0x1b, 0x0c, 0x77, 0x1a,
]);

impl From<TokenClaims> for AuthUser {
    fn from(claims: TokenClaims) -> Self {
        let owner_id = OwnerId::from(Uuid::new_v5(&OWNER_ID_NAMESPACE, claims.sub.as_bytes()));
        Self {
            owner_id,
            subject: claims.sub,
            email: claims.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JwkKey>,
}

#[derive(Debug, Clone, Deserialize)]
struct JwkKey {
    kid: String,
    n: String,
    e: String,
}

/// Cached set of the identity provider's public keys, refreshed on a TTL.
pub struct JwksCache {
    http: Client,
    jwks_url: String,
    issuer: String,
    audience: String,
    keys: RwLock<HashMap<String, DecodingKey>>,
    last_refresh: RwLock<Instant>,
}

impl JwksCache {
    pub async fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let jwks_url = std::env::var("AUTH_JWKS_URL").map_err(|_| "AUTH_JWKS_URL not set")?;
        let issuer = std::env::var("AUTH_ISSUER").map_err(|_| "AUTH_ISSUER not set")?;
        let audience = std::env::var("AUTH_AUDIENCE").map_err(|_| "AUTH_AUDIENCE not set")?;

        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;

        let cache = Self {
            http,
            jwks_url,
            issuer,
            audience,
            keys: RwLock::new(HashMap::new()),
            last_refresh: RwLock::new(Instant::now() - JWKS_CACHE_TTL),
        };
        cache.refresh_keys().await?;
        Ok(cache)
    }

    async fn refresh_keys(&self) -> Result<(), Box<dyn std::error::Error>> {
        debug!("refreshing identity-provider JWKS keys");
        let response = self.http.get(&self.jwks_url).send().await?;
        let jwks: JwksResponse = response.json().await?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)?;
            keys.insert(jwk.kid, key);
        }
        let count = keys.len();
        *self.keys.write().await = keys;
        *self.last_refresh.write().await = Instant::now();
        debug!(count, "refreshed JWKS keys");
        Ok(())
    }

    async fn get_key(&self, kid: &str) -> Option<DecodingKey> {
        let needs_refresh = self.last_refresh.read().await.elapsed() > JWKS_CACHE_TTL;
        if needs_refresh {
            if let Err(e) = self.refresh_keys().await {
                warn!(error = %e, "failed to refresh JWKS keys, using cached set");
            }
        }
        self.keys.read().await.get(kid).cloned()
    }

    pub async fn verify_token(&self, token: &str) -> Result<TokenClaims, ApiError> {
        let header = decode_header(token)
            .map_err(|e| ApiError::unauthorized(format!("invalid token header: {e}")))?;
        let kid = header
            .kid
            .ok_or_else(|| ApiError::unauthorized("token missing key id"))?;
        let key = self
            .get_key(&kid)
            .await
            .ok_or_else(|| ApiError::unauthorized("unknown key id"))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let token_data = decode::<TokenClaims>(token, &key, &validation)
            .map_err(|e| ApiError::unauthorized(format!("token validation failed: {e}")))?;
        Ok(token_data.claims)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("invalid Authorization header format"))?;

        let claims = state.jwks.verify_token(token).await?;
        Ok(AuthUser::from(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_subject_derives_same_owner_id() {
        let a: AuthUser = TokenClaims {
            sub: "provider|abc123".to_string(),
            email: None,
            iss: "https://idp.example".to_string(),
            aud: "heimdex".to_string(),
            iat: 0,
            exp: 0,
        }
        .into();
        let b: AuthUser = TokenClaims {
            sub: "provider|abc123".to_string(),
            email: None,
            iss: "https://idp.example".to_string(),
            aud: "heimdex".to_string(),
            iat: 0,
            exp: 0,
        }
        .into();
        assert_eq!(a.owner_id, b.owner_id);
    }

    #[test]
    fn different_subjects_derive_different_owner_ids() {
        let a: AuthUser = TokenClaims {
            sub: "a".to_string(),
            email: None,
            iss: "x".to_string(),
            aud: "y".to_string(),
            iat: 0,
            exp: 0,
        }
        .into();
        let b: AuthUser = TokenClaims {
            sub: "b".to_string(),
            email: None,
            iss: "x".to_string(),
            aud: "y".to_string(),
            iat: 0,
            exp: 0,
        }
        .into();
        assert_ne!(a.owner_id, b.owner_id);
    }
}
