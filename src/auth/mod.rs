//! Firebase ID token verification
//!
//! The core trusts the external identity service: a verified token's `sub`
//! claim is used as the customer identifier without further checks. Tokens
//! are RS256 JWTs validated against Google's published signing keys, which
//! are fetched lazily and cached by key id.

use std::collections::HashMap;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::state::AppState;

const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("unknown signing key: {0}")]
    UnknownKey(String),

    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(String),
}

/// Claims we validate from a Firebase ID token
#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// Verifier for Firebase-issued ID tokens
pub struct FirebaseAuth {
    project_id: String,
    http: reqwest::Client,
    // kid -> RSA (n, e) components
    keys: RwLock<HashMap<String, (String, String)>>,
}

impl FirebaseAuth {
    /// Create a new verifier for the given Firebase project
    pub fn new(project_id: String) -> Self {
        Self {
            project_id,
            http: reqwest::Client::new(),
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Verify an ID token and return the stable subject identifier
    pub async fn verify(&self, token: &str) -> Result<String, AuthError> {
        let header =
            decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token has no key id".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!(
            "https://securetoken.google.com/{}",
            self.project_id
        )]);

        let data = decode::<FirebaseClaims>(token, &key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(data.claims.sub)
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some((n, e)) = self.keys.read().await.get(kid) {
            return DecodingKey::from_rsa_components(n, e)
                .map_err(|e| AuthError::InvalidToken(e.to_string()));
        }

        // Key ids rotate; refresh once before giving up.
        self.refresh_keys().await?;

        match self.keys.read().await.get(kid) {
            Some((n, e)) => DecodingKey::from_rsa_components(n, e)
                .map_err(|e| AuthError::InvalidToken(e.to_string())),
            None => Err(AuthError::UnknownKey(kid.to_string())),
        }
    }

    async fn refresh_keys(&self) -> Result<(), AuthError> {
        let jwks: JwkSet = self
            .http
            .get(JWKS_URL)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        let mut keys = self.keys.write().await;
        keys.clear();
        for jwk in jwks.keys {
            keys.insert(jwk.kid, (jwk.n, jwk.e));
        }

        tracing::debug!(count = keys.len(), "refreshed Firebase signing keys");

        Ok(())
    }
}

/// Extractor yielding the verified customer id from the bearer token
pub struct AuthenticatedCustomer(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedCustomer
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized(AuthError::MissingToken.to_string()))?;

        let app_state = AppState::from_ref(state);
        let customer_id = app_state
            .firebase_auth
            .verify(bearer.token())
            .await
            .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

        Ok(AuthenticatedCustomer(customer_id))
    }
}
