//! Session token issuance, validation and revocation
//!
//! Tokens are HS256 JWTs carrying the caller's user, organization and role.
//! Signature/expiry checks and revocation checks are separate operations:
//! [`TokenService::validate`] never consults the revocation ledger.

use crate::{
    config::SecurityConfig,
    error::AppError,
    models::{auth::RevokedToken, membership::Role},
    repository::RevocationLedger,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind as JwtErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// JWT claims for session tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,

    /// Organization the session is scoped to
    pub org_id: Uuid,

    /// Role within that organization
    pub role: Role,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,

    /// JWT ID (unique token identifier)
    pub jti: Uuid,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

/// Why a token failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("malformed token")]
    Malformed,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            JwtErrorKind::ExpiredSignature => TokenError::Expired,
            JwtErrorKind::InvalidSignature | JwtErrorKind::InvalidAlgorithm => {
                TokenError::InvalidSignature
            }
            _ => TokenError::Malformed,
        }
    }
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token service
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    ledger: Arc<dyn RevocationLedger>,
}

impl TokenService {
    /// Create token service from config
    pub fn from_config(
        config: &SecurityConfig,
        ledger: Arc<dyn RevocationLedger>,
    ) -> Result<Self, AppError> {
        let secret = config.jwt_secret.expose_secret();

        // Ensure secret is at least 32 bytes for HS256
        if secret.len() < 32 {
            return Err(AppError::Config("JWT secret too short (min 32 chars)".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::seconds(config.session_ttl_secs as i64),
            ledger,
        })
    }

    /// Session validity window
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a session token valid for the configured window from now
    pub fn issue(&self, user_id: Uuid, org_id: Uuid, role: Role) -> Result<IssuedToken, AppError> {
        self.issue_at(user_id, org_id, role, Utc::now())
    }

    /// Issue a session token as if it had been issued at `issued_at`
    pub fn issue_at(
        &self,
        user_id: Uuid,
        org_id: Uuid,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AppError> {
        let expires_at = issued_at + self.ttl;

        let claims = Claims {
            sub: user_id,
            org_id,
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!("Failed to encode session token: {:?}", e);
                AppError::Internal(format!("Failed to encode session token: {}", e))
            })?;

        Ok(IssuedToken {
            token,
            expires_at: claims.expires_at(),
        })
    }

    /// Verify signature and expiry; does not check revocation
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Record the token in the revocation ledger until its own expiry
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        // The signature must still verify; expiry is irrelevant here.
        let mut validation = self.validation.clone();
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!(reason = %TokenError::from(e), "Refusing to revoke token");
                AppError::unauthenticated("cannot revoke an unverifiable token")
            })?
            .claims;

        let entry = RevokedToken::new(token, claims.expires_at());
        self.ledger.insert_revocation(&entry).await?;

        tracing::info!(user_id = %claims.sub, jti = %claims.jti, "Session token revoked");
        Ok(())
    }

    /// Exact string lookup against the ledger
    pub async fn is_revoked(&self, token: &str) -> Result<bool, AppError> {
        self.ledger.exists(token).await
    }
}
