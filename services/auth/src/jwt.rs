//! Session token signing and verification
//!
//! Session tokens are HS256 JWTs. Each one names the session row it was
//! issued for (`sid`), so revoking the row revokes the token even before it
//! expires.

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::User;

/// Session token configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret for signing tokens
    pub secret: String,
    /// Session lifetime in seconds (default: 30 days)
    pub session_max_age: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: signing secret (required, at least 32 bytes)
    /// - `SESSION_MAX_AGE`: session lifetime in seconds (default: 2592000)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        if secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 bytes long");
        }

        let session_max_age = std::env::var("SESSION_MAX_AGE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30 * 24 * 60 * 60);

        Ok(JwtConfig {
            secret,
            session_max_age,
        })
    }
}

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Session row ID
    pub sid: Uuid,
    /// Role at issue time; authorization re-reads it from the database
    pub role: String,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

/// Signs and verifies session tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    max_age: u64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        JwtService {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            max_age: config.session_max_age,
        }
    }

    /// Session lifetime in seconds
    pub fn max_age(&self) -> u64 {
        self.max_age
    }

    /// Issue a token for `user` bound to the session row `session_id`
    pub fn generate(&self, user: &User, session_id: Uuid) -> Result<(String, DateTime<Utc>)> {
        let now = Utc::now().timestamp();
        let exp = now + i64::try_from(self.max_age)?;

        let claims = Claims {
            sub: user.id,
            sid: session_id,
            role: user.role.as_str().to_string(),
            iat: now,
            exp,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        let expires_at = Utc
            .timestamp_opt(exp, 0)
            .single()
            .ok_or_else(|| anyhow::anyhow!("Session expiry out of range"))?;

        Ok((token, expires_at))
    }

    /// Validate a token's signature and expiry and return its claims
    pub fn validate(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

/// Digest stored in place of the token
pub fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
