//! Google OAuth2 authorization-code flow with PKCE
//!
//! The CSRF state doubles as the Redis key under which the PKCE verifier
//! waits for the callback. It is consumed on first use.

use anyhow::Result;
use common::cache::RedisPool;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
};
use serde::Deserialize;
use tracing::{error, info};

use crate::{
    error::{AuthError, AuthResult},
    google::GoogleConfig,
    models::ProviderProfile,
    validation::normalize_email,
};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const STATE_TTL_SECONDS: u64 = 600;

fn state_key(state: &str) -> String {
    format!("oauth_state:{}", state)
}

/// Google profile as returned by the userinfo endpoint
#[derive(Debug, Deserialize)]
struct GoogleUser {
    sub: String,
    email: String,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

/// OAuth2 client for Google
#[derive(Clone)]
pub struct GoogleOAuthClient {
    client: BasicClient,
    http: reqwest::Client,
    redis: RedisPool,
}

impl GoogleOAuthClient {
    pub fn new(config: &GoogleConfig, redis: RedisPool) -> Result<Self> {
        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(GOOGLE_AUTH_URL.to_string())?,
            Some(TokenUrl::new(GOOGLE_TOKEN_URL.to_string())?),
        )
        .set_redirect_uri(RedirectUrl::new(config.redirect_url.clone())?);

        Ok(Self {
            client,
            http: reqwest::Client::new(),
            redis,
        })
    }

    /// Build the consent URL and remember the PKCE verifier for the callback
    pub async fn authorize_url(&self) -> Result<String> {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        self.redis
            .set(
                &state_key(csrf_token.secret()),
                pkce_verifier.secret(),
                STATE_TTL_SECONDS,
            )
            .await?;

        info!("Generated Google authorization URL");
        Ok(auth_url.to_string())
    }

    /// Complete the flow: check the state, exchange the code, fetch the profile
    pub async fn exchange(&self, code: &str, state: &str) -> AuthResult<ProviderProfile> {
        let verifier = self
            .redis
            .take(&state_key(state))
            .await?
            .ok_or_else(|| AuthError::InvalidToken("unknown or expired OAuth state".to_string()))?;

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(verifier))
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(|e| {
                error!("Google code exchange failed: {}", e);
                AuthError::InvalidToken("code exchange failed".to_string())
            })?;

        let access_token = token.access_token().secret().to_string();
        let response = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;

        if !response.status().is_success() {
            return Err(AuthError::Internal(anyhow::anyhow!(
                "Failed to get Google user profile: {}",
                response.status()
            )));
        }

        let google_user: GoogleUser = response
            .json()
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;

        if !google_user.email_verified {
            return Err(AuthError::InvalidToken("email not verified".to_string()));
        }

        let expires_at = token
            .expires_in()
            .and_then(|d| i64::try_from(d.as_secs()).ok())
            .map(|secs| chrono::Utc::now().timestamp() + secs);

        Ok(ProviderProfile {
            provider: "google".to_string(),
            provider_account_id: google_user.sub,
            email: normalize_email(&google_user.email),
            name: google_user.name,
            image: google_user.picture,
            access_token: Some(access_token),
            refresh_token: token.refresh_token().map(|t| t.secret().to_string()),
            expires_at,
            id_token: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_keys_are_namespaced() {
        assert_eq!(state_key("abc"), "oauth_state:abc");
    }

    #[tokio::test]
    async fn authorize_url_fails_cleanly_without_redis() {
        let redis = RedisPool::new(&common::cache::RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
        })
        .unwrap();
        let client = GoogleOAuthClient::new(
            &GoogleConfig {
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
                redirect_url: "http://localhost:3000/api/auth/callback/google".to_string(),
                app_url: "http://localhost:3000".to_string(),
                certs_url: String::new(),
            },
            redis,
        )
        .unwrap();

        assert!(client.authorize_url().await.is_err());
    }
}
