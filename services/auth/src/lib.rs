//! Authentication for the estate site
//!
//! Credential signup and login, Google One-Tap and the Google code flow,
//! database-backed sessions carried in a cookie, and the session guards the
//! rest of the application mounts in front of its admin routes.

use std::sync::Arc;

use anyhow::Result;
use axum::http::HeaderMap;
use common::cache::RedisPool;
use sqlx::PgPool;
use tracing::{error, info};

pub mod error;
pub mod extract;
pub mod google;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod oauth;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod validation;

pub use error::{AuthError, AuthResult};

use crate::{
    extract::{CookieSettings, TrustedProxies, session_token},
    google::{GoogleConfig, GoogleIdTokenVerifier},
    jwt::JwtService,
    models::User,
    oauth::GoogleOAuthClient,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::UserRepository,
    session::SessionManager,
};

/// Google sign-in, present only when a client id is configured
pub struct GoogleServices {
    pub one_tap: GoogleIdTokenVerifier,
    pub oauth: GoogleOAuthClient,
    pub app_url: String,
}

/// State shared by the authentication handlers and guards
#[derive(Clone)]
pub struct AuthState {
    pub users: UserRepository,
    pub sessions: SessionManager,
    pub rate_limiter: RateLimiter,
    pub cookies: CookieSettings,
    pub trusted_proxies: TrustedProxies,
    pub google: Option<Arc<GoogleServices>>,
}

impl AuthState {
    pub fn new(
        pool: PgPool,
        jwt_service: JwtService,
        redis: RedisPool,
        google: Option<GoogleConfig>,
        cookie_secure: bool,
    ) -> Result<Self> {
        let cookies = CookieSettings {
            secure: cookie_secure,
            max_age: jwt_service.max_age(),
        };

        let google = match google {
            Some(config) => {
                info!("Google sign-in enabled");
                Some(Arc::new(GoogleServices {
                    one_tap: GoogleIdTokenVerifier::new(&config),
                    oauth: GoogleOAuthClient::new(&config, redis)?,
                    app_url: config.app_url.clone(),
                }))
            }
            None => {
                info!("Google sign-in disabled: GOOGLE_CLIENT_ID not set");
                None
            }
        };

        Ok(Self {
            users: UserRepository::new(pool.clone()),
            sessions: SessionManager::new(pool, jwt_service),
            rate_limiter: RateLimiter::new(RateLimiterConfig::default()),
            cookies,
            trusted_proxies: TrustedProxies::default(),
            google,
        })
    }

    /// Believe forwarding headers from these proxies when resolving client addresses
    pub fn with_trusted_proxies(mut self, proxies: TrustedProxies) -> Self {
        self.trusted_proxies = proxies;
        self
    }

    /// The signed-in user, if the request carries a live session.
    ///
    /// Lookup failures are logged and treated as anonymous.
    pub async fn optional_user(&self, headers: &HeaderMap) -> Option<User> {
        let token = session_token(headers)?;
        match self.sessions.authenticate(&token).await {
            Ok(user) => Some(user),
            Err(AuthError::Unauthorized) => None,
            Err(e) => {
                error!("Session lookup failed: {}", e);
                None
            }
        }
    }
}
