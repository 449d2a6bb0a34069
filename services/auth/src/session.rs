//! Session lifecycle: minting, resolving and revoking sessions

use anyhow::Result;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AuthError, AuthResult},
    jwt::{JwtService, token_hash},
    models::{IssuedSession, ProviderProfile, User},
    repositories::{SessionRepository, account, session, user},
};

/// Session manager backed by the `sessions` table
#[derive(Clone)]
pub struct SessionManager {
    pool: PgPool,
    jwt_service: JwtService,
    sessions: SessionRepository,
}

impl SessionManager {
    pub fn new(pool: PgPool, jwt_service: JwtService) -> Self {
        let sessions = SessionRepository::new(pool.clone());
        Self {
            pool,
            jwt_service,
            sessions,
        }
    }

    /// Session lifetime in seconds
    pub fn max_age(&self) -> u64 {
        self.jwt_service.max_age()
    }

    /// Start a session for an already authenticated user
    pub async fn create_session(&self, user: &User) -> Result<IssuedSession> {
        info!("Creating session for user: {}", user.id);

        let id = Uuid::new_v4();
        let (token, expires_at) = self.jwt_service.generate(user, id)?;
        session::insert_session(&self.pool, id, user.id, &token_hash(&token), expires_at).await?;

        Ok(IssuedSession {
            id,
            token,
            expires_at,
        })
    }

    /// Sign in through an external provider.
    ///
    /// The user upsert, the account link and the new session row are
    /// written in one transaction; if any step fails none of them persist.
    pub async fn sign_in_with_provider(
        &self,
        profile: &ProviderProfile,
    ) -> Result<(User, IssuedSession)> {
        info!(
            "Provider sign-in via {} for {}",
            profile.provider, profile.email
        );

        let mut tx = self.pool.begin().await?;

        let user = user::upsert_provider_user(&mut *tx, profile).await?;
        let account = account::upsert_account(&mut *tx, user.id, profile).await?;

        let id = Uuid::new_v4();
        let (token, expires_at) = self.jwt_service.generate(&user, id)?;
        session::insert_session(&mut *tx, id, user.id, &token_hash(&token), expires_at).await?;

        tx.commit().await?;

        info!("Linked account {} to user {}", account.id, user.id);
        Ok((
            user,
            IssuedSession {
                id,
                token,
                expires_at,
            },
        ))
    }

    /// Resolve a token to the user owning the live session it names
    pub async fn authenticate(&self, token: &str) -> AuthResult<User> {
        let claims = self.jwt_service.validate(token).map_err(|e| {
            warn!("Rejected session token: {}", e);
            AuthError::Unauthorized
        })?;

        self.sessions
            .find_user(claims.sid, &token_hash(token))
            .await?
            .filter(|user| user.id == claims.sub)
            .ok_or(AuthError::Unauthorized)
    }

    /// Revoke the session behind a token. Unknown tokens are ignored.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let deleted = self.sessions.delete_by_token(&token_hash(token)).await?;
        if deleted {
            info!("Session revoked");
        }
        Ok(deleted)
    }

    /// Drop expired session rows
    pub async fn cleanup_expired_sessions(&self) -> Result<u64> {
        let removed = self.sessions.delete_expired().await?;
        info!("Removed {} expired sessions", removed);
        Ok(removed)
    }
}
