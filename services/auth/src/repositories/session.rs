//! Session rows

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{Session, User};

/// Insert a session row
pub async fn insert_session<'e, E>(
    executor: E,
    id: Uuid,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<Session>
where
    E: PgExecutor<'e>,
{
    let session = sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO sessions (id, session_token, user_id, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, session_token, user_id, expires_at, created_at
        "#,
    )
    .bind(id)
    .bind(token_hash)
    .bind(user_id)
    .bind(expires_at)
    .fetch_one(executor)
    .await?;

    Ok(session)
}

/// Session repository
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load the owner of a live session
    pub async fn find_user(&self, session_id: Uuid, token_hash: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.email, u.name, u.password_hash, u.role, u.image,
                   u.created_at, u.updated_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.id = $1 AND s.session_token = $2 AND s.expires_at > NOW()
            "#,
        )
        .bind(session_id)
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(User::from_row).transpose()
    }

    /// Delete the session carrying this token digest
    pub async fn delete_by_token(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE session_token = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove sessions past their expiry
    pub async fn delete_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
