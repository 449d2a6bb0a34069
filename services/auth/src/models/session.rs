//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Session row. `session_token` holds the SHA-256 digest of the issued
/// token, never the token itself.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub session_token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A freshly minted session: the row id plus the token handed to the client
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
