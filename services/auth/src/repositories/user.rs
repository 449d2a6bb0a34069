//! User repository for database operations

use std::sync::LazyLock;

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use sqlx::{PgExecutor, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::models::{ProviderProfile, Role, USER_COLUMNS, User};

/// Hash a password with Argon2id and a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("no account has this password").ok());

/// Run one Argon2 verification against a throwaway hash.
///
/// Used on login paths that have no stored hash, so they cost the same as a
/// wrong password.
pub fn verify_dummy_password(password: &str) -> bool {
    DUMMY_HASH
        .as_deref()
        .and_then(|hash| verify_password(hash, password).ok())
        .unwrap_or(false)
}

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a user with a password. The email is expected normalized.
    pub async fn create_with_password(
        &self,
        email: &str,
        name: Option<&str>,
        password: &str,
        role: Role,
    ) -> Result<User> {
        info!("Creating new user: {}", email);

        let password_hash = hash_password(password)?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(name)
        .bind(&password_hash)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await?;

        User::from_row(&row)
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(User::from_row).transpose()
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(User::from_row).transpose()
    }

    /// All users, newest first
    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(User::from_row).collect()
    }

    /// Change a user's role
    pub async fn update_role(&self, id: Uuid, role: Role) -> Result<Option<User>> {
        info!("Setting role of user {} to {}", id, role);

        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET role = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(User::from_row).transpose()
    }

    /// Replace a user's password
    pub async fn set_password(&self, id: Uuid, password: &str) -> Result<bool> {
        let password_hash = hash_password(password)?;
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(&password_hash)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user; accounts and sessions cascade
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        info!("Deleting user {}", id);

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Insert the provider's user or refresh name and image of an existing one.
///
/// The role and password of an existing user are left untouched.
pub async fn upsert_provider_user<'e, E>(executor: E, profile: &ProviderProfile) -> Result<User>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO users (email, name, image)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE SET
            name = COALESCE(EXCLUDED.name, users.name),
            image = COALESCE(EXCLUDED.image, users.image),
            updated_at = NOW()
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&profile.email)
    .bind(&profile.name)
    .bind(&profile.image)
    .fetch_one(executor)
    .await?;

    User::from_row(&row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse 1").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "correct horse 1").unwrap());
        assert!(!verify_password(&hash, "wrong horse 1").unwrap());
    }

    #[test]
    fn dummy_verification_never_succeeds() {
        assert!(DUMMY_HASH.is_some());
        assert!(!verify_dummy_password("correct horse 1"));
        assert!(!verify_dummy_password(""));
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("plaintext", "plaintext").is_err());
    }
}
