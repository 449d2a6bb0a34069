//! Provider account links

use anyhow::Result;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{Account, ProviderProfile};

/// Link `user_id` to the provider identity, refreshing stored tokens when
/// the link already exists.
pub async fn upsert_account<'e, E>(
    executor: E,
    user_id: Uuid,
    profile: &ProviderProfile,
) -> Result<Account>
where
    E: PgExecutor<'e>,
{
    let account = sqlx::query_as::<_, Account>(
        r#"
        INSERT INTO accounts
            (user_id, provider, provider_account_id, access_token, refresh_token, expires_at, id_token)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (provider, provider_account_id) DO UPDATE SET
            access_token = COALESCE(EXCLUDED.access_token, accounts.access_token),
            refresh_token = COALESCE(EXCLUDED.refresh_token, accounts.refresh_token),
            expires_at = COALESCE(EXCLUDED.expires_at, accounts.expires_at),
            id_token = COALESCE(EXCLUDED.id_token, accounts.id_token)
        RETURNING id, user_id, provider, provider_account_id, access_token, refresh_token,
                  expires_at, id_token, created_at
        "#,
    )
    .bind(user_id)
    .bind(&profile.provider)
    .bind(&profile.provider_account_id)
    .bind(&profile.access_token)
    .bind(&profile.refresh_token)
    .bind(profile.expires_at)
    .bind(&profile.id_token)
    .fetch_one(executor)
    .await?;

    Ok(account)
}
