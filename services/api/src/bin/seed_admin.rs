//! Create an admin user, or promote an existing one.
//!
//! ```text
//! seed-admin --email owner@example.com --password 'changeme123' --name Owner
//! ```

use anyhow::Result;
use auth::{
    models::Role,
    repositories::UserRepository,
    validation::{normalize_email, validate_email, validate_password},
};
use clap::Parser;
use common::database::{DatabaseConfig, init_pool, run_migrations};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "seed-admin", about = "Create or promote an admin user")]
struct Args {
    /// Email of the admin account
    #[arg(long, env = "ADMIN_EMAIL")]
    email: String,

    /// Password; required when the account does not exist yet
    #[arg(long, env = "ADMIN_PASSWORD")]
    password: Option<String>,

    /// Display name for a new account
    #[arg(long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let email = normalize_email(&args.email);
    validate_email(&email).map_err(anyhow::Error::msg)?;
    if let Some(password) = &args.password {
        validate_password(password).map_err(anyhow::Error::msg)?;
    }

    let pool = init_pool(&DatabaseConfig::from_env()?).await?;
    run_migrations(&pool).await?;
    let users = UserRepository::new(pool);

    match users.find_by_email(&email).await? {
        Some(user) => {
            users.update_role(user.id, Role::Admin).await?;
            if let Some(password) = &args.password {
                users.set_password(user.id, password).await?;
            }
            info!("Promoted {} to admin", email);
        }
        None => {
            let password = args
                .password
                .ok_or_else(|| anyhow::anyhow!("--password is required for a new account"))?;
            let user = users
                .create_with_password(&email, args.name.as_deref(), &password, Role::Admin)
                .await?;
            info!("Created admin {} ({})", email, user.id);
        }
    }

    Ok(())
}
