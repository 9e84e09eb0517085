//! Setup binary - creates the schema and seeds roles, subjects, and the
//! admin user, then exits. Intended to run once before the application
//! serves traffic.

use dotenvy::dotenv;
use house_points::{
    config::database::{create_connection, create_tables, seed_roles, seed_subjects},
    core::identity::ensure_admin,
    errors::Result,
};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Non-fatal, env vars can be set externally
    dotenv().ok();

    let db = create_connection().await?;
    create_tables(&db).await?;
    seed_roles(&db).await?;
    seed_subjects(&db).await?;
    info!("Schema created; roles and subjects seeded.");

    match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
        (Ok(email), Ok(password)) => {
            let first_name = env::var("ADMIN_FIRST_NAME").unwrap_or_else(|_| "Site".to_string());
            let last_name = env::var("ADMIN_LAST_NAME").unwrap_or_else(|_| "Admin".to_string());
            let admin = ensure_admin(&db, &email, &first_name, &last_name, &password).await?;
            info!(user_id = admin.id, "Admin user is in place.");
        }
        _ => {
            warn!("ADMIN_EMAIL or ADMIN_PASSWORD not set; skipping admin seeding.");
        }
    }

    Ok(())
}
