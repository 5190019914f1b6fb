//! Schema migrations for identities, refresh sessions and verification codes.

use sqlx::PgPool;
use sqlx::migrate::MigrateError;

/// Apply every migration under `migrations/` that the database has not seen yet.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::debug!("Database schema is up to date");
    Ok(())
}
