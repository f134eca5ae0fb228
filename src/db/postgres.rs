use std::str::FromStr;
use std::time::Duration;

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};

/// Creates a PostgreSQL connection pool
///
/// `timeout` bounds both acquiring a connection and every statement run on it,
/// so a stuck database surfaces as an error instead of a hung request.
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    timeout: Duration,
) -> anyhow::Result<PgPool> {
    let options = PgConnectOptions::from_str(database_url)?
        .options([("statement_timeout", format!("{}ms", timeout.as_millis()))]);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(timeout)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
