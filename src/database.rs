use anyhow::{Context, Result};
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use std::time::Duration;
use tracing::info;

// Embed migrations into the binary
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/");

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Build the process-wide connection pool
///
/// The pool is created once at start-up and handed to every component that
/// needs the store.
pub fn create_pool(database_url: &str) -> Result<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(10)
        .connection_timeout(Duration::from_secs(10))
        .build(manager)
        .context("Failed to create PostgreSQL connection pool")
}

/// Apply any pending migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();

    let applied = tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .context("Failed to get connection for migrations")?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?
            .len();
        Ok::<usize, anyhow::Error>(applied)
    })
    .await
    .context("Migration task panicked")??;

    if applied > 0 {
        info!("Applied {} database migration(s)", applied);
    } else {
        info!("Database schema is up to date");
    }

    Ok(())
}
