use futures::future::BoxFuture;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::KeyValueStore;

/// Key-value rows in the `kv_store` table.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> eyre::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| eyre::eyre!("Failed to connect to database: {}", e))?;

        tracing::info!("Connected to PostgreSQL");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| eyre::eyre!("Failed to run migrations: {}", e))?;

        tracing::info!("Database migrations complete");
        Ok(Self { pool })
    }
}

impl KeyValueStore for PgStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, eyre::Result<Option<String>>> {
        Box::pin(async move {
            let row: Option<(String,)> =
                sqlx::query_as("SELECT value FROM kv_store WHERE key = $1")
                    .bind(key)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row.map(|(value,)| value))
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, eyre::Result<()>> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO kv_store (key, value, updated_at)
                 VALUES ($1, $2, NOW())
                 ON CONFLICT (key) DO UPDATE
                 SET value = $2, updated_at = NOW()",
            )
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, eyre::Result<()>> {
        Box::pin(async move {
            sqlx::query("DELETE FROM kv_store WHERE key = $1")
                .bind(key)
                .execute(&self.pool)
                .await?;
            Ok(())
        })
    }
}
