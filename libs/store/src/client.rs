use std::str::FromStr;

use eyre::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

#[derive(Clone)]
pub struct Client {
    pool: SqlitePool,
}

impl Client {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = if database_url.contains(":memory:") {
            // Every connection to `:memory:` is a separate database; pin a single one.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().max_connections(5).connect_with(options).await?
        };

        Ok(Self { pool })
    }

    pub async fn init(database_url: &str) -> Result<Self> {
        let client = Client::new(database_url).await?;

        // Create tables on startup
        sqlx::raw_sql(include_str!("../resources/create_tables.sql"))
            .execute(client.pool())
            .await?;

        Ok(client)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
