pub mod models;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

// Every request is a short read-modify-write of one `records` row, so a
// small pool is plenty.
const MAX_CONNECTIONS: u32 = 5;

/// Sqlite handle backing the record store.
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        // `sqlite:./data/helpdesk.db` needs ./data to exist before sqlite
        // will create the file.
        if let Some(file) = url.strip_prefix("sqlite:") {
            let file = file.split('?').next().unwrap_or(file);
            if let Some(dir) = std::path::Path::new(file).parent() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}
