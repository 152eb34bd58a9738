use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use sqlx::postgres::PgPoolOptions;
use tokio::fs;

pub type DbPool = sqlx::PgPool;
pub type OrmConn = DatabaseConnection;

const MIGRATIONS_DIR: &str = "migrations";

/// sqlx pool for the raw audit inserts.
pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connecting sqlx pool")
}

/// SeaORM connection used by the repositories and units of work.
pub async fn create_orm_conn(database_url: &str) -> Result<OrmConn> {
    let mut options = ConnectOptions::new(database_url);
    options.max_connections(20).sqlx_logging(false);
    Database::connect(options)
        .await
        .context("connecting SeaORM")
}

/// Apply every `*.sql` file under `migrations/` in filename order. Files are written
/// idempotently (`IF NOT EXISTS`), so re-running on startup is safe.
pub async fn run_migrations(conn: &OrmConn) -> Result<()> {
    let files = migration_files(Path::new(MIGRATIONS_DIR)).await?;
    let backend = conn.get_database_backend();

    for file in &files {
        let sql = fs::read_to_string(file)
            .await
            .with_context(|| format!("reading {}", file.display()))?;
        let statements = split_statements(&sql);
        tracing::debug!(file = %file.display(), statements = statements.len(), "applying migration");

        for stmt in statements {
            conn.execute(Statement::from_string(backend, stmt))
                .await
                .with_context(|| format!("migration {} failed", file.display()))?;
        }
    }

    tracing::info!(count = files.len(), "migrations applied");
    Ok(())
}

async fn migration_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("opening {}", dir.display()))?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

// Prepared statements on Postgres hold a single command each.
fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty())
        .map(|stmt| format!("{stmt};"))
        .collect()
}
