//! Connection handling and schema management

use crate::error::StoreError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Tables underlying the directory and the catalog.
///
/// `user_skills.updated_at` is a microsecond Unix timestamp; it orders the
/// update feed and is refreshed on every upsert.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT NOT NULL UNIQUE,
    name          TEXT NOT NULL,
    password      TEXT NOT NULL,
    address       TEXT,
    diploma       TEXT,
    phone         TEXT,
    employee_date TEXT,
    manager_id    INTEGER REFERENCES users(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS skills (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS user_skills (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    skill_id   INTEGER NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
    interested INTEGER NOT NULL,
    level      INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (user_id, skill_id)
);

CREATE TABLE IF NOT EXISTS roles (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, role_id)
);
";

/// Handle on the relational store shared by
/// [`UserDirectory`](crate::UserDirectory) and
/// [`SkillCatalog`](crate::SkillCatalog).
///
/// Cloning is cheap; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open a pool on `url` and create any missing tables.
    ///
    /// Foreign keys are enforced on every connection; the database file is
    /// created if it does not exist yet.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Open a private in-memory database.
    ///
    /// Every in-memory connection is its own database, so the pool is pinned
    /// to a single connection that is never reclaimed.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create any missing tables. Idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::debug!("schema migrated");
        Ok(())
    }

    /// Empty every table inside one transaction, leaving the schema in
    /// place.
    ///
    /// This is the reset hook test suites call between cases.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::raw_sql(
            "DELETE FROM user_roles;
             DELETE FROM user_skills;
             DELETE FROM roles;
             DELETE FROM skills;
             DELETE FROM users;",
        )
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        tracing::debug!("store cleared");
        Ok(())
    }

    /// The underlying pool, for the repository types.
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
