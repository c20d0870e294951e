//! Environment-driven configuration

/// Environment variable naming the database to open.
pub const DATABASE_URL_VAR: &str = "SKILLZ_DATABASE_URL";

/// Runtime configuration read by the surrounding application.
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the relational store (`sqlite:` scheme).
    pub database_url: String,
}

impl Config {
    /// Read configuration from the process environment, honoring a `.env`
    /// file when one is present.
    ///
    /// Falls back to a private in-memory database when nothing is
    /// configured.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let database_url = std::env::var(DATABASE_URL_VAR)
            .unwrap_or_else(|_| "sqlite::memory:".to_string());
        Self { database_url }
    }
}
