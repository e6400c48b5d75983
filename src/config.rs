//! Environment-driven configuration for the medplus binary.

pub const DEFAULT_DB_PATH: &str = "medplus.db";

#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the SQLite database file (`MEDPLUS_DB_PATH`).
    pub db_path: String,
}

impl Config {
    pub fn from_env() -> Self {
        let db_path =
            std::env::var("MEDPLUS_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
        Self { db_path }
    }
}
