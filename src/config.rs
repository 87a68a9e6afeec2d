//! Configuration types.

use std::path::PathBuf;

/// Server configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the HTTP server listens on.
    pub port: u16,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
}

impl ServerConfig {
    /// Build from `BOARD_PORT` and `BOARD_DB_PATH`, falling back to defaults.
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("BOARD_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .unwrap_or(8000);

        let db_path = std::env::var("BOARD_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/careers.db"));

        Self { port, db_path }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            db_path: PathBuf::from("./data/careers.db"),
        }
    }
}
