// src/config.rs
use std::env;

/// Environment-driven configuration. `DATABASE_URL` is optional at startup:
/// without it the server still binds, but every API request reports a
/// configuration error with a remediation hint.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT").unwrap_or_else(|_| "3030".to_string());
        let port = port.parse::<u16>().expect("PORT must be a valid number");
        let database_url = env::var("DATABASE_URL").ok();
        Config { port, database_url }
    }
}
