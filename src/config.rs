// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Credentials for the bootstrap administrator account.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub port: u16,
    pub rust_log: String,
    pub log_dir: String,
    /// Include error details in 500 responses.
    pub diagnostics: bool,
    pub cors_origins: Vec<String>,
    pub admin: Option<AdminSeed>,
}

impl Config {
    /// Reads the configuration from the environment.
    ///
    /// Panics when a required value is missing: the server must not start
    /// with an embedded signing secret or admin password.
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|secret| !secret.is_empty())
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24 * 60 * 60);

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        let diagnostics = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("development"))
            .unwrap_or(false);

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or_else(|_| vec!["http://localhost:5173".to_string()]);

        let admin = env::var("ADMIN_USERNAME").ok().map(|username| AdminSeed {
            username,
            email: env::var("ADMIN_EMAIL").expect("ADMIN_EMAIL must be set when ADMIN_USERNAME is"),
            password: env::var("ADMIN_PASSWORD")
                .expect("ADMIN_PASSWORD must be set when ADMIN_USERNAME is"),
        });

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            port,
            rust_log,
            log_dir,
            diagnostics,
            cors_origins,
            admin,
        }
    }

    /// Minimal configuration for in-process servers (tests, tooling).
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: None,
            jwt_secret: jwt_secret.into(),
            jwt_expiration: 24 * 60 * 60,
            port: 0,
            rust_log: "error".to_string(),
            log_dir: "logs".to_string(),
            diagnostics: false,
            cors_origins: Vec::new(),
            admin: None,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_split_and_trimmed() {
        let origins = parse_origins(" http://a.test , ,http://b.test");
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_config_defaults_to_memory_store() {
        let config = Config::with_secret("s");
        assert!(config.database_url.is_none());
        assert_eq!(config.jwt_expiration, 86_400);
        assert!(config.admin.is_none());
    }
}
