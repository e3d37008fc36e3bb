//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

use blogicum_core::pagination::DEFAULT_PER_PAGE;
use blogicum_infra::DatabaseConfig;
use blogicum_infra::JwtConfig;
use blogicum_infra::auth::DEFAULT_JWT_SECRET;

/// Templates shipped with the crate.
pub const DEFAULT_TEMPLATES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/templates");

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    pub jwt: JwtConfig,
    pub media_root: String,
    pub templates_dir: String,
    pub posts_per_page: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database: None,
            jwt: JwtConfig::default(),
            media_root: "./media".to_string(),
            templates_dir: DEFAULT_TEMPLATES_DIR.to_string(),
            posts_per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            url,
            max_connections: parse_var("DB_MAX_CONNECTIONS", 20),
            min_connections: parse_var("DB_MIN_CONNECTIONS", 2),
        });

        let secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set. Using the development secret.");
            DEFAULT_JWT_SECRET.to_string()
        });

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port),
            database,
            jwt: JwtConfig {
                secret,
                expiration_hours: parse_var("JWT_EXPIRATION_HOURS", defaults.jwt.expiration_hours),
                issuer: env::var("JWT_ISSUER").unwrap_or(defaults.jwt.issuer),
            },
            media_root: env::var("MEDIA_ROOT").unwrap_or(defaults.media_root),
            templates_dir: env::var("TEMPLATES_DIR").unwrap_or(defaults.templates_dir),
            posts_per_page: parse_var("POSTS_PER_PAGE", defaults.posts_per_page).max(1),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
