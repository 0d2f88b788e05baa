use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    /// Base URL of the external resume generation / parsing / scoring service.
    pub resume_service_url: String,
    pub service_timeout_secs: u64,
    pub session_ttl_secs: i64,
    /// Marks the session cookie `Secure`. Enable behind TLS.
    pub cookie_secure: bool,
    /// Optional directory holding the built frontend, served as the router fallback.
    pub static_dir: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            jwt_secret: require_env("JWT_SECRET")?,
            resume_service_url: require_env("RESUME_SERVICE_URL")?
                .trim_end_matches('/')
                .to_string(),
            service_timeout_secs: optional_env("SERVICE_TIMEOUT_SECS", "120")?,
            session_ttl_secs: optional_env("SESSION_TTL_SECS", "3600")?,
            cookie_secure: optional_env("COOKIE_SECURE", "false")?,
            static_dir: std::env::var("STATIC_DIR").ok().filter(|s| !s.is_empty()),
            port: optional_env("PORT", "8080")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .with_context(|| format!("Environment variable '{key}' has an invalid value"))
}
