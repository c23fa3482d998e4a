/*
 * Responsibility
 * - 環境変数や設定の読み込み (DATABASE_URL, CORS 許可、Auth 設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::services::auth::AuthConfig;
use crate::services::auth::config::parse_algorithms;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    // None -> in-memory drink store (development only)
    pub database_url: Option<String>,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub auth: AuthConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 5000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        let app_env = lookup("APP_ENV")
            .map(|raw| AppEnv::parse(&raw))
            .unwrap_or(AppEnv::Development);

        if app_env.is_production() && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let domain = lookup("AUTH0_DOMAIN")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("AUTH0_DOMAIN"))?;

        let audience = lookup("API_AUDIENCE")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("API_AUDIENCE"))?;

        let algorithms = match lookup("AUTH_ALGORITHMS") {
            Some(raw) => parse_algorithms(&raw).map_err(|_| ConfigError::Invalid("AUTH_ALGORITHMS"))?,
            None => vec![jsonwebtoken::Algorithm::RS256],
        };

        let leeway_seconds = parse_or(&lookup, "AUTH_LEEWAY_SECONDS", 0)?;
        let jwks_cache_ttl_seconds = parse_or(&lookup, "JWKS_CACHE_TTL_SECONDS", 600)?;
        let jwks_min_refresh_seconds = parse_or(&lookup, "JWKS_MIN_REFRESH_SECONDS", 30)?;
        let jwks_fetch_timeout_seconds = parse_or(&lookup, "JWKS_FETCH_TIMEOUT_SECONDS", 5)?;
        if jwks_fetch_timeout_seconds == 0 {
            return Err(ConfigError::Invalid("JWKS_FETCH_TIMEOUT_SECONDS"));
        }

        let jwks_file = lookup("JWKS_FILE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let auth = AuthConfig::new(domain, audience)
            .with_algorithms(algorithms)
            .with_leeway(leeway_seconds)
            .with_jwks_cache_ttl(Duration::from_secs(jwks_cache_ttl_seconds))
            .with_jwks_min_refresh_interval(Duration::from_secs(jwks_min_refresh_seconds))
            .with_jwks_fetch_timeout(Duration::from_secs(jwks_fetch_timeout_seconds))
            .with_jwks_file(jwks_file);

        Ok(Self {
            addr,
            database_url,
            app_env,
            cors_allowed_origins,
            auth,
        })
    }
}

fn parse_or<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}
