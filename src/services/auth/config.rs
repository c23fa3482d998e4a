use std::path::PathBuf;
use std::time::Duration;

use jsonwebtoken::Algorithm;

use crate::services::auth::key_cache::DEFAULT_MIN_REFRESH_INTERVAL;

/// Settings for the bearer-token gate.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Identity provider host, e.g. `tenant.eu.auth0.com`.
    pub domain: String,
    /// Expected `aud` claim.
    pub audience: String,
    /// Signature algorithms accepted for access tokens.
    pub algorithms: Vec<Algorithm>,
    /// Clock skew tolerated on `exp`.
    pub leeway_seconds: u64,
    pub jwks_cache_ttl: Duration,
    /// Unknown kids refetch the JWKS at most this often.
    pub jwks_min_refresh_interval: Duration,
    pub jwks_fetch_timeout: Duration,
    /// Serve keys from this JWKS file instead of fetching them (local development).
    pub jwks_file: Option<PathBuf>,
}

impl AuthConfig {
    pub fn new(domain: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            audience: audience.into(),
            algorithms: vec![Algorithm::RS256],
            leeway_seconds: 0,
            jwks_cache_ttl: Duration::from_secs(600),
            jwks_min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            jwks_fetch_timeout: Duration::from_secs(5),
            jwks_file: None,
        }
    }

    /// `https://<domain>/`
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.domain)
    }

    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_jwks_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache_ttl = ttl;
        self
    }

    pub fn with_jwks_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.jwks_min_refresh_interval = interval;
        self
    }

    pub fn with_jwks_file(mut self, path: Option<PathBuf>) -> Self {
        self.jwks_file = path;
        self
    }

    pub fn with_jwks_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.jwks_fetch_timeout = timeout;
        self
    }
}

/// Parse a comma-separated allow-list such as `RS256,PS256`.
///
/// Keys come from a JWKS of RSA keys, so only RSA-family algorithms are accepted.
pub fn parse_algorithms(raw: &str) -> Result<Vec<Algorithm>, String> {
    let mut out = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let alg: Algorithm = name
            .parse()
            .map_err(|_| format!("unknown algorithm '{name}'"))?;
        match alg {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => {
                if !out.contains(&alg) {
                    out.push(alg);
                }
            }
            _ => return Err(format!("algorithm '{name}' is not an RSA algorithm")),
        }
    }

    if out.is_empty() {
        return Err("no algorithms configured".to_string());
    }
    Ok(out)
}
