/// Factory: build `AuthGate` from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::AuthGate;
use crate::services::auth::error::AuthResult;
use crate::services::auth::jwks::{HttpKeySetFetcher, KeySetFetcher, StaticKeySet, jwks_url};

pub fn build_auth_gate(config: &Config) -> AuthResult<Arc<AuthGate>> {
    let auth = &config.auth;

    let fetcher: Arc<dyn KeySetFetcher> = match &auth.jwks_file {
        Some(path) => {
            tracing::warn!(path = %path.display(), "serving signing keys from a local JWKS file");
            Arc::new(StaticKeySet::from_file(path)?)
        }
        None => {
            let fetcher =
                HttpKeySetFetcher::new(jwks_url(&auth.domain)?, auth.jwks_fetch_timeout)?;
            tracing::info!(jwks = %fetcher.url(), "fetching signing keys from identity provider");
            Arc::new(fetcher)
        }
    };

    let gate = AuthGate::new(auth.clone(), fetcher);
    tracing::info!(
        audience = %auth.audience,
        ttl = ?gate.keys().ttl(),
        "bearer-token gate configured"
    );
    Ok(Arc::new(gate))
}
