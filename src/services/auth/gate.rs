/*
 * Responsibility
 * - Bearer トークン認可の入口 (AuthGate::authorize)
 * - 抽出 → 鍵解決 → 検証 → 権限チェック を固定順で実行し、最初の失敗で打ち切る
 * - 設定と鍵取得は外から注入する (グローバル状態なし)
 */
use std::sync::Arc;

use axum::http::HeaderMap;

use crate::services::auth::bearer;
use crate::services::auth::claims::ClaimSet;
use crate::services::auth::config::AuthConfig;
use crate::services::auth::error::{AuthError, AuthResult};
use crate::services::auth::jwks::KeySetFetcher;
use crate::services::auth::key_cache::KeySetCache;
use crate::services::auth::permissions;
use crate::services::auth::verifier::JwtVerifier;

#[derive(Debug)]
pub struct AuthGate {
    keys: KeySetCache,
    verifier: JwtVerifier,
}

impl AuthGate {
    pub fn new(config: AuthConfig, fetcher: Arc<dyn KeySetFetcher>) -> Self {
        let keys = KeySetCache::new(fetcher, config.jwks_cache_ttl)
            .with_min_refresh_interval(config.jwks_min_refresh_interval);
        let verifier = JwtVerifier::new(&config);

        Self { keys, verifier }
    }

    /// The signing-key cache, for explicit invalidation.
    pub fn keys(&self) -> &KeySetCache {
        &self.keys
    }

    /// Authenticate the request and require `permission`.
    ///
    /// An empty `permission` only authenticates.
    pub async fn authorize(&self, headers: &HeaderMap, permission: &str) -> AuthResult<ClaimSet> {
        let token = bearer::token_from_headers(headers)?;
        let claims = self.verify_decode(token).await?;
        permissions::check_permission(permission, &claims)?;
        Ok(claims)
    }

    /// Resolve the signing key for `token` and verify it.
    pub async fn verify_decode(&self, token: &str) -> AuthResult<ClaimSet> {
        let kid = JwtVerifier::key_id(token)?;

        let key = self
            .keys
            .resolve(&kid)
            .await?
            .ok_or(AuthError::MissingSigningKey)?;

        self.verifier.verify(token, &key)
    }
}
