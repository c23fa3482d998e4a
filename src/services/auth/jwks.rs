/*
 * Responsibility
 * - JWKS (公開鍵セット) の取得インターフェース
 * - 本番: HTTP で https://<domain>/.well-known/jwks.json を取得
 * - テスト: 固定の鍵セットを差し込めるよう trait で抽象化
 */
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::services::auth::error::{AuthError, AuthResult};

/// One entry of a JSON Web Key Set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: String,
    #[serde(rename = "use", default)]
    pub use_: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    pub keys: Vec<Jwk>,
}

/// The fields needed to rebuild an RSA public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaKey {
    pub kty: String,
    pub kid: String,
    pub use_: Option<String>,
    pub n: String,
    pub e: String,
}

impl RsaKey {
    pub fn decoding_key(&self) -> AuthResult<DecodingKey> {
        DecodingKey::from_rsa_components(&self.n, &self.e).map_err(|_| AuthError::UnparsableToken)
    }
}

impl KeySet {
    /// Scan the whole set for `kid`. Entries without RSA components never match.
    pub fn find(&self, kid: &str) -> Option<RsaKey> {
        self.keys
            .iter()
            .filter(|jwk| jwk.kid == kid)
            .find_map(|jwk| {
                Some(RsaKey {
                    kty: jwk.kty.clone(),
                    kid: jwk.kid.clone(),
                    use_: jwk.use_.clone(),
                    n: jwk.n.clone()?,
                    e: jwk.e.clone()?,
                })
            })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Source of signing keys for the gate.
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    async fn fetch_keyset(&self) -> AuthResult<KeySet>;
}

/// `https://<domain>/.well-known/jwks.json`
pub fn jwks_url(domain: &str) -> AuthResult<Url> {
    Url::parse(&format!("https://{domain}/.well-known/jwks.json"))
        .map_err(|err| AuthError::KeyFetchFailed(format!("invalid identity domain: {err}")))
}

/// Fetches the key set from the identity provider over HTTP.
#[derive(Debug, Clone)]
pub struct HttpKeySetFetcher {
    client: Client,
    url: Url,
}

impl HttpKeySetFetcher {
    pub fn new(url: Url, timeout: Duration) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AuthError::KeyFetchFailed(err.to_string()))?;

        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: Client, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    async fn fetch_keyset(&self) -> AuthResult<KeySet> {
        tracing::debug!(url = %self.url, "fetching JWKS");

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|err| AuthError::KeyFetchFailed(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyFetchFailed(format!(
                "HTTP {} from {}",
                response.status(),
                self.url
            )));
        }

        let keys: KeySet = response
            .json()
            .await
            .map_err(|err| AuthError::KeyFetchFailed(format!("invalid JWKS body: {err}")))?;

        if keys.is_empty() {
            tracing::warn!(url = %self.url, "JWKS contains no keys");
        } else {
            tracing::debug!(count = keys.len(), "fetched JWKS");
        }
        Ok(keys)
    }
}

/// A fixed key set. Used by tests and for pinning keys locally.
#[derive(Debug, Clone, Default)]
pub struct StaticKeySet {
    keys: KeySet,
}

impl StaticKeySet {
    pub fn new(keys: KeySet) -> Self {
        Self { keys }
    }

    /// Load a JWKS document (`{"keys": [...]}`) from disk.
    pub fn from_file(path: &Path) -> AuthResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            AuthError::KeyFetchFailed(format!("cannot read {}: {err}", path.display()))
        })?;
        let keys: KeySet = serde_json::from_str(&raw).map_err(|err| {
            AuthError::KeyFetchFailed(format!("invalid JWKS in {}: {err}", path.display()))
        })?;

        Ok(Self::new(keys))
    }
}

#[async_trait]
impl KeySetFetcher for StaticKeySet {
    async fn fetch_keyset(&self) -> AuthResult<KeySet> {
        Ok(self.keys.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn sample_set() -> KeySet {
        serde_json::from_value(json!({
            "keys": [
                { "kty": "RSA", "kid": "a", "use": "sig", "n": "AQAB", "e": "AQAB" },
                { "kty": "RSA", "kid": "b", "use": "sig", "alg": "RS256", "n": "n-b", "e": "AQAB" },
                { "kty": "EC", "kid": "c", "use": "sig" }
            ]
        }))
        .expect("jwks")
    }

    fn fetcher_for(server: &MockServer, timeout: Duration) -> HttpKeySetFetcher {
        let url = Url::parse(&server.url("/.well-known/jwks.json")).expect("url");
        HttpKeySetFetcher::new(url, timeout).expect("fetcher")
    }

    #[test]
    fn builds_well_known_url() {
        let url = jwks_url("tenant.eu.auth0.com").expect("url");
        assert_eq!(url.as_str(), "https://tenant.eu.auth0.com/.well-known/jwks.json");
    }

    #[test]
    fn find_matches_kid_and_copies_rsa_fields() {
        let set = sample_set();
        let key = set.find("b").expect("key b");
        assert_eq!(key.kty, "RSA");
        assert_eq!(key.kid, "b");
        assert_eq!(key.use_.as_deref(), Some("sig"));
        assert_eq!(key.n, "n-b");
        assert_eq!(key.e, "AQAB");
    }

    #[test]
    fn find_misses_unknown_or_incomplete_keys() {
        let set = sample_set();
        assert!(set.find("zzz").is_none());
        assert!(set.find("c").is_none());
    }

    #[tokio::test]
    async fn http_fetcher_reads_key_set() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/.well-known/jwks.json");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "keys": [{ "kty": "RSA", "kid": "k1", "use": "sig", "n": "AQAB", "e": "AQAB" }]
                    }));
            })
            .await;

        let fetcher = fetcher_for(&server, Duration::from_secs(2));
        let keys = fetcher.fetch_keyset().await.expect("fetch");

        mock.assert_async().await;
        assert_eq!(keys.len(), 1);
        assert!(keys.find("k1").is_some());
    }

    #[tokio::test]
    async fn http_fetcher_maps_bad_status_to_key_fetch_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/.well-known/jwks.json");
                then.status(503);
            })
            .await;

        let fetcher = fetcher_for(&server, Duration::from_secs(2));
        let err = fetcher.fetch_keyset().await.expect_err("should fail");
        assert!(matches!(err, AuthError::KeyFetchFailed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn http_fetcher_maps_garbage_body_to_key_fetch_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/.well-known/jwks.json");
                then.status(200).body("<html>not json</html>");
            })
            .await;

        let fetcher = fetcher_for(&server, Duration::from_secs(2));
        let err = fetcher.fetch_keyset().await.expect_err("should fail");
        assert!(matches!(err, AuthError::KeyFetchFailed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn http_fetcher_gives_up_after_timeout() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/.well-known/jwks.json");
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .json_body(json!({ "keys": [] }));
            })
            .await;

        let fetcher = fetcher_for(&server, Duration::from_millis(50));
        let err = fetcher.fetch_keyset().await.expect_err("should time out");
        assert!(matches!(err, AuthError::KeyFetchFailed(_)), "{err:?}");
    }
}
