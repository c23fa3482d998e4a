/*
 * Responsibility
 * - KeySetFetcher の結果を TTL 付きでキャッシュする
 * - 未知の kid を見たら取り直す (鍵ローテーション対応)。ただし直近の取得から
 *   min_refresh_interval 以内なら取り直さない (kid を偽造したリクエストで JWKS を叩かせない)
 * - 取得は同時に 1 タスクだけ。待っていたタスクは取得済みの結果を使う
 * - invalidate() で明示的に破棄できる
 */
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

use crate::services::auth::error::AuthResult;
use crate::services::auth::jwks::{KeySet, KeySetFetcher, RsaKey};

pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

struct CachedKeySet {
    keys: Arc<KeySet>,
    fetched_at: Instant,
}

/// TTL cache in front of a [`KeySetFetcher`].
///
/// A zero TTL disables caching: every lookup fetches the key set.
pub struct KeySetCache {
    fetcher: Arc<dyn KeySetFetcher>,
    ttl: Duration,
    min_refresh_interval: Duration,
    state: RwLock<Option<CachedKeySet>>,
    fetch_lock: Mutex<()>,
}

impl std::fmt::Debug for KeySetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySetCache")
            .field("ttl", &self.ttl)
            .field("min_refresh_interval", &self.min_refresh_interval)
            .finish()
    }
}

impl KeySetCache {
    pub fn new(fetcher: Arc<dyn KeySetFetcher>, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            state: RwLock::new(None),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Shortest gap between two fetches forced by an unknown kid.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Find the key for `kid`.
    ///
    /// `Ok(None)` means the identity provider does not publish that kid.
    pub async fn resolve(&self, kid: &str) -> AuthResult<Option<RsaKey>> {
        let (keys, fresh) = self.current().await?;
        if let Some(key) = keys.find(kid) {
            return Ok(Some(key));
        }
        if fresh {
            return Ok(None);
        }

        let keys = {
            let _fetching = self.fetch_lock.lock().await;
            match self.cached_within(self.min_refresh_interval).await {
                Some(recent) => {
                    tracing::debug!(kid, "kid not in JWKS, fetched recently; not refreshing");
                    recent
                }
                None => {
                    tracing::debug!(kid, "kid not in cached JWKS, refreshing");
                    self.fetch().await?
                }
            }
        };
        Ok(keys.find(kid))
    }

    /// Drop the cached key set; the next lookup fetches again.
    pub async fn invalidate(&self) {
        self.state.write().await.take();
    }

    /// The cached set and whether it was fetched for this lookup.
    async fn current(&self) -> AuthResult<(Arc<KeySet>, bool)> {
        if let Some(keys) = self.cached_within(self.ttl).await {
            return Ok((keys, false));
        }

        let _fetching = self.fetch_lock.lock().await;
        // another task may have fetched while this one waited
        if let Some(keys) = self.cached_within(self.ttl).await {
            return Ok((keys, true));
        }
        Ok((self.fetch().await?, true))
    }

    async fn cached_within(&self, max_age: Duration) -> Option<Arc<KeySet>> {
        let state = self.state.read().await;
        state
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < max_age)
            .map(|cached| cached.keys.clone())
    }

    /// Fetch the key set and replace the cached copy. Callers hold `fetch_lock`.
    async fn fetch(&self) -> AuthResult<Arc<KeySet>> {
        let keys = Arc::new(self.fetcher.fetch_keyset().await?);

        let mut state = self.state.write().await;
        *state = Some(CachedKeySet {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });

        Ok(keys)
    }
}
