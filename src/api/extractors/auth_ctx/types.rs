/*
 * Responsibility
 * - Handler から見える「認可済みコンテキスト」の型
 * - middleware がゲートを通して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - JWT の検証ロジックや JWKS の取得は services::auth 側の責務
 */
use crate::services::auth::ClaimSet;

/// 認可済みのリクエストに付与されるコンテキスト
///
/// - `claims` は署名・iss/aud/exp 検証済みの payload
/// - `permission` はこのルートで要求された権限 (空文字は認証のみ)
#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub claims: ClaimSet,
    pub permission: &'static str,
}

impl AuthCtx {
    pub fn new(claims: ClaimSet, permission: &'static str) -> Self {
        Self { claims, permission }
    }

    pub fn subject(&self) -> Option<&str> {
        self.claims.subject.as_deref()
    }
}
