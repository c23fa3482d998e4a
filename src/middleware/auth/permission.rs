//! Bearer-token gate as a route layer → AuthCtx を extensions に入れる
//!
//! - `AuthGate::authorize` (抽出 → 鍵解決 → 検証 → 権限チェック) を handler の前に実行する
//! - 失敗時は handler を呼ばずに AppError (401) を返す
//! - 成功時は AuthCtx を extensions に格納し、handler は AuthCtxExtractor で受け取る

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};

use crate::api::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::AuthError;
use crate::state::AppState;

#[derive(Clone)]
struct Guard {
    state: AppState,
    permission: &'static str,
}

/// Guard every method of `route` with `permission`.
///
/// 例：
/// ```ignore
/// .route("/drinks-detail", auth::require(get(list_drinks_detail), &state, "get:drinks-detail"))
/// ```
pub fn require(
    route: MethodRouter<AppState>,
    state: &AppState,
    permission: &'static str,
) -> MethodRouter<AppState> {
    let guard = Guard {
        state: state.clone(),
        permission,
    };
    // route_layer: 認可はマッチしたルートにだけ掛ける (404 が 401 に化けない)
    route.route_layer(middleware::from_fn_with_state(guard, permission_middleware))
}

async fn permission_middleware(
    State(guard): State<Guard>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = match guard
        .state
        .auth
        .authorize(req.headers(), guard.permission)
        .await
    {
        Ok(claims) => claims,
        Err(err) => {
            if let AuthError::KeyFetchFailed(detail) = &err {
                tracing::warn!(%detail, "JWKS fetch failed");
            } else {
                tracing::debug!(
                    code = err.code(),
                    permission = guard.permission,
                    "authorization rejected"
                );
            }
            return Err(err.into());
        }
    };

    // middleware → extractor への受け渡し
    req.extensions_mut()
        .insert(AuthCtx::new(claims, guard.permission));

    Ok(next.run(req).await)
}
