/*
 * Responsibility
 * - URL 構造と、各ルートに要求する権限を定義
 * - 同じパスでもメソッドごとに権限が違うので MethodRouter 単位でゲートを掛けて merge する
 */
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::api::handlers::{
    drinks::{create_drink, delete_drink, list_drinks, list_drinks_detail, update_drink},
    health::health,
};
use crate::api::permissions::{DELETE_DRINKS, GET_DRINKS_DETAIL, PATCH_DRINKS, POST_DRINKS};
use crate::middleware::auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/drinks",
            get(list_drinks).merge(auth::require(post(create_drink), state, POST_DRINKS)),
        )
        .route(
            "/drinks-detail",
            auth::require(get(list_drinks_detail), state, GET_DRINKS_DETAIL),
        )
        .route(
            "/drinks/{drink_id}",
            auth::require(patch(update_drink), state, PATCH_DRINKS)
                .merge(auth::require(delete(delete_drink), state, DELETE_DRINKS)),
        )
}
