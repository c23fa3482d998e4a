/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth::require(...), cors::apply(...), http::apply(...)
 */
pub mod auth;
pub mod cors;
pub mod http;
