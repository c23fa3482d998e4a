/*
 * Responsibility
 * - Authorization ヘッダから Bearer トークンを取り出す
 * - ヘッダの形式チェックのみ (署名検証はしない)
 */
use axum::http::{HeaderMap, header};

use crate::services::auth::error::{AuthError, AuthResult};

/// Pull the bearer token out of the request headers.
pub fn token_from_headers(headers: &HeaderMap) -> AuthResult<&str> {
    match headers.get(header::AUTHORIZATION) {
        None => Err(AuthError::MissingHeader),
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|_| AuthError::MalformedHeader(AuthError::DOES_NOT_START_WITH_BEARER))?;
            token_from_header(Some(raw))
        }
    }
}

/// Parse a raw `Authorization` header value into the token part.
///
/// The value is split on whitespace: the first part must be `bearer`
/// (case-insensitive) and exactly one more part must follow it.
pub fn token_from_header(raw: Option<&str>) -> AuthResult<&str> {
    let raw = raw.ok_or(AuthError::MissingHeader)?;

    let mut parts = raw.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::MissingHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader(
            AuthError::DOES_NOT_START_WITH_BEARER,
        ));
    }

    let token = parts
        .next()
        .ok_or(AuthError::MalformedHeader(AuthError::TOKEN_NOT_FOUND))?;

    if parts.next().is_some() {
        return Err(AuthError::MalformedHeader(AuthError::NOT_BEARER_TOKEN));
    }

    Ok(token)
}
