/*
 * Responsibility
 * - 認可ゲートの失敗モードを 1 つの enum で表す
 * - code / description / status を HTTP 層に渡す (レンダリングは AppError 側)
 */
use axum::http::StatusCode;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Every way the bearer-token gate can reject a request.
///
/// The `Display` text is the human-readable description that ends up in the
/// `message` field of the error body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header is needed.")]
    MissingHeader,

    #[error("{0}")]
    MalformedHeader(&'static str),

    #[error("Unable to find the appropriate key.")]
    MissingSigningKey,

    #[error("Token expired.")]
    TokenExpired,

    #[error("Incorrect claims. Please, check the audience and issuer.")]
    InvalidClaims,

    #[error("Unable to parse authentication token.")]
    UnparsableToken,

    #[error("User does not have permissions attached")]
    MissingPermissions,

    #[error("User does not have permission")]
    InsufficientPermissions,

    // detail is kept for logs only; the body carries the generic message
    #[error("Unable to fetch signing keys.")]
    KeyFetchFailed(String),
}

impl AuthError {
    pub const DOES_NOT_START_WITH_BEARER: &'static str =
        "Authorization header does not start with Bearer.";
    pub const TOKEN_NOT_FOUND: &'static str = "The header is malformed. Token is not found.";
    pub const NOT_BEARER_TOKEN: &'static str = "Authorization header is not Bearer token.";
    pub const MISSING_KID: &'static str = "Authorization malformed.";

    /// Machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "authorization_header_missing",
            AuthError::MalformedHeader(_)
            | AuthError::MissingSigningKey
            | AuthError::UnparsableToken => "invalid_header",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims => "invalid_claims",
            AuthError::MissingPermissions | AuthError::InsufficientPermissions => {
                "invalid_permissions"
            }
            AuthError::KeyFetchFailed(_) => "jwks_unavailable",
        }
    }

    pub fn description(&self) -> String {
        self.to_string()
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}
