/*
 * Responsibility
 * - 署名検証 + iss/aud/exp の検証 (jsonwebtoken)
 * - jsonwebtoken のエラーを AuthError の 3 分類に落とす
 *   - 期限切れ / claims 不一致 / それ以外 (パース不能)
 */
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Validation, decode, decode_header};
use serde_json::Value;

use crate::services::auth::claims::ClaimSet;
use crate::services::auth::config::AuthConfig;
use crate::services::auth::error::{AuthError, AuthResult};
use crate::services::auth::jwks::RsaKey;

#[derive(Debug, Clone)]
pub struct JwtVerifier {
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::default();
        validation.algorithms = config.algorithms.clone();
        validation.set_issuer(&[config.issuer()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.leeway = config.leeway_seconds;

        Self { validation }
    }

    /// Read `kid` from the unverified token header.
    pub fn key_id(token: &str) -> AuthResult<String> {
        let header = decode_header(token).map_err(|_| AuthError::UnparsableToken)?;
        header
            .kid
            .ok_or(AuthError::MalformedHeader(AuthError::MISSING_KID))
    }

    /// Verify the signature and registered claims, then decode the payload.
    pub fn verify(&self, token: &str, key: &RsaKey) -> AuthResult<ClaimSet> {
        let decoding_key = key.decoding_key()?;
        let data = decode::<Value>(token, &decoding_key, &self.validation).map_err(|err| {
            tracing::debug!(kid = %key.kid, kind = ?err.kind(), "token rejected");
            classify(&err)
        })?;

        ClaimSet::try_from(data.claims)
    }
}

fn classify(err: &jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidAudience | ErrorKind::InvalidIssuer => AuthError::InvalidClaims,
        ErrorKind::MissingRequiredClaim(claim) if matches!(claim.as_str(), "aud" | "iss") => {
            AuthError::InvalidClaims
        }
        _ => AuthError::UnparsableToken,
    }
}
