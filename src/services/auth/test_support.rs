//! Fixtures for signing tokens against a fixed RSA key pair.
use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};

use crate::services::auth::config::AuthConfig;
use crate::services::auth::gate::AuthGate;
use crate::services::auth::jwks::{Jwk, KeySet, StaticKeySet};

pub const DOMAIN: &str = "coffee-test.eu.auth0.com";
pub const AUDIENCE: &str = "coffee-shop";
pub const KID: &str = "test-key";

pub const SIGNING_KEY_PEM: &str = include_str!("testdata/signing.pem");
pub const OTHER_KEY_PEM: &str = include_str!("testdata/other.pem");
const SIGNING_JWK: &str = include_str!("testdata/signing.jwk.json");

pub fn config() -> AuthConfig {
    AuthConfig::new(DOMAIN, AUDIENCE)
}

pub fn signing_jwk(kid: &str) -> Jwk {
    let components: Value = serde_json::from_str(SIGNING_JWK).expect("jwk fixture");
    Jwk {
        kty: "RSA".into(),
        kid: kid.into(),
        use_: Some("sig".into()),
        alg: Some("RS256".into()),
        n: components["n"].as_str().map(str::to_string),
        e: components["e"].as_str().map(str::to_string),
    }
}

pub fn key_set() -> KeySet {
    KeySet {
        keys: vec![signing_jwk("unrelated"), signing_jwk(KID)],
    }
}

pub fn gate() -> AuthGate {
    AuthGate::new(config(), Arc::new(StaticKeySet::new(key_set())))
}

/// Builds a token that passes the gate unless told otherwise.
pub struct TokenBuilder {
    algorithm: Algorithm,
    kid: Option<String>,
    pem: &'static str,
    issuer: String,
    audience: Value,
    expires_in: i64,
    permissions: Option<Vec<String>>,
}

impl TokenBuilder {
    pub fn new() -> Self {
        Self {
            algorithm: Algorithm::RS256,
            kid: Some(KID.to_string()),
            pem: SIGNING_KEY_PEM,
            issuer: config().issuer(),
            audience: json!(AUDIENCE),
            expires_in: 3600,
            permissions: None,
        }
    }

    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.to_string());
        self
    }

    pub fn without_kid(mut self) -> Self {
        self.kid = None;
        self
    }

    pub fn signed_with(mut self, pem: &'static str) -> Self {
        self.pem = pem;
        self
    }

    pub fn issuer(mut self, issuer: &str) -> Self {
        self.issuer = issuer.to_string();
        self
    }

    /// `Value::Null` leaves the claim out.
    pub fn audience(mut self, audience: Value) -> Self {
        self.audience = audience;
        self
    }

    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.expires_in = seconds;
        self
    }

    pub fn permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = Some(permissions.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn sign(self) -> String {
        let now = Utc::now().timestamp();
        let mut claims = json!({
            "iss": self.issuer,
            "sub": "auth0|test-user",
            "iat": now,
            "exp": now + self.expires_in,
        });
        if !self.audience.is_null() {
            claims["aud"] = self.audience;
        }
        if let Some(permissions) = self.permissions {
            claims["permissions"] = json!(permissions);
        }

        let mut header = Header::new(self.algorithm);
        header.kid = self.kid;

        let key = EncodingKey::from_rsa_pem(self.pem.as_bytes()).expect("rsa pem fixture");
        encode(&header, &claims, &key).expect("sign token")
    }
}
