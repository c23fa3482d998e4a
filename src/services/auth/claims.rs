use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::auth::error::{AuthError, AuthResult};

/// Verified token payload handed to protected handlers.
///
/// The typed fields cover what the gate itself relies on; everything else is
/// reachable through [`ClaimSet::get`].
#[derive(Debug, Clone, Serialize)]
pub struct ClaimSet {
    pub issuer: String,
    pub audience: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub subject: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub raw: Value,
}

impl ClaimSet {
    /// Look up any claim by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.raw.get(name)
    }

    /// Whether the token carries a non-empty `permissions` list, whatever its entries are.
    pub fn permissions_attached(&self) -> bool {
        self.raw
            .get("permissions")
            .and_then(Value::as_array)
            .is_some_and(|granted| !granted.is_empty())
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_deref()
            .is_some_and(|granted| granted.iter().any(|p| p == permission))
    }
}

#[derive(Debug, Deserialize)]
struct ClaimsRepr {
    iss: String,
    #[serde(default)]
    aud: Option<AudienceRepr>,
    exp: i64,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    permissions: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AudienceRepr {
    Single(String),
    Many(Vec<String>),
}

impl TryFrom<Value> for ClaimSet {
    type Error = AuthError;

    fn try_from(value: Value) -> AuthResult<Self> {
        let repr: ClaimsRepr =
            serde_json::from_value(value.clone()).map_err(|_| AuthError::UnparsableToken)?;

        let expires_at = Utc
            .timestamp_opt(repr.exp, 0)
            .single()
            .ok_or(AuthError::UnparsableToken)?;

        let audience = match repr.aud {
            Some(AudienceRepr::Single(item)) => vec![item],
            Some(AudienceRepr::Many(items)) => items,
            None => Vec::new(),
        };

        Ok(Self {
            issuer: repr.iss,
            audience,
            expires_at,
            subject: repr.sub,
            // non-string entries can never match a permission string
            permissions: repr.permissions.map(|granted| {
                granted
                    .into_iter()
                    .filter_map(|p| match p {
                        Value::String(p) => Some(p),
                        _ => None,
                    })
                    .collect()
            }),
            raw: value,
        })
    }
}
