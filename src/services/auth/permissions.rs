use crate::services::auth::claims::ClaimSet;
use crate::services::auth::error::{AuthError, AuthResult};

/// Check that `permission` is granted by the verified claims.
///
/// An empty `permission` means the route only needs an authenticated caller,
/// so no `permissions` claim is required at all.
pub fn check_permission(permission: &str, claims: &ClaimSet) -> AuthResult<()> {
    if permission.is_empty() {
        return Ok(());
    }

    if !claims.permissions_attached() {
        return Err(AuthError::MissingPermissions);
    }

    if claims.has_permission(permission) {
        Ok(())
    } else {
        Err(AuthError::InsufficientPermissions)
    }
}
