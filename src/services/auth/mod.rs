pub mod bearer;
pub mod claims;
pub mod config;
pub mod error;
pub mod factory;
pub mod gate;
pub mod jwks;
pub mod key_cache;
pub mod permissions;
pub mod verifier;

#[cfg(test)]
pub mod test_support;

pub use claims::ClaimSet;
pub use config::AuthConfig;
pub use error::AuthError;
pub use factory::build_auth_gate;
pub use gate::AuthGate;
