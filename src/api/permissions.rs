//! Permission strings granted by the identity provider's RBAC roles.
//!
//! Barista: `get:drinks-detail`. Manager: everything below.

pub const GET_DRINKS_DETAIL: &str = "get:drinks-detail";
pub const POST_DRINKS: &str = "post:drinks";
pub const PATCH_DRINKS: &str = "patch:drinks";
pub const DELETE_DRINKS: &str = "delete:drinks";
