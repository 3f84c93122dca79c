//! Capability checks applied at the start of every gated operation
//!
//! Authentication is always checked before the capability, so an anonymous
//! caller gets `Authentication` even for operations it could never perform.

use crate::{
    error::{AppError, AppResult},
    models::{Capability, UserClaims},
};

/// Require an authenticated principal
pub fn require_authenticated(principal: Option<&UserClaims>) -> AppResult<&UserClaims> {
    principal.ok_or_else(|| AppError::Authentication("Login required".to_string()))
}

/// Require an authenticated principal holding `capability`
pub fn require_capability(
    principal: Option<&UserClaims>,
    capability: Capability,
) -> AppResult<&UserClaims> {
    let claims = require_authenticated(principal)?;
    if !claims.has_capability(capability) {
        return Err(AppError::Authorization(format!(
            "Permission '{}' required",
            capability
        )));
    }
    Ok(claims)
}
