//! Turning policy decisions into responses.
//!
//! Policies answer `true`/`false`; this is where a `false` becomes a 401 for
//! an anonymous caller or a 403 for an authenticated one.

use bizhub_core::{
  policy::{ActionRequest, Authenticated, Policy},
  principal::Principal,
  verb::Verb,
};

use crate::error::ApiError;

/// Ask `policy` about `request`, mapping a denial to an error.
pub fn authorize<R, P>(policy: &P, request: &ActionRequest<'_, R>) -> Result<(), ApiError>
where
  R: ?Sized,
  P: Policy<R> + ?Sized,
{
  if policy.permits(request) {
    return Ok(());
  }
  tracing::debug!(
    policy = policy.name(),
    verb = %request.verb,
    principal = ?request.principal.id(),
    "request denied"
  );
  if request.principal.is_authenticated() {
    Err(ApiError::Forbidden)
  } else {
    Err(ApiError::Unauthorized)
  }
}

/// Reject anonymous callers.
pub fn require_authenticated(principal: &Principal, verb: Verb) -> Result<(), ApiError> {
  authorize::<(), _>(&Authenticated, &ActionRequest::collection(principal, verb))
}

#[cfg(test)]
mod tests {
  use super::*;
  use bizhub_core::policy::RoleGate;

  #[test]
  fn anonymous_denial_is_unauthorized() {
    let err = require_authenticated(&Principal::anonymous(), Verb::Get).unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
  }

  #[test]
  fn authenticated_denial_is_forbidden() {
    let gate = RoleGate::new("Sales");
    let p = Principal::authenticated(1, ["Sales"]);
    let err = authorize::<(), _>(&gate, &ActionRequest::collection(&p, Verb::Delete)).unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));
    assert!(authorize::<(), _>(&gate, &ActionRequest::collection(&p, Verb::Post)).is_ok());
  }
}
