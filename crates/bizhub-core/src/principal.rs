//! The identity a request acts as.

use std::collections::BTreeSet;

use crate::Id;

/// The caller behind a request. Immutable for the lifetime of the request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Principal {
  user_id: Option<Id>,
  roles:   BTreeSet<String>,
}

impl Principal {
  /// A caller that presented no credentials.
  pub fn anonymous() -> Self { Self::default() }

  pub fn authenticated<I, R>(user_id: Id, roles: I) -> Self
  where
    I: IntoIterator<Item = R>,
    R: Into<String>,
  {
    Self {
      user_id: Some(user_id),
      roles:   roles.into_iter().map(Into::into).collect(),
    }
  }

  /// The user id, or `None` for an anonymous caller.
  pub fn id(&self) -> Option<Id> { self.user_id }

  pub fn is_authenticated(&self) -> bool { self.user_id.is_some() }

  pub fn has_role(&self, role: &str) -> bool { self.roles.contains(role) }

  pub fn roles(&self) -> &BTreeSet<String> { &self.roles }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn anonymous_has_no_identity() {
    let p = Principal::anonymous();
    assert!(!p.is_authenticated());
    assert_eq!(p.id(), None);
    assert!(p.roles().is_empty());
  }

  #[test]
  fn authenticated_carries_roles() {
    let p = Principal::authenticated(7, ["Sales"]);
    assert!(p.is_authenticated());
    assert_eq!(p.id(), Some(7));
    assert!(p.has_role("Sales"));
    assert!(!p.has_role("sales"));
  }
}
