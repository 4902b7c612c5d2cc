//! HTTP-style verbs as seen by the authorization layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The action a request wants to perform.
///
/// Ordered so that it can live in a `BTreeSet` allow-list.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
  Get,
  Head,
  Options,
  Post,
  Put,
  Patch,
  Delete,
}

impl Verb {
  /// Verbs that never change state. Visibility is not owner-restricted for
  /// these.
  pub fn is_safe(self) -> bool {
    matches!(self, Self::Get | Self::Head | Self::Options)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Get => "GET",
      Self::Head => "HEAD",
      Self::Options => "OPTIONS",
      Self::Post => "POST",
      Self::Put => "PUT",
      Self::Patch => "PATCH",
      Self::Delete => "DELETE",
    }
  }
}

impl fmt::Display for Verb {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
