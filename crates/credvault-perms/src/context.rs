//! The authenticated caller.

/// Identity of the actor making a request, already authenticated.
///
/// Actors are opaque strings such as `uaa-user:<id>` or `mtls-app:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserContext {
    actor: String,
}

impl UserContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
        }
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }
}
