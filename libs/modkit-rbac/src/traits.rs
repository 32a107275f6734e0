use crate::{
    assertion::{Assertion, AssertionRef},
    context::Context,
    errors::RbacError,
    identity::Identity,
};
use std::sync::Arc;

/// Maps an identity (possibly anonymous) to the role ids that apply to it
pub trait RoleResolver: Send + Sync {
    /// Effective role ids for `identity`.
    ///
    /// Guest and default role substitution is the resolver's job; the
    /// engine takes the returned ids as final.
    ///
    /// # Errors
    /// Returns [`RbacError::RoleResolution`] when the backing role store fails.
    fn identity_roles(
        &self,
        identity: Option<&dyn Identity>,
        context: Context<'_>,
    ) -> Result<Vec<String>, RbacError>;
}

/// Turns an assertion reference into something executable
pub trait AssertionContainer: Send + Sync {
    /// Resolve `reference`. Inline references resolve to themselves.
    ///
    /// Must be callable concurrently; repeated calls for the same name may
    /// return a cached instance.
    ///
    /// # Errors
    /// Returns [`RbacError::UnknownAssertion`] for names nothing is registered under.
    fn resolve(&self, reference: &AssertionRef) -> Result<Arc<dyn Assertion>, RbacError>;
}

/// The authorization decision boundary
pub trait Authorizer: Send + Sync {
    /// `Ok(true)` when `identity` may exercise `permission` in `context`.
    ///
    /// # Errors
    /// Denials are `Ok(false)`. An error means the decision could not be
    /// evaluated (misconfiguration or a failing collaborator).
    fn is_granted(
        &self,
        identity: Option<&dyn Identity>,
        permission: &str,
        context: Context<'_>,
    ) -> Result<bool, RbacError>;
}
