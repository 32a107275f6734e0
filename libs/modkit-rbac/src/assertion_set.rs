use crate::{
    assertion::{Assertion, AssertionRef},
    context::Context,
    errors::RbacError,
    identity::Identity,
    traits::AssertionContainer,
};
use std::sync::Arc;

/// Ordered, AND-combined assertions bound to a single permission check.
///
/// Built per decision and dropped afterwards. Every reference is resolved
/// before any assertion runs, so an unresolvable name is reported even when
/// an earlier assertion would have denied.
pub struct AssertionSet<'a> {
    container: &'a dyn AssertionContainer,
    references: &'a [AssertionRef],
}

impl<'a> AssertionSet<'a> {
    pub fn new(container: &'a dyn AssertionContainer, references: &'a [AssertionRef]) -> Self {
        Self {
            container,
            references,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.references.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// `true` only if every assertion passes, evaluated in configured order.
    ///
    /// Stops at the first failing assertion; later ones are not called. An
    /// empty set passes.
    ///
    /// # Errors
    /// Returns the container's error when a reference cannot be resolved.
    pub fn assert(
        &self,
        permission: &str,
        identity: Option<&dyn Identity>,
        context: Context<'_>,
    ) -> Result<bool, RbacError> {
        let assertions = self
            .references
            .iter()
            .map(|reference| self.container.resolve(reference))
            .collect::<Result<Vec<Arc<dyn Assertion>>, _>>()?;

        for (position, assertion) in assertions.iter().enumerate() {
            if !assertion.assert(permission, identity, context) {
                tracing::debug!(
                    permission,
                    position,
                    assertion = ?self.references[position],
                    "assertion vetoed permission"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}
