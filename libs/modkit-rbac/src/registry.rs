use crate::{
    assertion::{Assertion, AssertionRef},
    errors::RbacError,
    traits::AssertionContainer,
};
use dashmap::DashMap;
use std::{collections::HashMap, fmt, sync::Arc};

/// Builds an assertion instance on first use
pub type AssertionFactory = Arc<dyn Fn() -> Arc<dyn Assertion> + Send + Sync>;

enum Registration {
    Instance(Arc<dyn Assertion>),
    Factory(AssertionFactory),
}

/// Name-keyed assertion container.
///
/// Registration happens while wiring the application; resolution is then
/// shared by all concurrent evaluations. Factories run lazily and their
/// product is cached, last writer wins if two evaluations race on a cold
/// name.
#[derive(Default)]
pub struct AssertionRegistry {
    registrations: HashMap<String, Registration>,
    resolved: DashMap<String, Arc<dyn Assertion>>,
}

impl AssertionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ready-made, shared assertion under `name`
    pub fn register(&mut self, name: impl Into<String>, assertion: Arc<dyn Assertion>) {
        let name = name.into();
        self.resolved.remove(&name);
        self.registrations.insert(name, Registration::Instance(assertion));
    }

    /// Register a factory invoked the first time `name` is resolved
    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Assertion> + Send + Sync + 'static,
    {
        let name = name.into();
        self.resolved.remove(&name);
        self.registrations.insert(name, Registration::Factory(Arc::new(factory)));
    }

    /// Builder-style [`AssertionRegistry::register`]
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, assertion: Arc<dyn Assertion>) -> Self {
        self.register(name, assertion);
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.registrations.contains_key(name)
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registrations.keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    fn resolve_named(&self, name: &str) -> Result<Arc<dyn Assertion>, RbacError> {
        if let Some(cached) = self.resolved.get(name) {
            return Ok(Arc::clone(cached.value()));
        }

        let assertion = match self.registrations.get(name) {
            Some(Registration::Instance(assertion)) => Arc::clone(assertion),
            Some(Registration::Factory(factory)) => {
                tracing::debug!(assertion = name, "instantiating assertion");
                factory()
            }
            None => return Err(RbacError::UnknownAssertion(name.to_owned())),
        };

        self.resolved.insert(name.to_owned(), Arc::clone(&assertion));
        Ok(assertion)
    }
}

impl AssertionContainer for AssertionRegistry {
    fn resolve(&self, reference: &AssertionRef) -> Result<Arc<dyn Assertion>, RbacError> {
        match reference {
            AssertionRef::Inline(assertion) => Ok(Arc::clone(assertion)),
            AssertionRef::Named(name) => self.resolve_named(name),
        }
    }
}

impl fmt::Debug for AssertionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertionRegistry")
            .field("names", &self.names())
            .field("resolved", &self.resolved.len())
            .finish_non_exhaustive()
    }
}
