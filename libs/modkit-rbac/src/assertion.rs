use crate::{context::Context, identity::Identity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Runtime predicate that can veto a permission the role graph granted.
///
/// Implementations should be side-effect free; they may be skipped when an
/// earlier assertion for the same permission already failed.
pub trait Assertion: Send + Sync {
    fn assert(
        &self,
        permission: &str,
        identity: Option<&dyn Identity>,
        context: Context<'_>,
    ) -> bool;
}

impl<F> Assertion for F
where
    F: Fn(&str, Option<&dyn Identity>, Context<'_>) -> bool + Send + Sync,
{
    fn assert(
        &self,
        permission: &str,
        identity: Option<&dyn Identity>,
        context: Context<'_>,
    ) -> bool {
        self(permission, identity, context)
    }
}

/// Wrap a closure as a shareable assertion
pub fn assertion_fn<F>(f: F) -> Arc<dyn Assertion>
where
    F: Fn(&str, Option<&dyn Identity>, Context<'_>) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// How a permission points at an assertion: by registry name, or inline
#[derive(Clone)]
pub enum AssertionRef {
    Named(String),
    Inline(Arc<dyn Assertion>),
}

impl AssertionRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn inline(assertion: Arc<dyn Assertion>) -> Self {
        Self::Inline(assertion)
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name.as_str()),
            Self::Inline(_) => None,
        }
    }
}

impl fmt::Debug for AssertionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Inline(_) => f.write_str("Inline(..)"),
        }
    }
}

impl From<&str> for AssertionRef {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for AssertionRef {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<Arc<dyn Assertion>> for AssertionRef {
    fn from(assertion: Arc<dyn Assertion>) -> Self {
        Self::Inline(assertion)
    }
}

/// Assertions configured for one permission: a single reference or an
/// ordered list of them.
///
/// Both shapes read back through [`AssertionBinding::refs`] as one ordered
/// slice, so the evaluation path never branches on the shape.
#[derive(Clone, Debug)]
pub enum AssertionBinding {
    One(AssertionRef),
    Many(Vec<AssertionRef>),
}

impl AssertionBinding {
    /// The configured references in evaluation order
    #[must_use]
    pub fn refs(&self) -> &[AssertionRef] {
        match self {
            Self::One(reference) => std::slice::from_ref(reference),
            Self::Many(references) => references,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs().is_empty()
    }
}

impl From<AssertionRef> for AssertionBinding {
    fn from(reference: AssertionRef) -> Self {
        Self::One(reference)
    }
}

impl From<Vec<AssertionRef>> for AssertionBinding {
    fn from(references: Vec<AssertionRef>) -> Self {
        Self::Many(references)
    }
}

impl From<&str> for AssertionBinding {
    fn from(name: &str) -> Self {
        Self::One(name.into())
    }
}

impl From<Arc<dyn Assertion>> for AssertionBinding {
    fn from(assertion: Arc<dyn Assertion>) -> Self {
        Self::One(assertion.into())
    }
}

/// Configuration shape of an assertion binding: one name or a list of names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssertionConfig {
    One(String),
    Many(Vec<String>),
}

impl AssertionConfig {
    /// Configured names in evaluation order
    #[must_use]
    pub fn names(&self) -> &[String] {
        match self {
            Self::One(name) => std::slice::from_ref(name),
            Self::Many(names) => names,
        }
    }
}

impl From<&AssertionConfig> for AssertionBinding {
    fn from(config: &AssertionConfig) -> Self {
        match config {
            AssertionConfig::One(name) => Self::One(AssertionRef::named(name)),
            AssertionConfig::Many(names) => {
                let references = names.iter().map(AssertionRef::named).collect();
                Self::Many(references)
            }
        }
    }
}
