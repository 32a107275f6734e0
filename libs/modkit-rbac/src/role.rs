use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// A named bundle of granted permissions plus the roles it inherits from.
///
/// Parents are kept ordered so graph traversal is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: String,
    #[serde(default)]
    permissions: HashSet<String>,
    #[serde(default)]
    parents: BTreeSet<String>,
}

impl Role {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            permissions: HashSet::new(),
            parents: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    #[must_use]
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions.extend(permissions.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.insert(parent.into());
        self
    }

    #[must_use]
    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents.extend(parents.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn permissions(&self) -> &HashSet<String> {
        &self.permissions
    }

    #[must_use]
    pub fn parents(&self) -> &BTreeSet<String> {
        &self.parents
    }

    /// Direct grant only, parents are not consulted
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}
