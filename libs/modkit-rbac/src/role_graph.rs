use crate::{errors::RbacError, role::Role};
use arc_swap::ArcSwap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// All known roles, keyed by id, answering hierarchical permission queries.
///
/// The graph is immutable once built. Reloading means building a new graph
/// and swapping it in through a [`RoleGraphHandle`].
#[derive(Debug, Clone, Default)]
pub struct RoleGraph {
    roles: HashMap<String, Role>,
    create_missing_roles: bool,
}

impl RoleGraph {
    /// Build a graph from roles. A later role with the same id replaces an
    /// earlier one.
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: roles
                .into_iter()
                .map(|role| (role.id().to_owned(), role))
                .collect(),
            create_missing_roles: false,
        }
    }

    /// Treat unknown role ids as empty roles instead of failing
    #[must_use]
    pub fn with_create_missing_roles(mut self, enabled: bool) -> Self {
        self.create_missing_roles = enabled;
        self
    }

    #[must_use]
    pub fn create_missing_roles(&self) -> bool {
        self.create_missing_roles
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Role> {
        self.roles.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.roles.contains_key(id)
    }

    /// Ids of all roles in the graph, in no particular order
    pub fn role_ids(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Check every parent reference up front.
    ///
    /// Always succeeds when missing roles are created implicitly.
    ///
    /// # Errors
    /// Returns [`RbacError::UnknownRole`] for the first dangling parent found.
    pub fn validate(&self) -> Result<(), RbacError> {
        if self.create_missing_roles {
            return Ok(());
        }

        let mut ids: Vec<&String> = self.roles.keys().collect();
        ids.sort();

        for id in ids {
            let role = &self.roles[id];
            if let Some(parent) = role.parents().iter().find(|p| !self.contains(p)) {
                return Err(RbacError::unknown_parent(parent, id));
            }
        }
        Ok(())
    }

    /// Does any of `role_ids`, or any of their ancestors, grant `permission`?
    ///
    /// Grant is a pure OR across roles and ancestors and stops at the first
    /// match. Each role is visited at most once per call, so cyclic parent
    /// links terminate. An empty `role_ids` is `Ok(false)`.
    ///
    /// Traversal is depth-first: roots in the given order, parents in
    /// ascending id order. With missing roles not created implicitly the
    /// outcome therefore depends on what is reached first: a dangling parent
    /// ordered before a granting one is an error, while a grant reached
    /// before the dangling parent is `Ok(true)`. [`RoleGraph::validate`]
    /// rules this out up front.
    ///
    /// # Errors
    /// Returns [`RbacError::UnknownRole`] when traversal reaches a role id
    /// absent from the graph and missing roles are not created implicitly.
    pub fn is_granted<I, S>(&self, role_ids: I, permission: &str) -> Result<bool, RbacError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut pending: Vec<(&str, Option<&str>)> = Vec::new();

        for root in role_ids {
            let Some(root) = self.lookup(root.as_ref(), None)? else {
                continue;
            };
            pending.push((root.id(), None));

            while let Some((id, referenced_by)) = pending.pop() {
                if !visited.insert(id) {
                    continue;
                }
                let Some(role) = self.lookup(id, referenced_by)? else {
                    continue;
                };
                if role.has_permission(permission) {
                    tracing::trace!(role = role.id(), permission, "permission granted by role");
                    return Ok(true);
                }
                // reversed so the lowest-ordered parent is popped first
                for parent in role.parents().iter().rev() {
                    if !visited.contains(parent.as_str()) {
                        pending.push((parent.as_str(), Some(role.id())));
                    }
                }
            }
        }

        Ok(false)
    }

    /// `Ok(None)` stands for an implicitly created empty role
    fn lookup(&self, id: &str, referenced_by: Option<&str>) -> Result<Option<&Role>, RbacError> {
        match self.roles.get(id) {
            Some(role) => Ok(Some(role)),
            None if self.create_missing_roles => {
                tracing::trace!(role = id, "treating unknown role as empty");
                Ok(None)
            }
            None => Err(match referenced_by {
                Some(parent) => RbacError::unknown_parent(id, parent),
                None => RbacError::unknown_role(id),
            }),
        }
    }
}

/// Shared, atomically replaceable reference to the current [`RoleGraph`].
///
/// Readers get a consistent snapshot without locking; a reload swaps the
/// whole graph and never mutates one that evaluations may be reading.
#[derive(Debug, Clone)]
pub struct RoleGraphHandle {
    inner: Arc<ArcSwap<RoleGraph>>,
}

impl RoleGraphHandle {
    #[must_use]
    pub fn new(graph: RoleGraph) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(graph)),
        }
    }

    /// Snapshot of the current graph
    #[must_use]
    pub fn load(&self) -> Arc<RoleGraph> {
        self.inner.load_full()
    }

    /// Install `graph` for all subsequent evaluations and return the previous
    /// one. Evaluations already holding a snapshot finish against it.
    pub fn replace(&self, graph: RoleGraph) -> Arc<RoleGraph> {
        let roles = graph.len();
        let previous = self.inner.swap(Arc::new(graph));
        tracing::info!(roles, previous_roles = previous.len(), "role graph replaced");
        previous
    }
}

impl From<RoleGraph> for RoleGraphHandle {
    fn from(graph: RoleGraph) -> Self {
        Self::new(graph)
    }
}
