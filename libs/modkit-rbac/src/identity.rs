use serde::{Deserialize, Serialize};

/// The actor being authorized.
///
/// The decision engine treats identities as opaque and only hands them to
/// the role resolver and to assertions. `roles` is what the default
/// [`crate::RoleService`] reads; custom resolvers are free to ignore it.
pub trait Identity: Send + Sync {
    /// Stable identifier of the actor (user id, service account, ...)
    fn subject(&self) -> &str;

    /// Role ids attached directly to this identity
    fn roles(&self) -> &[String];
}

/// Plain identity value for callers that have no richer type of their own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleIdentity {
    subject: String,
    #[serde(default)]
    roles: Vec<String>,
}

impl SimpleIdentity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            roles: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }
}

impl Identity for SimpleIdentity {
    fn subject(&self) -> &str {
        &self.subject
    }

    fn roles(&self) -> &[String] {
        &self.roles
    }
}
