use crate::{context::Context, errors::RbacError, identity::Identity, traits::RoleResolver};

/// Default role resolver.
///
/// - no identity: the guest role
/// - identity without roles: the default role, if one is configured
/// - otherwise: the identity's own roles
#[derive(Debug, Clone)]
pub struct RoleService {
    guest_role: String,
    default_role: Option<String>,
}

impl RoleService {
    pub fn new(guest_role: impl Into<String>) -> Self {
        Self {
            guest_role: guest_role.into(),
            default_role: None,
        }
    }

    #[must_use]
    pub fn with_default_role(mut self, default_role: Option<String>) -> Self {
        self.default_role = default_role;
        self
    }

    #[must_use]
    pub fn guest_role(&self) -> &str {
        &self.guest_role
    }

    #[must_use]
    pub fn default_role(&self) -> Option<&str> {
        self.default_role.as_deref()
    }
}

impl RoleResolver for RoleService {
    fn identity_roles(
        &self,
        identity: Option<&dyn Identity>,
        _context: Context<'_>,
    ) -> Result<Vec<String>, RbacError> {
        let Some(identity) = identity else {
            return Ok(vec![self.guest_role.clone()]);
        };

        let roles = identity.roles();
        if roles.is_empty() {
            return Ok(self.default_role.iter().cloned().collect());
        }
        Ok(roles.to_vec())
    }
}
