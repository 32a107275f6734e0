use thiserror::Error;

/// Boxed error produced by an external role resolver
pub type ResolverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures that prevent a decision from being evaluated.
///
/// A plain denial is never represented here: `is_granted` returns `Ok(false)`
/// for that. Every variant means "cannot evaluate", so callers can answer with
/// a server error instead of a forbidden response.
#[derive(Debug, Error)]
pub enum RbacError {
    #[error("unknown role '{role}'{}", referenced_by_suffix(.referenced_by.as_deref()))]
    UnknownRole {
        role: String,
        /// Role that listed `role` as a parent, `None` for a root role
        referenced_by: Option<String>,
    },

    #[error("unknown assertion '{0}'")]
    UnknownAssertion(String),

    #[error("role resolution failed: {0}")]
    RoleResolution(#[source] ResolverError),
}

fn referenced_by_suffix(referenced_by: Option<&str>) -> String {
    referenced_by
        .map(|parent| format!(" (parent of '{parent}')"))
        .unwrap_or_default()
}

impl RbacError {
    pub fn unknown_role(role: impl Into<String>) -> Self {
        Self::UnknownRole {
            role: role.into(),
            referenced_by: None,
        }
    }

    pub fn unknown_parent(role: impl Into<String>, referenced_by: impl Into<String>) -> Self {
        Self::UnknownRole {
            role: role.into(),
            referenced_by: Some(referenced_by.into()),
        }
    }

    pub fn role_resolution(err: impl Into<ResolverError>) -> Self {
        Self::RoleResolution(err.into())
    }

    /// `true` when the failure is an operator/programmer misconfiguration
    /// rather than a failing collaborator
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::UnknownRole { .. } | Self::UnknownAssertion(_) => true,
            Self::RoleResolution(_) => false,
        }
    }

    /// Short, stable label for metrics and logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownRole { .. } => "unknown_role",
            Self::UnknownAssertion(_) => "unknown_assertion",
            Self::RoleResolution(_) => "role_resolution",
        }
    }
}
