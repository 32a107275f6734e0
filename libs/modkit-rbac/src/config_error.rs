use crate::errors::RbacError;
use thiserror::Error;

/// Errors that can occur while loading or wiring rbac configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load rbac configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("malformed assertion configuration for permission '{permission}': {reason}")]
    MalformedAssertion { permission: String, reason: String },

    #[error("invalid role configuration for '{role}': {reason}")]
    InvalidRole { role: String, reason: String },

    #[error(transparent)]
    Rbac(#[from] RbacError),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}
