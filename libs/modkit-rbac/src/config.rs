use crate::{
    assertion::{AssertionBinding, AssertionConfig, AssertionRef},
    config_error::ConfigError,
    errors::RbacError,
    role::Role,
    role_graph::RoleGraph,
    role_service::RoleService,
    service::AuthorizationService,
    traits::AssertionContainer,
};
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path, sync::Arc};

/// Figment key the rbac section lives under
pub const CONFIG_SECTION: &str = "rbac";

/// Prefix of environment variables overriding file values
pub const ENV_PREFIX: &str = "RBAC__";

/// Main rbac configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RbacConfig {
    /// Role applied when no identity is present
    #[serde(default = "default_guest_role")]
    pub guest_role: String,

    /// Role applied to an identity carrying no roles (`null` disables)
    #[serde(default = "default_default_role")]
    pub default_role: Option<String>,

    /// Treat unknown role ids as empty roles instead of failing
    #[serde(default = "default_create_missing_roles")]
    pub create_missing_roles: bool,

    /// Role definitions keyed by role id
    #[serde(default)]
    pub roles: HashMap<String, RoleConfig>,

    /// Permission name to the assertion name(s) guarding it
    #[serde(default)]
    pub assertion_map: HashMap<String, AssertionConfig>,
}

fn default_guest_role() -> String {
    "guest".to_owned()
}

#[allow(clippy::unnecessary_wraps)]
fn default_default_role() -> Option<String> {
    Some("member".to_owned())
}

fn default_create_missing_roles() -> bool {
    true
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            guest_role: default_guest_role(),
            default_role: default_default_role(),
            create_missing_roles: default_create_missing_roles(),
            roles: HashMap::new(),
            assertion_map: HashMap::new(),
        }
    }
}

/// Definition of a single role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    #[serde(default)]
    pub permissions: Vec<String>,

    /// Roles this one inherits permissions from
    #[serde(default)]
    pub parents: Vec<String>,
}

impl RbacConfig {
    /// Extract the `rbac` section of an already assembled figment
    ///
    /// # Errors
    /// Returns [`ConfigError::Load`] when the section does not deserialize.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        Ok(figment.extract_inner(CONFIG_SECTION)?)
    }

    /// Load a YAML file and apply `RBAC__`-prefixed environment overrides.
    ///
    /// The file holds the fields at top level (no `rbac:` wrapper); nested
    /// keys in variables are separated by `__`, e.g. `RBAC__GUEST_ROLE`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Load`] on unreadable or malformed input, or any
    /// [`RbacConfig::validate`] failure.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;

        tracing::info!(
            path = %path.as_ref().display(),
            roles = config.roles.len(),
            asserted_permissions = config.assertion_map.len(),
            "rbac configuration loaded"
        );
        Ok(config)
    }

    /// Validate the configuration for consistency
    ///
    /// # Errors
    /// Rejects blank role ids and blank assertion names. When missing roles
    /// are not created implicitly, also rejects parents, `guest_role` and
    /// `default_role` that are never defined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.guest_role.trim().is_empty() {
            return Err(ConfigError::InvalidRole {
                role: self.guest_role.clone(),
                reason: "guest role must not be blank".to_owned(),
            });
        }

        for (id, role) in &self.roles {
            if id.trim().is_empty() {
                return Err(ConfigError::InvalidRole {
                    role: id.clone(),
                    reason: "role id must not be blank".to_owned(),
                });
            }
            if let Some(parent) = role.parents.iter().find(|p| p.trim().is_empty()) {
                return Err(ConfigError::InvalidRole {
                    role: id.clone(),
                    reason: format!("blank parent role id '{parent}'"),
                });
            }
        }

        for (permission, assertions) in &self.assertion_map {
            if assertions.names().iter().any(|name| name.trim().is_empty()) {
                return Err(ConfigError::MalformedAssertion {
                    permission: permission.clone(),
                    reason: "assertion names must not be blank".to_owned(),
                });
            }
        }

        self.role_graph().validate()?;

        if !self.create_missing_roles {
            let assigned = std::iter::once(&self.guest_role).chain(&self.default_role);
            for role in assigned {
                if !self.roles.contains_key(role) {
                    return Err(RbacError::unknown_role(role.as_str()).into());
                }
            }
        }
        Ok(())
    }

    /// Build the role graph described by `roles`
    #[must_use]
    pub fn role_graph(&self) -> RoleGraph {
        let roles = self.roles.iter().map(|(id, role)| {
            Role::new(id.as_str())
                .with_permissions(role.permissions.iter().map(String::as_str))
                .with_parents(role.parents.iter().map(String::as_str))
        });
        RoleGraph::new(roles).with_create_missing_roles(self.create_missing_roles)
    }

    /// Default role resolver honoring `guest_role` and `default_role`
    #[must_use]
    pub fn role_service(&self) -> RoleService {
        RoleService::new(self.guest_role.as_str()).with_default_role(self.default_role.clone())
    }

    /// `assertion_map` normalized into bindings
    #[must_use]
    pub fn assertion_bindings(&self) -> HashMap<String, AssertionBinding> {
        self.assertion_map
            .iter()
            .map(|(permission, config)| (permission.clone(), AssertionBinding::from(config)))
            .collect()
    }
}

/// Build an `AuthorizationService` from configuration.
///
/// Every assertion name in `assertion_map` is resolved against `container`
/// up front so a missing registration fails here rather than on the first
/// request that needs it.
///
/// # Errors
/// Returns a [`ConfigError`] if validation fails or an assertion name cannot
/// be resolved.
pub fn build_authorization_service(
    config: &RbacConfig,
    container: Arc<dyn AssertionContainer>,
) -> Result<AuthorizationService, ConfigError> {
    config.validate()?;

    let bindings = config.assertion_bindings();
    for (permission, binding) in &bindings {
        for reference in binding.refs() {
            container.resolve(reference)?;
            if let AssertionRef::Named(name) = reference {
                tracing::debug!(permission = %permission, assertion = %name, "assertion bound");
            }
        }
    }

    let graph = config.role_graph();
    let roles = graph.len();

    let resolver = Arc::new(config.role_service());
    let service = AuthorizationService::new(graph, resolver, container);

    tracing::info!(
        roles,
        guest_role = %config.guest_role,
        default_role = ?config.default_role,
        create_missing_roles = config.create_missing_roles,
        "Authorization service initialized"
    );

    Ok(service.with_assertions(bindings))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::{assertion::assertion_fn, registry::AssertionRegistry};
    use figment::providers::Serialized;
    use serde_json::json;

    fn role(permissions: &[&str], parents: &[&str]) -> RoleConfig {
        RoleConfig {
            permissions: permissions.iter().map(|p| (*p).to_owned()).collect(),
            parents: parents.iter().map(|p| (*p).to_owned()).collect(),
        }
    }

    fn define(config: &mut RbacConfig, id: &str, role: RoleConfig) {
        config.roles.insert(id.to_owned(), role);
    }

    fn strict() -> RbacConfig {
        RbacConfig {
            create_missing_roles: false,
            ..RbacConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = RbacConfig::default();
        assert_eq!(config.guest_role, "guest");
        assert_eq!(config.default_role.as_deref(), Some("member"));
        assert!(config.create_missing_roles);
        assert!(config.roles.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_figment_section() {
        let figment = Figment::new().merge(Serialized::defaults(json!({
            "rbac": {
                "guest_role": "anonymous",
                "default_role": null,
                "create_missing_roles": false,
                "roles": {
                    "anonymous": { "permissions": ["post.read"] },
                    "editor": { "permissions": ["post.edit"], "parents": ["anonymous"] }
                },
                "assertion_map": {
                    "post.edit": "is_author",
                    "post.delete": ["is_author", "not_locked"]
                }
            }
        })));

        let config = RbacConfig::from_figment(&figment).unwrap();
        assert_eq!(config.guest_role, "anonymous");
        assert_eq!(config.default_role, None);
        assert!(!config.create_missing_roles);
        assert_eq!(config.roles["editor"], role(&["post.edit"], &["anonymous"]));
        assert_eq!(
            config.assertion_map["post.edit"],
            AssertionConfig::One("is_author".to_owned())
        );
        assert_eq!(config.assertion_map["post.delete"].names().len(), 2);
    }

    #[test]
    fn test_malformed_assertion_shape_fails_to_load() {
        let figment = Figment::new().merge(Serialized::defaults(json!({
            "rbac": { "assertion_map": { "post.edit": { "name": "is_author" } } }
        })));

        assert!(matches!(
            RbacConfig::from_figment(&figment),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_blank_assertion_name_is_malformed() {
        let mut config = RbacConfig::default();
        config.assertion_map.insert(
            "post.edit".to_owned(),
            AssertionConfig::Many(vec!["is_author".to_owned(), " ".to_owned()]),
        );

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MalformedAssertion { permission, .. }) if permission == "post.edit"
        ));
    }

    #[test]
    fn test_dangling_parent_rejected_only_when_strict() {
        let mut config = RbacConfig::default();
        define(&mut config, "editor", role(&["post.edit"], &["ghost"]));
        assert!(config.validate().is_ok());

        config.create_missing_roles = false;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Rbac(RbacError::UnknownRole { .. })));
        assert_eq!(err.to_string(), "unknown role 'ghost' (parent of 'editor')");
    }

    #[test]
    fn test_strict_mode_requires_guest_role_defined() {
        let mut config = strict();
        config.default_role = None;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Rbac(RbacError::UnknownRole { .. })));
        assert_eq!(err.to_string(), "unknown role 'guest'");

        define(&mut config, "guest", RoleConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strict_mode_requires_default_role_defined() {
        let mut config = strict();
        define(&mut config, "guest", role(&["post.read"], &[]));
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "unknown role 'member'");

        define(&mut config, "member", role(&[], &["guest"]));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_undefined_assigned_roles_allowed_when_lenient() {
        let config = RbacConfig {
            guest_role: "visitor".to_owned(),
            ..RbacConfig::default()
        };
        assert!(config.roles.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_role_graph_from_config() {
        let mut config = RbacConfig::default();
        define(&mut config, "guest", role(&["post.read"], &[]));
        define(&mut config, "member", role(&["post.comment"], &["guest"]));

        let graph = config.role_graph();
        assert_eq!(graph.len(), 2);
        assert!(graph.create_missing_roles());
        assert!(graph.is_granted(["member"], "post.read").unwrap());
    }

    #[test]
    fn test_build_service_requires_registered_assertions() {
        let mut config = RbacConfig::default();
        define(&mut config, "member", role(&["post.edit"], &[]));
        config.assertion_map.insert(
            "post.edit".to_owned(),
            AssertionConfig::One("is_author".to_owned()),
        );

        let empty: Arc<dyn AssertionContainer> = Arc::new(AssertionRegistry::new());
        assert!(matches!(
            build_authorization_service(&config, empty),
            Err(ConfigError::Rbac(RbacError::UnknownAssertion(name))) if name == "is_author"
        ));

        let registry = AssertionRegistry::new().with("is_author", assertion_fn(|_, _, _| true));
        let service = build_authorization_service(&config, Arc::new(registry)).unwrap();
        assert!(service.assertions_for("post.edit").is_some());
        assert!(service.assertions_for("post.read").is_none());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = RbacConfig::default();
        define(&mut config, "admin", role(&["*"], &["member"]));

        let json = serde_json::to_string(&config).unwrap();
        let deserialized: RbacConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.roles["admin"], config.roles["admin"]);
        assert_eq!(deserialized.guest_role, "guest");
    }
}
