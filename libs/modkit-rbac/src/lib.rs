#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Role-based access control decision engine.
//!
//! A decision runs three stages, each able to deny:
//!
//! 1. a [`RoleResolver`] maps the (possibly absent) identity to role ids; no
//!    roles means deny
//! 2. the [`RoleGraph`] checks whether any of those roles, or their
//!    ancestors, grants the permission
//! 3. the [`AssertionSet`] bound to the permission, if any, must pass in full
//!
//! Denials are `Ok(false)`. Misconfiguration (unknown roles, unresolvable
//! assertions) surfaces as [`RbacError`] so callers can tell "forbidden"
//! apart from "cannot evaluate".

// Core modules
pub mod context;
pub mod errors;
pub mod identity;
pub mod role;
pub mod role_graph;
pub mod traits;

pub mod assertion;
pub mod assertion_set;
pub mod registry;
pub mod role_service;
pub mod service;

// Configuration and observability
pub mod config;
pub mod config_error;
pub mod metrics;

// Core exports
pub use context::Context;
pub use errors::RbacError;
pub use identity::{Identity, SimpleIdentity};
pub use role::Role;
pub use role_graph::{RoleGraph, RoleGraphHandle};
pub use traits::{AssertionContainer, Authorizer, RoleResolver};

pub use assertion::{Assertion, AssertionBinding, AssertionConfig, AssertionRef, assertion_fn};
pub use assertion_set::AssertionSet;
pub use registry::{AssertionFactory, AssertionRegistry};
pub use role_service::RoleService;
pub use service::{AuthorizationService, Decision};

pub use config::{RbacConfig, RoleConfig, build_authorization_service};
pub use config_error::ConfigError;
pub use metrics::{LoggingMetrics, NoOpMetrics, RbacEvent, RbacMetricLabels, RbacMetrics};
