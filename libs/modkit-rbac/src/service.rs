use crate::{
    assertion::AssertionBinding,
    assertion_set::AssertionSet,
    context::Context,
    errors::RbacError,
    identity::Identity,
    metrics::{NoOpMetrics, RbacEvent, RbacMetricLabels, RbacMetrics},
    role_graph::RoleGraphHandle,
    traits::{AssertionContainer, Authorizer, RoleResolver},
};
use std::{collections::HashMap, fmt, sync::Arc, time::Instant};

/// Outcome of a decision, with the stage that settled it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Granted,
    /// The role resolver returned no roles
    NoRoles,
    /// No resolved role or ancestor grants the permission
    RoleGraphDenied,
    /// The role graph granted, an assertion vetoed
    AssertionDenied,
}

impl Decision {
    #[must_use]
    pub fn is_granted(self) -> bool {
        matches!(self, Decision::Granted)
    }

    fn event(self) -> RbacEvent {
        match self {
            Decision::Granted => RbacEvent::Granted,
            Decision::NoRoles => RbacEvent::DeniedNoRoles,
            Decision::RoleGraphDenied => RbacEvent::DeniedByRoleGraph,
            Decision::AssertionDenied => RbacEvent::DeniedByAssertion,
        }
    }
}

/// Orchestrates role resolution, the role graph and per-permission
/// assertions into a single deny-by-default decision.
///
/// Holds no per-call mutable state; one instance serves all concurrent
/// evaluations.
pub struct AuthorizationService {
    role_graph: RoleGraphHandle,
    role_resolver: Arc<dyn RoleResolver>,
    assertion_container: Arc<dyn AssertionContainer>,
    assertions: HashMap<String, AssertionBinding>,
    metrics: Arc<dyn RbacMetrics>,
}

impl AuthorizationService {
    pub fn new(
        role_graph: impl Into<RoleGraphHandle>,
        role_resolver: Arc<dyn RoleResolver>,
        assertion_container: Arc<dyn AssertionContainer>,
    ) -> Self {
        Self {
            role_graph: role_graph.into(),
            role_resolver,
            assertion_container,
            assertions: HashMap::new(),
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Bind assertions to `permission`, replacing any previous binding
    #[must_use]
    pub fn with_assertion(
        mut self,
        permission: impl Into<String>,
        binding: impl Into<AssertionBinding>,
    ) -> Self {
        self.assertions.insert(permission.into(), binding.into());
        self
    }

    #[must_use]
    pub fn with_assertions<I, P>(mut self, assertions: I) -> Self
    where
        I: IntoIterator<Item = (P, AssertionBinding)>,
        P: Into<String>,
    {
        for (permission, binding) in assertions {
            self.assertions.insert(permission.into(), binding);
        }
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn RbacMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Handle to the live role graph; replace through it to reload roles
    #[must_use]
    pub fn role_graph(&self) -> &RoleGraphHandle {
        &self.role_graph
    }

    #[must_use]
    pub fn assertions_for(&self, permission: &str) -> Option<&AssertionBinding> {
        self.assertions.get(permission)
    }

    /// Evaluate a decision and report which stage settled it.
    ///
    /// # Errors
    /// See [`Authorizer::is_granted`].
    pub fn decide(
        &self,
        identity: Option<&dyn Identity>,
        permission: &str,
        context: Context<'_>,
    ) -> Result<Decision, RbacError> {
        let started = Instant::now();
        let result = self.evaluate(identity, permission, context);

        let labels = RbacMetricLabels::default().with_permission(permission);
        match &result {
            Ok(decision) => {
                tracing::debug!(permission, decision = ?decision, "authorization decided");
                self.metrics.record_event(decision.event(), &labels);
            }
            Err(err) => {
                tracing::warn!(permission, error = %err, "authorization could not be evaluated");
                let failed = labels.with_error_type(err.kind());
                self.metrics.record_event(RbacEvent::EvaluationFailed, &failed);
            }
        }
        self.metrics.record_duration(started.elapsed(), &labels);

        result
    }

    fn evaluate(
        &self,
        identity: Option<&dyn Identity>,
        permission: &str,
        context: Context<'_>,
    ) -> Result<Decision, RbacError> {
        let roles = self.role_resolver.identity_roles(identity, context)?;
        if roles.is_empty() {
            return Ok(Decision::NoRoles);
        }

        let graph = self.role_graph.load();
        if !graph.is_granted(&roles, permission)? {
            tracing::trace!(permission, roles = ?roles, "role graph denied");
            return Ok(Decision::RoleGraphDenied);
        }

        let Some(binding) = self.assertions.get(permission).filter(|b| !b.is_empty()) else {
            return Ok(Decision::Granted);
        };

        let set = AssertionSet::new(self.assertion_container.as_ref(), binding.refs());
        if set.assert(permission, identity, context)? {
            Ok(Decision::Granted)
        } else {
            Ok(Decision::AssertionDenied)
        }
    }
}

impl Authorizer for AuthorizationService {
    fn is_granted(
        &self,
        identity: Option<&dyn Identity>,
        permission: &str,
        context: Context<'_>,
    ) -> Result<bool, RbacError> {
        self.decide(identity, permission, context).map(Decision::is_granted)
    }
}

impl fmt::Debug for AuthorizationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut permissions: Vec<&String> = self.assertions.keys().collect();
        permissions.sort();
        f.debug_struct("AuthorizationService")
            .field("roles", &self.role_graph.load().len())
            .field("asserted_permissions", &permissions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::{
        assertion::{AssertionRef, assertion_fn},
        identity::SimpleIdentity,
        registry::AssertionRegistry,
        role::Role,
        role_graph::RoleGraph,
        role_service::RoleService,
    };
    use std::{sync::Mutex, time::Duration};

    #[derive(Default)]
    struct RecordingMetrics {
        events: Mutex<Vec<RbacEvent>>,
        labels: Mutex<Vec<(Option<String>, Option<String>)>>,
    }

    impl RbacMetrics for RecordingMetrics {
        fn record_event(&self, event: RbacEvent, labels: &RbacMetricLabels<'_>) {
            let permission = labels.permission.map(str::to_owned);
            let error_type = labels.error_type.map(str::to_owned);
            self.events.lock().unwrap().push(event);
            self.labels.lock().unwrap().push((permission, error_type));
        }

        fn record_duration(&self, _duration: Duration, _labels: &RbacMetricLabels<'_>) {}
    }

    fn graph() -> RoleGraph {
        RoleGraph::new([
            Role::new("guest").with_permission("post.read"),
            Role::new("member")
                .with_permission("post.comment")
                .with_parent("guest"),
            Role::new("editor")
                .with_permission("post.edit")
                .with_parent("member"),
        ])
    }

    fn service() -> AuthorizationService {
        let registry = AssertionRegistry::new().with(
            "is_author",
            assertion_fn(|_, identity, ctx| match (identity, ctx.downcast_ref::<&str>()) {
                (Some(identity), Some(author)) => identity.subject() == *author,
                _ => false,
            }),
        );
        let roles = RoleService::new("guest").with_default_role(Some("member".to_owned()));
        let svc = AuthorizationService::new(graph(), Arc::new(roles), Arc::new(registry));
        svc.with_assertion("post.edit", "is_author")
    }

    /// Service whose guest role is missing from the strict graph
    fn unresolvable() -> AuthorizationService {
        let roles = Arc::new(RoleService::new("ghost"));
        AuthorizationService::new(graph(), roles, Arc::new(AssertionRegistry::new()))
    }

    fn guest_may(svc: &AuthorizationService, permission: &str) -> bool {
        svc.is_granted(None, permission, Context::none()).unwrap()
    }

    fn edit_as(
        svc: &AuthorizationService,
        identity: &SimpleIdentity,
        author: &'static str,
    ) -> Decision {
        svc.decide(Some(identity), "post.edit", Context::new(&author)).unwrap()
    }

    #[test]
    fn test_guest_reads() {
        let svc = service();
        assert!(guest_may(&svc, "post.read"));
        assert!(!guest_may(&svc, "post.comment"));
    }

    #[test]
    fn test_assertion_vetoes_granted_permission() {
        let svc = service();
        let alice = SimpleIdentity::new("alice").with_role("editor");

        assert_eq!(edit_as(&svc, &alice, "alice"), Decision::Granted);
        assert_eq!(edit_as(&svc, &alice, "bob"), Decision::AssertionDenied);
    }

    #[test]
    fn test_role_graph_denial_skips_assertions() {
        let svc = service();
        let bob = SimpleIdentity::new("bob");
        assert_eq!(edit_as(&svc, &bob, "bob"), Decision::RoleGraphDenied);
    }

    #[test]
    fn test_no_roles_is_denied() {
        let svc = AuthorizationService::new(
            graph(),
            Arc::new(RoleService::new("guest")),
            Arc::new(AssertionRegistry::new()),
        );
        let nobody = SimpleIdentity::new("nobody");
        let decision = svc.decide(Some(&nobody), "post.read", Context::none());
        assert_eq!(decision.unwrap(), Decision::NoRoles);
    }

    #[test]
    fn test_empty_binding_means_no_assertions() {
        let svc = service().with_assertion("post.comment", Vec::<AssertionRef>::new());
        let carol = SimpleIdentity::new("carol").with_role("member");
        let granted = svc.is_granted(Some(&carol), "post.comment", Context::none());
        assert!(granted.unwrap());
    }

    #[test]
    fn test_metrics_record_outcomes() {
        let metrics = Arc::new(RecordingMetrics::default());
        let svc = service().with_metrics(metrics.clone());
        let editor = SimpleIdentity::new("alice").with_role("editor");

        svc.is_granted(None, "post.read", Context::none()).unwrap();
        svc.is_granted(None, "post.edit", Context::none()).unwrap();
        svc.is_granted(Some(&editor), "post.edit", Context::new(&"bob")).unwrap();

        let broken = unresolvable().with_metrics(metrics.clone());
        let failure = broken.is_granted(None, "post.read", Context::none());
        assert!(failure.is_err());

        assert_eq!(
            *metrics.events.lock().unwrap(),
            vec![
                RbacEvent::Granted,
                RbacEvent::DeniedByRoleGraph,
                RbacEvent::DeniedByAssertion,
                RbacEvent::EvaluationFailed,
            ]
        );
    }

    #[test]
    fn test_metric_labels_borrow_permission_and_error_kind() {
        let metrics = Arc::new(RecordingMetrics::default());
        let svc = service().with_metrics(metrics.clone());
        let broken = unresolvable().with_metrics(metrics.clone());

        let permission = String::from("post.read");
        assert!(guest_may(&svc, &permission));
        let failure = broken.is_granted(None, &permission, Context::none());
        assert!(failure.is_err());
        drop(permission);

        let read = Some("post.read".to_owned());
        let granted = (read.clone(), None);
        let failed = (read, Some("unknown_role".to_owned()));
        assert_eq!(*metrics.labels.lock().unwrap(), vec![granted, failed]);
    }

    #[test]
    fn test_debug_lists_asserted_permissions() {
        let rendered = format!("{:?}", service());
        assert!(rendered.contains("post.edit"));
        assert!(rendered.contains("roles: 3"));
    }
}
