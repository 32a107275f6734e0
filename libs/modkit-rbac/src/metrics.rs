//! Metrics tracking for authorization decisions
//!
//! Trait-based so any backend (Prometheus, `StatsD`, ...) can be plugged in.

use std::time::Duration;

/// Decision outcomes worth counting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RbacEvent {
    /// Role graph granted and every assertion passed
    Granted,

    /// The role resolver returned no roles
    DeniedNoRoles,

    /// No resolved role or ancestor grants the permission
    DeniedByRoleGraph,

    /// An assertion vetoed a role-granted permission
    DeniedByAssertion,

    /// The decision could not be evaluated
    EvaluationFailed,
}

impl RbacEvent {
    /// Get the metric name for this event
    #[must_use]
    pub fn metric_name(&self) -> &'static str {
        match self {
            RbacEvent::Granted => "rbac.decision.granted",
            RbacEvent::DeniedNoRoles => "rbac.decision.denied.no_roles",
            RbacEvent::DeniedByRoleGraph => "rbac.decision.denied.role_graph",
            RbacEvent::DeniedByAssertion => "rbac.decision.denied.assertion",
            RbacEvent::EvaluationFailed => "rbac.decision.failed",
        }
    }
}

/// Labels for rbac metrics.
///
/// Borrowed from the decision being recorded; backends that keep labels
/// past the call copy what they need.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RbacMetricLabels<'a> {
    /// Permission being checked
    pub permission: Option<&'a str>,

    /// Error kind (for failures)
    pub error_type: Option<&'a str>,
}

impl<'a> RbacMetricLabels<'a> {
    #[must_use]
    pub fn with_permission(mut self, permission: &'a str) -> Self {
        self.permission = Some(permission);
        self
    }

    #[must_use]
    pub fn with_error_type(mut self, error_type: &'a str) -> Self {
        self.error_type = Some(error_type);
        self
    }
}

/// Trait for metrics backends
pub trait RbacMetrics: Send + Sync {
    /// Record a decision event
    fn record_event(&self, event: RbacEvent, labels: &RbacMetricLabels<'_>);

    /// Record how long a decision took
    fn record_duration(&self, duration: Duration, labels: &RbacMetricLabels<'_>);
}

/// No-op metrics implementation (default)
#[derive(Debug, Clone, Copy)]
pub struct NoOpMetrics;

impl RbacMetrics for NoOpMetrics {
    fn record_event(&self, _event: RbacEvent, _labels: &RbacMetricLabels<'_>) {
        // No-op
    }

    fn record_duration(&self, _duration: Duration, _labels: &RbacMetricLabels<'_>) {
        // No-op
    }
}

/// Logging-based metrics implementation (for debugging)
#[derive(Debug, Clone, Copy)]
pub struct LoggingMetrics;

impl RbacMetrics for LoggingMetrics {
    fn record_event(&self, event: RbacEvent, labels: &RbacMetricLabels<'_>) {
        tracing::debug!(
            metric = event.metric_name(),
            permission = ?labels.permission,
            error_type = ?labels.error_type,
            "Rbac event recorded"
        );
    }

    fn record_duration(&self, duration: Duration, labels: &RbacMetricLabels<'_>) {
        tracing::debug!(
            metric = "rbac.decision.duration_us",
            duration_us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX),
            permission = ?labels.permission,
            "Decision duration recorded"
        );
    }
}
