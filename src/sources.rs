//! External collaborator interfaces: membership, connect, failure, metrics.
//!
//! The balancer consumes these as opaque plug-ins. Asynchronous sequences
//! are modeled as unbounded `mpsc` receivers; a closed channel ends the
//! subscription without affecting the endpoint's lifecycle.

use crate::error::ConnectError;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

/// Kind of membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipEventType {
    /// An endpoint joined the pool.
    Add,
    /// An endpoint left the pool.
    Remove,
}

/// A membership change reported by the discovery layer.
#[derive(Debug, Clone)]
pub struct MembershipEvent<C> {
    /// Kind of change.
    pub event_type: MembershipEventType,
    /// Affected endpoint.
    pub endpoint: C,
}

impl<C> MembershipEvent<C> {
    /// Event announcing a new endpoint.
    #[must_use]
    pub fn add(endpoint: C) -> Self {
        Self {
            event_type: MembershipEventType::Add,
            endpoint,
        }
    }

    /// Event announcing the removal of an endpoint.
    #[must_use]
    pub fn remove(endpoint: C) -> Self {
        Self {
            event_type: MembershipEventType::Remove,
            endpoint,
        }
    }
}

/// Future returned by a [`Connector`] attempt.
pub type ConnectFuture = Pin<Box<dyn Future<Output = Result<(), ConnectError>> + Send>>;

/// Primes an endpoint before it is activated in the pool.
///
/// Must tolerate repeated invocations for the same endpoint; the balancer
/// reconnects after every quarantine. An attempt whose future is dropped has
/// been cancelled and must clean up after itself.
pub trait Connector<C>: Send + Sync {
    /// Start a connect attempt; resolving `Ok` signals readiness.
    fn connect(&self, endpoint: &C) -> ConnectFuture;
}

/// Connector that reports readiness immediately (default).
#[derive(Debug, Default)]
pub struct ImmediateConnector;

impl<C> Connector<C> for ImmediateConnector {
    fn connect(&self, _endpoint: &C) -> ConnectFuture {
        Box::pin(async { Ok(()) })
    }
}

/// One failure observed on an endpoint.
#[derive(Debug, Clone)]
pub struct FailureSignal {
    /// Human-readable failure reason.
    pub reason: String,
}

impl FailureSignal {
    /// Create a new failure signal.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Produces the failure stream for an endpoint. Each emission quarantines
/// the endpoint.
pub trait FailureSource<C>: Send + Sync {
    /// Subscribe to failures of `endpoint`.
    fn failures(&self, endpoint: &C) -> mpsc::UnboundedReceiver<FailureSignal>;
}

/// Failure source that never reports anything (default).
#[derive(Debug, Default)]
pub struct NeverFails;

impl<C> FailureSource<C> for NeverFails {
    fn failures(&self, _endpoint: &C) -> mpsc::UnboundedReceiver<FailureSignal> {
        // Dropping the sender closes the stream right away.
        let (_tx, rx) = mpsc::unbounded_channel();
        rx
    }
}

/// Produces the metrics stream for an endpoint. The latest emission wins;
/// it is what the weighting strategy sees at selection time.
pub trait MetricsFactory<C, M>: Send + Sync {
    /// Subscribe to metric snapshots of `endpoint`.
    fn metrics(&self, endpoint: &C) -> mpsc::UnboundedReceiver<M>;
}

/// Metrics factory that emits nothing, for pools weighted without metrics.
#[derive(Debug, Default)]
pub struct NullMetricsFactory;

impl<C> MetricsFactory<C, ()> for NullMetricsFactory {
    fn metrics(&self, _endpoint: &C) -> mpsc::UnboundedReceiver<()> {
        let (_tx, rx) = mpsc::unbounded_channel();
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_event_constructors() {
        let add = MembershipEvent::add("a");
        assert_eq!(add.event_type, MembershipEventType::Add);
        assert_eq!(add.endpoint, "a");

        let remove = MembershipEvent::remove("a");
        assert_eq!(remove.event_type, MembershipEventType::Remove);
    }

    #[tokio::test]
    async fn test_immediate_connector_succeeds() {
        let connector = ImmediateConnector;
        let result = Connector::<&str>::connect(&connector, &"a").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_never_fails_stream_is_closed() {
        let source = NeverFails;
        let mut rx = FailureSource::<&str>::failures(&source, &"a");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_null_metrics_stream_is_closed() {
        let factory = NullMetricsFactory;
        let mut rx = MetricsFactory::<&str, ()>::metrics(&factory, &"a");
        assert!(rx.recv().await.is_none());
    }
}
