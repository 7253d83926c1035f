//! Balancer error types and result aliases.

use thiserror::Error;

/// Result type alias for balancer operations.
pub type BalancerResult<T> = Result<T, BalancerError>;

/// Errors surfaced to callers of the load balancer.
#[derive(Debug, Clone, Error)]
pub enum BalancerError {
    /// `choose` was called while no endpoint was connected.
    #[error("no endpoints available")]
    NoEndpointsAvailable,

    /// The operation was invoked after `shutdown()`.
    #[error("load balancer is shut down")]
    ShutDown,

    /// A caller-supplied selection strategy failed.
    #[error("selection strategy failed: {0}")]
    StrategyFailed(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Failure reported by a [`Connector`](crate::sources::Connector) attempt.
///
/// Never surfaced to callers; mapped to a `FAILED` lifecycle event for the
/// affected endpoint.
#[derive(Debug, Clone, Error)]
#[error("connect failed: {reason}")]
pub struct ConnectError {
    /// Human-readable failure reason.
    pub reason: String,
}

impl ConnectError {
    /// Create a new connect error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            BalancerError::NoEndpointsAvailable.to_string(),
            "no endpoints available"
        );
        assert_eq!(
            BalancerError::ShutDown.to_string(),
            "load balancer is shut down"
        );

        let err = BalancerError::StrategyFailed("weights exhausted".to_string());
        assert_eq!(err.to_string(), "selection strategy failed: weights exhausted");
    }

    #[test]
    fn test_connect_error_display() {
        let err = ConnectError::new("connection refused");
        assert_eq!(err.to_string(), "connect failed: connection refused");
    }
}
