//! Weighting and selection strategies.
//!
//! Selection is a two-stage pipeline: a [`WeightingStrategy`] turns the
//! snapshot of active endpoints into a weighted list, then a
//! [`SelectionStrategy`] picks one endpoint from it. Any round-robin cursor
//! or reservoir lives inside the selection strategy; the pipeline itself is
//! stateless.

use crate::error::{BalancerError, BalancerResult};
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A connected endpoint together with its most recent metrics snapshot.
#[derive(Debug, Clone)]
pub struct ActiveEndpoint<C, M> {
    /// The endpoint.
    pub endpoint: C,
    /// Latest metrics emission, if any arrived yet.
    pub metrics: Option<M>,
}

/// Endpoints paired with the weights a weighting strategy assigned to them.
#[derive(Debug, Clone)]
pub struct WeightedEndpoints<C> {
    endpoints: Vec<C>,
    weights: Vec<u32>,
}

impl<C> WeightedEndpoints<C> {
    /// Pair endpoints with their weights. Both slices must have equal length.
    #[must_use]
    pub fn new(endpoints: Vec<C>, weights: Vec<u32>) -> Self {
        debug_assert_eq!(endpoints.len(), weights.len());
        Self { endpoints, weights }
    }

    /// The endpoints, in weighting order.
    #[must_use]
    pub fn endpoints(&self) -> &[C] {
        &self.endpoints
    }

    /// The weight of each endpoint, parallel to [`Self::endpoints`].
    #[must_use]
    pub fn weights(&self) -> &[u32] {
        &self.weights
    }

    /// Number of endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Check whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.weights.iter().map(|w| u64::from(*w)).sum()
    }
}

/// Assigns a non-negative weight to each active endpoint.
///
/// Pure: must not block or call back into the balancer.
pub trait WeightingStrategy<C, M>: Send + Sync {
    /// Weigh the snapshot of active endpoints.
    fn weigh(&self, active: &[ActiveEndpoint<C, M>]) -> WeightedEndpoints<C>;

    /// Get the strategy name.
    fn name(&self) -> &'static str;
}

/// Equal weight for every active endpoint (default).
#[derive(Debug, Default)]
pub struct EqualWeightStrategy;

impl EqualWeightStrategy {
    /// Create a new equal-weight strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<C: Clone, M> WeightingStrategy<C, M> for EqualWeightStrategy {
    fn weigh(&self, active: &[ActiveEndpoint<C, M>]) -> WeightedEndpoints<C> {
        let endpoints: Vec<C> = active.iter().map(|a| a.endpoint.clone()).collect();
        let weights = vec![1; endpoints.len()];
        WeightedEndpoints::new(endpoints, weights)
    }

    fn name(&self) -> &'static str {
        "equal-weight"
    }
}

/// Future returned by a selection strategy.
pub type SelectFuture<C> = Pin<Box<dyn Future<Output = BalancerResult<C>> + Send>>;

/// Picks one endpoint from a weighted list.
///
/// May keep internal state (round-robin cursors, reservoirs); the balancer
/// shares one strategy instance across all `choose` calls.
pub trait SelectionStrategy<C>: Send + Sync {
    /// Select one endpoint.
    fn select(&self, weighted: &WeightedEndpoints<C>) -> SelectFuture<C>;

    /// Get the strategy name.
    fn name(&self) -> &'static str;
}

/// Round-robin selection ignoring weights (default).
#[derive(Debug, Default)]
pub struct RoundRobinSelection {
    current: AtomicUsize,
}

impl RoundRobinSelection {
    /// Create a new round-robin strategy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: AtomicUsize::new(0),
        }
    }
}

impl<C: Clone + Send + 'static> SelectionStrategy<C> for RoundRobinSelection {
    fn select(&self, weighted: &WeightedEndpoints<C>) -> SelectFuture<C> {
        if weighted.is_empty() {
            return Box::pin(async { Err(BalancerError::NoEndpointsAvailable) });
        }
        let idx = self.current.fetch_add(1, Ordering::Relaxed) % weighted.len();
        let endpoint = weighted.endpoints()[idx].clone();
        Box::pin(async move { Ok(endpoint) })
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}

/// Uniformly random selection ignoring weights.
#[derive(Debug, Default)]
pub struct RandomSelection;

impl RandomSelection {
    /// Create a new random strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<C: Clone + Send + 'static> SelectionStrategy<C> for RandomSelection {
    fn select(&self, weighted: &WeightedEndpoints<C>) -> SelectFuture<C> {
        if weighted.is_empty() {
            return Box::pin(async { Err(BalancerError::NoEndpointsAvailable) });
        }
        let idx = rand::rng().random_range(0..weighted.len());
        let endpoint = weighted.endpoints()[idx].clone();
        Box::pin(async move { Ok(endpoint) })
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Weighted round-robin: endpoints are visited proportionally to their
/// weights using a shared cursor over the cumulative weight range.
#[derive(Debug, Default)]
pub struct WeightedRoundRobinSelection {
    current: AtomicUsize,
}

impl WeightedRoundRobinSelection {
    /// Create a new weighted round-robin strategy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: AtomicUsize::new(0),
        }
    }
}

impl<C: Clone + Send + 'static> SelectionStrategy<C> for WeightedRoundRobinSelection {
    fn select(&self, weighted: &WeightedEndpoints<C>) -> SelectFuture<C> {
        if weighted.is_empty() {
            return Box::pin(async { Err(BalancerError::NoEndpointsAvailable) });
        }

        let total = weighted.total_weight();
        if total == 0 {
            // All weights zero: degrade to plain round-robin.
            let idx = self.current.fetch_add(1, Ordering::Relaxed) % weighted.len();
            let endpoint = weighted.endpoints()[idx].clone();
            return Box::pin(async move { Ok(endpoint) });
        }

        let cursor = self.current.fetch_add(1, Ordering::Relaxed) as u64 % total;
        let mut accumulated = 0_u64;
        for (idx, weight) in weighted.weights().iter().enumerate() {
            accumulated += u64::from(*weight);
            if cursor < accumulated {
                let endpoint = weighted.endpoints()[idx].clone();
                return Box::pin(async move { Ok(endpoint) });
            }
        }

        let endpoint = weighted.endpoints()[0].clone();
        Box::pin(async move { Ok(endpoint) })
    }

    fn name(&self) -> &'static str {
        "weighted-round-robin"
    }
}
