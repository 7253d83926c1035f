//! Balancer configuration types.
//!
//! Optional sugar over the builder: deserializable settings for the
//! tunable policies, applied with
//! [`LoadBalancerBuilder::with_settings`](crate::balancer::LoadBalancerBuilder::with_settings).

use crate::error::BalancerError;
use crate::policy::{self, ActiveCountFn, BackoffFn};
use crate::selection::{
    RandomSelection, RoundRobinSelection, SelectionStrategy, WeightedRoundRobinSelection,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Tunable balancer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerSettings {
    /// Balancer name, tags every log line.
    pub name: String,

    /// Quarantine backoff policy.
    pub backoff: BackoffConfig,

    /// Active-count policy.
    pub active_count: ActiveCountConfig,

    /// Selection strategy.
    pub selection: SelectionKind,
}

impl Default for BalancerSettings {
    fn default() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            backoff: BackoffConfig::default(),
            active_count: ActiveCountConfig::default(),
            selection: SelectionKind::default(),
        }
    }
}

impl BalancerSettings {
    /// Parse settings from a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, BalancerError> {
        toml::from_str(raw)
            .map_err(|e| BalancerError::Config(format!("failed to parse settings: {e}")))
    }
}

/// Quarantine backoff configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum BackoffConfig {
    /// Constant delay regardless of the failure count.
    Fixed {
        /// The delay.
        #[serde(with = "humantime_serde", default = "default_fixed_delay")]
        delay: Duration,
    },
    /// Delay growing by `step` per consecutive failure.
    Linear {
        /// Per-failure increment.
        #[serde(with = "humantime_serde")]
        step: Duration,
        /// Upper bound.
        #[serde(with = "humantime_serde", default = "default_max_delay")]
        max: Duration,
    },
    /// Delay doubling per consecutive failure.
    Exponential {
        /// Delay after the first failure.
        #[serde(with = "humantime_serde")]
        base: Duration,
        /// Upper bound.
        #[serde(with = "humantime_serde", default = "default_max_delay")]
        max: Duration,
    },
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::Fixed {
            delay: default_fixed_delay(),
        }
    }
}

impl BackoffConfig {
    /// Build the backoff function this configuration describes.
    #[must_use]
    pub fn to_backoff(&self) -> BackoffFn {
        match self {
            Self::Fixed { delay } => policy::fixed_delay(*delay),
            Self::Linear { step, max } => policy::linear_delay(*step, *max),
            Self::Exponential { base, max } => policy::exponential_delay(*base, *max),
        }
    }
}

/// Active-count policy configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum ActiveCountConfig {
    /// Keep every known endpoint acquired.
    #[default]
    All,
    /// Acquire at most `limit` endpoints.
    AtMost {
        /// Maximum acquired endpoints.
        limit: usize,
    },
}

impl ActiveCountConfig {
    /// Build the active-count function this configuration describes.
    #[must_use]
    pub fn to_policy(&self) -> ActiveCountFn {
        match self {
            Self::All => policy::all_endpoints(),
            Self::AtMost { limit } => policy::at_most(*limit),
        }
    }
}

/// Selection strategy kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionKind {
    /// Round-robin over the active endpoints.
    #[default]
    RoundRobin,
    /// Uniformly random pick.
    Random,
    /// Round-robin proportional to the assigned weights.
    WeightedRoundRobin,
}

impl SelectionKind {
    /// Instantiate the strategy this kind names.
    #[must_use]
    pub fn to_strategy<C>(&self) -> Arc<dyn SelectionStrategy<C>>
    where
        C: Clone + Send + 'static,
    {
        match self {
            Self::RoundRobin => Arc::new(RoundRobinSelection::new()),
            Self::Random => Arc::new(RandomSelection::new()),
            Self::WeightedRoundRobin => Arc::new(WeightedRoundRobinSelection::new()),
        }
    }
}

fn default_fixed_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}
