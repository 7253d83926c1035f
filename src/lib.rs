//! # Carom
//!
//! A client-side load balancer core for network services. Driven by a
//! stream of membership events, carom maintains a pool of connected
//! endpoints, quarantines failing endpoints with configurable backoff,
//! attaches a pluggable metric to each endpoint, and serves selection
//! requests through a weighting and a selection strategy.
//!
//! ## Architecture
//!
//! ```text
//! membership ──▶ lifecycle controller ──▶ per-endpoint state machines
//!                      │                   IDLE → CONNECTING → CONNECTED
//!                      │                          ╲    ▲           │
//!                      ▼                           ▼   │           ▼
//!                 active set ◀───────────────── QUARANTINED ── REMOVED
//!                      │
//! choose() ──▶ weighting strategy ──▶ selection strategy ──▶ endpoint
//! ```
//!
//! Each endpoint owns a serialized state-machine driver; connect attempts,
//! failure signals, and the quarantine timer feed events into it. The
//! transport, failure detection, and metric computation are supplied by the
//! caller through the [`sources`] traits.
//!
//! ## Example
//!
//! ```no_run
//! use carom::sources::{MembershipEvent, NullMetricsFactory};
//! use carom::LoadBalancer;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), carom::BalancerError> {
//! let (members, membership) = tokio::sync::mpsc::unbounded_channel();
//! let balancer = LoadBalancer::builder(membership, NullMetricsFactory)
//!     .with_name("demo")
//!     .build();
//!
//! members.send(MembershipEvent::add("10.0.0.1:8080")).unwrap();
//! let endpoint = balancer.choose().await?;
//! # let _ = endpoint;
//! # Ok(())
//! # }
//! ```

pub mod balancer;
pub mod config;
pub mod error;
pub mod fsm;
pub mod policy;
pub mod queue;
pub mod selection;
pub mod sources;

mod holder;

pub use balancer::{BalancerStats, LoadBalancer, LoadBalancerBuilder};
pub use error::{BalancerError, BalancerResult, ConnectError};
pub use selection::{
    ActiveEndpoint, EqualWeightStrategy, RandomSelection, RoundRobinSelection, SelectionStrategy,
    WeightedEndpoints, WeightedRoundRobinSelection, WeightingStrategy,
};
pub use sources::{Connector, FailureSource, MembershipEvent, MembershipEventType, MetricsFactory};
