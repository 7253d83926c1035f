//! Load balancer orchestration: the per-endpoint lifecycle graph, membership
//! dispatch, the active-count governor, and the public facade.

use crate::error::{BalancerError, BalancerResult};
use crate::fsm::{self, EventQueue, FollowUp, StateMachine, StateMachineBuilder};
use crate::holder::{EndpointState, Holder, LifecycleEvent};
use crate::policy::{self, ActiveCountFn, BackoffFn};
use crate::queue::RandomizedQueue;
use crate::selection::{
    ActiveEndpoint, EqualWeightStrategy, RoundRobinSelection, SelectionStrategy, WeightingStrategy,
};
use crate::sources::{
    Connector, FailureSource, ImmediateConnector, MembershipEvent, MembershipEventType,
    MetricsFactory, NeverFails,
};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Selection statistics.
#[derive(Debug, Default)]
pub struct BalancerStats {
    /// Total `choose` calls.
    pub total_selections: AtomicU64,
    /// `choose` calls that returned an endpoint.
    pub successful_selections: AtomicU64,
    /// `choose` calls that returned an error.
    pub failed_selections: AtomicU64,
}

impl BalancerStats {
    /// Record the outcome of one selection.
    pub fn record_selection(&self, success: bool) {
        self.total_selections.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_selections.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_selections.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Shared balancer state: every structure the lifecycle graph and the
/// selection pipeline touch.
struct Core<C, M> {
    name: String,
    /// All known endpoints, in every state. Keys unique.
    clients: RwLock<HashMap<C, Arc<Holder<C, M>>>>,
    /// Endpoints currently idle, polled at random by the governor.
    idle: RandomizedQueue<C>,
    /// Endpoints occupying an acquired slot (connecting or connected).
    acquired: Mutex<HashSet<C>>,
    /// Connected endpoints, snapshotted by the selection pipeline.
    active: RwLock<Vec<Arc<Holder<C, M>>>>,
    connector: Arc<dyn Connector<C>>,
    failure_source: Arc<dyn FailureSource<C>>,
    metrics_factory: Arc<dyn MetricsFactory<C, M>>,
    weighting: Arc<dyn WeightingStrategy<C, M>>,
    selection: Arc<dyn SelectionStrategy<C>>,
    backoff: BackoffFn,
    active_count: ActiveCountFn,
    stats: BalancerStats,
    shut_down: AtomicBool,
    membership_task: Mutex<Option<JoinHandle<()>>>,
}

impl<C, M> Core<C, M> {
    /// Release the membership pump and every holder. Idempotent.
    fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(balancer = %self.name, "shutting down");

        if let Some(task) = self
            .membership_task
            .lock()
            .expect("membership task lock poisoned")
            .take()
        {
            task.abort();
        }

        let holders: Vec<Arc<Holder<C, M>>> = self
            .clients
            .read()
            .expect("clients lock poisoned")
            .values()
            .cloned()
            .collect();
        for holder in holders {
            holder.shutdown();
        }
    }
}

impl<C, M> Core<C, M>
where
    C: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    M: Clone + Send + Sync + 'static,
{
    fn lookup(&self, endpoint: &C) -> Option<Arc<Holder<C, M>>> {
        self.clients
            .read()
            .expect("clients lock poisoned")
            .get(endpoint)
            .cloned()
    }

    fn client_count(&self) -> usize {
        self.clients.read().expect("clients lock poisoned").len()
    }

    fn remove_client(&self, endpoint: &C) {
        self.clients
            .write()
            .expect("clients lock poisoned")
            .remove(endpoint);
    }

    fn add_acquired(&self, endpoint: C) {
        self.acquired
            .lock()
            .expect("acquired lock poisoned")
            .insert(endpoint);
    }

    fn remove_acquired(&self, endpoint: &C) {
        self.acquired
            .lock()
            .expect("acquired lock poisoned")
            .remove(endpoint);
    }

    fn add_active(&self, holder: &Arc<Holder<C, M>>) {
        let mut active = self.active.write().expect("active lock poisoned");
        if !active.iter().any(|h| h.endpoint() == holder.endpoint()) {
            active.push(Arc::clone(holder));
        }
    }

    fn remove_active(&self, endpoint: &C) {
        self.active
            .write()
            .expect("active lock poisoned")
            .retain(|h| h.endpoint() != endpoint);
    }

    /// Point-in-time copy of the active set with each endpoint's latest
    /// metrics. No lock is held once this returns.
    fn active_snapshot(&self) -> Vec<ActiveEndpoint<C, M>> {
        self.active
            .read()
            .expect("active lock poisoned")
            .iter()
            .map(|holder| ActiveEndpoint {
                endpoint: holder.endpoint().clone(),
                metrics: holder.metrics_snapshot(),
            })
            .collect()
    }

    /// Consult the active-count policy; if more endpoints should be
    /// acquired, push one arbitrary idle endpoint towards CONNECTING.
    ///
    /// The slot is reserved in `acquired` before the CONNECT event is
    /// submitted. Event delivery is asynchronous, so without the
    /// reservation two concurrent IDLE entries would both read a stale
    /// acquired count and overshoot the policy.
    fn maybe_acquire(&self) {
        let desired = (self.active_count)(self.client_count());
        let mut acquired = self.acquired.lock().expect("acquired lock poisoned");
        if desired > acquired.len() {
            if let Some(endpoint) = self.idle.poll_random() {
                if let Some(holder) = self.lookup(&endpoint) {
                    acquired.insert(endpoint);
                    holder.submit(LifecycleEvent::Connect);
                }
            }
        }
    }

    /// Start a connect attempt for `holder`, cancelling any prior attempt
    /// still in flight.
    fn spawn_connect(&self, holder: &Arc<Holder<C, M>>) {
        let attempt = self.connector.connect(holder.endpoint());
        let name = self.name.clone();
        let holder_task = Arc::clone(holder);
        let task = tokio::spawn(async move {
            match attempt.await {
                Ok(()) => {
                    holder_task.reset_quarantine();
                    holder_task.submit(LifecycleEvent::Connected);
                }
                Err(error) => {
                    warn!(
                        balancer = %name,
                        endpoint = ?holder_task.endpoint(),
                        %error,
                        "connect attempt failed"
                    );
                    holder_task.note_failure();
                    holder_task.submit(LifecycleEvent::Failed);
                }
            }
        });
        holder.set_connect_task(task);
    }

    /// Dispatch one membership event.
    fn handle_membership(
        &self,
        machine: &Arc<StateMachine<Arc<Holder<C, M>>, EndpointState, LifecycleEvent>>,
        event: MembershipEvent<C>,
    ) {
        match (self.lookup(&event.endpoint), event.event_type) {
            (None, MembershipEventType::Add) => {
                let (handle, queue) = fsm::channel();
                let holder = Arc::new(Holder::new(event.endpoint.clone(), handle));

                let inserted = {
                    let mut clients = self.clients.write().expect("clients lock poisoned");
                    match clients.entry(event.endpoint) {
                        Entry::Vacant(slot) => {
                            slot.insert(Arc::clone(&holder));
                            true
                        }
                        Entry::Occupied(_) => false,
                    }
                };

                // A lost insertion race discards the duplicate holder
                // without ever initializing it.
                if inserted {
                    trace!(balancer = %self.name, endpoint = ?holder.endpoint(), "endpoint added");
                    self.initialize_holder(machine, &holder, queue);
                }
            }
            (None, MembershipEventType::Remove) => {
                trace!(
                    balancer = %self.name,
                    endpoint = ?event.endpoint,
                    "remove for unknown endpoint ignored"
                );
            }
            (Some(holder), MembershipEventType::Add) => {
                trace!(
                    balancer = %self.name,
                    endpoint = ?event.endpoint,
                    state = ?holder.state(),
                    "duplicate add ignored"
                );
            }
            (Some(holder), MembershipEventType::Remove) => {
                holder.submit(LifecycleEvent::Remove);
            }
        }
    }

    /// Start the state-machine driver and the metrics and failure
    /// subscriptions of a freshly inserted holder.
    fn initialize_holder(
        &self,
        machine: &Arc<StateMachine<Arc<Holder<C, M>>, EndpointState, LifecycleEvent>>,
        holder: &Arc<Holder<C, M>>,
        queue: EventQueue<LifecycleEvent>,
    ) {
        let driver = Arc::clone(machine).drive(Arc::clone(holder), EndpointState::Idle, queue);
        holder.add_subscription(driver);

        let mut metrics_rx = self.metrics_factory.metrics(holder.endpoint());
        let metrics_holder = Arc::clone(holder);
        holder.add_subscription(tokio::spawn(async move {
            while let Some(metrics) = metrics_rx.recv().await {
                metrics_holder.set_metrics(metrics);
            }
            debug!(endpoint = ?metrics_holder.endpoint(), "metrics stream ended");
        }));

        let mut failures_rx = self.failure_source.failures(holder.endpoint());
        let failure_holder = Arc::clone(holder);
        let name = self.name.clone();
        holder.add_subscription(tokio::spawn(async move {
            while let Some(signal) = failures_rx.recv().await {
                warn!(
                    balancer = %name,
                    endpoint = ?failure_holder.endpoint(),
                    reason = %signal.reason,
                    "failure reported"
                );
                failure_holder.note_failure();
                failure_holder.submit(LifecycleEvent::Failed);
            }
            debug!(endpoint = ?failure_holder.endpoint(), "failure stream ended");
        }));
    }
}

/// Build the endpoint lifecycle graph over a shared [`Core`].
///
/// Residence rules: idle endpoints live in the idle queue only, acquired
/// endpoints in the acquired set, connected endpoints in the acquired set
/// and the active list, quarantined and removed endpoints in none of them.
/// The enter and exit actions below maintain those rules on every
/// transition, including the stale-success path QUARANTINED → CONNECTED and
/// the step-down path CONNECTED → IDLE.
fn build_machine<C, M>(
    core: &Arc<Core<C, M>>,
) -> Arc<StateMachine<Arc<Holder<C, M>>, EndpointState, LifecycleEvent>>
where
    C: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    M: Clone + Send + Sync + 'static,
{
    let mut builder: StateMachineBuilder<Arc<Holder<C, M>>, EndpointState, LifecycleEvent> =
        StateMachineBuilder::new();

    let idle_core = Arc::clone(core);
    let idle_exit_core = Arc::clone(core);
    builder
        .state(EndpointState::Idle)
        .on_enter(move |holder| {
            info!(balancer = %idle_core.name, endpoint = ?holder.endpoint(), "endpoint is idle");
            holder.set_state(EndpointState::Idle);
            idle_core.remove_acquired(holder.endpoint());
            idle_core.idle.offer(holder.endpoint().clone());
            idle_core.maybe_acquire();
            None
        })
        .on_exit(move |holder| {
            idle_exit_core.idle.remove(holder.endpoint());
            None
        })
        .transition(LifecycleEvent::Connect, EndpointState::Connecting)
        .transition(LifecycleEvent::Failed, EndpointState::Quarantined)
        .transition(LifecycleEvent::Connected, EndpointState::Connected);

    let connecting_core = Arc::clone(core);
    builder
        .state(EndpointState::Connecting)
        .on_enter(move |holder| {
            info!(
                balancer = %connecting_core.name,
                endpoint = ?holder.endpoint(),
                "endpoint is connecting"
            );
            holder.set_state(EndpointState::Connecting);
            connecting_core.add_acquired(holder.endpoint().clone());
            connecting_core.spawn_connect(holder);
            None
        })
        .transition(LifecycleEvent::Connected, EndpointState::Connected)
        .transition(LifecycleEvent::Failed, EndpointState::Quarantined)
        .transition(LifecycleEvent::Remove, EndpointState::Removed);

    let connected_core = Arc::clone(core);
    let connected_exit_core = Arc::clone(core);
    builder
        .state(EndpointState::Connected)
        .on_enter(move |holder| {
            info!(
                balancer = %connected_core.name,
                endpoint = ?holder.endpoint(),
                "endpoint is connected"
            );
            holder.set_state(EndpointState::Connected);
            // A stale success out of quarantine arrives without an acquired
            // slot; take one so the active set stays within acquired.
            connected_core.add_acquired(holder.endpoint().clone());
            connected_core.add_active(holder);
            None
        })
        .on_exit(move |holder| {
            connected_exit_core.remove_active(holder.endpoint());
            None
        })
        .ignore(LifecycleEvent::Connected)
        .ignore(LifecycleEvent::Connect)
        .transition(LifecycleEvent::Failed, EndpointState::Quarantined)
        .transition(LifecycleEvent::Remove, EndpointState::Removed)
        .transition(LifecycleEvent::Stop, EndpointState::Idle);

    let quarantined_core = Arc::clone(core);
    builder
        .state(EndpointState::Quarantined)
        .on_enter(move |holder| {
            let count = holder.quarantine_count();
            info!(
                balancer = %quarantined_core.name,
                endpoint = ?holder.endpoint(),
                count,
                "endpoint is quarantined"
            );
            holder.set_state(EndpointState::Quarantined);
            quarantined_core.remove_acquired(holder.endpoint());
            let delay = (quarantined_core.backoff)(count);
            Some(Box::pin(async move {
                tokio::time::sleep(delay).await;
                Some(LifecycleEvent::Unquarantine)
            }) as FollowUp<LifecycleEvent>)
        })
        .ignore(LifecycleEvent::Failed)
        .transition(LifecycleEvent::Unquarantine, EndpointState::Idle)
        .transition(LifecycleEvent::Remove, EndpointState::Removed)
        .transition(LifecycleEvent::Connected, EndpointState::Connected);

    let removed_core = Arc::clone(core);
    builder
        .state(EndpointState::Removed)
        .on_enter(move |holder| {
            info!(balancer = %removed_core.name, endpoint = ?holder.endpoint(), "endpoint is removed");
            holder.set_state(EndpointState::Removed);
            removed_core.remove_active(holder.endpoint());
            removed_core.idle.remove(holder.endpoint());
            removed_core.remove_acquired(holder.endpoint());
            removed_core.remove_client(holder.endpoint());
            holder.shutdown();
            None
        })
        .terminal();

    Arc::new(builder.build())
}

/// Future adapter that contains a panic from a user-supplied selection
/// strategy so it surfaces as an error on the `choose` result instead of
/// unwinding into the caller.
struct CatchUnwind<F>(F);

impl<F, T> Future for CatchUnwind<F>
where
    F: Future<Output = T> + Unpin,
{
    type Output = std::thread::Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = &mut self.get_mut().0;
        match catch_unwind(AssertUnwindSafe(|| Pin::new(inner).poll(cx))) {
            Ok(Poll::Ready(value)) => Poll::Ready(Ok(value)),
            Ok(Poll::Pending) => Poll::Pending,
            Err(payload) => Poll::Ready(Err(payload)),
        }
    }
}

/// Builder for a [`LoadBalancer`].
///
/// The membership stream and the metrics factory are required; everything
/// else defaults to the most permissive behavior: equal weights, round-robin
/// selection, an all-endpoints active-count policy, a constant 10 s backoff,
/// a never-failing failure source, and an immediately succeeding connector.
pub struct LoadBalancerBuilder<C, M> {
    name: String,
    membership: mpsc::UnboundedReceiver<MembershipEvent<C>>,
    metrics_factory: Arc<dyn MetricsFactory<C, M>>,
    weighting: Arc<dyn WeightingStrategy<C, M>>,
    selection: Arc<dyn SelectionStrategy<C>>,
    connector: Arc<dyn Connector<C>>,
    failure_source: Arc<dyn FailureSource<C>>,
    backoff: BackoffFn,
    active_count: ActiveCountFn,
}

impl<C, M> LoadBalancerBuilder<C, M>
where
    C: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    M: Clone + Send + Sync + 'static,
{
    /// Name the balancer; tags every log line.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Strategy computing weights for the active endpoints.
    #[must_use]
    pub fn with_weighting_strategy(
        mut self,
        strategy: impl WeightingStrategy<C, M> + 'static,
    ) -> Self {
        self.weighting = Arc::new(strategy);
        self
    }

    /// Strategy selecting one endpoint from the weighted list.
    #[must_use]
    pub fn with_selection_strategy(
        mut self,
        strategy: impl SelectionStrategy<C> + 'static,
    ) -> Self {
        self.selection = Arc::new(strategy);
        self
    }

    /// Connector priming endpoints before they activate.
    #[must_use]
    pub fn with_connector(mut self, connector: impl Connector<C> + 'static) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// Source of asynchronous failure signals per endpoint.
    #[must_use]
    pub fn with_failure_source(mut self, source: impl FailureSource<C> + 'static) -> Self {
        self.failure_source = Arc::new(source);
        self
    }

    /// Quarantine delay as a function of the consecutive failure count.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffFn) -> Self {
        self.backoff = backoff;
        self
    }

    /// Desired acquired-endpoint count as a function of the pool size.
    #[must_use]
    pub fn with_active_count_policy(mut self, policy: ActiveCountFn) -> Self {
        self.active_count = policy;
        self
    }

    /// Apply deserialized [`BalancerSettings`](crate::config::BalancerSettings):
    /// name, backoff, active-count policy, and selection strategy.
    #[must_use]
    pub fn with_settings(mut self, settings: &crate::config::BalancerSettings) -> Self {
        self.name = settings.name.clone();
        self.backoff = settings.backoff.to_backoff();
        self.active_count = settings.active_count.to_policy();
        self.selection = settings.selection.to_strategy();
        self
    }

    /// Build the balancer and start consuming membership events.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn build(self) -> LoadBalancer<C, M> {
        let core = Arc::new(Core {
            name: self.name,
            clients: RwLock::new(HashMap::new()),
            idle: RandomizedQueue::new(),
            acquired: Mutex::new(HashSet::new()),
            active: RwLock::new(Vec::new()),
            connector: self.connector,
            failure_source: self.failure_source,
            metrics_factory: self.metrics_factory,
            weighting: self.weighting,
            selection: self.selection,
            backoff: self.backoff,
            active_count: self.active_count,
            stats: BalancerStats::default(),
            shut_down: AtomicBool::new(false),
            membership_task: Mutex::new(None),
        });

        let machine = build_machine(&core);

        let pump_core = Arc::clone(&core);
        let mut membership = self.membership;
        let pump = tokio::spawn(async move {
            while let Some(event) = membership.recv().await {
                pump_core.handle_membership(&machine, event);
            }
            // Stream completion does not terminate the balancer.
            debug!(balancer = %pump_core.name, "membership stream ended");
        });
        *core
            .membership_task
            .lock()
            .expect("membership task lock poisoned") = Some(pump);

        info!(balancer = %core.name, "load balancer initialized");
        LoadBalancer { core }
    }
}

/// A client-side load balancer over a dynamic pool of endpoints.
///
/// Driven by a membership stream, the balancer keeps each known endpoint in
/// a lifecycle of idle → connecting → connected, quarantines endpoints on
/// failure with a configurable reconnect backoff, and serves [`choose`]
/// requests from the currently connected set through a weighting and a
/// selection strategy.
///
/// [`choose`]: LoadBalancer::choose
pub struct LoadBalancer<C, M> {
    core: Arc<Core<C, M>>,
}

impl<C, M> LoadBalancer<C, M>
where
    C: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    M: Clone + Send + Sync + 'static,
{
    /// Start building a balancer from its two required collaborators.
    #[must_use]
    pub fn builder(
        membership: mpsc::UnboundedReceiver<MembershipEvent<C>>,
        metrics_factory: impl MetricsFactory<C, M> + 'static,
    ) -> LoadBalancerBuilder<C, M> {
        LoadBalancerBuilder {
            name: "<unnamed>".to_string(),
            membership,
            metrics_factory: Arc::new(metrics_factory),
            weighting: Arc::new(EqualWeightStrategy::new()),
            selection: Arc::new(RoundRobinSelection::new()),
            connector: Arc::new(ImmediateConnector),
            failure_source: Arc::new(NeverFails),
            backoff: policy::fixed_delay(Duration::from_secs(10)),
            active_count: policy::all_endpoints(),
        }
    }

    /// Get the balancer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Select one endpoint from the active set.
    ///
    /// Snapshots the active set, weighs it, and defers to the selection
    /// strategy. A panicking strategy is contained and reported as
    /// [`BalancerError::StrategyFailed`] rather than unwinding into the
    /// caller. Because lifecycle transitions are concurrent with selection,
    /// the returned endpoint may be tearing down by the time the caller
    /// uses it; callers tolerate this through their own error handling.
    pub async fn choose(&self) -> BalancerResult<C> {
        if self.core.shut_down.load(Ordering::SeqCst) {
            self.core.stats.record_selection(false);
            return Err(BalancerError::ShutDown);
        }

        let snapshot = self.core.active_snapshot();
        if snapshot.is_empty() {
            self.core.stats.record_selection(false);
            return Err(BalancerError::NoEndpointsAvailable);
        }

        let weighted = match catch_unwind(AssertUnwindSafe(|| self.core.weighting.weigh(&snapshot)))
        {
            Ok(weighted) => weighted,
            Err(_) => {
                warn!(
                    balancer = %self.core.name,
                    strategy = %self.core.weighting.name(),
                    "weighting strategy panicked"
                );
                self.core.stats.record_selection(false);
                return Err(BalancerError::StrategyFailed(
                    "weighting strategy panicked".to_string(),
                ));
            }
        };

        let select = match catch_unwind(AssertUnwindSafe(|| self.core.selection.select(&weighted)))
        {
            Ok(select) => select,
            Err(_) => {
                warn!(
                    balancer = %self.core.name,
                    strategy = %self.core.selection.name(),
                    "selection strategy panicked"
                );
                self.core.stats.record_selection(false);
                return Err(BalancerError::StrategyFailed(
                    "selection strategy panicked".to_string(),
                ));
            }
        };

        let result = match CatchUnwind(select).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    balancer = %self.core.name,
                    strategy = %self.core.selection.name(),
                    "selection strategy panicked"
                );
                Err(BalancerError::StrategyFailed(
                    "selection strategy panicked".to_string(),
                ))
            }
        };
        self.core.stats.record_selection(result.is_ok());
        result
    }

    /// Snapshot of every known endpoint, in any state.
    #[must_use]
    pub fn list_all_clients(&self) -> Vec<C> {
        self.core
            .clients
            .read()
            .expect("clients lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Snapshot of the connected endpoints.
    #[must_use]
    pub fn list_active_clients(&self) -> Vec<C> {
        self.core
            .active
            .read()
            .expect("active lock poisoned")
            .iter()
            .map(|holder| holder.endpoint().clone())
            .collect()
    }

    /// Get the selection statistics.
    #[must_use]
    pub fn stats(&self) -> &BalancerStats {
        &self.core.stats
    }

    /// Stop consuming membership events and release every endpoint's
    /// subscriptions, timers, and in-flight connect attempts. Idempotent;
    /// subsequent `choose` calls return [`BalancerError::ShutDown`].
    pub fn shutdown(&self) {
        self.core.shutdown();
    }
}

impl<C, M> Drop for LoadBalancer<C, M> {
    fn drop(&mut self) {
        self.core.shutdown();
    }
}

impl<C, M> std::fmt::Debug for LoadBalancer<C, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadBalancer")
            .field("name", &self.core.name)
            .finish_non_exhaustive()
    }
}
