//! Per-endpoint lifecycle record.

use crate::fsm::MachineHandle;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Lifecycle states of an endpoint within the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum EndpointState {
    /// Known but not occupying an acquired slot.
    Idle,
    /// Connect attempt in flight.
    Connecting,
    /// Ready to receive traffic.
    Connected,
    /// Temporarily excluded after a failure, awaiting backoff expiry.
    Quarantined,
    /// Terminal: dropped from the pool.
    Removed,
}

/// Events driving an endpoint's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum LifecycleEvent {
    /// Start a connect attempt.
    Connect,
    /// A connect attempt succeeded.
    Connected,
    /// A connect attempt or the failure source reported a failure.
    Failed,
    /// Membership removed the endpoint.
    Remove,
    /// The quarantine backoff expired.
    Unquarantine,
    /// Voluntary step-down back to idle.
    Stop,
}

/// Binds one endpoint to its state machine, metrics slot, quarantine
/// counter, and the task handles of its subscriptions.
///
/// State transitions are owned by the state machine driver; the holder only
/// carries the mutable slots the lifecycle reads and writes.
pub(crate) struct Holder<C, M> {
    endpoint: C,
    metrics: RwLock<Option<M>>,
    state: RwLock<EndpointState>,
    quarantine_count: AtomicU32,
    machine: MachineHandle<LifecycleEvent>,
    connect_task: Mutex<Option<JoinHandle<()>>>,
    subscriptions: Mutex<Vec<JoinHandle<()>>>,
}

impl<C, M> Holder<C, M> {
    pub(crate) fn new(endpoint: C, machine: MachineHandle<LifecycleEvent>) -> Self {
        Self {
            endpoint,
            metrics: RwLock::new(None),
            state: RwLock::new(EndpointState::Idle),
            quarantine_count: AtomicU32::new(0),
            machine,
            connect_task: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn endpoint(&self) -> &C {
        &self.endpoint
    }

    pub(crate) fn state(&self) -> EndpointState {
        *self.state.read().expect("state lock poisoned")
    }

    /// Record the state just entered. Called only from the state machine's
    /// entry actions.
    pub(crate) fn set_state(&self, state: EndpointState) {
        *self.state.write().expect("state lock poisoned") = state;
    }

    /// Store the latest metrics emission.
    pub(crate) fn set_metrics(&self, metrics: M) {
        *self.metrics.write().expect("metrics lock poisoned") = Some(metrics);
    }

    pub(crate) fn quarantine_count(&self) -> u32 {
        self.quarantine_count.load(Ordering::SeqCst)
    }

    /// Record one failure; returns the updated count.
    pub(crate) fn note_failure(&self) -> u32 {
        self.quarantine_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Reset the failure count after a successful connect.
    pub(crate) fn reset_quarantine(&self) {
        self.quarantine_count.store(0, Ordering::SeqCst);
    }

    /// Submit a lifecycle event to this endpoint's state machine.
    pub(crate) fn submit(&self, event: LifecycleEvent) {
        self.machine.submit(event);
    }

    /// Install the handle of a fresh connect attempt, cancelling any attempt
    /// still in flight.
    pub(crate) fn set_connect_task(&self, task: JoinHandle<()>) {
        let mut slot = self.connect_task.lock().expect("connect task lock poisoned");
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
    }

    /// Track a subscription task to be released on shutdown.
    pub(crate) fn add_subscription(&self, task: JoinHandle<()>) {
        self.subscriptions
            .lock()
            .expect("subscriptions lock poisoned")
            .push(task);
    }

    /// Release every subscription and any in-flight connect attempt.
    /// Idempotent.
    pub(crate) fn shutdown(&self) {
        if let Some(task) = self
            .connect_task
            .lock()
            .expect("connect task lock poisoned")
            .take()
        {
            task.abort();
        }

        let tasks = std::mem::take(
            &mut *self
                .subscriptions
                .lock()
                .expect("subscriptions lock poisoned"),
        );
        for task in tasks {
            task.abort();
        }
    }
}

impl<C, M: Clone> Holder<C, M> {
    /// Latest metrics emission, if any arrived yet.
    pub(crate) fn metrics_snapshot(&self) -> Option<M> {
        self.metrics.read().expect("metrics lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    fn test_holder() -> Holder<&'static str, u32> {
        let (handle, _queue) = fsm::channel();
        Holder::new("a", handle)
    }

    #[test]
    fn test_state_tracking() {
        let holder = test_holder();
        assert_eq!(holder.state(), EndpointState::Idle);

        holder.set_state(EndpointState::Connecting);
        holder.set_state(EndpointState::Connected);
        assert_eq!(holder.state(), EndpointState::Connected);
    }

    #[test]
    fn test_quarantine_counter() {
        let holder = test_holder();
        assert_eq!(holder.quarantine_count(), 0);

        assert_eq!(holder.note_failure(), 1);
        assert_eq!(holder.note_failure(), 2);
        assert_eq!(holder.quarantine_count(), 2);

        holder.reset_quarantine();
        assert_eq!(holder.quarantine_count(), 0);
    }

    #[test]
    fn test_metrics_latest_wins() {
        let holder = test_holder();
        assert_eq!(holder.metrics_snapshot(), None);

        holder.set_metrics(1);
        holder.set_metrics(2);
        assert_eq!(holder.metrics_snapshot(), Some(2));
    }

    #[tokio::test]
    async fn test_replacing_connect_task_cancels_prior() {
        let holder = test_holder();
        let completed = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&completed);
        holder.set_connect_task(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        }));
        holder.set_connect_task(tokio::spawn(async {}));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!completed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let holder = test_holder();
        let completed = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&completed);
        holder.add_subscription(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        }));

        holder.shutdown();
        holder.shutdown();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!completed.load(Ordering::SeqCst));
    }
}
