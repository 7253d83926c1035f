//! Generic table-driven state machine with asynchronous event delivery.
//!
//! A [`StateMachine`] is a static description of a state graph: for every
//! state an optional enter action, an optional exit action, a transition
//! table, and a set of ignored events. Driving the machine spawns one task
//! per instance that consumes events from a queue, so events submitted from
//! any thread are serialized per instance and each transition (exit of the
//! previous state followed by enter of the next) completes before the next
//! event is dispatched.
//!
//! An enter action may return a follow-up future resolving to another event;
//! the event is fed back into the machine's queue behind everything already
//! queued. Follow-up tasks still pending when the driver stops — or when the
//! driver task is aborted — are cancelled with it, so a delayed event cannot
//! outlive its machine instance. Follow-ups returned from exit actions are
//! discarded, so exit is useful for cleanup only. An event that is neither
//! in the transition table nor in the ignore set of the current state is
//! logged and dropped.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

/// Future resolving to an optional follow-up event.
pub type FollowUp<E> = Pin<Box<dyn Future<Output = Option<E>> + Send>>;

/// Enter/exit action: runs synchronously inside the driver and may return a
/// follow-up future.
type Action<Ctx, E> = Arc<dyn Fn(&Ctx) -> Option<FollowUp<E>> + Send + Sync>;

struct StateEntry<Ctx, S, E> {
    on_enter: Option<Action<Ctx, E>>,
    on_exit: Option<Action<Ctx, E>>,
    transitions: HashMap<E, S>,
    ignored: HashSet<E>,
    terminal: bool,
}

impl<Ctx, S, E> Default for StateEntry<Ctx, S, E> {
    fn default() -> Self {
        Self {
            on_enter: None,
            on_exit: None,
            transitions: HashMap::new(),
            ignored: HashSet::new(),
            terminal: false,
        }
    }
}

/// Thread-safe handle for submitting events to one machine instance.
///
/// Submission never blocks; events are queued and processed in FIFO order by
/// the instance's driver task. Submitting to a stopped machine is a no-op.
pub struct MachineHandle<E> {
    tx: mpsc::UnboundedSender<E>,
}

impl<E> MachineHandle<E> {
    /// Submit an event to the machine instance.
    pub fn submit(&self, event: E) {
        let _ = self.tx.send(event);
    }
}

impl<E> Clone for MachineHandle<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Receiving side of a machine instance's event queue, consumed by
/// [`StateMachine::drive`].
pub struct EventQueue<E> {
    tx: mpsc::UnboundedSender<E>,
    rx: mpsc::UnboundedReceiver<E>,
}

/// Create the event queue for one machine instance.
///
/// The [`MachineHandle`] may be cloned and stored before the driver starts,
/// which allows the driven context to carry its own handle.
#[must_use]
pub fn channel<E>() -> (MachineHandle<E>, EventQueue<E>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        MachineHandle { tx: tx.clone() },
        EventQueue { tx, rx },
    )
}

/// Builder for a [`StateMachine`].
pub struct StateMachineBuilder<Ctx, S, E> {
    states: HashMap<S, StateEntry<Ctx, S, E>>,
}

impl<Ctx, S, E> StateMachineBuilder<Ctx, S, E>
where
    S: Copy + Eq + Hash,
    E: Eq + Hash,
{
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
        }
    }

    /// Declare a state, returning a handle for configuring it. Declaring the
    /// same state twice extends the earlier declaration.
    pub fn state(&mut self, state: S) -> StateHandle<'_, Ctx, S, E> {
        StateHandle {
            entry: self.states.entry(state).or_default(),
        }
    }

    /// Finish the declaration.
    #[must_use]
    pub fn build(self) -> StateMachine<Ctx, S, E> {
        StateMachine {
            states: self.states,
        }
    }
}

impl<Ctx, S, E> Default for StateMachineBuilder<Ctx, S, E>
where
    S: Copy + Eq + Hash,
    E: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration handle for a single declared state.
pub struct StateHandle<'a, Ctx, S, E> {
    entry: &'a mut StateEntry<Ctx, S, E>,
}

impl<Ctx, S, E> StateHandle<'_, Ctx, S, E>
where
    E: Eq + Hash,
{
    /// Set the enter action.
    pub fn on_enter(
        self,
        action: impl Fn(&Ctx) -> Option<FollowUp<E>> + Send + Sync + 'static,
    ) -> Self {
        self.entry.on_enter = Some(Arc::new(action));
        self
    }

    /// Set the exit action. Follow-up events it returns are discarded.
    pub fn on_exit(
        self,
        action: impl Fn(&Ctx) -> Option<FollowUp<E>> + Send + Sync + 'static,
    ) -> Self {
        self.entry.on_exit = Some(Arc::new(action));
        self
    }

    /// Declare a legal transition from this state.
    pub fn transition(self, event: E, target: S) -> Self {
        self.entry.transitions.insert(event, target);
        self
    }

    /// Declare an event as legal but transition-free in this state.
    pub fn ignore(self, event: E) -> Self {
        self.entry.ignored.insert(event);
        self
    }

    /// Mark this state as terminal: the driver stops after its enter action.
    pub fn terminal(self) -> Self {
        self.entry.terminal = true;
        self
    }
}

/// Follow-up tasks spawned by enter actions of one driven instance.
///
/// Dropped together with the driver future, whether the driver returns on a
/// terminal state or is aborted from outside; outstanding tasks are aborted
/// at that point.
struct FollowUpTasks {
    tasks: Vec<JoinHandle<()>>,
}

impl FollowUpTasks {
    fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    fn track(&mut self, task: JoinHandle<()>) {
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(task);
    }
}

impl Drop for FollowUpTasks {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// A static state graph shared by any number of driven instances.
pub struct StateMachine<Ctx, S, E> {
    states: HashMap<S, StateEntry<Ctx, S, E>>,
}

impl<Ctx, S, E> StateMachine<Ctx, S, E>
where
    Ctx: Send + 'static,
    S: Copy + Eq + Hash + Debug + Send + Sync + 'static,
    E: Copy + Eq + Hash + Debug + Send + Sync + 'static,
{
    /// Start driving one instance from `initial`, consuming `queue`.
    ///
    /// The enter action of the initial state runs first. The returned task
    /// ends when a terminal state is entered or the queue closes; aborting it
    /// stops the instance.
    pub fn drive(self: Arc<Self>, ctx: Ctx, initial: S, queue: EventQueue<E>) -> JoinHandle<()> {
        let machine = self;
        tokio::spawn(async move {
            let EventQueue { tx, mut rx } = queue;
            let mut follow_ups = FollowUpTasks::new();
            let mut current = initial;

            if machine.enter(current, &ctx, &tx, &mut follow_ups) {
                return;
            }

            while let Some(event) = rx.recv().await {
                let Some(entry) = machine.states.get(&current) else {
                    warn!(state = ?current, ?event, "event in undeclared state dropped");
                    continue;
                };

                if let Some(&next) = entry.transitions.get(&event) {
                    trace!(from = ?current, to = ?next, ?event, "transition");
                    if let Some(exit) = &entry.on_exit {
                        // Exit follow-ups are cleanup residue, not input.
                        drop(exit(&ctx));
                    }
                    current = next;
                    if machine.enter(current, &ctx, &tx, &mut follow_ups) {
                        return;
                    }
                } else if entry.ignored.contains(&event) {
                    trace!(state = ?current, ?event, "event ignored");
                } else {
                    warn!(state = ?current, ?event, "illegal transition dropped");
                }
            }
        })
    }

    /// Run the enter action of `state`, tracking any spawned follow-up task
    /// for cancellation; returns `true` if the state is terminal.
    fn enter(
        &self,
        state: S,
        ctx: &Ctx,
        tx: &mpsc::UnboundedSender<E>,
        follow_ups: &mut FollowUpTasks,
    ) -> bool {
        let Some(entry) = self.states.get(&state) else {
            return false;
        };

        if let Some(enter) = &entry.on_enter {
            if let Some(follow_up) = enter(ctx) {
                let tx = tx.clone();
                follow_ups.track(tokio::spawn(async move {
                    if let Some(event) = follow_up.await {
                        let _ = tx.send(event);
                    }
                }));
            }
        }

        entry.terminal
    }
}
