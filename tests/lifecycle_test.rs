//! End-to-end lifecycle tests: membership churn, quarantine and recovery,
//! removal mid-connect, and selection under concurrency.

use carom::policy;
use carom::sources::{
    ConnectFuture, Connector, FailureSignal, FailureSource, MembershipEvent, NullMetricsFactory,
};
use carom::{BalancerError, ConnectError, LoadBalancer};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

type Endpoint = &'static str;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Poll `cond` every 10 ms until it holds or `timeout` elapses.
async fn wait_until(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

#[derive(Debug, Clone, Copy)]
enum ConnectOutcome {
    Succeed,
    Fail,
    Hang,
}

/// Connector whose outcomes are scripted per endpoint; unscripted attempts
/// succeed immediately.
#[derive(Clone, Default)]
struct ScriptedConnector {
    scripts: Arc<Mutex<HashMap<Endpoint, Vec<ConnectOutcome>>>>,
    attempts: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    fn script(&self, endpoint: Endpoint, outcomes: Vec<ConnectOutcome>) {
        self.scripts.lock().unwrap().insert(endpoint, outcomes);
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector<Endpoint> for ScriptedConnector {
    fn connect(&self, endpoint: &Endpoint) -> ConnectFuture {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(endpoint) {
                Some(outcomes) if !outcomes.is_empty() => outcomes.remove(0),
                _ => ConnectOutcome::Succeed,
            }
        };
        Box::pin(async move {
            match outcome {
                ConnectOutcome::Succeed => Ok(()),
                ConnectOutcome::Fail => Err(ConnectError::new("scripted failure")),
                ConnectOutcome::Hang => std::future::pending().await,
            }
        })
    }
}

/// Failure source whose emissions are triggered by the test.
#[derive(Clone, Default)]
struct ManualFailureSource {
    senders: Arc<Mutex<HashMap<Endpoint, mpsc::UnboundedSender<FailureSignal>>>>,
}

impl ManualFailureSource {
    fn fail(&self, endpoint: Endpoint, reason: &str) {
        if let Some(tx) = self.senders.lock().unwrap().get(endpoint) {
            let _ = tx.send(FailureSignal::new(reason));
        }
    }
}

impl FailureSource<Endpoint> for ManualFailureSource {
    fn failures(&self, endpoint: &Endpoint) -> mpsc::UnboundedReceiver<FailureSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().insert(*endpoint, tx);
        rx
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn happy_path_connects_all_endpoints() {
    init_tracing();
    let (members, membership) = mpsc::unbounded_channel();
    let balancer = LoadBalancer::builder(membership, NullMetricsFactory)
        .with_name("happy")
        .build();

    members.send(MembershipEvent::add("a")).unwrap();
    members.send(MembershipEvent::add("b")).unwrap();

    assert!(
        wait_until(
            || balancer.list_active_clients().len() == 2,
            Duration::from_secs(2)
        )
        .await
    );

    let mut all = balancer.list_all_clients();
    all.sort_unstable();
    assert_eq!(all, vec!["a", "b"]);

    let choice = balancer.choose().await.unwrap();
    assert!(["a", "b"].contains(&choice));
}

#[tokio::test(flavor = "multi_thread")]
async fn quarantined_endpoint_recovers_after_backoff() {
    init_tracing();
    let connector = ScriptedConnector::default();
    connector.script("a", vec![ConnectOutcome::Fail]);

    let (members, membership) = mpsc::unbounded_channel();
    let balancer = LoadBalancer::builder(membership, NullMetricsFactory)
        .with_name("recovery")
        .with_connector(connector.clone())
        .with_backoff(policy::fixed_delay(Duration::from_millis(50)))
        .build();

    members.send(MembershipEvent::add("a")).unwrap();

    // First attempt fails and quarantines; the retry after backoff succeeds.
    assert!(
        wait_until(
            || balancer.list_active_clients() == vec!["a"],
            Duration::from_secs(2)
        )
        .await
    );
    assert!(connector.attempts() >= 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn failure_while_active_quarantines_and_reconnects() {
    init_tracing();
    let failures = ManualFailureSource::default();

    let (members, membership) = mpsc::unbounded_channel();
    let balancer = LoadBalancer::builder(membership, NullMetricsFactory)
        .with_name("flap")
        .with_failure_source(failures.clone())
        .with_backoff(policy::fixed_delay(Duration::from_millis(50)))
        .build();

    members.send(MembershipEvent::add("a")).unwrap();
    assert!(
        wait_until(
            || balancer.list_active_clients() == vec!["a"],
            Duration::from_secs(2)
        )
        .await
    );

    failures.fail("a", "injected failure");
    assert!(
        wait_until(
            || balancer.list_active_clients().is_empty(),
            Duration::from_secs(1)
        )
        .await,
        "failed endpoint should leave the active set"
    );

    assert!(
        wait_until(
            || balancer.list_active_clients() == vec!["a"],
            Duration::from_secs(2)
        )
        .await,
        "endpoint should reconnect after the backoff"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn removal_during_connect_cancels_the_attempt() {
    init_tracing();
    let connector = ScriptedConnector::default();
    connector.script("a", vec![ConnectOutcome::Hang]);

    let (members, membership) = mpsc::unbounded_channel();
    let balancer = LoadBalancer::builder(membership, NullMetricsFactory)
        .with_name("mid-connect")
        .with_connector(connector.clone())
        .build();

    members.send(MembershipEvent::add("a")).unwrap();
    assert!(
        wait_until(|| connector.attempts() == 1, Duration::from_secs(2)).await,
        "connect attempt should start"
    );
    assert!(balancer.list_active_clients().is_empty());

    members.send(MembershipEvent::remove("a")).unwrap();
    assert!(
        wait_until(
            || balancer.list_all_clients().is_empty(),
            Duration::from_secs(2)
        )
        .await,
        "removed endpoint should leave the pool"
    );
    assert!(balancer.list_active_clients().is_empty());
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn removal_while_quarantined_is_complete() {
    init_tracing();
    let connector = ScriptedConnector::default();
    connector.script("a", vec![ConnectOutcome::Fail]);

    let (members, membership) = mpsc::unbounded_channel();
    let balancer = LoadBalancer::builder(membership, NullMetricsFactory)
        .with_name("quarantine-remove")
        .with_connector(connector.clone())
        .with_backoff(policy::fixed_delay(Duration::from_secs(5)))
        .build();

    members.send(MembershipEvent::add("a")).unwrap();
    assert!(
        wait_until(|| connector.attempts() == 1, Duration::from_secs(2)).await,
        "connect attempt should start"
    );
    // Let the scripted failure land so the endpoint is quarantined for 5 s.
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Removal must not wait for the backoff to expire.
    members.send(MembershipEvent::remove("a")).unwrap();
    assert!(
        wait_until(
            || balancer.list_all_clients().is_empty(),
            Duration::from_secs(2)
        )
        .await,
        "removal must complete while the backoff is still pending"
    );
    assert!(balancer.list_active_clients().is_empty());
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn choose_with_no_endpoints_reports_unavailable() {
    init_tracing();
    let (_members, membership) = mpsc::unbounded_channel::<MembershipEvent<Endpoint>>();
    let balancer = LoadBalancer::builder(membership, NullMetricsFactory).build();

    let result = balancer.choose().await;
    assert!(matches!(result, Err(BalancerError::NoEndpointsAvailable)));
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_add_is_idempotent() {
    init_tracing();
    let (members, membership) = mpsc::unbounded_channel();
    let balancer = LoadBalancer::builder(membership, NullMetricsFactory).build();

    members.send(MembershipEvent::add("a")).unwrap();
    members.send(MembershipEvent::add("a")).unwrap();

    assert!(
        wait_until(
            || balancer.list_active_clients() == vec!["a"],
            Duration::from_secs(2)
        )
        .await
    );
    assert_eq!(balancer.list_all_clients(), vec!["a"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn removal_of_connected_endpoint_is_complete() {
    init_tracing();
    let (members, membership) = mpsc::unbounded_channel();
    let balancer = LoadBalancer::builder(membership, NullMetricsFactory).build();

    members.send(MembershipEvent::add("a")).unwrap();
    assert!(
        wait_until(
            || balancer.list_active_clients() == vec!["a"],
            Duration::from_secs(2)
        )
        .await
    );

    members.send(MembershipEvent::remove("a")).unwrap();
    assert!(
        wait_until(
            || balancer.list_all_clients().is_empty() && balancer.list_active_clients().is_empty(),
            Duration::from_secs(2)
        )
        .await
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_is_idempotent_and_fails_choose() {
    init_tracing();
    let (members, membership) = mpsc::unbounded_channel();
    let balancer = LoadBalancer::builder(membership, NullMetricsFactory).build();

    members.send(MembershipEvent::add("a")).unwrap();
    assert!(
        wait_until(
            || balancer.list_active_clients() == vec!["a"],
            Duration::from_secs(2)
        )
        .await
    );

    balancer.shutdown();
    balancer.shutdown();

    let result = balancer.choose().await;
    assert!(matches!(result, Err(BalancerError::ShutDown)));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_choose_under_membership_churn() {
    init_tracing();
    let (members, membership) = mpsc::unbounded_channel();
    let balancer = Arc::new(
        LoadBalancer::builder(membership, NullMetricsFactory)
            .with_name("churn")
            .build(),
    );

    let endpoints: Vec<String> = (0..50).map(|i| format!("host-{i}")).collect();
    let churn_window = Duration::from_millis(500);

    let churn_endpoints = endpoints.clone();
    let churn = tokio::spawn(async move {
        let deadline = Instant::now() + churn_window;
        let mut present = vec![false; churn_endpoints.len()];
        let mut i = 0;
        while Instant::now() < deadline {
            let idx = i % churn_endpoints.len();
            let event = if present[idx] {
                MembershipEvent::remove(churn_endpoints[idx].clone())
            } else {
                MembershipEvent::add(churn_endpoints[idx].clone())
            };
            present[idx] = !present[idx];
            if members.send(event).is_err() {
                return;
            }
            i += 1;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        // Let in-flight removals finish, then re-add what is missing so the
        // pool can quiesce non-empty.
        tokio::time::sleep(Duration::from_millis(200)).await;
        for (idx, endpoint) in churn_endpoints.iter().enumerate() {
            if !present[idx] {
                let _ = members.send(MembershipEvent::add(endpoint.clone()));
            }
        }
    });

    let mut choosers = Vec::new();
    for _ in 0..100 {
        let balancer = Arc::clone(&balancer);
        choosers.push(tokio::spawn(async move {
            let deadline = Instant::now() + Duration::from_millis(600);
            while Instant::now() < deadline {
                match balancer.choose().await {
                    Ok(endpoint) => assert!(endpoint.starts_with("host-")),
                    Err(BalancerError::NoEndpointsAvailable) => {}
                    Err(other) => panic!("unexpected choose error: {other}"),
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    // No chooser may hang.
    tokio::time::timeout(Duration::from_secs(10), async {
        churn.await.unwrap();
        for chooser in choosers {
            chooser.await.unwrap();
        }
    })
    .await
    .expect("choose calls must not hang under churn");

    // After quiescence every known endpoint is connected and the views are
    // consistent.
    assert!(
        wait_until(
            || {
                let all = balancer.list_all_clients();
                let active = balancer.list_active_clients();
                !all.is_empty()
                    && active.len() == all.len()
                    && active.iter().all(|endpoint| all.contains(endpoint))
            },
            Duration::from_secs(5)
        )
        .await
    );
}
