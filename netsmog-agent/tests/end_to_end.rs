//! Agent against a real kernel router on an ephemeral port.

use netsmog_agent::{CoordinatorClient, EchoProber, FetchError, Scheduler};
use netsmog_contracts::{ProbeSample, ResultBatch, ResultSink};
use netsmog_devkit::{MemoryStore, ScriptedProber, TestHarness};
use netsmog_kernel::{build_router, load_config, AppState, Registry, SecretStore, Snapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const KERNEL_YAML: &str = "\
main:
  title: e2e
  secrets: SECRETS
targets:
  g1:
    targets:
      t1:
        probe: ping
        host: 127.0.0.1
        interval: 1
        count: 1
  private:
    workers: [someone-else]
    targets:
      hidden:
        host: 192.0.2.1
";

struct Kernel {
    url: String,
    store: Arc<MemoryStore>,
}

async fn start_kernel(harness: &TestHarness) -> Kernel {
    let secrets_path = harness.write_secrets(&[("w1", "hunter2")]).unwrap();
    let yaml = KERNEL_YAML.replace("SECRETS", &secrets_path.display().to_string());
    let cfg_path = harness.write_kernel_config(&yaml).unwrap();

    let cfg = load_config(&cfg_path).await.unwrap();
    let store = Arc::new(MemoryStore::new());
    let router = build_router(AppState {
        registry: Snapshot::new(Registry {
            catalogue: cfg.catalogue().unwrap(),
            secrets: SecretStore::load(&cfg.main.secrets).await.unwrap(),
        }),
        store: store.clone(),
    });
    let addr = harness.serve(router).await.unwrap();
    Kernel {
        url: format!("http://{addr}"),
        store,
    }
}

async fn wait_rows(store: &MemoryStore, count: usize) {
    for _ in 0..100 {
        if store.rows().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn test_fetch_then_submit() {
    let harness = TestHarness::new().unwrap();
    let kernel = start_kernel(&harness).await;
    let token = harness.token("w1", "hunter2").unwrap();
    let client = CoordinatorClient::new(&kernel.url, "w1", &token).unwrap();

    let assignment = client.fetch_assignment().await.unwrap();
    assert_eq!(assignment["g1"]["t1"].host, "127.0.0.1");
    assert_eq!(assignment["g1"]["t1"].count, 1);
    assert!(assignment["private"].is_empty());

    let prober = Arc::new(ScriptedProber::constant(Duration::from_micros(250)));
    let shutdown = CancellationToken::new();
    let scheduler = Scheduler::new(
        prober.clone(),
        Arc::new(client),
        Duration::from_secs(3),
        shutdown.clone(),
    );
    let mut tasks = scheduler.spawn_all(&assignment);
    assert_eq!(tasks.len(), 1);

    wait_rows(&kernel.store, 1).await;
    shutdown.cancel();
    while tasks.join_next().await.is_some() {}

    let rows = kernel.store.rows();
    assert!(!rows.is_empty());
    assert_eq!(rows[0].series, "g1.t1");
    assert_eq!(rows[0].worker, "w1");
    assert_eq!(rows[0].value, 0.25);
    assert!(prober.calls().iter().all(|c| c.host == "127.0.0.1"));
}

#[tokio::test]
async fn test_real_prober_reports_a_float() {
    let harness = TestHarness::new().unwrap();
    let kernel = start_kernel(&harness).await;
    let token = harness.token("w1", "hunter2").unwrap();
    let client = CoordinatorClient::new(&kernel.url, "w1", &token).unwrap();
    let assignment = client.fetch_assignment().await.unwrap();

    let shutdown = CancellationToken::new();
    let scheduler = Scheduler::new(
        Arc::new(EchoProber::new()),
        Arc::new(client),
        Duration::from_secs(3),
        shutdown.clone(),
    );
    let mut tasks = scheduler.spawn_all(&assignment);
    wait_rows(&kernel.store, 1).await;
    shutdown.cancel();
    while tasks.join_next().await.is_some() {}

    // a latency where ICMP sockets are allowed, the failure marker otherwise
    let rows = kernel.store.rows();
    assert!(!rows.is_empty());
    assert!(rows[0].value >= 0.0 || rows[0].value == ProbeSample::Failed.as_millis_f64());
}

#[tokio::test]
async fn test_wrong_secret_is_refused() {
    let harness = TestHarness::new().unwrap();
    let kernel = start_kernel(&harness).await;
    let token = harness.token("w1", "not-the-secret").unwrap();
    let client = CoordinatorClient::new(&kernel.url, "w1", &token).unwrap();

    assert!(matches!(client.fetch_assignment().await, Err(FetchError::Status(403))));

    let mut batch = ResultBatch::new();
    batch.insert("g1", "t1", vec![ProbeSample::Failed].into());
    assert!(client.submit(&batch).await.is_err());
    assert!(kernel.store.rows().is_empty());
}

#[tokio::test]
async fn test_same_batch_twice_is_stored_twice() {
    let harness = TestHarness::new().unwrap();
    let kernel = start_kernel(&harness).await;
    let token = harness.token("w1", "hunter2").unwrap();
    let client = CoordinatorClient::new(&kernel.url, "w1", &token).unwrap();

    let batch = ResultBatch::single(
        "g1",
        "t1",
        vec![ProbeSample::Latency(Duration::from_millis(2))].into(),
    );
    client.submit(&batch).await.unwrap();
    client.submit(&batch).await.unwrap();
    assert_eq!(kernel.store.rows().len(), 2);
}
