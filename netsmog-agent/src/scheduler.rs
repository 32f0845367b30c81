//! Per-target probing loops.
//!
//! Each target of the assignment gets its own task cycling through
//! wait -> probe `count` times -> report. Targets share nothing but the
//! prober, the sink and the shutdown token.

use netsmog_contracts::{
    Assignment, ProbeResult, ProbeSample, Prober, ResultBatch, ResultSink, Target,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Lowest deadline ever given to a single probe.
pub const MIN_PROBE_DEADLINE: Duration = Duration::from_millis(100);

/// Deadline of each probe in a cycle: half the interval shared between the
/// `count` probes, capped at `max` and never below [`MIN_PROBE_DEADLINE`].
pub fn probe_deadline(interval: Duration, count: u32, max: Duration) -> Duration {
    let share = interval / 2 / count.max(1);
    share.min(max).max(MIN_PROBE_DEADLINE)
}

/// Fires the `count` probes of one cycle, in order. Failures become markers.
pub async fn run_cycle(prober: &dyn Prober, target: &Target, deadline: Duration) -> ProbeResult {
    let mut result = ProbeResult::with_capacity(target.count as usize);
    for n in 1..=target.count {
        let sample = match prober.probe(&target.host, deadline).await {
            Ok(rtt) => ProbeSample::Latency(rtt),
            Err(e) => {
                tracing::debug!(host = %target.host, n, count = target.count, error = %e, "probe failed");
                ProbeSample::Failed
            }
        };
        result.push(sample);
    }
    result
}

/// Everything a target loop needs, shared by all loops of the agent.
#[derive(Clone)]
pub struct Scheduler {
    prober: Arc<dyn Prober>,
    sink: Arc<dyn ResultSink>,
    max_deadline: Duration,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(
        prober: Arc<dyn Prober>,
        sink: Arc<dyn ResultSink>,
        max_deadline: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            prober,
            sink,
            max_deadline,
            shutdown,
        }
    }

    /// Spawns one loop per target. The set is fixed for the life of the agent.
    pub fn spawn_all(&self, assignment: &Assignment) -> JoinSet<()> {
        let mut tasks = JoinSet::new();
        for (group, targets) in assignment {
            for (name, target) in targets {
                let scheduler = self.clone();
                let (group, name, target) = (group.clone(), name.clone(), target.clone());
                tasks.spawn(async move { scheduler.run_target(group, name, target).await });
            }
        }
        tasks
    }

    pub async fn run_target(&self, group: String, name: String, target: Target) {
        let interval = target.interval();
        let deadline = probe_deadline(interval, target.count, self.max_deadline);
        tracing::info!(
            group = %group,
            target = %name,
            host = %target.host,
            probe = %target.probe,
            count = target.count,
            interval_s = target.interval,
            "launching probes"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let result = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = run_cycle(self.prober.as_ref(), &target, deadline) => result,
            };
            tracing::debug!(
                group = %group,
                target = %name,
                samples = result.len(),
                failures = result.failures(),
                "submitting results"
            );

            let batch = ResultBatch::single(group.clone(), name.clone(), result);
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                submitted = self.sink.submit(&batch) => {
                    // dropped, not retried
                    if let Err(e) = submitted {
                        tracing::warn!(group = %group, target = %name, error = %e, "error sending results");
                    }
                }
            }
        }

        tracing::debug!(group = %group, target = %name, "probe loop stopped");
    }
}
