use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Wire value standing for a failed probe (unreachable, timeout, ...).
/// Negative so it can never be confused with a real 0ms latency.
pub const FAILURE_MARKER: f64 = -1.0;

/// Probe kinds understood by the agents. Only ICMP echo for now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Ping,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Ping => "ping",
        }
    }
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One thing to probe, as distributed to the agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(default)]
    pub title: String,
    pub probe: ProbeKind,
    /// Seconds between two probing cycles.
    pub interval: u64,
    /// Probes fired per cycle.
    pub count: u32,
    pub host: String,
    #[serde(default)]
    pub workers: Vec<String>,
}

impl Target {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

/// Named collection of targets sharing the same worker membership.
///
/// An empty `workers` list means every worker runs the group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetGroup {
    #[serde(default)]
    pub workers: Vec<String>,
    #[serde(default)]
    pub targets: BTreeMap<String, Target>,
}

impl TargetGroup {
    /// True when `worker` is allowed to execute this group.
    pub fn admits(&self, worker: &str) -> bool {
        self.workers.is_empty() || self.workers.iter().any(|w| w == worker)
    }
}

/// Every target group known to the kernel, keyed by group name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalogue {
    groups: BTreeMap<String, TargetGroup>,
}

impl Catalogue {
    pub fn new(groups: BTreeMap<String, TargetGroup>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &BTreeMap<String, TargetGroup> {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&TargetGroup> {
        self.groups.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, group: TargetGroup) {
        self.groups.insert(name.into(), group);
    }

    pub fn target_count(&self) -> usize {
        self.groups.values().map(|g| g.targets.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// What one worker has to run: group -> target name -> target.
/// This is the JSON document served on the assignment endpoint.
pub type Assignment = BTreeMap<String, BTreeMap<String, Target>>;

/// Outcome of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub enum ProbeSample {
    Latency(Duration),
    Failed,
}

impl ProbeSample {
    /// Milliseconds, or [`FAILURE_MARKER`] for a failed probe.
    pub fn as_millis_f64(&self) -> f64 {
        match self {
            ProbeSample::Latency(rtt) => rtt.as_nanos() as f64 / 1_000_000.0,
            ProbeSample::Failed => FAILURE_MARKER,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ProbeSample::Failed)
    }
}

impl From<f64> for ProbeSample {
    fn from(ms: f64) -> Self {
        if ms.is_finite() && ms >= 0.0 {
            // nanosecond rounding keeps the wire value stable across a round trip
            ProbeSample::Latency(Duration::from_nanos((ms * 1_000_000.0).round() as u64))
        } else {
            ProbeSample::Failed
        }
    }
}

impl From<ProbeSample> for f64 {
    fn from(sample: ProbeSample) -> Self {
        sample.as_millis_f64()
    }
}

/// Samples gathered for one target during one cycle, in probe order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbeResult(Vec<ProbeSample>);

impl ProbeResult {
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, sample: ProbeSample) {
        self.0.push(sample);
    }

    pub fn samples(&self) -> &[ProbeSample] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.0.iter().filter(|s| s.is_failure()).count()
    }
}

impl From<Vec<ProbeSample>> for ProbeResult {
    fn from(samples: Vec<ProbeSample>) -> Self {
        Self(samples)
    }
}

/// Unit of transfer from an agent to the kernel: group -> target -> samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultBatch(BTreeMap<String, BTreeMap<String, ProbeResult>>);

impl ResultBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch holding the result of a single target, as sent after each cycle.
    pub fn single(group: impl Into<String>, target: impl Into<String>, result: ProbeResult) -> Self {
        let mut batch = Self::new();
        batch.insert(group, target, result);
        batch
    }

    pub fn insert(&mut self, group: impl Into<String>, target: impl Into<String>, result: ProbeResult) {
        self.0
            .entry(group.into())
            .or_default()
            .insert(target.into(), result);
    }

    pub fn get(&self, group: &str, target: &str) -> Option<&ProbeResult> {
        self.0.get(group).and_then(|g| g.get(target))
    }

    /// Flattened `(group, target, result)` view.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &ProbeResult)> {
        self.0.iter().flat_map(|(group, targets)| {
            targets
                .iter()
                .map(move |(target, result)| (group.as_str(), target.as_str(), result))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|targets| targets.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping(host: &str) -> Target {
        Target {
            title: String::new(),
            probe: ProbeKind::Ping,
            interval: 60,
            count: 3,
            host: host.to_string(),
            workers: Vec::new(),
        }
    }

    #[test]
    fn test_group_membership() {
        let open = TargetGroup::default();
        assert!(open.admits("anyone"));

        let closed = TargetGroup {
            workers: vec!["w1".into(), "w2".into()],
            targets: BTreeMap::new(),
        };
        assert!(closed.admits("w2"));
        assert!(!closed.admits("w3"));
    }

    #[test]
    fn test_target_wire_format() {
        let json = serde_json::to_value(ping("192.0.2.7")).unwrap();
        assert_eq!(json["probe"], "ping");
        assert_eq!(json["host"], "192.0.2.7");
        assert_eq!(json["interval"], 60);
        assert_eq!(json["count"], 3);
        assert!(json["workers"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_probe_kind_is_rejected() {
        let raw = r#"{"probe":"http","interval":1,"count":1,"host":"example.org"}"#;
        assert!(serde_json::from_str::<Target>(raw).is_err());
    }

    #[test]
    fn test_sample_markers() {
        let ok = ProbeSample::Latency(Duration::from_micros(1500));
        assert_eq!(ok.as_millis_f64(), 1.5);
        assert_eq!(ProbeSample::Failed.as_millis_f64(), FAILURE_MARKER);

        assert_eq!(ProbeSample::from(-1.0), ProbeSample::Failed);
        assert!(matches!(ProbeSample::from(2.0), ProbeSample::Latency(_)));
        assert_eq!(ProbeSample::from(0.25).as_millis_f64(), 0.25);
        assert_eq!(ProbeSample::from(f64::NAN), ProbeSample::Failed);
    }

    #[test]
    fn test_result_batch_shape() {
        let result = ProbeResult::from(vec![
            ProbeSample::Latency(Duration::from_millis(12)),
            ProbeSample::Failed,
        ]);
        let batch = ResultBatch::single("dns", "quad9", result);

        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json, serde_json::json!({"dns": {"quad9": [12.0, -1.0]}}));

        let parsed: ResultBatch = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.get("dns", "quad9").unwrap().failures(), 1);
        assert_eq!(parsed.entries().count(), 1);
    }

    #[test]
    fn test_malformed_batch_is_rejected() {
        assert!(serde_json::from_str::<ResultBatch>(r#"{"g": {"t": ["fast"]}}"#).is_err());
        assert!(serde_json::from_str::<ResultBatch>(r#"{"g": [1.0]}"#).is_err());
    }

    #[test]
    fn test_catalogue_counts() {
        let mut group = TargetGroup::default();
        group.targets.insert("a".into(), ping("192.0.2.1"));
        group.targets.insert("b".into(), ping("192.0.2.2"));

        let mut catalogue = Catalogue::default();
        catalogue.insert("lab", group);
        catalogue.insert("empty", TargetGroup::default());

        assert_eq!(catalogue.target_count(), 2);
        assert_eq!(catalogue.groups().len(), 2);
        assert!(catalogue.group("lab").is_some());
    }
}
