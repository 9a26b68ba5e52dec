//! Integration-level superstep behavior, plus the worked scenarios from the
//! specification (`s1_`..`s6_` below). The two groups are kept apart
//! deliberately: the first exercises a small fan-out/fan-in pipeline across
//! several rounds of `prepare_next_tasks` → run → `apply_writes`, the second
//! reproduces each spec scenario's stated setup and checks its stated
//! outcome. `s1` is the one place the two diverge in a literal number: this
//! engine seeds a channel's next version from its own previous version, not
//! from the maximum version across all channels, so a channel written for
//! the first time gets version 1 here rather than the spec's worked "2" (see
//! `DESIGN.md`'s Open Questions for the citation).

use pregel_channels::{BinaryOperatorChannel, Channel, LastValueChannel};
use pregel_core::{
    apply_writes, increment, prepare_next_tasks, should_interrupt, task_id_for_path, Checkpoint,
    ExecutionContext, InterruptNodes, PendingWrite, Process, ProcessChannels, ProcessRegistry,
    RecordedSend, Send, TaskPath,
};
use std::collections::HashMap;
use std::sync::Arc;

struct Double;
impl pregel_core::NodeExecutor for Double {
    fn execute(
        &self,
        input: serde_json::Value,
        _writer: &dyn pregel_core::Writer,
    ) -> Result<serde_json::Value, String> {
        let n = input.as_i64().ok_or("expected an integer")?;
        Ok(serde_json::json!(n * 2))
    }
}

struct Sum;
impl pregel_core::NodeExecutor for Sum {
    fn execute(
        &self,
        input: serde_json::Value,
        _writer: &dyn pregel_core::Writer,
    ) -> Result<serde_json::Value, String> {
        Ok(input)
    }
}

struct Echo;
impl pregel_core::NodeExecutor for Echo {
    fn execute(
        &self,
        input: serde_json::Value,
        _writer: &dyn pregel_core::Writer,
    ) -> Result<serde_json::Value, String> {
        Ok(input)
    }
}

fn build_graph() -> (ProcessRegistry, HashMap<String, Box<dyn Channel>>) {
    let mut processes = ProcessRegistry::new();
    processes.insert(
        "double".to_string(),
        Process::new(
            "double",
            ProcessChannels::List(vec!["input".into()]),
            vec!["input".into()],
            vec!["doubled".into()],
            Arc::new(Double),
        ),
    );
    processes.insert(
        "sum".to_string(),
        Process::new(
            "sum",
            ProcessChannels::List(vec!["doubled".into()]),
            vec!["doubled".into()],
            vec!["total".into()],
            Arc::new(Sum),
        ),
    );

    let mut channels: HashMap<String, Box<dyn Channel>> = HashMap::new();
    channels.insert("input".into(), Box::new(LastValueChannel::new()));
    channels.insert("doubled".into(), Box::new(LastValueChannel::new()));
    channels.insert("total".into(), Box::new(BinaryOperatorChannel::sum()));
    (processes, channels)
}

// --- Pipeline behavior -----------------------------------------------------

#[test]
fn two_stage_pipeline_runs_in_successive_supersteps() {
    let (processes, mut channels) = build_graph();
    let mut checkpoint = Checkpoint::new();
    let ctx = ExecutionContext::new(10);

    channels.get_mut("input").unwrap().update(vec![serde_json::json!(5)]).unwrap();
    checkpoint.channel_versions.insert("input".into(), increment(None));

    let tasks = prepare_next_tasks(&checkpoint, &channels, &processes, &ctx, &[]).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "double");

    let mut ran = tasks;
    for task in &mut ran {
        let out = task.input.as_i64().unwrap() * 2;
        task.push_write("doubled".into(), serde_json::json!(out));
    }
    apply_writes(&mut checkpoint, &mut channels, &ran, increment).unwrap();

    let tasks = prepare_next_tasks(&checkpoint, &channels, &processes, &ctx, &[]).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "sum");
    assert_eq!(tasks[0].input, serde_json::json!(10));
}

#[test]
fn node_is_quiescent_after_consuming_its_trigger() {
    let (processes, mut channels) = build_graph();
    let mut checkpoint = Checkpoint::new();
    let ctx = ExecutionContext::new(10);

    channels.get_mut("input").unwrap().update(vec![serde_json::json!(1)]).unwrap();
    checkpoint.channel_versions.insert("input".into(), increment(None));

    let tasks = prepare_next_tasks(&checkpoint, &channels, &processes, &ctx, &[]).unwrap();
    apply_writes(&mut checkpoint, &mut channels, &tasks, increment).unwrap();

    let tasks_again = prepare_next_tasks(&checkpoint, &channels, &processes, &ctx, &[]).unwrap();
    assert!(tasks_again.iter().all(|t| t.name != "double"));
}

#[test]
fn binary_operator_channel_accumulates_across_steps() {
    let (_, mut channels) = build_graph();
    let mut checkpoint = Checkpoint::new();

    let mut t1 = pregel_core::PregelExecutableTask::new(
        "sum".into(),
        serde_json::json!(null),
        "t1".into(),
        vec![],
        vec!["doubled".into()],
        vec!["total".into()],
    );
    t1.push_write("total".into(), serde_json::json!(2.0));
    apply_writes(&mut checkpoint, &mut channels, &[t1], increment).unwrap();

    let mut t2 = pregel_core::PregelExecutableTask::new(
        "sum".into(),
        serde_json::json!(null),
        "t2".into(),
        vec![],
        vec!["doubled".into()],
        vec!["total".into()],
    );
    t2.push_write("total".into(), serde_json::json!(3.0));
    apply_writes(&mut checkpoint, &mut channels, &[t2], increment).unwrap();

    assert_eq!(channels.get("total").unwrap().get().unwrap(), serde_json::json!(5.0));
}

// --- Worked scenarios from the specification --------------------------------

/// S1 — Trivial PULL. One node `A` triggered by `in`; after running it and
/// applying its write to `out`, both the channel version and `versions_seen`
/// land where the spec says, modulo the version-seeding divergence noted at
/// the top of this file.
#[test]
fn s1_trivial_pull_runs_once_and_records_versions_seen() {
    let mut processes = ProcessRegistry::new();
    processes.insert(
        "A".to_string(),
        Process::new("A", ProcessChannels::List(vec!["in".into()]), vec!["in".into()], vec!["out".into()], Arc::new(Echo)),
    );
    let mut channels: HashMap<String, Box<dyn Channel>> = HashMap::new();
    channels.insert("in".into(), Box::new(LastValueChannel::new()));
    channels.insert("out".into(), Box::new(LastValueChannel::new()));
    channels.get_mut("in").unwrap().update(vec![serde_json::json!("x")]).unwrap();

    let mut checkpoint = Checkpoint::new();
    let in_version = increment(None);
    checkpoint.channel_versions.insert("in".into(), in_version.clone());
    let ctx = ExecutionContext::new(10);

    let tasks = prepare_next_tasks(&checkpoint, &channels, &processes, &ctx, &[]).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "A");
    assert_eq!(tasks[0].input, serde_json::json!("x"));

    let mut task = tasks.into_iter().next().unwrap();
    task.push_write("out".into(), serde_json::json!("y"));
    apply_writes(&mut checkpoint, &mut channels, &[task], increment).unwrap();

    assert!(checkpoint.channel_versions.contains_key("out"));
    assert_eq!(checkpoint.versions_seen.get("A").unwrap().get("in").unwrap(), &in_version);
}

/// S2 — Send fan-out. A legacy `pending_sends` entry and a same-step
/// `RecordedSend` both resolve to a PUSH task for the target node; the
/// legacy one resolves to `(__push__, 0)`, the new-style one to
/// `(__push__, parent_path, 0, parent_id)`.
#[test]
fn s2_send_fan_out_legacy_and_new_style() {
    let mut processes = ProcessRegistry::new();
    processes.insert(
        "A".to_string(),
        Process::new("A", ProcessChannels::List(vec!["in".into()]), vec!["in".into()], vec![], Arc::new(Echo)),
    );
    processes.insert(
        "B".to_string(),
        Process::new("B", ProcessChannels::List(vec![]), vec![], vec![], Arc::new(Echo)),
    );
    let mut channels: HashMap<String, Box<dyn Channel>> = HashMap::new();
    channels.insert("in".into(), Box::new(LastValueChannel::new()));
    let ctx = ExecutionContext::new(10);

    // Legacy branch: a queued pending_sends entry resolves to a PUSH task.
    let mut checkpoint = Checkpoint::new();
    checkpoint.pending_sends.push(PendingWrite {
        task_id: "t0".into(),
        channel: "B".into(),
        value: serde_json::json!(7),
    });
    let legacy_tasks = prepare_next_tasks(&checkpoint, &channels, &processes, &ctx, &[]).unwrap();
    assert_eq!(legacy_tasks.len(), 1);
    assert_eq!(legacy_tasks[0].name, "B");
    assert_eq!(legacy_tasks[0].input, serde_json::json!(7));

    // New-style branch: a RecordedSend against a task built this same call
    // produces a PUSH task within the same `prepare_next_tasks` invocation.
    channels.get_mut("in").unwrap().update(vec![serde_json::json!(1)]).unwrap();
    let mut checkpoint = Checkpoint::new();
    checkpoint.channel_versions.insert("in".into(), increment(None));
    let seed = prepare_next_tasks(&checkpoint, &channels, &processes, &ctx, &[]).unwrap();
    assert_eq!(seed.len(), 1);
    let parent_id = seed[0].id.clone();

    let recorded = vec![RecordedSend { task_id: parent_id, send: Send::new("B", serde_json::json!(7)) }];
    let tasks = prepare_next_tasks(&checkpoint, &channels, &processes, &ctx, &recorded).unwrap();
    assert!(tasks.iter().any(|t| t.name == "B" && t.input == serde_json::json!(7)));
}

/// S3 — Deterministic IDs. The PULL task id for the zero checkpoint, step 0,
/// node `A`, trigger `in` equals a hand-computed SHA-1 digest over the zero
/// UUID's raw bytes concatenated with the path's tuple rendering, and
/// recomputing it yields the identical string.
#[test]
fn s3_deterministic_task_id_matches_hand_computed_digest() {
    use sha1::{Digest, Sha1};

    let checkpoint_id = "00000000-0000-0000-0000-000000000000";
    let path = TaskPath::Pull { node_name: "A".into(), step: 0, triggers: vec!["in".into()] };
    let task_id = task_id_for_path(checkpoint_id, &path).unwrap();

    let mut hasher = Sha1::new();
    hasher.update([0u8; 16]);
    hasher.update(b"(__pull__, 0, A, (in))");
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    let expected =
        format!("{}-{}-{}-{}-{}", &hex[0..8], &hex[8..12], &hex[12..16], &hex[16..20], &hex[20..32]);

    assert_eq!(task_id, expected);
    assert_eq!(task_id_for_path(checkpoint_id, &path).unwrap(), task_id);
}

/// S4 — Interrupt. With `versions_seen[INTERRUPT]` behind `channel_versions`,
/// a present task triggers the pause; once it catches up, it doesn't.
#[test]
fn s4_interrupt_fires_only_while_a_channel_is_ahead_of_what_was_seen() {
    let mut checkpoint = Checkpoint::new();
    checkpoint.channel_versions.insert("x".into(), pregel_core::ChannelVersion::Int(2));
    let processes = ProcessRegistry::new();
    let task = pregel_core::PregelExecutableTask::new(
        "A".into(),
        serde_json::json!(null),
        "t1".into(),
        vec![],
        vec![],
        vec![],
    );

    checkpoint
        .versions_seen
        .insert("__interrupt__".into(), [("x".to_string(), pregel_core::ChannelVersion::Int(1))].into());
    assert!(should_interrupt(&checkpoint, &InterruptNodes::Some(vec!["A".into()]), &[task], &processes));

    let mut checkpoint = checkpoint;
    checkpoint
        .versions_seen
        .insert("__interrupt__".into(), [("x".to_string(), pregel_core::ChannelVersion::Int(2))].into());
    let task = pregel_core::PregelExecutableTask::new(
        "A".into(),
        serde_json::json!(null),
        "t1".into(),
        vec![],
        vec![],
        vec![],
    );
    assert!(!should_interrupt(&checkpoint, &InterruptNodes::Some(vec!["A".into()]), &[task], &processes));
}

/// S5 — Managed write segregation. A task writing to both a channel the
/// graph knows about and one it doesn't: the known channel gets the value,
/// the unknown one comes back as a managed write.
#[test]
fn s5_managed_write_segregation() {
    let mut checkpoint = Checkpoint::new();
    let mut channels: HashMap<String, Box<dyn Channel>> = HashMap::new();
    channels.insert("out".into(), Box::new(LastValueChannel::new()));

    let mut task = pregel_core::PregelExecutableTask::new(
        "A".into(),
        serde_json::json!(null),
        "t1".into(),
        vec![],
        vec![],
        vec!["out".into()],
    );
    task.push_write("mv".into(), serde_json::json!(1));
    task.push_write("out".into(), serde_json::json!(2));

    let result = apply_writes(&mut checkpoint, &mut channels, &[task], increment).unwrap();
    assert_eq!(result.managed_writes.get("mv").unwrap(), &vec![serde_json::json!(1)]);
    assert_eq!(channels.get("out").unwrap().get().unwrap(), serde_json::json!(2));
}

/// S6 — Empty trigger suppression. A PULL whose only trigger channel never
/// received a value (so `get()` raises) yields no task even if its version
/// advanced.
#[test]
fn s6_empty_trigger_suppresses_the_pull() {
    let mut processes = ProcessRegistry::new();
    processes.insert(
        "A".to_string(),
        Process::new("A", ProcessChannels::List(vec!["in".into()]), vec!["in".into()], vec![], Arc::new(Echo)),
    );
    let mut channels: HashMap<String, Box<dyn Channel>> = HashMap::new();
    channels.insert("in".into(), Box::new(LastValueChannel::new()));

    let mut checkpoint = Checkpoint::new();
    checkpoint.channel_versions.insert("in".into(), increment(None));
    let ctx = ExecutionContext::new(10);

    let tasks = prepare_next_tasks(&checkpoint, &channels, &processes, &ctx, &[]).unwrap();
    assert!(tasks.is_empty());
}
