//! The superstep algorithm: applying a batch of task writes to the channel
//! set and checkpoint (§ write application), then planning the next batch of
//! tasks to run (§ scheduling).
//!
//! Everything here is pure with respect to I/O — callers own the event loop,
//! retries and persistence; this module only ever mutates the checkpoint and
//! channel map it's handed.

use crate::checkpoint::{Checkpoint, ChannelVersion, PendingWrite, INTERRUPT};
use crate::consts;
use crate::error::{PregelError, Result};
use crate::identity::{self, TaskPath};
use crate::managed::{ExecutionContext, ManagedValueType};
use crate::process::{Process, ProcessChannels, ProcessRegistry};
use crate::send::{RecordedSend, Send};
use crate::types::{PregelExecutableTask, WritesProtocol};
use pregel_channels::{Channel, ChannelError};
use std::collections::{HashMap, HashSet};

/// Outcome of [`apply_writes`]: which channels actually advanced this step,
/// and any writes targeting channels the caller hasn't registered (handed
/// back rather than dropped, since "managed" targets are often resolved by
/// the caller after the fact).
pub struct AppliedWrites {
    pub updated_channels: HashSet<String>,
    pub managed_writes: HashMap<String, Vec<serde_json::Value>>,
}

/// Fold every task's writes into the channel set, advancing versions for
/// whatever actually changed. Order of operations matters: versions_seen is
/// recorded and trigger channels are consumed *before* this step's writes are
/// applied, so a task never observes its own write as something it triggered.
pub fn apply_writes(
    checkpoint: &mut Checkpoint,
    channels: &mut HashMap<String, Box<dyn Channel>>,
    tasks: &[PregelExecutableTask],
    get_next_version: impl Fn(Option<&ChannelVersion>) -> ChannelVersion,
) -> Result<AppliedWrites> {
    let mut sorted: Vec<&PregelExecutableTask> = tasks.iter().collect();
    sorted.sort_by_key(|t| t.path.iter().take(3).map(|s| s.to_string()).collect::<Vec<_>>());

    let bump_step = sorted.iter().any(|t| !t.triggers().is_empty());

    for task in &sorted {
        if task.triggers().is_empty() {
            continue;
        }
        let entry = checkpoint.versions_seen.entry(task.name.clone()).or_default();
        for trigger in task.triggers() {
            if let Some(version) = checkpoint.channel_versions.get(trigger) {
                entry.insert(trigger.clone(), version.clone());
            }
        }
    }

    let mut to_consume: HashSet<String> = HashSet::new();
    for task in &sorted {
        for trigger in task.triggers() {
            if !consts::is_special_channel(trigger) && channels.contains_key(trigger) {
                to_consume.insert(trigger.clone());
            }
        }
    }
    for name in &to_consume {
        let consumed = channels.get_mut(name).map(|ch| ch.consume()).unwrap_or(false);
        if consumed {
            let next = get_next_version(checkpoint.channel_versions.get(name));
            checkpoint.channel_versions.insert(name.clone(), next);
        }
    }

    if bump_step {
        checkpoint.pending_sends.clear();
    }

    let mut writes_by_channel: HashMap<String, Vec<serde_json::Value>> = HashMap::new();
    let mut managed_writes: HashMap<String, Vec<serde_json::Value>> = HashMap::new();

    for task in &sorted {
        for (channel, value) in task.writes() {
            if channel == consts::TASKS {
                checkpoint.pending_sends.push(PendingWrite {
                    task_id: task.id.clone(),
                    channel: channel.clone(),
                    value: value.clone(),
                });
                continue;
            }
            if consts::is_special_channel(channel) {
                continue;
            }
            if channels.contains_key(channel) {
                writes_by_channel.entry(channel.clone()).or_default().push(value.clone());
            } else {
                managed_writes.entry(channel.clone()).or_default().push(value.clone());
            }
        }
    }

    let mut updated_channels = HashSet::new();
    for (name, values) in writes_by_channel {
        if let Some(ch) = channels.get_mut(&name) {
            if ch.update(values)? {
                let next = get_next_version(checkpoint.channel_versions.get(&name));
                checkpoint.channel_versions.insert(name.clone(), next);
                updated_channels.insert(name);
            }
        }
    }

    if bump_step {
        let idle: Vec<String> =
            channels.keys().filter(|name| !updated_channels.contains(*name)).cloned().collect();
        for name in idle {
            if let Some(ch) = channels.get_mut(&name) {
                if ch.update(vec![])? {
                    let next = get_next_version(checkpoint.channel_versions.get(&name));
                    checkpoint.channel_versions.insert(name.clone(), next);
                    updated_channels.insert(name);
                }
            }
        }
    }

    Ok(AppliedWrites { updated_channels, managed_writes })
}

/// Which nodes are allowed to pause the run when they observe new input.
pub enum InterruptNodes {
    All,
    Some(Vec<String>),
}

/// Whether the run should pause before executing `tasks`, given what's
/// changed in the checkpoint since the last time an interrupt was evaluated.
/// `InterruptNodes::All` excludes nodes tagged [`consts::TAG_HIDDEN`] —
/// execution-internal nodes a caller never asked to see.
pub fn should_interrupt(
    checkpoint: &Checkpoint,
    interrupt_nodes: &InterruptNodes,
    tasks: &[PregelExecutableTask],
    processes: &ProcessRegistry,
) -> bool {
    let seen = checkpoint.versions_seen.get(INTERRUPT).cloned().unwrap_or_default();
    let null_version = checkpoint.null_version();
    let any_updates = checkpoint
        .channel_versions
        .iter()
        .any(|(channel, version)| *version > *seen.get(channel).unwrap_or(&null_version));
    if !any_updates {
        return false;
    }
    match interrupt_nodes {
        InterruptNodes::All => tasks.iter().any(|t| {
            !processes
                .get(&t.name)
                .map(|p| p.tags.iter().any(|tag| tag == consts::TAG_HIDDEN))
                .unwrap_or(false)
        }),
        InterruptNodes::Some(names) => tasks.iter().any(|t| names.contains(&t.name)),
    }
}

fn managed_kind_for_key(key: &str) -> Option<ManagedValueType> {
    [ManagedValueType::RemainingSteps, ManagedValueType::IsLastStep, ManagedValueType::CurrentStep]
        .into_iter()
        .find(|k| k.state_key() == key)
}

/// Compute a process's input from its channel subscriptions.
///
/// A list-shaped subscription reads the first channel that has a value. A
/// mapping-shaped one builds an object: keys naming a trigger must read
/// successfully or the process isn't eligible yet ([`PregelError::EmptyChannel`]
/// propagates); keys naming a known but non-triggering channel are read
/// best-effort and simply omitted if empty; keys naming neither are resolved
/// against managed values.
fn proc_input(
    proc: &Process,
    channels: &HashMap<String, Box<dyn Channel>>,
    ctx: &ExecutionContext,
) -> Result<Option<serde_json::Value>> {
    match &proc.channels {
        ProcessChannels::List(names) => {
            for name in names {
                if let Some(ch) = channels.get(name) {
                    match ch.get() {
                        Ok(v) => return Ok(Some(v)),
                        Err(ChannelError::Empty) => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            Ok(None)
        }
        ProcessChannels::Mapping(pairs) => {
            let mut obj = serde_json::Map::new();
            for (key, channel_name) in pairs {
                if let Some(kind) = managed_kind_for_key(key) {
                    obj.insert(key.clone(), ctx.resolve(kind));
                    continue;
                }
                let is_trigger = proc.triggers.contains(channel_name);
                match channels.get(channel_name) {
                    Some(ch) => match ch.get() {
                        Ok(v) => {
                            obj.insert(key.clone(), v);
                        }
                        Err(ChannelError::Empty) if is_trigger => {
                            return Err(PregelError::EmptyChannel);
                        }
                        Err(ChannelError::Empty) => {}
                        Err(e) => return Err(e.into()),
                    },
                    None => {}
                }
            }
            Ok(Some(serde_json::Value::Object(obj)))
        }
    }
}

/// Read channel values as they would appear if only `task_writes` (not yet
/// committed through [`apply_writes`]) had landed. Used to give a running
/// task a consistent view of values it just wrote itself.
pub fn local_read(
    channels: &HashMap<String, Box<dyn Channel>>,
    task_writes: &[(String, serde_json::Value)],
    select: &[String],
) -> Result<HashMap<String, serde_json::Value>> {
    let mut snapshot: HashMap<String, Box<dyn Channel>> =
        channels.iter().map(|(k, v)| (k.clone(), v.clone_box())).collect();

    let mut grouped: HashMap<String, Vec<serde_json::Value>> = HashMap::new();
    for (channel, value) in task_writes {
        if consts::is_special_channel(channel) {
            continue;
        }
        grouped.entry(channel.clone()).or_default().push(value.clone());
    }
    for (channel, values) in grouped {
        if let Some(ch) = snapshot.get_mut(&channel) {
            ch.update(values)?;
        }
    }

    let mut out = HashMap::new();
    for key in select {
        if let Some(ch) = snapshot.get(key) {
            out.insert(key.clone(), ch.get()?);
        }
    }
    Ok(out)
}

/// The `local_write` side of a task's writer: appends to a task's write
/// buffer, validating `Send` targets against the process registry so a typo'd
/// node name fails fast instead of silently vanishing at write-application
/// time.
pub struct LocalWriter<'a> {
    buffer: std::sync::Mutex<Vec<(String, serde_json::Value)>>,
    known_nodes: &'a HashSet<String>,
}

impl<'a> LocalWriter<'a> {
    pub fn new(known_nodes: &'a HashSet<String>) -> Self {
        Self { buffer: std::sync::Mutex::new(Vec::new()), known_nodes }
    }

    pub fn send(&self, node: &str, value: serde_json::Value) -> Result<()> {
        if !self.known_nodes.contains(node) {
            return Err(PregelError::InvalidUpdate(format!(
                "send target '{node}' is not a registered node"
            )));
        }
        let packet = Send::new(node, value);
        self.buffer
            .lock()
            .expect("writer buffer poisoned")
            .push((consts::PUSH.to_string(), serde_json::to_value(packet)?));
        Ok(())
    }

    pub fn into_writes(self) -> Vec<(String, serde_json::Value)> {
        self.buffer.into_inner().expect("writer buffer poisoned")
    }
}

impl crate::types::Writer for LocalWriter<'_> {
    fn write(&self, channel: &str, value: serde_json::Value) -> std::result::Result<(), String> {
        self.buffer
            .lock()
            .expect("writer buffer poisoned")
            .push((channel.to_string(), value));
        Ok(())
    }

    fn send(&self, node: &str, value: serde_json::Value) -> std::result::Result<(), String> {
        LocalWriter::send(self, node, value).map_err(|e| e.to_string())
    }
}

/// Build every task eligible to run next: legacy `pending_sends` entries
/// first, then PULL candidates for each registered process, then PUSH tasks
/// discovered from `recorded_sends` — `Send`s already produced this step by
/// tasks outside this call (typically ones that already finished executing).
/// Matching is by producing-task id, walked in place so a `Send` recorded
/// against a PUSH task built in this very call can itself spawn further PUSH
/// tasks within the same superstep; a group whose producing task isn't among
/// the ones built here (it ran and was dropped before this call) still gets a
/// task, rooted at an empty parent path.
pub fn prepare_next_tasks(
    checkpoint: &Checkpoint,
    channels: &HashMap<String, Box<dyn Channel>>,
    processes: &ProcessRegistry,
    ctx: &ExecutionContext,
    recorded_sends: &[RecordedSend],
) -> Result<Vec<PregelExecutableTask>> {
    let known_nodes: HashSet<String> = processes.keys().cloned().collect();
    let mut tasks = Vec::new();

    for (index, pending) in checkpoint.pending_sends.iter().enumerate() {
        if !processes.contains_key(&pending.channel) {
            continue;
        }
        let path = TaskPath::PushLegacy { index };
        if let Some(task) = prepare_single_task(
            checkpoint,
            channels,
            processes,
            ctx,
            &path,
            Some(pending.value.clone()),
            Some(&pending.channel),
            None,
        )? {
            tasks.push(task);
        }
    }

    let step = ctx.current_step() as u64;
    for proc in processes.values() {
        let path = TaskPath::Pull { node_name: proc.name.clone(), step, triggers: Vec::new() };
        if let Some(task) =
            prepare_single_task(checkpoint, channels, processes, ctx, &path, None, None, None)?
        {
            tasks.push(task);
        }
    }

    let mut by_producer: HashMap<&str, Vec<&RecordedSend>> = HashMap::new();
    for recorded in recorded_sends {
        by_producer.entry(recorded.task_id.as_str()).or_default().push(recorded);
    }

    let mut idx = 0;
    while idx < tasks.len() {
        let parent_path = tasks[idx].path.clone();
        let parent_task_id = tasks[idx].id.clone();
        if let Some(sends) = by_producer.remove(parent_task_id.as_str()) {
            push_tasks_for(
                checkpoint,
                channels,
                processes,
                ctx,
                &known_nodes,
                &parent_path,
                &parent_task_id,
                sends,
                &mut tasks,
            )?;
        }
        idx += 1;
    }

    for (parent_task_id, sends) in by_producer {
        push_tasks_for(
            checkpoint,
            channels,
            processes,
            ctx,
            &known_nodes,
            &[],
            parent_task_id,
            sends,
            &mut tasks,
        )?;
    }

    Ok(tasks)
}

/// Build a PUSH task for each `Send` a producing task emitted, appending to
/// `tasks` in place (so the caller's `while` loop over `tasks` picks up any
/// further `Send`s a freshly built PUSH task itself produced).
#[allow(clippy::too_many_arguments)]
fn push_tasks_for(
    checkpoint: &Checkpoint,
    channels: &HashMap<String, Box<dyn Channel>>,
    processes: &ProcessRegistry,
    ctx: &ExecutionContext,
    known_nodes: &HashSet<String>,
    parent_path: &[crate::identity::PathSegment],
    parent_task_id: &str,
    sends: Vec<&RecordedSend>,
    tasks: &mut Vec<PregelExecutableTask>,
) -> Result<()> {
    for (write_index, recorded) in sends.into_iter().enumerate() {
        let send = &recorded.send;
        if !known_nodes.contains(send.node()) {
            tracing::warn!(node = send.node(), "push targets an unregistered node, skipping");
            continue;
        }
        let path = TaskPath::Push {
            parent_path: parent_path.to_vec(),
            write_index,
            parent_task_id: parent_task_id.to_string(),
        };
        if let Some(task) = prepare_single_task(
            checkpoint,
            channels,
            processes,
            ctx,
            &path,
            Some(send.arg().clone()),
            Some(send.node()),
            None,
        )? {
            tasks.push(task);
        }
    }
    Ok(())
}

/// Build a single task for `path`, or `None` if it isn't eligible (a PULL
/// whose triggers haven't advanced, or whose required input is still empty).
/// `task_id_checksum`, when given, must match the id this call recomputes —
/// a replayed task whose recomputed id drifted from what the checkpoint
/// recorded means the process graph changed underneath the checkpoint, which
/// is never safe to paper over.
fn prepare_single_task(
    checkpoint: &Checkpoint,
    channels: &HashMap<String, Box<dyn Channel>>,
    processes: &ProcessRegistry,
    ctx: &ExecutionContext,
    path: &TaskPath,
    explicit_input: Option<serde_json::Value>,
    target_node: Option<&str>,
    task_id_checksum: Option<&str>,
) -> Result<Option<PregelExecutableTask>> {
    let node_name = match path {
        TaskPath::Pull { node_name, .. } => node_name.clone(),
        TaskPath::PushLegacy { .. } | TaskPath::Push { .. } | TaskPath::PushCall { .. } => {
            match target_node {
                Some(n) => n.to_string(),
                None => return Ok(None),
            }
        }
    };
    let Some(proc) = processes.get(&node_name) else { return Ok(None) };

    match path {
        TaskPath::Pull { step, .. } => {
            let seen = checkpoint.versions_seen.get(&node_name).cloned().unwrap_or_default();
            let null_version = checkpoint.null_version();
            let mut triggered: Vec<String> = proc
                .triggers
                .iter()
                .filter(|channel| {
                    let current = checkpoint.channel_versions.get(*channel).unwrap_or(&null_version);
                    let prev = seen.get(*channel).unwrap_or(&null_version);
                    let advanced = current > prev;
                    let readable = channels.get(*channel).map(|c| c.get().is_ok()).unwrap_or(false);
                    advanced && readable
                })
                .cloned()
                .collect();
            triggered.sort();
            if triggered.is_empty() {
                return Ok(None);
            }

            let input = match proc_input(proc, channels, ctx) {
                Ok(v) => v,
                Err(PregelError::EmptyChannel) => return Ok(None),
                Err(e) => return Err(e),
            };
            let Some(input) = input else { return Ok(None) };

            let resolved_path =
                TaskPath::Pull { node_name: node_name.clone(), step: *step, triggers: triggered.clone() };
            let task_id = identity::task_id_for_path(&checkpoint.id, &resolved_path)?;
            verify_task_id_checksum(task_id_checksum, &task_id)?;
            let mut task = PregelExecutableTask::new(
                node_name,
                input,
                task_id,
                resolved_path.as_segments(),
                triggered,
                proc.write_channels.clone(),
            );
            task.retry_policy = proc.retry_policy.clone();
            Ok(Some(task))
        }
        TaskPath::PushLegacy { .. } | TaskPath::Push { .. } | TaskPath::PushCall { .. } => {
            let input = explicit_input.unwrap_or(serde_json::Value::Null);
            let task_id = identity::task_id_for_path(&checkpoint.id, path)?;
            verify_task_id_checksum(task_id_checksum, &task_id)?;
            let mut task = PregelExecutableTask::new(
                node_name,
                input,
                task_id,
                path.as_segments(),
                vec![],
                proc.write_channels.clone(),
            );
            task.retry_policy = proc.retry_policy.clone();
            Ok(Some(task))
        }
    }
}

/// Assert a replayed task's recomputed id matches the checksum it was
/// replayed with, per §4.3's replay-safety requirement.
fn verify_task_id_checksum(expected: Option<&str>, computed: &str) -> Result<()> {
    match expected {
        Some(expected) if expected != computed => Err(PregelError::ChecksumMismatch {
            expected: expected.to_string(),
            actual: computed.to_string(),
        }),
        _ => Ok(()),
    }
}
