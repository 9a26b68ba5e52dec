//! Task records: the read-only [`PregelTask`] surfaced to callers that only
//! want to know what ran, and the heavier [`PregelExecutableTask`] the
//! planner builds for `for_execution` callers, carrying everything a node
//! executor needs plus its write buffer.

use crate::identity::PathSegment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A value surfaced to a human or supervising process mid-run, pausing
/// execution until it's resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interrupt {
    pub value: serde_json::Value,
    pub id: String,
}

/// A read-only summary of a task, independent of whether it was actually run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PregelTask {
    pub id: String,
    pub name: String,
    pub path: Vec<PathSegment>,
    pub error: Option<String>,
    pub interrupts: Vec<Interrupt>,
    pub state: TaskState,
    pub result: Option<serde_json::Value>,
}

/// How a task should be retried after a transient failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub initial_interval: f64,
    pub backoff_factor: f64,
    pub max_interval: f64,
    pub max_attempts: u32,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: 0.5,
            backoff_factor: 2.0,
            max_interval: 128.0,
            max_attempts: 3,
            jitter: true,
        }
    }
}

/// Identifies a cached result: the node's namespace, a content key derived
/// from its input, and how long the entry stays valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub ns: String,
    pub key: String,
    pub ttl: Option<u64>,
}

/// How a node's cache key is derived from its input.
#[derive(Clone)]
pub struct CachePolicy {
    pub key_func: Arc<dyn Fn(&serde_json::Value) -> String + Send + Sync>,
    pub ttl: Option<u64>,
}

impl std::fmt::Debug for CachePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachePolicy").field("ttl", &self.ttl).finish()
    }
}

/// What a node executor needs to run: its name, the input computed for it,
/// and a handle to write results back through `local_write`.
pub trait NodeExecutor: Send + Sync {
    fn execute(
        &self,
        input: serde_json::Value,
        writer: &dyn Writer,
    ) -> Result<serde_json::Value, String>;
}

/// The injected `local_write` closure a running task uses to emit writes —
/// either to a channel by name, or as a [`crate::send::Send`] to another node.
pub trait Writer: Send + Sync {
    fn write(&self, channel: &str, value: serde_json::Value) -> Result<(), String>;
    fn send(&self, node: &str, value: serde_json::Value) -> Result<(), String>;
}

/// Common surface over a task's accumulated writes, independent of whether
/// the task is the lightweight [`PregelTask`] view or the full executable one.
pub trait WritesProtocol {
    fn writes(&self) -> &[(String, serde_json::Value)];
    fn triggers(&self) -> &[String];
}

/// A task ready to run: its computed input, the writer it should use, its
/// retry and cache policy, and the write buffer `local_write` appends to.
#[derive(Debug)]
pub struct PregelExecutableTask {
    pub name: String,
    pub input: serde_json::Value,
    pub config: HashMap<String, serde_json::Value>,
    pub triggers: Vec<String>,
    pub write_channels: Vec<String>,
    pub retry_policy: Option<RetryPolicy>,
    pub cache_key: Option<CacheKey>,
    pub id: String,
    pub path: Vec<PathSegment>,
    writes: Vec<(String, serde_json::Value)>,
}

impl PregelExecutableTask {
    pub fn new(
        name: String,
        input: serde_json::Value,
        id: String,
        path: Vec<PathSegment>,
        triggers: Vec<String>,
        write_channels: Vec<String>,
    ) -> Self {
        Self {
            name,
            input,
            config: HashMap::new(),
            triggers,
            write_channels,
            retry_policy: None,
            cache_key: None,
            id,
            path,
            writes: Vec::new(),
        }
    }

    /// Append a write to this task's buffer. Called by the `local_write`
    /// closure injected into the task's config, never by the task directly.
    pub fn push_write(&mut self, channel: String, value: serde_json::Value) {
        self.writes.push((channel, value));
    }
}

impl WritesProtocol for PregelExecutableTask {
    fn writes(&self) -> &[(String, serde_json::Value)] {
        &self.writes
    }

    fn triggers(&self) -> &[String] {
        &self.triggers
    }
}

/// A minimal [`WritesProtocol`] implementation for tasks reconstructed during
/// replay, where only the recorded writes (not a live executor) are available.
pub struct PregelTaskWrites {
    pub writes: Vec<(String, serde_json::Value)>,
    pub triggers: Vec<String>,
}

impl WritesProtocol for PregelTaskWrites {
    fn writes(&self) -> &[(String, serde_json::Value)] {
        &self.writes
    }

    fn triggers(&self) -> &[String] {
        &self.triggers
    }
}
