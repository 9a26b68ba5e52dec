//! The process registry: the static description of each node in the graph —
//! what triggers it, what channels it reads, and how to run it — as opposed
//! to [`crate::types::PregelExecutableTask`], which is one instantiation of
//! a process for a single superstep.

use crate::types::{CachePolicy, NodeExecutor, RetryPolicy};
use std::sync::Arc;

/// The shape of a process's channel subscriptions: either a fixed list (read
/// the first one that has a value) or a named mapping (each key reads its
/// own channel, with per-key trigger/passthrough semantics resolved by the
/// planner).
#[derive(Clone)]
pub enum ProcessChannels {
    List(Vec<String>),
    Mapping(Vec<(String, String)>),
}

/// A registered node: name, subscriptions, triggers, and the executor that
/// runs when it's scheduled.
#[derive(Clone)]
pub struct Process {
    pub name: String,
    pub channels: ProcessChannels,
    pub triggers: Vec<String>,
    pub write_channels: Vec<String>,
    pub executor: Arc<dyn NodeExecutor>,
    pub retry_policy: Option<RetryPolicy>,
    pub cache_policy: Option<CachePolicy>,
    /// Arbitrary labels; [`crate::consts::TAG_HIDDEN`] excludes a node from
    /// the interrupt-all wildcard in [`crate::algo::should_interrupt`].
    pub tags: Vec<String>,
}

impl Process {
    pub fn new(
        name: impl Into<String>,
        channels: ProcessChannels,
        triggers: Vec<String>,
        write_channels: Vec<String>,
        executor: Arc<dyn NodeExecutor>,
    ) -> Self {
        Self {
            name: name.into(),
            channels,
            triggers,
            write_channels,
            executor,
            retry_policy: None,
            cache_policy: None,
            tags: Vec::new(),
        }
    }
}

/// The full set of registered processes, keyed by name for fast lookup during
/// planning.
pub type ProcessRegistry = std::collections::HashMap<String, Process>;
