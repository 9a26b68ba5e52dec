//! [`Send`]: a task's way of addressing a write at another node directly,
//! bypassing channel routing (used for map-reduce fan-out patterns).

use serde::{Deserialize, Serialize};

/// A packet produced by a task's return value telling the engine "run `node`
/// again next step, with `arg` as its input" instead of writing to a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Send {
    node: String,
    arg: serde_json::Value,
}

impl Send {
    pub fn new(node: impl Into<String>, arg: serde_json::Value) -> Self {
        Self { node: node.into(), arg }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn arg(&self) -> &serde_json::Value {
        &self.arg
    }

    pub fn into_parts(self) -> (String, serde_json::Value) {
        (self.node, self.arg)
    }
}

/// A `Send` a task already produced, recorded against the id of the task that
/// produced it. This, not [`crate::checkpoint::PendingWrite`], is what feeds
/// new-style PUSH discovery in `prepare_next_tasks`: a parent task's id maps
/// to the `Send`s it emitted, so the planner can walk producer → consumer
/// without caring what the legacy queue looked like.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedSend {
    pub task_id: String,
    pub send: Send,
}

/// What a conditional edge function may return: a single next node, or a
/// list of `Send`s fanning out to (possibly repeated) nodes with distinct
/// inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionalEdgeResult {
    Node(String),
    Sends(Vec<Send>),
}

impl From<String> for ConditionalEdgeResult {
    fn from(node: String) -> Self {
        ConditionalEdgeResult::Node(node)
    }
}

impl From<&str> for ConditionalEdgeResult {
    fn from(node: &str) -> Self {
        ConditionalEdgeResult::Node(node.to_string())
    }
}

impl From<Vec<Send>> for ConditionalEdgeResult {
    fn from(sends: Vec<Send>) -> Self {
        ConditionalEdgeResult::Sends(sends)
    }
}
