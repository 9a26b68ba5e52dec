//! Task paths and deterministic task ids.
//!
//! A task's path is a tuple describing where it came from — either a PULL
//! (triggered by a node's own channel subscriptions) or a PUSH (a `Send`
//! produced by another task). The task id is a deterministic digest of that
//! path plus the owning checkpoint id, so the same path always resolves to
//! the same id within a checkpoint, and replaying a checkpoint reproduces
//! identical ids without re-running anything.

use crate::error::{PregelError, Result};
use serde::{Deserialize, Serialize};

pub const PUSH: &str = "__push__";
pub const PULL: &str = "__pull__";

/// One element of a [`TaskPath`]. Tuples nest because a `Call` task's path
/// embeds the full call description as its final segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathSegment {
    Str(String),
    Int(u64),
    Tuple(Vec<PathSegment>),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Str(s) => write!(f, "{s}"),
            PathSegment::Int(i) => write!(f, "{i}"),
            PathSegment::Tuple(parts) => {
                write!(f, "(")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        PathSegment::Str(s.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(s: String) -> Self {
        PathSegment::Str(s)
    }
}

impl From<u64> for PathSegment {
    fn from(i: u64) -> Self {
        PathSegment::Int(i)
    }
}

/// A function being invoked via a `Call`-shaped PUSH task. Only the name
/// participates in task-id derivation — the closure itself carries no stable
/// identity to hash.
#[derive(Clone)]
pub struct Call {
    pub func_name: String,
    pub input: serde_json::Value,
    pub retry: bool,
}

impl std::fmt::Debug for Call {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Call")
            .field("func_name", &self.func_name)
            .field("retry", &self.retry)
            .finish()
    }
}

/// The full path describing how a task came to exist.
#[derive(Debug, Clone)]
pub enum TaskPath {
    /// Triggered by its own channel subscriptions. `step` and the sorted
    /// `triggers` that fired both participate in the hashed path — without
    /// them, the same node scheduled in two different supersteps against
    /// different trigger sets (but the same checkpoint) would collide onto
    /// one task id.
    Pull { node_name: String, step: u64, triggers: Vec<String> },
    /// Legacy `pending_sends` entry, identified only by its queue index.
    PushLegacy { index: usize },
    /// A `Send` produced by another task this step.
    Push {
        parent_path: Vec<PathSegment>,
        write_index: usize,
        parent_task_id: String,
    },
    /// A `Send` carrying a deferred function call.
    PushCall {
        parent_path: Vec<PathSegment>,
        write_index: usize,
        parent_task_id: String,
        call: Call,
    },
}

impl TaskPath {
    /// Render as the tuple of [`PathSegment`]s that feeds `task_id`
    /// derivation, mirroring each shape's Python tuple layout.
    pub fn as_segments(&self) -> Vec<PathSegment> {
        match self {
            TaskPath::Pull { node_name, step, triggers } => {
                let mut sorted_triggers = triggers.clone();
                sorted_triggers.sort();
                vec![
                    PathSegment::Str(PULL.to_string()),
                    PathSegment::Int(*step),
                    PathSegment::Str(node_name.clone()),
                    PathSegment::Tuple(
                        sorted_triggers.into_iter().map(PathSegment::Str).collect(),
                    ),
                ]
            }
            TaskPath::PushLegacy { index } => {
                vec![PathSegment::Str(PUSH.to_string()), PathSegment::Int(*index as u64)]
            }
            TaskPath::Push { parent_path, write_index, parent_task_id } => vec![
                PathSegment::Str(PUSH.to_string()),
                PathSegment::Tuple(parent_path.clone()),
                PathSegment::Int(*write_index as u64),
                PathSegment::Str(parent_task_id.clone()),
            ],
            TaskPath::PushCall { parent_path, write_index, parent_task_id, call } => vec![
                PathSegment::Str(PUSH.to_string()),
                PathSegment::Tuple(parent_path.clone()),
                PathSegment::Int(*write_index as u64),
                PathSegment::Str(parent_task_id.clone()),
                PathSegment::Str(call.func_name.clone()),
            ],
        }
    }

    /// The first three segments, used as the sort key when applying writes
    /// in a deterministic order.
    pub fn sort_key(&self) -> Vec<String> {
        self.as_segments().into_iter().take(3).map(|s| s.to_string()).collect()
    }
}

/// Render a [`PathSegment`] tuple the way the original implementation
/// stringifies Python tuples, for use as raw hash input.
fn tuple_str(segments: &[PathSegment]) -> String {
    format!(
        "({})",
        segments.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", ")
    )
}

/// Derive a deterministic, UUID-shaped task id from a namespace and a
/// sequence of string parts: `sha1(namespace || parts.concat())`, formatted
/// into UUID dash groups. This is intentionally not a conformant RFC 4122
/// UUIDv5 (the version/variant nibbles are left as the hash produced them) —
/// only stability and even distribution across tasks matter here, not
/// interoperability with UUID-aware tooling.
pub fn uuid5_str(namespace: &[u8], parts: &[&str]) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(namespace);
    for part in parts {
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    let hex = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// Derive the task id for a given path within a checkpoint, using the
/// checkpoint id's 16 raw UUID bytes — not its 36-character string encoding —
/// as the hash namespace, matching the worked examples in the spec.
pub fn task_id_for_path(checkpoint_id: &str, path: &TaskPath) -> Result<String> {
    let namespace = uuid::Uuid::parse_str(checkpoint_id).map_err(|e| {
        PregelError::InvalidUpdate(format!("checkpoint id '{checkpoint_id}' is not a valid uuid: {e}"))
    })?;
    let segments = path.as_segments();
    let rendered = tuple_str(&segments);
    Ok(uuid5_str(namespace.as_bytes(), &[rendered.as_str()]))
}
