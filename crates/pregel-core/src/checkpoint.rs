//! The checkpoint: the immutable-per-step record of channel versions, which
//! node has seen which version of which channel, and writes still waiting to
//! be delivered.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A channel's version number. Versions are totally ordered and only ever
/// move forward; the engine never inspects their internal representation
/// beyond that ordering, so this stays the simplest thing that can work
/// (monotonically increasing integers) while remaining `#[serde(untagged)]`
/// in case a future version source needs a different shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelVersion {
    Int(u64),
    Float(f64),
    String(String),
}

impl Default for ChannelVersion {
    fn default() -> Self {
        ChannelVersion::Int(0)
    }
}

impl ChannelVersion {
    /// The zero value of this version type — a channel that has never been
    /// written has this version, by definition.
    pub fn null() -> Self {
        ChannelVersion::default()
    }

    fn as_sort_key(&self) -> (u8, f64, &str) {
        match self {
            ChannelVersion::Int(v) => (0, *v as f64, ""),
            ChannelVersion::Float(v) => (0, *v, ""),
            ChannelVersion::String(s) => (1, 0.0, s.as_str()),
        }
    }
}

impl PartialEq for ChannelVersion {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(std::cmp::Ordering::Equal)
    }
}

impl PartialOrd for ChannelVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.as_sort_key().partial_cmp(&other.as_sort_key()).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// A collection of per-channel versions, keyed by channel name.
pub type ChannelVersions = HashMap<String, ChannelVersion>;

/// Produce the next version for a channel given its current one. The default
/// strategy is a monotonically increasing integer; callers that need a
/// different ordering (e.g. hybrid logical clocks) plug in their own function
/// with this same signature.
pub fn increment(current: Option<&ChannelVersion>) -> ChannelVersion {
    match current {
        Some(ChannelVersion::Int(v)) => ChannelVersion::Int(v + 1),
        Some(ChannelVersion::Float(v)) => ChannelVersion::Float(v + 1.0),
        Some(ChannelVersion::String(_)) | None => ChannelVersion::Int(1),
    }
}

/// An entry in the legacy `pending_sends` queue: `channel` here names the
/// *target node*, not a routable channel — this predates `Send`-encoded PUSH
/// tasks and is kept only so checkpoints written before that model existed
/// still replay. New-style PUSH discovery does not use this type; see
/// [`crate::send::RecordedSend`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingWrite {
    pub task_id: String,
    pub channel: String,
    pub value: serde_json::Value,
}

/// Why a checkpoint was written, plus the superstep number it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub source: String,
    pub step: i64,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// The reserved key under which a task's interrupts are recorded in
/// [`Checkpoint::versions_seen`].
pub const INTERRUPT: &str = "__interrupt__";

/// A single superstep's worth of durable state: channel values live outside
/// this struct (in the channel objects themselves); the checkpoint only
/// records what version each channel is at, what each node has already
/// consumed, and writes still in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Checkpoint format version, bumped only on breaking schema changes.
    pub v: u32,
    /// Unique id for this checkpoint. Doubles as the namespace for deriving
    /// this step's task ids.
    pub id: String,
    pub ts: String,
    pub channel_versions: ChannelVersions,
    /// Per-node record of the channel versions it has already consumed, so a
    /// replay can tell which triggers are "new" versus already-seen. The
    /// [`INTERRUPT`] key is special: it records which channels were visible
    /// to an interrupted task rather than a node's own consumption.
    pub versions_seen: HashMap<String, ChannelVersions>,
    /// Legacy queue of sends not yet attached to a channel, kept for
    /// checkpoints written before per-channel buffering existed.
    pub pending_sends: Vec<PendingWrite>,
}

impl Checkpoint {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: String) -> Self {
        Self {
            v: 1,
            id,
            ts: chrono::Utc::now().to_rfc3339(),
            channel_versions: HashMap::new(),
            versions_seen: HashMap::new(),
            pending_sends: Vec::new(),
        }
    }

    pub fn null_version(&self) -> ChannelVersion {
        ChannelVersion::null()
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::new()
    }
}
