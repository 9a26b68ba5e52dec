//! The Pregel step engine: task identity, write application, and superstep
//! planning on top of [`pregel_channels`].
//!
//! A run advances through supersteps of plan → execute → apply:
//! [`algo::prepare_next_tasks`] decides which tasks are eligible given the
//! current [`checkpoint::Checkpoint`] and channel state, the caller executes
//! them (off-thread, retried, whatever fits), and [`algo::apply_writes`]
//! folds the results back in, advancing channel versions and recording what
//! each node has now seen. [`algo::should_interrupt`] decides whether to
//! pause between those two halves.
//!
//! Task identity (`identity::task_id_for_path`) is deterministic: the same
//! path within the same checkpoint always hashes to the same id, so a
//! checkpoint can be replayed without re-deriving new identities for tasks
//! that already ran.

pub mod algo;
pub mod checkpoint;
pub mod consts;
pub mod error;
pub mod identity;
pub mod managed;
pub mod process;
pub mod send;
pub mod types;

pub use algo::{apply_writes, local_read, prepare_next_tasks, should_interrupt, AppliedWrites, InterruptNodes, LocalWriter};
pub use checkpoint::{increment, ChannelVersion, ChannelVersions, Checkpoint, CheckpointMetadata, PendingWrite};
pub use error::{PregelError, Result};
pub use identity::{task_id_for_path, uuid5_str, Call, PathSegment, TaskPath};
pub use managed::{ExecutionContext, ManagedValueType};
pub use process::{Process, ProcessChannels, ProcessRegistry};
pub use send::{ConditionalEdgeResult, RecordedSend, Send};
pub use types::{
    CacheKey, CachePolicy, Interrupt, NodeExecutor, PregelExecutableTask, PregelTask,
    PregelTaskWrites, RetryPolicy, TaskState, Writer, WritesProtocol,
};
