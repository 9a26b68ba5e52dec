//! Well-known channel names and config keys, gathered in one place so a
//! typo in a string literal is a compile error everywhere else in the crate.

/// Reserved channel recording whether the current step is the run's last one.
pub const RESERVED_IS_LAST_STEP: &str = "__is_last_step__";
/// Reserved channel recording the current superstep number.
pub const RESERVED_STEP: &str = "__step__";

/// Control write meaning "this task produced no channel writes".
pub const NO_WRITES: &str = "__no_writes__";
/// Control write carrying a [`crate::send::Send`], consumed by the planner.
pub const PUSH: &str = "__push__";
/// Control write requesting the run resume from an interrupt.
pub const RESUME: &str = "__resume__";
/// Control write recording an interrupt raised mid-task.
pub const INTERRUPT: &str = "__interrupt__";
/// Control write carrying a task's final return value.
pub const RETURN: &str = "__return__";
/// Control write carrying a task-body exception.
pub const ERROR: &str = "__error__";
/// Legacy control write appending to the pending-sends queue directly.
pub const TASKS: &str = "__tasks__";

/// Config key under which `local_write`'s `send` half is injected into a
/// task's config map.
pub const CONFIG_KEY_SEND: &str = "__pregel_send__";
/// Config key under which `local_read` is injected.
pub const CONFIG_KEY_READ: &str = "__pregel_read__";
/// Config key carrying the checkpoint-namespace map for nested subgraphs.
pub const CONFIG_KEY_CHECKPOINT_MAP: &str = "__pregel_checkpoint_map__";
/// Config key carrying this task's already-applied writes, for replay.
pub const CONFIG_KEY_WRITES: &str = "__pregel_writes__";
/// Config key carrying the run's scratchpad (interrupt resume values, etc.).
pub const CONFIG_KEY_SCRATCHPAD: &str = "__pregel_scratchpad__";
/// Config key carrying the pluggable store handed to nodes that need
/// cross-run persistence outside the checkpoint.
pub const CONFIG_KEY_STORE: &str = "__pregel_store__";
/// Config key carrying the checkpointer implementation in use for this run.
pub const CONFIG_KEY_CHECKPOINTER: &str = "__pregel_checkpointer__";
/// Config key carrying the id of the checkpoint a task is running against.
pub const CONFIG_KEY_CHECKPOINT_ID: &str = "__pregel_checkpoint_id__";
/// Config key carrying the checkpoint namespace a task is running in.
pub const CONFIG_KEY_CHECKPOINT_NS: &str = "__pregel_checkpoint_ns__";
/// Config key carrying the running task's own id, for `local_write` to stamp
/// onto the writes it produces.
pub const CONFIG_KEY_TASK_ID: &str = "__pregel_task_id__";

/// Separator joining a parent checkpoint namespace to a child node name when
/// building a nested-subgraph namespace.
pub const NS_SEP: &str = "|";
/// Marks the end of a namespace segment that embeds a task id, distinguishing
/// it from a plain node-name segment.
pub const NS_END: &str = ":";

/// Tag marking a node as execution-internal: excluded from the `"*"`
/// interrupt-all wildcard even though it still participates in scheduling.
pub const TAG_HIDDEN: &str = "langsmith:hidden";

/// Sentinel task id used for writes not associated with any real task.
pub const NULL_TASK_ID: &str = "";

/// Every special (non-routable) write key, in the order the planner checks
/// them.
pub const SPECIAL_CHANNELS: &[&str] = &[NO_WRITES, PUSH, RESUME, INTERRUPT, RETURN, ERROR];

/// Whether `channel` is a control write the engine consumes itself rather
/// than a name it routes to an actual [`pregel_channels::Channel`].
pub fn is_special_channel(channel: &str) -> bool {
    SPECIAL_CHANNELS.contains(&channel)
}
