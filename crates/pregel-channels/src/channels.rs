//! The channel capability interface and the three "core" channel variants:
//! last-value, topic (append-only), and binary-operator (custom reducer).
//!
//! Channels are the only stateful part of a superstep: the planner and the
//! write-applicator never touch a channel's internals directly, only this
//! trait's five operations.

use crate::error::{ChannelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Capability set every channel variant implements.
///
/// A channel is a polymorphic, versioned container. `update` and `consume`
/// return whether the channel's *version* should advance; `read` may fail with
/// [`ChannelError::Empty`] when nothing has been written yet.
pub trait Channel: Send + Sync + Debug {
    /// Read the current value.
    fn get(&self) -> Result<serde_json::Value>;

    /// Apply a batch of values produced during one superstep. Order within the
    /// batch is arbitrary. Returns `true` if the channel's contents changed in
    /// a way that should bump its version.
    fn update(&mut self, values: Vec<serde_json::Value>) -> Result<bool>;

    /// Serialize the channel's state for a checkpoint.
    fn checkpoint(&self) -> Result<serde_json::Value>;

    /// Restore the channel's state from a checkpoint value.
    fn from_checkpoint(&mut self, checkpoint: serde_json::Value) -> Result<()>;

    /// Notify the channel that the run is (tentatively) finishing. Returns
    /// `true` if this changed the channel in a version-bumping way.
    fn finish(&mut self) -> bool {
        false
    }

    /// Notify the channel that a task triggered by it has run. Returns `true`
    /// if this should bump the channel's version. Most channels are passive
    /// here; barrier-like channels use this to reset themselves.
    fn consume(&mut self) -> bool {
        false
    }

    /// Whether `get` would currently succeed.
    fn is_available(&self) -> bool {
        self.get().is_ok()
    }

    /// Clone into a fresh boxed channel, for checkpoint-copy simulations.
    fn clone_box(&self) -> Box<dyn Channel>;
}

impl Clone for Box<dyn Channel> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Stores only the most recently written value. Rejects more than one value
/// per superstep — a node that writes twice to the same last-value channel in
/// one step is a bug, not a last-write-wins race.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastValueChannel {
    value: Option<serde_json::Value>,
}

impl LastValueChannel {
    pub fn new() -> Self {
        Self { value: None }
    }

    pub fn with_value(value: serde_json::Value) -> Self {
        Self { value: Some(value) }
    }
}

impl Default for LastValueChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for LastValueChannel {
    fn get(&self) -> Result<serde_json::Value> {
        self.value.clone().ok_or(ChannelError::Empty)
    }

    fn update(&mut self, mut values: Vec<serde_json::Value>) -> Result<bool> {
        match values.len() {
            0 => Ok(false),
            1 => {
                self.value = values.pop();
                Ok(true)
            }
            _ => Err(ChannelError::InvalidUpdate(
                "last-value channel accepts at most one value per step".into(),
            )),
        }
    }

    fn checkpoint(&self) -> Result<serde_json::Value> {
        self.value.clone().ok_or(ChannelError::Empty)
    }

    fn from_checkpoint(&mut self, checkpoint: serde_json::Value) -> Result<()> {
        self.value = Some(checkpoint);
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}

/// Append-only log: every update extends the accumulated list, nothing is
/// ever dropped within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicChannel {
    values: Vec<serde_json::Value>,
}

impl TopicChannel {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn get_all(&self) -> &[serde_json::Value] {
        &self.values
    }
}

impl Default for TopicChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for TopicChannel {
    fn get(&self) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Array(self.values.clone()))
    }

    fn update(&mut self, mut values: Vec<serde_json::Value>) -> Result<bool> {
        if values.is_empty() {
            return Ok(false);
        }
        self.values.append(&mut values);
        Ok(true)
    }

    fn checkpoint(&self) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Array(self.values.clone()))
    }

    fn from_checkpoint(&mut self, checkpoint: serde_json::Value) -> Result<()> {
        let serde_json::Value::Array(values) = checkpoint else {
            return Err(ChannelError::InvalidUpdate("topic channel checkpoint must be an array".into()));
        };
        self.values = values;
        Ok(())
    }

    fn is_available(&self) -> bool {
        !self.values.is_empty()
    }

    fn clone_box(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}

/// Reducer used by [`BinaryOperatorChannel`].
pub type ReducerFn =
    Box<dyn Fn(serde_json::Value, serde_json::Value) -> serde_json::Value + Send + Sync>;

/// Combines every value written in a step — and across steps — with a
/// user-supplied binary operator (sum, append, max, ...).
pub struct BinaryOperatorChannel {
    value: Option<serde_json::Value>,
    reducer: ReducerFn,
}

impl BinaryOperatorChannel {
    pub fn new<F>(reducer: F) -> Self
    where
        F: Fn(serde_json::Value, serde_json::Value) -> serde_json::Value + Send + Sync + 'static,
    {
        Self {
            value: None,
            reducer: Box::new(reducer),
        }
    }

    pub fn sum() -> Self {
        Self::new(|a, b| {
            serde_json::json!(a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0))
        })
    }

    pub fn append() -> Self {
        Self::new(|a, b| {
            let mut result = match a {
                serde_json::Value::Array(arr) => arr,
                other => vec![other],
            };
            match b {
                serde_json::Value::Array(arr) => result.extend(arr),
                other => result.push(other),
            }
            serde_json::Value::Array(result)
        })
    }
}

impl Debug for BinaryOperatorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryOperatorChannel")
            .field("value", &self.value)
            .field("reducer", &"<fn>")
            .finish()
    }
}

impl Channel for BinaryOperatorChannel {
    fn get(&self) -> Result<serde_json::Value> {
        self.value.clone().ok_or(ChannelError::Empty)
    }

    fn update(&mut self, values: Vec<serde_json::Value>) -> Result<bool> {
        let mut incoming = values.into_iter();
        let Some(first) = incoming.next() else {
            return Ok(false);
        };
        let seed = self.value.take().map_or(first.clone(), |current| (self.reducer)(current, first));
        self.value = Some(incoming.fold(seed, |acc, v| (self.reducer)(acc, v)));
        Ok(true)
    }

    fn checkpoint(&self) -> Result<serde_json::Value> {
        self.value.clone().ok_or(ChannelError::Empty)
    }

    fn from_checkpoint(&mut self, checkpoint: serde_json::Value) -> Result<()> {
        self.value = Some(checkpoint);
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Channel> {
        // The reducer closure isn't `Clone`; callers that need a fresh handle
        // construct a new channel from a checkpoint instead of cloning one live.
        panic!("BinaryOperatorChannel cannot be cloned directly; restore from a checkpoint")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_value_single_write() {
        let mut ch = LastValueChannel::new();
        assert!(!ch.is_available());
        assert!(ch.update(vec![serde_json::json!(42)]).unwrap());
        assert_eq!(ch.get().unwrap(), serde_json::json!(42));
        ch.update(vec![serde_json::json!(7)]).unwrap();
        assert_eq!(ch.get().unwrap(), serde_json::json!(7));
    }

    #[test]
    fn last_value_rejects_multiple_in_one_batch() {
        let mut ch = LastValueChannel::new();
        assert!(ch.update(vec![serde_json::json!(1), serde_json::json!(2)]).is_err());
    }

    #[test]
    fn last_value_empty_update_is_noop() {
        let mut ch = LastValueChannel::new();
        assert!(!ch.update(vec![]).unwrap());
        assert!(!ch.is_available());
    }

    #[test]
    fn topic_accumulates_across_batches() {
        let mut ch = TopicChannel::new();
        ch.update(vec![serde_json::json!(1), serde_json::json!(2)]).unwrap();
        ch.update(vec![serde_json::json!(3)]).unwrap();
        assert_eq!(ch.get().unwrap(), serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn topic_checkpoint_roundtrip() {
        let mut ch = TopicChannel::new();
        ch.update(vec![serde_json::json!("a"), serde_json::json!("b")]).unwrap();
        let cp = ch.checkpoint().unwrap();
        let mut restored = TopicChannel::new();
        restored.from_checkpoint(cp).unwrap();
        assert_eq!(restored.get_all().len(), 2);
    }

    #[test]
    fn binary_operator_sum() {
        let mut ch = BinaryOperatorChannel::sum();
        ch.update(vec![serde_json::json!(1.0), serde_json::json!(2.0), serde_json::json!(3.0)])
            .unwrap();
        assert_eq!(ch.get().unwrap(), serde_json::json!(6.0));
        ch.update(vec![serde_json::json!(4.0)]).unwrap();
        assert_eq!(ch.get().unwrap(), serde_json::json!(10.0));
    }

    #[test]
    fn binary_operator_append() {
        let mut ch = BinaryOperatorChannel::append();
        ch.update(vec![serde_json::json!(1), serde_json::json!(2)]).unwrap();
        ch.update(vec![serde_json::json!(3)]).unwrap();
        assert_eq!(ch.get().unwrap(), serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn last_value_checkpoint_roundtrip_preserves_type() {
        let mut ch = LastValueChannel::new();
        ch.update(vec![serde_json::json!(true)]).unwrap();
        let cp = ch.checkpoint().unwrap();
        let mut restored = LastValueChannel::new();
        restored.from_checkpoint(cp).unwrap();
        assert!(restored.get().unwrap().is_boolean());
    }
}
