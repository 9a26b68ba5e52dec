//! Channel variants used less often than the three core ones: ephemeral
//! (step-scoped), any-value (permissive last-write), untracked (never
//! checkpointed), and named-barrier (waits for a fixed set of signals).

use crate::channels::Channel;
use crate::error::{ChannelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Holds a value only for the superstep immediately after it was written,
/// then clears on the next empty `update`. Useful for values that should not
/// outlive the step that produced them (e.g. a one-shot routing decision).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EphemeralValueChannel {
    value: Option<serde_json::Value>,
    guard: bool,
}

impl EphemeralValueChannel {
    pub fn new() -> Self {
        Self { value: None, guard: true }
    }

    pub fn new_unguarded() -> Self {
        Self { value: None, guard: false }
    }
}

impl Default for EphemeralValueChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for EphemeralValueChannel {
    fn get(&self) -> Result<serde_json::Value> {
        self.value.clone().ok_or(ChannelError::Empty)
    }

    fn update(&mut self, values: Vec<serde_json::Value>) -> Result<bool> {
        if values.is_empty() {
            return Ok(self.value.take().is_some());
        }
        if values.len() > 1 && self.guard {
            return Err(ChannelError::InvalidUpdate(
                "ephemeral channel (guarded) accepts at most one value per step".into(),
            ));
        }
        self.value = values.into_iter().last();
        Ok(true)
    }

    fn checkpoint(&self) -> Result<serde_json::Value> {
        Ok(self.value.clone().unwrap_or(serde_json::Value::Null))
    }

    fn from_checkpoint(&mut self, checkpoint: serde_json::Value) -> Result<()> {
        if !checkpoint.is_null() {
            self.value = Some(checkpoint);
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.value.is_some()
    }

    fn clone_box(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}

/// Last-write-wins, but never rejects multiple values in a batch — useful
/// when a channel is written by several tasks that are known to agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnyValueChannel {
    value: Option<serde_json::Value>,
}

impl AnyValueChannel {
    pub fn new() -> Self {
        Self { value: None }
    }
}

impl Default for AnyValueChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for AnyValueChannel {
    fn get(&self) -> Result<serde_json::Value> {
        self.value.clone().ok_or(ChannelError::Empty)
    }

    fn update(&mut self, values: Vec<serde_json::Value>) -> Result<bool> {
        if values.is_empty() {
            return Ok(self.value.take().is_some());
        }
        self.value = values.into_iter().last();
        Ok(true)
    }

    fn checkpoint(&self) -> Result<serde_json::Value> {
        Ok(self.value.clone().unwrap_or(serde_json::Value::Null))
    }

    fn from_checkpoint(&mut self, checkpoint: serde_json::Value) -> Result<()> {
        if !checkpoint.is_null() {
            self.value = Some(checkpoint);
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.value.is_some()
    }

    fn clone_box(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}

/// Holds a value in memory exactly like [`crate::LastValueChannel`] but never
/// survives a checkpoint round-trip — `checkpoint()` always yields `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UntrackedValueChannel {
    #[serde(skip)]
    value: Option<serde_json::Value>,
    guard: bool,
}

impl UntrackedValueChannel {
    pub fn new() -> Self {
        Self { value: None, guard: true }
    }

    pub fn new_unguarded() -> Self {
        Self { value: None, guard: false }
    }
}

impl Default for UntrackedValueChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for UntrackedValueChannel {
    fn get(&self) -> Result<serde_json::Value> {
        self.value.clone().ok_or(ChannelError::Empty)
    }

    fn update(&mut self, values: Vec<serde_json::Value>) -> Result<bool> {
        if values.is_empty() {
            return Ok(false);
        }
        if values.len() > 1 && self.guard {
            return Err(ChannelError::InvalidUpdate(
                "untracked channel (guarded) accepts at most one value per step".into(),
            ));
        }
        self.value = values.into_iter().last();
        Ok(true)
    }

    fn checkpoint(&self) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    fn from_checkpoint(&mut self, _checkpoint: serde_json::Value) -> Result<()> {
        self.value = None;
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.value.is_some()
    }

    fn clone_box(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}

/// Becomes available only once every name in its fixed set has written once;
/// `consume` resets it so the barrier can be re-armed for the next round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedBarrierValueChannel {
    names: HashSet<String>,
    seen: HashSet<String>,
}

impl NamedBarrierValueChannel {
    pub fn new(names: HashSet<String>) -> Self {
        Self { names, seen: HashSet::new() }
    }
}

impl Channel for NamedBarrierValueChannel {
    fn get(&self) -> Result<serde_json::Value> {
        if self.seen != self.names {
            return Err(ChannelError::InvalidUpdate("not all barrier names seen yet".into()));
        }
        Ok(serde_json::Value::Null)
    }

    fn update(&mut self, values: Vec<serde_json::Value>) -> Result<bool> {
        let mut updated = false;
        for value in values {
            let name = value
                .as_str()
                .ok_or_else(|| ChannelError::InvalidUpdate("expected a string name".into()))?;
            if !self.names.contains(name) {
                return Err(ChannelError::InvalidUpdate(format!(
                    "'{name}' is not one of this barrier's expected names"
                )));
            }
            if self.seen.insert(name.to_string()) {
                updated = true;
            }
        }
        Ok(updated)
    }

    fn checkpoint(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!(self.seen.iter().cloned().collect::<Vec<_>>()))
    }

    fn from_checkpoint(&mut self, checkpoint: serde_json::Value) -> Result<()> {
        if let Some(arr) = checkpoint.as_array() {
            self.seen = arr.iter().filter_map(|v| v.as_str().map(String::from)).collect();
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.seen == self.names
    }

    fn consume(&mut self) -> bool {
        if self.seen == self.names {
            self.seen.clear();
            true
        } else {
            false
        }
    }

    fn clone_box(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}
