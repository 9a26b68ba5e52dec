//! Managed values: inputs computed by the runtime itself (remaining step
//! budget, current step number, whether this is the last step) rather than
//! read from a channel.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagedValueType {
    RemainingSteps,
    IsLastStep,
    CurrentStep,
}

impl ManagedValueType {
    /// The key a process uses in its channel mapping to request this value.
    pub fn state_key(&self) -> &'static str {
        match self {
            ManagedValueType::RemainingSteps => "remaining_steps",
            ManagedValueType::IsLastStep => "is_last_step",
            ManagedValueType::CurrentStep => "current_step",
        }
    }
}

/// Tracks the run's progress through supersteps so managed values can be
/// computed on demand without threading a step counter through every
/// function signature.
#[derive(Clone)]
pub struct ExecutionContext {
    current_step: Arc<AtomicUsize>,
    max_steps: usize,
}

impl ExecutionContext {
    pub fn new(max_steps: usize) -> Self {
        Self { current_step: Arc::new(AtomicUsize::new(0)), max_steps }
    }

    pub fn current_step(&self) -> usize {
        self.current_step.load(Ordering::SeqCst)
    }

    pub fn remaining_steps(&self) -> usize {
        self.max_steps.saturating_sub(self.current_step())
    }

    pub fn is_last_step(&self) -> bool {
        self.remaining_steps() <= 1
    }

    pub fn increment_step(&self) -> usize {
        self.current_step.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Resolve a managed value to the JSON it should present as a task
    /// input, for a process channel key that names one by [`ManagedValueType`].
    pub fn resolve(&self, kind: ManagedValueType) -> serde_json::Value {
        match kind {
            ManagedValueType::RemainingSteps => serde_json::json!(self.remaining_steps()),
            ManagedValueType::IsLastStep => serde_json::json!(self.is_last_step()),
            ManagedValueType::CurrentStep => serde_json::json!(self.current_step()),
        }
    }
}
