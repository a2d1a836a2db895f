//! Outbound engine events.
//!
//! The engine emits these synchronously after the corresponding operation
//! commits (or, for cycle rejections, immediately after the rejection).
//! External layers (webhook relays, CLI notifications) register sinks at
//! construction time; the engine never interprets the events itself.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;

use sinew_core::model::item::WorkflowState;

/// Events published to registered sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A state transition committed.
    TransitionOccurred {
        project: String,
        item: String,
        from: WorkflowState,
        to: WorkflowState,
        actor: String,
        at: DateTime<Utc>,
    },
    /// An edge insertion was rejected because it would close a cycle.
    CycleRejected {
        project: String,
        /// Source of the attempted edge.
        source: String,
        /// Target of the attempted edge.
        target: String,
        cycle: Vec<String>,
    },
    /// The computed critical path differs from the previously reported one.
    CriticalPathChanged {
        project: String,
        new_path: Vec<String>,
    },
}

/// Subscriber seam for outbound events.
///
/// Implementations must be cheap and non-blocking; the engine publishes
/// while holding no project lock, but synchronously on the caller's thread.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &EngineEvent);
}

/// Sink that buffers events in memory. Useful for tests and for callers
/// that drain events after each batch of operations.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all buffered events, leaving the buffer empty.
    pub fn drain(&self) -> Vec<EngineEvent> {
        match self.events.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl EventSink for CollectingSink {
    fn publish(&self, event: &EngineEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
