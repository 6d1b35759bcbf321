// Metrics hooks for dataset operations.
//
// The registry hands one `EngineMetrics` to every dataset it holds, and each
// capability call and point-producing operation reports through it. Keeps the
// engine free of any particular metrics backend.
use std::time::Duration;

use serde::Serialize;

use crate::Capability;

/// Point-producing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Steer,
    Instruct,
    Interpolate,
    AddSentence,
    EditSentence,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Steer => "steer",
            Operation::Instruct => "instruct",
            Operation::Interpolate => "interpolate",
            Operation::AddSentence => "add_sentence",
            Operation::EditSentence => "edit_sentence",
        }
    }
}

/// Observer for engine activity.
pub trait EngineMetrics: Send + Sync {
    /// One capability call: how long it took and whether it succeeded.
    fn record_capability(&self, dataset: &str, capability: Capability, latency: Duration, ok: bool);

    /// Points an operation was asked for against points it produced.
    fn record_points(&self, dataset: &str, operation: Operation, requested: usize, produced: usize);

    /// Store size after a mutation.
    fn record_store_size(&self, _dataset: &str, _entries: usize) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl EngineMetrics for NoopMetrics {
    fn record_capability(&self, _: &str, _: Capability, _: Duration, _: bool) {}

    fn record_points(&self, _: &str, _: Operation, _: usize, _: usize) {}
}
