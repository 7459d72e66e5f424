use serde_json::{Value, json};

use super::{Analyzer, TraceEvent};
use crate::formatter::Summary;
use crate::layout::Identifier;
use crate::stack::CallStackTracker;

/// Events the probe inspects before stopping the run.
pub const PROBE_EVENTS: usize = 5;

const MESSAGE_PREVIEW: usize = 32;

/// Shows how the layout splits the first few events, then halts the pipeline.
/// Used to check a layout pattern against a log before a full run.
#[derive(Debug, Default)]
pub struct Probe {
    rows: Vec<Vec<Value>>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Analyzer for Probe {
    fn name(&self) -> &'static str {
        "probe"
    }

    fn consume(&mut self, event: &TraceEvent, _stacks: &CallStackTracker) -> bool {
        let date = event
            .timestamp
            .map(|date| date.format("%Y-%m-%d %H:%M:%S%.3f").to_string());
        let message: String = event
            .event
            .token(Identifier::Message)
            .ok()
            .flatten()
            .unwrap_or_default()
            .chars()
            .take(MESSAGE_PREVIEW)
            .collect();

        self.rows.push(vec![
            json!(date),
            json!(event.thread),
            json!(event.category),
            json!(event.signature()),
            json!(message),
        ]);
        self.rows.len() < PROBE_EVENTS
    }

    fn summarize(&self) -> Summary {
        Summary::Table {
            headers: ["date", "thread", "category", "method", "message"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            rows: self.rows.clone(),
        }
    }
}
