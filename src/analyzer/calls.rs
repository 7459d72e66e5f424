use rustc_hash::FxHashMap;

use super::{Analyzer, RECORD_SEPARATOR, Target, TraceEvent, join_records, render_frames};
use crate::formatter::Summary;
use crate::stack::{CallStackTracker, TraceKind};

/// Records every call to a target method: the stack and arguments it was
/// called with, its entering event, and the exit that returned from it.
#[derive(Debug)]
pub struct MethodCallSummary {
    target: Target,
    records: Vec<String>,
    // per thread, indexes of records still waiting for their exit
    open: FxHashMap<String, Vec<usize>>,
}

impl MethodCallSummary {
    pub fn new(target: Target) -> Self {
        MethodCallSummary {
            target,
            records: Vec::new(),
            open: FxHashMap::default(),
        }
    }
}

impl Analyzer for MethodCallSummary {
    fn name(&self) -> &'static str {
        "calls"
    }

    fn consume(&mut self, event: &TraceEvent, stacks: &CallStackTracker) -> bool {
        let Some(signature) = event.signature() else {
            return true;
        };
        if !self.target.matches(&signature) {
            return true;
        }

        match event.kind {
            TraceKind::Entering { .. } => {
                let mut record = String::new();
                render_frames(&stacks.snapshot(&event.thread), &mut record);
                record.push_str(event.text());
                record.push_str("\n\n");
                self.open
                    .entry(event.thread.clone())
                    .or_default()
                    .push(self.records.len());
                self.records.push(record);
            }
            TraceKind::Exiting { .. } if event.unwind.matched => {
                let pending = self.open.get_mut(&event.thread).and_then(Vec::pop);
                if let Some(index) = pending {
                    let record = &mut self.records[index];
                    record.push_str(event.text());
                    record.push_str(RECORD_SEPARATOR);
                }
            }
            _ => {}
        }
        true
    }

    fn summarize(&self) -> Summary {
        Summary::Text(join_records(&self.records))
    }
}
