use super::{Analyzer, RECORD_SEPARATOR, TraceEvent, join_records, render_frames};
use crate::formatter::Summary;
use crate::stack::CallStackTracker;

/// Collects ERROR events and thrown exceptions together with the call stack
/// they happened in.
#[derive(Debug, Default)]
pub struct ErrorSummary {
    records: Vec<String>,
}

impl ErrorSummary {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Analyzer for ErrorSummary {
    fn name(&self) -> &'static str {
        "errors"
    }

    fn consume(&mut self, event: &TraceEvent, stacks: &CallStackTracker) -> bool {
        let throwing = event.kind.is_throwing();
        if !throwing && !event.is_error() {
            return true;
        }

        let mut record = String::new();
        let snapshot = stacks.snapshot(&event.thread);
        render_frames(&snapshot, &mut record);
        if throwing {
            // the throw already popped its frames; show them as they were
            render_frames(event.unwind.popped.iter().rev(), &mut record);
        }
        record.push_str(event.text());
        record.push_str(RECORD_SEPARATOR);
        self.records.push(record);
        true
    }

    fn summarize(&self) -> Summary {
        Summary::Text(join_records(&self.records))
    }
}
