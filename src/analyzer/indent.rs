use super::{Analyzer, TraceEvent};
use crate::formatter::Summary;
use crate::stack::CallStackTracker;

const INDENT: &str = "   ";

/// Re-emits every event indented by its thread's call depth.
#[derive(Debug, Default)]
pub struct IndentFormatter {
    lines: Vec<String>,
}

impl IndentFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Analyzer for IndentFormatter {
    fn name(&self) -> &'static str {
        "indent"
    }

    fn consume(&mut self, event: &TraceEvent, stacks: &CallStackTracker) -> bool {
        let mut depth = stacks.depth(&event.thread);
        // exits have already been popped; line them up with their entry
        if event.kind.is_exiting() {
            depth += 1;
        }
        self.lines.push(format!("{}{}", INDENT.repeat(depth), event.text()));
        true
    }

    fn summarize(&self) -> Summary {
        Summary::Text(super::join_records(&self.lines))
    }
}
