use super::{Analyzer, Target, TraceEvent};
use crate::formatter::Summary;
use crate::stack::CallStackTracker;

/// Keeps the events of a target method and everything logged beneath it.
#[derive(Debug)]
pub struct MethodIsolation {
    target: Target,
    events: Vec<String>,
}

impl MethodIsolation {
    pub fn new(target: Target) -> Self {
        MethodIsolation {
            target,
            events: Vec::new(),
        }
    }

    fn in_target(&self, event: &TraceEvent, stacks: &CallStackTracker) -> bool {
        if event
            .signature()
            .is_some_and(|signature| self.target.matches(&signature))
        {
            return true;
        }
        stacks
            .snapshot(&event.thread)
            .iter()
            .any(|frame| self.target.matches(&frame.signature))
    }
}

impl Analyzer for MethodIsolation {
    fn name(&self) -> &'static str {
        "isolate"
    }

    fn consume(&mut self, event: &TraceEvent, stacks: &CallStackTracker) -> bool {
        if self.in_target(event, stacks) {
            self.events.push(event.text().to_string());
        }
        true
    }

    fn summarize(&self) -> Summary {
        Summary::Text(super::join_records(&self.events))
    }
}
