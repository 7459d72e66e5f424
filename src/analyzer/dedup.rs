use super::{Analyzer, TraceEvent};
use crate::formatter::Summary;
use crate::layout::Identifier;
use crate::stack::CallStackTracker;

type Key = (Option<String>, String, Option<String>);

/// Drops an event when its date, thread and message repeat the previous
/// event's. Only the immediately preceding event is compared.
#[derive(Debug, Default)]
pub struct DedupFilter {
    previous: Option<Key>,
    kept: Vec<String>,
    dropped: usize,
}

impl DedupFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn key(event: &TraceEvent) -> Key {
        let token = |id: Identifier| event.event.token(id).ok().flatten().map(str::to_string);
        (
            token(Identifier::Date),
            event.thread.clone(),
            token(Identifier::Message),
        )
    }
}

impl Analyzer for DedupFilter {
    fn name(&self) -> &'static str {
        "dedup"
    }

    fn consume(&mut self, event: &TraceEvent, _stacks: &CallStackTracker) -> bool {
        let key = Self::key(event);
        if self.previous.as_ref() == Some(&key) {
            self.dropped += 1;
        } else {
            self.kept.push(event.text().to_string());
            self.previous = Some(key);
        }
        true
    }

    fn summarize(&self) -> Summary {
        Summary::Text(super::join_records(&self.kept))
    }
}
