use chrono::NaiveDateTime;

use super::{Analyzer, TraceEvent};
use crate::formatter::Summary;
use crate::stack::CallStackTracker;

/// Re-orders events by their uncorrected timestamps. Events with equal
/// timestamps keep their arrival order; undated events go last.
#[derive(Debug, Default)]
pub struct Timeline {
    events: Vec<(Option<NaiveDateTime>, String)>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ordered(&self) -> Vec<&str> {
        let mut events: Vec<&(Option<NaiveDateTime>, String)> = self.events.iter().collect();
        events.sort_by_key(|(date, _)| (date.is_none(), *date));
        events.into_iter().map(|(_, text)| text.as_str()).collect()
    }
}

impl Analyzer for Timeline {
    fn name(&self) -> &'static str {
        "timeline"
    }

    fn consume(&mut self, event: &TraceEvent, _stacks: &CallStackTracker) -> bool {
        self.events
            .push((event.raw_timestamp, event.text().to_string()));
        true
    }

    fn summarize(&self) -> Summary {
        let mut text = String::new();
        for event in self.ordered() {
            text.push_str(event);
            text.push('\n');
        }
        Summary::Text(text)
    }
}
