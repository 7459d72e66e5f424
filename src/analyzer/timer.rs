use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;
use serde_json::json;

use super::{Analyzer, TraceEvent};
use crate::formatter::Summary;
use crate::stack::{CallStackTracker, TraceKind};

const HEADERS: [&str; 8] = [
    "thread", "method", "order", "calls", "shortest", "longest", "average", "total",
];

/// Durations of every completed call of one method on one thread.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodTimer {
    pub thread: String,
    pub method: String,
    /// 1-based order in which the (thread, method) pair first completed.
    pub order: usize,
    pub durations: Vec<i64>,
}

/// Millisecond statistics over a [`MethodTimer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerStats {
    pub count: usize,
    pub min: i64,
    pub max: i64,
    pub mean: f64,
    pub total: i64,
}

impl MethodTimer {
    pub fn stats(&self) -> TimerStats {
        let total: i64 = self.durations.iter().sum();
        let count = self.durations.len();
        TimerStats {
            count,
            min: self.durations.iter().copied().min().unwrap_or(0),
            max: self.durations.iter().copied().max().unwrap_or(0),
            mean: if count > 0 { total as f64 / count as f64 } else { 0.0 },
            total,
        }
    }
}

/// Times method calls from their Entering/Exiting pairs.
///
/// Keeps its own per-thread stack of entry times instead of reading the
/// shared tracker, so interleaved or unbalanced traces only affect the
/// calls involved.
#[derive(Debug, Default)]
pub struct Timer {
    entries: FxHashMap<String, Vec<(String, Option<NaiveDateTime>)>>,
    timers: Vec<MethodTimer>,
    index: FxHashMap<(String, String), usize>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timers in first-completed order.
    pub fn timers(&self) -> &[MethodTimer] {
        &self.timers
    }

    pub fn get(&self, thread: &str, method: &str) -> Option<&MethodTimer> {
        self.index
            .get(&(thread.to_string(), method.to_string()))
            .map(|&i| &self.timers[i])
    }

    fn record(&mut self, thread: &str, method: String, duration: i64) {
        let key = (thread.to_string(), method);
        let next = self.timers.len();
        let slot = *self.index.entry(key.clone()).or_insert(next);
        if slot == next {
            self.timers.push(MethodTimer {
                thread: key.0,
                method: key.1,
                order: next + 1,
                durations: Vec::new(),
            });
        }
        self.timers[slot].durations.push(duration);
    }
}

impl Analyzer for Timer {
    fn name(&self) -> &'static str {
        "timer"
    }

    fn consume(&mut self, event: &TraceEvent, _stacks: &CallStackTracker) -> bool {
        let Some(signature) = event.signature() else {
            return true;
        };

        match event.kind {
            TraceKind::Entering { .. } => {
                self.entries
                    .entry(event.thread.clone())
                    .or_default()
                    .push((signature, event.timestamp));
            }
            TraceKind::Exiting { .. } => {
                let Some(stack) = self.entries.get_mut(&event.thread) else {
                    return true;
                };
                let mut start = None;
                while let Some((entered, at)) = stack.pop() {
                    if entered == signature {
                        start = Some(at);
                        break;
                    }
                    log::debug!("timer skipping unfinished call {} on {}", entered, event.thread);
                }
                if let Some(entered_at) = start {
                    match (entered_at, event.timestamp) {
                        (Some(begin), Some(end)) => {
                            let elapsed = (end - begin).num_milliseconds();
                            self.record(&event.thread, signature, elapsed);
                        }
                        _ => log::debug!("no timestamps to time {}", signature),
                    }
                }
            }
            TraceKind::Other => {}
        }
        true
    }

    fn summarize(&self) -> Summary {
        let rows = self
            .timers
            .iter()
            .map(|timer| {
                let stats = timer.stats();
                vec![
                    json!(timer.thread),
                    json!(timer.method),
                    json!(timer.order),
                    json!(stats.count),
                    json!(stats.min),
                    json!(stats.max),
                    json!(stats.mean),
                    json!(stats.total),
                ]
            })
            .collect();

        Summary::Table {
            headers: HEADERS.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }
}
