use chrono::DateTime;
use rustc_hash::FxHashMap;
use serde_json::json;

use super::{Analyzer, TraceEvent};
use crate::formatter::Summary;
use crate::stack::CallStackTracker;

/// One hour.
pub const DEFAULT_SLICE_MILLIS: i64 = 60 * 60 * 1000;

const BUCKET_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Counts method exits per time slice.
#[derive(Debug)]
pub struct Trender {
    slice: i64,
    methods: Vec<String>,
    counts: FxHashMap<String, FxHashMap<i64, usize>>,
}

impl Default for Trender {
    fn default() -> Self {
        Self::new(DEFAULT_SLICE_MILLIS)
    }
}

impl Trender {
    /// `slice` is in milliseconds and must be positive.
    pub fn new(slice: i64) -> Self {
        Trender {
            slice: slice.max(1),
            methods: Vec::new(),
            counts: FxHashMap::default(),
        }
    }

    /// Start of the slice holding `millis`.
    pub fn bucket(&self, millis: i64) -> i64 {
        millis.div_euclid(self.slice) * self.slice
    }

    pub fn count(&self, method: &str, bucket: i64) -> usize {
        self.counts
            .get(method)
            .and_then(|buckets| buckets.get(&bucket))
            .copied()
            .unwrap_or(0)
    }

    fn range(&self) -> Option<(i64, i64)> {
        let mut buckets = self.counts.values().flat_map(|b| b.keys().copied());
        let first = buckets.next()?;
        Some(buckets.fold((first, first), |(lo, hi), b| (lo.min(b), hi.max(b))))
    }
}

impl Analyzer for Trender {
    fn name(&self) -> &'static str {
        "trender"
    }

    fn consume(&mut self, event: &TraceEvent, _stacks: &CallStackTracker) -> bool {
        if !event.kind.is_exiting() {
            return true;
        }
        let (Some(method), Some(timestamp)) = (event.signature(), event.timestamp) else {
            return true;
        };

        let bucket = self.bucket(timestamp.and_utc().timestamp_millis());
        if !self.counts.contains_key(&method) {
            self.methods.push(method.clone());
        }
        *self.counts.entry(method).or_default().entry(bucket).or_insert(0) += 1;
        true
    }

    /// One column per slice from the earliest to the latest, gaps included.
    fn summarize(&self) -> Summary {
        let mut headers = vec!["method".to_string()];
        let Some((first, last)) = self.range() else {
            return Summary::Table {
                headers,
                rows: Vec::new(),
            };
        };

        let axis: Vec<i64> = (0..)
            .map(|i| first + i * self.slice)
            .take_while(|bucket| *bucket <= last)
            .collect();
        headers.extend(axis.iter().map(|&bucket| {
            DateTime::from_timestamp_millis(bucket)
                .map(|at| at.naive_utc().format(BUCKET_FORMAT).to_string())
                .unwrap_or_else(|| bucket.to_string())
        }));

        let rows = self
            .methods
            .iter()
            .map(|method| {
                let mut row = vec![json!(method)];
                row.extend(axis.iter().map(|&bucket| json!(self.count(method, bucket))));
                row
            })
            .collect();

        Summary::Table { headers, rows }
    }
}
