//! The single-threaded driver: pulls reassembled events, corrects their dates,
//! keeps the call stacks current and pushes each event through the analyzers
//! in registration order.

use std::io::Write;
use std::sync::Arc;

use crate::analyzer::{Analyzer, TraceEvent, Truncated};
use crate::error::{Error, Result};
use crate::formatter::Summary;
use crate::layout::{CompiledPattern, DEFAULT_LAYOUT, LogEvent};
use crate::normalizer::DateNormalizer;
use crate::stack::CallStackTracker;

/// Driver options, built once from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub layout: String,
    pub correct_dates: bool,
    /// Cut events to this many characters before analyzers see them.
    pub fast_limit: Option<usize>,
    /// Echo every event to the output as it is read.
    pub join: bool,
    /// Collect joined events into a `join` summary instead of echoing them,
    /// so structured output stays a single document.
    pub join_summary: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            layout: DEFAULT_LAYOUT.to_string(),
            correct_dates: true,
            fast_limit: None,
            join: false,
            join_summary: false,
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub events: usize,
    pub matched: usize,
    pub skipped: usize,
    /// An analyzer asked to stop before the input ran out.
    pub halted: bool,
}

pub struct Pipeline {
    config: PipelineConfig,
    pattern: Arc<CompiledPattern>,
    tracker: CallStackTracker,
    normalizer: DateNormalizer,
    analyzers: Vec<Box<dyn Analyzer>>,
    joined: String,
    stats: RunStats,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let pattern = Arc::new(CompiledPattern::compile(&config.layout)?);
        Ok(Pipeline {
            normalizer: DateNormalizer::new(config.correct_dates),
            config,
            pattern,
            tracker: CallStackTracker::new(),
            analyzers: Vec::new(),
            joined: String::new(),
            stats: RunStats::default(),
        })
    }

    pub fn add_analyzer(&mut self, analyzer: Box<dyn Analyzer>) {
        match self.config.fast_limit {
            Some(limit) => self.analyzers.push(Box::new(Truncated::new(analyzer, limit))),
            None => self.analyzers.push(analyzer),
        }
    }

    pub fn pattern(&self) -> &Arc<CompiledPattern> {
        &self.pattern
    }

    pub fn tracker(&self) -> &CallStackTracker {
        &self.tracker
    }

    pub fn normalizer(&self) -> &DateNormalizer {
        &self.normalizer
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Handle one event. Returns false once an analyzer asks to stop.
    pub fn process(&mut self, event: LogEvent, out: &mut dyn Write) -> Result<bool> {
        self.stats.events += 1;
        if self.config.join {
            if self.config.join_summary {
                self.joined.push_str(event.text());
                self.joined.push('\n');
            } else {
                writeln!(out, "{}", event.text())?;
            }
        }

        if !event.matches() {
            self.stats.skipped += 1;
            log::warn!(
                "skipping event that does not match the layout: {}",
                first_line(event.text())
            );
            return Ok(true);
        }
        self.stats.matched += 1;

        let mut trace = TraceEvent::parse(event)?;
        trace.timestamp = trace.raw_timestamp.map(|date| self.normalizer.normalize(date));

        if let Some(frame) = trace.frame() {
            self.tracker.enter(&trace.thread, frame);
        } else if trace.kind.is_exiting() {
            if let Some(signature) = trace.signature() {
                let unwind = self.tracker.exit(&trace.thread, &signature);
                trace.unwind = unwind;
            }
        }

        let mut proceed = true;
        for analyzer in &mut self.analyzers {
            proceed = analyzer.consume(&trace, &self.tracker) && proceed;
        }
        Ok(proceed)
    }

    /// Drain `events`. Fails when events were read but none matched the layout.
    pub fn run<I>(&mut self, events: I, out: &mut dyn Write) -> Result<RunStats>
    where
        I: IntoIterator<Item = Result<LogEvent>>,
    {
        for event in events {
            if !self.process(event?, out)? {
                log::info!("stopped after {} events", self.stats.events);
                self.stats.halted = true;
                break;
            }
        }

        log::debug!("run finished: {:?}", self.stats);
        if self.tracker.stray_exits() > 0 || self.tracker.mismatches() > 0 {
            log::info!(
                "{} stray exits, {} unwind mismatches",
                self.tracker.stray_exits(),
                self.tracker.mismatches()
            );
        }

        if self.stats.events > 0 && self.stats.matched == 0 {
            return Err(Error::LayoutMismatch {
                layout: self.pattern.layout().to_string(),
            });
        }
        Ok(self.stats)
    }

    /// Each analyzer's summary, in registration order, after the collected
    /// `join` text when joined events are summarized.
    pub fn summaries(&self) -> Vec<(&'static str, Summary)> {
        let joined = (self.config.join && self.config.join_summary)
            .then(|| ("join", Summary::Text(self.joined.clone())));
        joined
            .into_iter()
            .chain(
                self.analyzers
                    .iter()
                    .map(|analyzer| (analyzer.name(), analyzer.summarize())),
            )
            .collect()
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}
