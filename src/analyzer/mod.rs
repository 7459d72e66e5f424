//! Analyzers consume trace events one at a time and render a summary at the end.
//!
//! The pipeline updates the [`CallStackTracker`] before an event reaches any
//! analyzer, so a snapshot taken during `consume` already includes an entering
//! frame and no longer includes the frames an exit popped.

use chrono::NaiveDateTime;

use crate::error::TokenError;
use crate::formatter::Summary;
use crate::layout::{Identifier, LogEvent};
use crate::stack::{self, CallFrame, CallStackTracker, TraceKind, Unwind};

pub mod calls;
pub mod dedup;
pub mod errors;
pub mod indent;
pub mod isolation;
pub mod probe;
pub mod timeline;
pub mod timer;
pub mod token_filter;
pub mod trender;

pub use calls::MethodCallSummary;
pub use dedup::DedupFilter;
pub use errors::ErrorSummary;
pub use indent::IndentFormatter;
pub use isolation::MethodIsolation;
pub use probe::Probe;
pub use timeline::Timeline;
pub use timer::{MethodTimer, Timer, TimerStats};
pub use token_filter::TokenFilter;
pub use trender::Trender;

/// Closes each error and method-call record.
pub const RECORD_SEPARATOR: &str =
    "\n\n----------------------------------------------------\n\n";

/// A consumer of trace events.
pub trait Analyzer {
    fn name(&self) -> &'static str;

    /// Returns false to stop the whole pipeline.
    fn consume(&mut self, event: &TraceEvent, stacks: &CallStackTracker) -> bool;

    fn summarize(&self) -> Summary;
}

impl<A: Analyzer + ?Sized> Analyzer for Box<A> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn consume(&mut self, event: &TraceEvent, stacks: &CallStackTracker) -> bool {
        (**self).consume(event, stacks)
    }

    fn summarize(&self) -> Summary {
        (**self).summarize()
    }
}

/// A matched log event with the tokens analyzers need already pulled out.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    pub event: LogEvent,
    pub thread: String,
    pub category: String,
    pub kind: TraceKind,
    /// Date after 12-hour correction.
    pub timestamp: Option<NaiveDateTime>,
    /// Date as parsed from the date token.
    pub raw_timestamp: Option<NaiveDateTime>,
    /// Frames popped by this event when it is an exit.
    pub unwind: Unwind,
}

impl TraceEvent {
    pub fn parse(event: LogEvent) -> Result<Self, TokenError> {
        let thread = event
            .token(Identifier::Thread)?
            .unwrap_or(stack::DEFAULT_THREAD)
            .to_string();
        let category = match event.token(Identifier::Category)? {
            Some(category) => category,
            None => event
                .token(Identifier::ClassName)?
                .unwrap_or(stack::DEFAULT_CATEGORY),
        }
        .to_string();
        let kind = event
            .message()?
            .map_or(TraceKind::Other, TraceKind::classify);
        let raw_timestamp = event.date()?;

        Ok(TraceEvent {
            event,
            thread,
            category,
            kind,
            timestamp: raw_timestamp,
            raw_timestamp,
            unwind: Unwind::default(),
        })
    }

    pub fn text(&self) -> &str {
        self.event.text()
    }

    /// `category:method` for entering and exiting events.
    pub fn signature(&self) -> Option<String> {
        self.kind
            .method()
            .map(|method| stack::signature(&self.category, method))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.event.priority(), Ok(Some(priority)) if priority.trim() == "ERROR")
    }

    /// The frame an entering event pushes.
    pub fn frame(&self) -> Option<CallFrame> {
        match &self.kind {
            TraceKind::Entering { method, arguments } => Some(CallFrame {
                signature: stack::signature(&self.category, method),
                arguments: stack::format_arguments(arguments),
                entered: self.timestamp,
            }),
            _ => None,
        }
    }

    /// This event cut to `limit` characters, keeping the dates and unwind
    /// already resolved for the full event. `None` when nothing was cut or
    /// the cut text no longer matches the layout.
    pub fn truncated(&self, limit: usize) -> Option<TraceEvent> {
        let cut = self.event.truncated(limit);
        if cut.text() == self.event.text() {
            return None;
        }
        let mut truncated = TraceEvent::parse(cut).ok()?;
        truncated.timestamp = self.timestamp;
        truncated.raw_timestamp = self.raw_timestamp;
        truncated.unwind = self.unwind.clone();
        Some(truncated)
    }
}

/// Method filter for the isolation and call-summary analyzers. Without a
/// class any category matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub class: Option<String>,
    pub method: String,
}

impl Target {
    pub fn new(class: Option<String>, method: impl Into<String>) -> Self {
        Target {
            class,
            method: method.into(),
        }
    }

    pub fn matches(&self, signature: &str) -> bool {
        let (category, method) = signature.split_once(':').unwrap_or(("", signature));
        method == self.method && self.class.as_deref().is_none_or(|class| class == category)
    }
}

/// Fast mode: hands the wrapped analyzer a copy of each event cut to `limit`
/// characters and closed with `)`.
pub struct Truncated<A> {
    inner: A,
    limit: usize,
}

impl<A: Analyzer> Truncated<A> {
    pub fn new(inner: A, limit: usize) -> Self {
        Truncated { inner, limit }
    }
}

impl<A: Analyzer> Analyzer for Truncated<A> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn consume(&mut self, event: &TraceEvent, stacks: &CallStackTracker) -> bool {
        match event.truncated(self.limit) {
            Some(truncated) => self.inner.consume(&truncated, stacks),
            None => self.inner.consume(event, stacks),
        }
    }

    fn summarize(&self) -> Summary {
        self.inner.summarize()
    }
}

/// Append `sig (` + arguments + ` )` for each frame, oldest first.
pub(crate) fn render_frames<'a>(frames: impl IntoIterator<Item = &'a CallFrame>, out: &mut String) {
    for frame in frames {
        out.push_str(&frame.signature);
        out.push_str(" (");
        if !frame.arguments.is_empty() {
            out.push('\n');
            out.push_str(&frame.arguments);
        }
        out.push_str(" )\n\n");
    }
}

/// Records joined the way every text summary is: one per line group.
pub(crate) fn join_records(records: &[String]) -> String {
    let mut text = String::new();
    for record in records {
        text.push_str(record);
        text.push('\n');
    }
    text
}
