use regex::Regex;

use super::{Analyzer, TraceEvent};
use crate::error::{Error, Result};
use crate::formatter::Summary;
use crate::layout::Identifier;
use crate::stack::CallStackTracker;

/// Keeps events where any token matches its regex, or with `exclusive` set,
/// events where none do.
///
/// Each regex must match the whole token value. An event whose layout has no
/// such token counts as not matching.
#[derive(Debug)]
pub struct TokenFilter {
    filters: Vec<(Identifier, Regex)>,
    exclusive: bool,
    kept: Vec<String>,
}

impl TokenFilter {
    pub fn new(filters: Vec<(Identifier, Regex)>, exclusive: bool) -> Self {
        TokenFilter {
            filters,
            exclusive,
            kept: Vec::new(),
        }
    }

    /// Parse `TOKEN=REGEX`, where TOKEN is a conversion character (`t`, `p`)
    /// or its name (`thread`, `priority`).
    pub fn parse_filter(spec: &str) -> Result<(Identifier, Regex)> {
        let invalid = |reason: String| Error::InvalidFilter {
            spec: spec.to_string(),
            reason,
        };

        let (token, pattern) = spec
            .split_once('=')
            .ok_or_else(|| invalid("expected TOKEN=REGEX".to_string()))?;
        let identifier = Identifier::from_name(token.trim())
            .ok_or_else(|| invalid(format!("unknown token '{}'", token.trim())))?;
        let regex = Regex::new(&format!("(?s)^(?:{})$", pattern))
            .map_err(|err| invalid(err.to_string()))?;
        Ok((identifier, regex))
    }

    pub fn accepts(&self, event: &TraceEvent) -> bool {
        let matched = self.filters.iter().any(|(identifier, regex)| {
            matches!(event.event.token(*identifier), Ok(Some(value)) if regex.is_match(value))
        });
        matched != self.exclusive
    }
}

impl Analyzer for TokenFilter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn consume(&mut self, event: &TraceEvent, _stacks: &CallStackTracker) -> bool {
        if self.accepts(event) {
            self.kept.push(event.text().to_string());
        }
        true
    }

    fn summarize(&self) -> Summary {
        Summary::Text(super::join_records(&self.kept))
    }
}
