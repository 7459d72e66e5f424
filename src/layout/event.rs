use std::cell::OnceCell;
use std::sync::Arc;

use chrono::NaiveDateTime;

use super::{CompiledPattern, Identifier};
use crate::error::TokenError;

type Spans = Option<Vec<Option<(usize, usize)>>>;

/// One logical log event: the reassembled text plus the pattern that
/// describes it. Tokens are extracted on first use and cached.
#[derive(Debug, Clone)]
pub struct LogEvent {
    text: String,
    pattern: Arc<CompiledPattern>,
    spans: OnceCell<Spans>,
}

impl LogEvent {
    pub fn new(text: impl Into<String>, pattern: Arc<CompiledPattern>) -> Self {
        LogEvent {
            text: text.into(),
            pattern,
            spans: OnceCell::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn pattern(&self) -> &Arc<CompiledPattern> {
        &self.pattern
    }

    /// True when the compiled pattern matches the whole event.
    pub fn matches(&self) -> bool {
        self.spans().is_some()
    }

    /// Value of a token.
    ///
    /// `Ok(None)` when the layout has no such conversion; an error when the
    /// layout has it but the event does not match the pattern.
    pub fn token(&self, identifier: Identifier) -> Result<Option<&str>, TokenError> {
        let Some(group) = self.pattern.group_of(identifier) else {
            return Ok(None);
        };
        let spans = self.spans().as_ref().ok_or_else(|| TokenError {
            event: self.text.clone(),
        })?;
        Ok(spans
            .get(group)
            .copied()
            .flatten()
            .map(|(start, end)| &self.text[start..end]))
    }

    pub fn message(&self) -> Result<Option<&str>, TokenError> {
        self.token(Identifier::Message)
    }

    pub fn priority(&self) -> Result<Option<&str>, TokenError> {
        self.token(Identifier::Priority)
    }

    /// The date token parsed with the layout's date sub-format, uncorrected.
    pub fn date(&self) -> Result<Option<NaiveDateTime>, TokenError> {
        Ok(self
            .token(Identifier::Date)?
            .and_then(|text| self.pattern.parse_date(text)))
    }

    /// A copy cut to `limit` characters and closed with `)`; the event itself
    /// when it is already short enough.
    pub fn truncated(&self, limit: usize) -> LogEvent {
        match self.text.char_indices().nth(limit) {
            Some((cut, _)) => {
                let mut text = String::with_capacity(cut + 1);
                text.push_str(&self.text[..cut]);
                text.push(')');
                LogEvent::new(text, Arc::clone(&self.pattern))
            }
            None => self.clone(),
        }
    }

    fn spans(&self) -> &Spans {
        self.spans.get_or_init(|| {
            self.pattern.regex().captures(&self.text).map(|caps| {
                caps.iter()
                    .map(|m| m.map(|m| (m.start(), m.end())))
                    .collect()
            })
        })
    }
}

impl PartialEq for LogEvent {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}
