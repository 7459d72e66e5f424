//! Layout-pattern compilation.
//!
//! A layout pattern such as `%d{ISO8601} %5p %t %c{4}:%L - %m%n` is split into
//! conversion tokens and compiled into a single boundary regex with one capture
//! group per token. The same regex is used to recognise the first line of an
//! event and to extract tokens from a whole (possibly multi-line) event.

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::LayoutError;

pub mod date;
pub mod event;

pub use date::DateFormat;
pub use event::LogEvent;

/// Default layout used by the CLI when none is given.
pub const DEFAULT_LAYOUT: &str = "%d{ISO8601} %5p %t %c{4}:%L - %m%n";

/// Priority names the `%p` conversion accepts.
pub const PRIORITIES: [&str; 6] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR", "FATAL"];

lazy_static! {
    static ref CONVERSION_REGEX: Regex = Regex::new(
        r"(?s)^(?P<width>-?[0-9]*)(?:\.(?P<precision>[0-9]+))?(?P<id>[cCdFlLmMnprtxX%])(?:\{(?P<qualifier>[^}]*)\})?(?P<trailing>.*)$"
    ).unwrap();
}

/// The conversion characters a layout pattern may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identifier {
    Category,
    ClassName,
    Date,
    FileName,
    Location,
    LineNumber,
    Message,
    Method,
    LineSeparator,
    Priority,
    Elapsed,
    Thread,
    Ndc,
    Mdc,
    Percent,
}

impl Identifier {
    pub const COUNT: usize = 15;

    pub fn from_char(c: char) -> Option<Self> {
        let id = match c {
            'c' => Identifier::Category,
            'C' => Identifier::ClassName,
            'd' => Identifier::Date,
            'F' => Identifier::FileName,
            'l' => Identifier::Location,
            'L' => Identifier::LineNumber,
            'm' => Identifier::Message,
            'M' => Identifier::Method,
            'n' => Identifier::LineSeparator,
            'p' => Identifier::Priority,
            'r' => Identifier::Elapsed,
            't' => Identifier::Thread,
            'x' => Identifier::Ndc,
            'X' => Identifier::Mdc,
            '%' => Identifier::Percent,
            _ => return None,
        };
        Some(id)
    }

    /// Accepts the conversion character or a long name (`thread`, `priority`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Self::from_char(c);
        }
        let id = match name.to_ascii_lowercase().as_str() {
            "category" | "logger" => Identifier::Category,
            "class" => Identifier::ClassName,
            "date" => Identifier::Date,
            "file" => Identifier::FileName,
            "location" => Identifier::Location,
            "line" => Identifier::LineNumber,
            "message" => Identifier::Message,
            "method" => Identifier::Method,
            "priority" | "level" => Identifier::Priority,
            "elapsed" => Identifier::Elapsed,
            "thread" => Identifier::Thread,
            "ndc" => Identifier::Ndc,
            "mdc" => Identifier::Mdc,
            _ => return None,
        };
        Some(id)
    }

    pub fn as_char(self) -> char {
        match self {
            Identifier::Category => 'c',
            Identifier::ClassName => 'C',
            Identifier::Date => 'd',
            Identifier::FileName => 'F',
            Identifier::Location => 'l',
            Identifier::LineNumber => 'L',
            Identifier::Message => 'm',
            Identifier::Method => 'M',
            Identifier::LineSeparator => 'n',
            Identifier::Priority => 'p',
            Identifier::Elapsed => 'r',
            Identifier::Thread => 't',
            Identifier::Ndc => 'x',
            Identifier::Mdc => 'X',
            Identifier::Percent => '%',
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// One `%...` conversion of a layout pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutToken {
    pub identifier: Identifier,
    /// Justification width; negative means left-justified.
    pub width: Option<i32>,
    /// Truncation precision (`%.30c`).
    pub precision: Option<usize>,
    /// Content of the `{...}` qualifier.
    pub qualifier: Option<String>,
    /// Literal text up to the next conversion.
    pub trailing: String,
}

impl LayoutToken {
    /// Parse the text of one conversion, without its leading `%`.
    pub fn parse(raw: &str) -> Result<Self, LayoutError> {
        let caps = CONVERSION_REGEX
            .captures(raw)
            .ok_or_else(|| LayoutError::UnknownConversion {
                token: raw.to_string(),
            })?;

        // the regex only admits known identifiers
        let identifier = caps
            .name("id")
            .and_then(|m| m.as_str().chars().next())
            .and_then(Identifier::from_char)
            .ok_or_else(|| LayoutError::UnknownConversion {
                token: raw.to_string(),
            })?;

        let width = caps
            .name("width")
            .map(|m| m.as_str())
            .filter(|w| !w.is_empty() && *w != "-")
            .and_then(|w| w.parse::<i32>().ok());
        let precision = caps
            .name("precision")
            .and_then(|m| m.as_str().parse::<usize>().ok());
        let qualifier = caps.name("qualifier").map(|m| m.as_str().to_string());
        let trailing = caps
            .name("trailing")
            .map_or(String::new(), |m| m.as_str().to_string());

        Ok(LayoutToken {
            identifier,
            width,
            precision,
            qualifier,
            trailing,
        })
    }
}

/// A layout pattern compiled into its boundary regex.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    layout: String,
    prefix: String,
    regex: Regex,
    groups: [Option<usize>; Identifier::COUNT],
    date: Option<DateFormat>,
}

impl CompiledPattern {
    pub fn compile(layout: &str) -> Result<Self, LayoutError> {
        if layout.is_empty() {
            return Err(LayoutError::Empty);
        }

        let (prefix, raw_tokens) = split_conversions(layout);
        let mut tokens = Vec::with_capacity(raw_tokens.len());
        for raw in raw_tokens {
            tokens.push(LayoutToken::parse(raw)?);
        }

        let mut source = String::from("(?s)^");
        source.push_str(&regex::escape(prefix));

        let mut groups = [None; Identifier::COUNT];
        let mut date = None;

        for (index, token) in tokens.iter().enumerate() {
            let fragment = match token.identifier {
                Identifier::Category | Identifier::ClassName | Identifier::FileName => {
                    dotted_path_regex(token)?
                }
                Identifier::Date => {
                    let format = DateFormat::compile(token.qualifier.as_deref())?;
                    let fragment = format.regex().to_string();
                    if date.is_none() {
                        date = Some(format);
                    }
                    fragment
                }
                Identifier::Location | Identifier::LineNumber | Identifier::Elapsed => {
                    r"\?|[0-9]+".to_string()
                }
                Identifier::Message
                | Identifier::Thread
                | Identifier::Method
                | Identifier::Ndc
                | Identifier::Mdc => ".*".to_string(),
                Identifier::Priority => PRIORITIES.join("|"),
                Identifier::LineSeparator => "$".to_string(),
                Identifier::Percent => "%".to_string(),
            };

            let pads_before = token.width.is_some_and(|w| w > 0)
                || token.identifier == Identifier::Priority;
            if pads_before {
                source.push_str(r"\s*");
            }
            source.push('(');
            source.push_str(&fragment);
            source.push(')');
            if token.width.is_some_and(|w| w < 0) {
                source.push_str(r"\s*");
            }
            source.push_str(&regex::escape(&token.trailing));

            // first occurrence of a repeated identifier wins
            let slot = &mut groups[token.identifier.slot()];
            if slot.is_none() {
                *slot = Some(index + 1);
            }
        }
        source.push('$');

        log::debug!("layout '{}' compiled to '{}'", layout, source);
        let regex = Regex::new(&source)?;

        Ok(CompiledPattern {
            layout: layout.to_string(),
            prefix: prefix.to_string(),
            regex,
            groups,
            date,
        })
    }

    pub fn layout(&self) -> &str {
        &self.layout
    }

    /// Literal text preceding the first conversion.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// True when `line` starts a new event.
    pub fn is_boundary(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    /// Capture group index holding `identifier`, if the layout has it.
    pub fn group_of(&self, identifier: Identifier) -> Option<usize> {
        self.groups[identifier.slot()]
    }

    /// The date sub-format derived from the first `%d` conversion.
    pub fn date_format(&self) -> Option<&DateFormat> {
        self.date.as_ref()
    }

    /// Parse a date token with the derived sub-format. `None` when the layout
    /// has no date or the text does not parse.
    pub fn parse_date(&self, text: &str) -> Option<NaiveDateTime> {
        self.date.as_ref().and_then(|format| format.parse(text))
    }
}

/// Split a layout into its literal prefix and the raw conversions, each
/// without the leading `%`. `%%` yields a conversion that starts with `%`.
fn split_conversions(layout: &str) -> (&str, Vec<&str>) {
    let Some(first) = layout.find('%') else {
        return (layout, Vec::new());
    };

    let mut raw = Vec::new();
    let mut start = first + 1;
    while start < layout.len() {
        let end = layout[start..]
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c == '%')
            .map_or(layout.len(), |(i, _)| start + i);
        raw.push(&layout[start..end]);
        start = end + 1;
    }

    (&layout[..first], raw)
}

fn dotted_path_regex(token: &LayoutToken) -> Result<String, LayoutError> {
    const SEGMENT: &str = r"[a-zA-Z0-9_$?]+";
    match token.qualifier.as_deref() {
        None => Ok(format!(r"{SEGMENT}(?:\.{SEGMENT})*")),
        Some(qualifier) => {
            let segments = qualifier
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| LayoutError::BadQualifier {
                    identifier: token.identifier.as_char(),
                    qualifier: qualifier.to_string(),
                })?;
            Ok(format!(r"{SEGMENT}(?:\.{SEGMENT}){{0,{}}}", segments - 1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_conversions() {
        let (prefix, raw) = split_conversions("[%d] %-5p %c{2}:%L - %m%n");
        assert_eq!(prefix, "[");
        assert_eq!(raw, vec!["d] ", "-5p ", "c{2}:", "L - ", "m", "n"]);
    }

    #[test]
    fn test_split_percent_literal() {
        let (_, raw) = split_conversions("%m %% done%n");
        assert_eq!(raw, vec!["m ", "% done", "n"]);
    }

    #[test]
    fn test_token_parts() {
        let token = LayoutToken::parse("-20.30c{4}: ").unwrap();
        assert_eq!(token.identifier, Identifier::Category);
        assert_eq!(token.width, Some(-20));
        assert_eq!(token.precision, Some(30));
        assert_eq!(token.qualifier.as_deref(), Some("4"));
        assert_eq!(token.trailing, ": ");
    }

    #[test]
    fn test_identifier_names() {
        assert_eq!(Identifier::from_name("t"), Some(Identifier::Thread));
        assert_eq!(Identifier::from_name("Priority"), Some(Identifier::Priority));
        assert_eq!(Identifier::from_name("level"), Some(Identifier::Priority));
        assert_eq!(Identifier::from_name("q"), None);
        assert_eq!(Identifier::from_name("nope"), None);
    }

    #[test]
    fn test_unknown_conversion() {
        let err = CompiledPattern::compile("%d %q %m").unwrap_err();
        assert!(matches!(err, LayoutError::UnknownConversion { .. }));
    }

    #[test]
    fn test_bad_dotted_qualifier() {
        let err = CompiledPattern::compile("%c{zero} %m").unwrap_err();
        assert!(matches!(err, LayoutError::BadQualifier { identifier: 'c', .. }));
    }

    #[test]
    fn test_groups_follow_token_order() {
        let pattern = CompiledPattern::compile("%d{ABSOLUTE} %5p %c{1}:%L - %m%n").unwrap();
        assert_eq!(pattern.group_of(Identifier::Date), Some(1));
        assert_eq!(pattern.group_of(Identifier::Priority), Some(2));
        assert_eq!(pattern.group_of(Identifier::Message), Some(5));
        assert_eq!(pattern.group_of(Identifier::Thread), None);
        assert!(pattern.is_boundary("10:50:23,134  WARN SailPointFactory:124 - contexts.get"));
        assert!(!pattern.is_boundary("\tat sailpoint.web.BaseBean.getContext(BaseBean.java:118)"));
    }

    #[test]
    fn test_dotted_segments_are_bounded() {
        let pattern = CompiledPattern::compile("%c{2} %m").unwrap();
        assert!(pattern.is_boundary("web.BaseBean hello"));
        assert!(!pattern.is_boundary("sailpoint.web.BaseBean hello"));
    }
}
