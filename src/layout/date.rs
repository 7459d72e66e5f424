use chrono::NaiveDateTime;
use chrono::format::{self, Parsed, StrftimeItems};
use regex::Regex;

use crate::error::LayoutError;

/// Preset name accepted by `%d{ISO8601}`.
pub const ISO8601: &str = "ISO8601";
/// Preset name accepted by `%d{ABSOLUTE}`.
pub const ABSOLUTE: &str = "ABSOLUTE";

const ISO8601_FORMAT: &str = "yyyy-MM-dd HH:mm:ss,SSS";
const ABSOLUTE_FORMAT: &str = "HH:mm:ss,SSS";

/// A `%d{...}` qualifier compiled into a capture regex fragment and a chrono
/// parse format.
///
/// The qualifier is the usual `SimpleDateFormat`-style mini language: runs of
/// pattern letters (`yyyy`, `MM`, `HH`, ...) map to digit runs or name runs, text
/// in single quotes and any non-letter character is literal.
///
/// Hours chrono cannot read directly are rewritten before parsing: `k` runs
/// 1..=24, `h` and `K` are combined with the `a` marker into a 24-hour value.
/// A weekday name is only checked when the format also carries a day.
#[derive(Debug, Clone)]
pub struct DateFormat {
    format: String,
    regex: String,
    chrono: String,
    matcher: Regex,
    segments: Vec<Role>,
    fields: Fields,
}

#[derive(Debug, Clone, Copy, Default)]
struct Fields {
    year: bool,
    month: bool,
    day: bool,
    day_of_year: bool,
    hour: bool,
    minute: bool,
}

/// How the text captured for one piece of the format reaches chrono.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Verbatim,
    /// `k`: 24 is midnight.
    HourOfDay,
    /// `h` or `K` next to an `a` marker.
    HourOfHalfDay,
    Meridiem,
    Skipped,
}

enum Piece {
    Letters(char, usize),
    Literal(String),
}

impl DateFormat {
    /// Compile a date qualifier. `None` means the log4j default, ISO8601.
    pub fn compile(qualifier: Option<&str>) -> Result<Self, LayoutError> {
        let format = match qualifier.map(str::trim) {
            None | Some("") | Some(ISO8601) => ISO8601_FORMAT,
            Some(ABSOLUTE) => ABSOLUTE_FORMAT,
            Some(other) => other,
        };

        let pieces = split_pieces(format)?;
        let has_meridiem = pieces
            .iter()
            .any(|p| matches!(p, Piece::Letters('a', _)));
        let has_day = pieces
            .iter()
            .any(|p| matches!(p, Piece::Letters('d' | 'D', _)));

        let mut regex = String::new();
        let mut chrono = String::new();
        let mut groups = String::new();
        let mut segments = Vec::with_capacity(pieces.len());
        let mut fields = Fields::default();

        for piece in &pieces {
            let (fragment, spec, role) = match piece {
                Piece::Literal(text) => {
                    let spec = text.replace('%', "%%");
                    (regex::escape(text), spec, Role::Verbatim)
                }
                Piece::Letters(symbol, count) => {
                    let count = *count;
                    let (fragment, spec, role) = match symbol {
                        'y' => {
                            fields.year = true;
                            let spec = if count == 2 { "%y" } else { "%Y" };
                            (digits(count), spec, Role::Verbatim)
                        }
                        'M' if count <= 2 => {
                            fields.month = true;
                            (digits(count), "%m", Role::Verbatim)
                        }
                        'M' => {
                            fields.month = true;
                            let spec = if count == 3 { "%b" } else { "%B" };
                            (name_run(), spec, Role::Verbatim)
                        }
                        'd' => {
                            fields.day = true;
                            (digits(count), "%d", Role::Verbatim)
                        }
                        'D' => {
                            fields.day_of_year = true;
                            (digits(count), "%j", Role::Verbatim)
                        }
                        'H' => {
                            fields.hour = true;
                            (digits(count), "%H", Role::Verbatim)
                        }
                        'k' => {
                            fields.hour = true;
                            (digits(count), "%H", Role::HourOfDay)
                        }
                        'h' | 'K' if has_meridiem => {
                            fields.hour = true;
                            (digits(count), "%H", Role::HourOfHalfDay)
                        }
                        // 12-hour clocks without a marker are read as 24-hour
                        // values; the date normalizer resolves the ambiguity
                        'h' | 'K' => {
                            fields.hour = true;
                            (digits(count), "%H", Role::Verbatim)
                        }
                        'm' => {
                            fields.minute = true;
                            (digits(count), "%M", Role::Verbatim)
                        }
                        's' => (digits(count), "%S", Role::Verbatim),
                        'S' => match count {
                            0..=3 => (r"\d{3}".to_string(), "%3f", Role::Verbatim),
                            4..=6 => (r"\d{6}".to_string(), "%6f", Role::Verbatim),
                            _ => (r"\d{9}".to_string(), "%9f", Role::Verbatim),
                        },
                        'E' if has_day => {
                            let spec = if count <= 3 { "%a" } else { "%A" };
                            (name_run(), spec, Role::Verbatim)
                        }
                        'E' => (name_run(), "", Role::Skipped),
                        'a' => ("[AaPp][Mm]".to_string(), "", Role::Meridiem),
                        'z' => (r"\S+".to_string(), "%Z", Role::Verbatim),
                        'Z' => (r"[+-]\d{4}".to_string(), "%z", Role::Verbatim),
                        other => {
                            return Err(LayoutError::DateFormat {
                                symbol: *other,
                                format: format.to_string(),
                            });
                        }
                    };
                    (fragment, spec.to_string(), role)
                }
            };
            groups.push_str(&format!("({})", fragment));
            regex.push_str(&fragment);
            chrono.push_str(&spec);
            segments.push(role);
        }

        let matcher = Regex::new(&format!("^{}$", groups))?;
        log::debug!("date format '{}' -> regex '{}', chrono '{}'", format, regex, chrono);

        Ok(DateFormat {
            format: format.to_string(),
            regex,
            chrono,
            matcher,
            segments,
            fields,
        })
    }

    /// The resolved date format (presets expanded).
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Regex fragment matching a rendered date, without a capture group.
    pub fn regex(&self) -> &str {
        &self.regex
    }

    /// The chrono format applied after hours are rewritten and unchecked
    /// weekdays dropped.
    pub fn chrono_format(&self) -> &str {
        &self.chrono
    }

    /// Parse a captured date token.
    ///
    /// Fields the format does not carry are filled from 1970-01-01 00:00, so
    /// time-only layouts such as `ABSOLUTE` still yield comparable values.
    pub fn parse(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        let Some(normalized) = self.normalize(text) else {
            log::debug!("date '{}' does not match '{}'", text, self.format);
            return None;
        };

        let mut parsed = Parsed::new();
        if let Err(err) = format::parse(&mut parsed, &normalized, StrftimeItems::new(&self.chrono)) {
            log::debug!("date '{}' does not parse as '{}': {}", text, self.format, err);
            return None;
        }

        if !self.fields.year {
            parsed.set_year(1970).ok()?;
        }
        if !self.fields.day_of_year {
            if !self.fields.month {
                parsed.set_month(1).ok()?;
            }
            if !self.fields.day {
                parsed.set_day(1).ok()?;
            }
        }
        if !self.fields.hour {
            parsed.set_hour(0).ok()?;
        }
        if !self.fields.minute {
            parsed.set_minute(0).ok()?;
        }

        match parsed.to_naive_datetime_with_offset(0) {
            Ok(date) => Some(date),
            Err(err) => {
                log::debug!("date '{}' is incomplete for '{}': {}", text, self.format, err);
                None
            }
        }
    }

    /// Rewrite `text` into what `chrono_format` expects.
    fn normalize(&self, text: &str) -> Option<String> {
        let captures = self.matcher.captures(text)?;
        let piece = |index: usize| captures.get(index + 1).map_or("", |m| m.as_str());
        let afternoon = self
            .segments
            .iter()
            .enumerate()
            .any(|(index, role)| *role == Role::Meridiem && piece(index).eq_ignore_ascii_case("pm"));

        let mut normalized = String::with_capacity(text.len());
        for (index, role) in self.segments.iter().enumerate() {
            match role {
                Role::Verbatim => normalized.push_str(piece(index)),
                Role::HourOfDay => {
                    let hour: u32 = piece(index).parse().ok()?;
                    normalized.push_str(&format!("{:02}", hour % 24));
                }
                Role::HourOfHalfDay => {
                    let hour: u32 = piece(index).parse().ok()?;
                    let hour = hour % 12 + if afternoon { 12 } else { 0 };
                    normalized.push_str(&format!("{:02}", hour));
                }
                Role::Meridiem | Role::Skipped => {}
            }
        }
        Some(normalized)
    }
}

fn digits(count: usize) -> String {
    if count <= 1 {
        r"\d+".to_string()
    } else {
        format!(r"\d{{{}}}", count)
    }
}

// Month and weekday names
fn name_run() -> String {
    r"\p{L}+\.?".to_string()
}

fn split_pieces(format: &str) -> Result<Vec<Piece>, LayoutError> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\'' {
            // '' is an escaped quote, anything else opens a quoted literal
            if chars.peek() == Some(&'\'') {
                chars.next();
                literal.push('\'');
                continue;
            }
            let mut closed = false;
            while let Some(q) = chars.next() {
                if q == '\'' {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                        literal.push('\'');
                    } else {
                        closed = true;
                        break;
                    }
                } else {
                    literal.push(q);
                }
            }
            if !closed {
                return Err(LayoutError::UnterminatedQuote(format.to_string()));
            }
        } else if c.is_ascii_alphabetic() {
            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            let mut count = 1;
            while chars.peek() == Some(&c) {
                chars.next();
                count += 1;
            }
            pieces.push(Piece::Letters(c, count));
        } else {
            literal.push(c);
        }
    }

    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}
