//! Call stacks rebuilt from `Entering` / `Exiting` / `Throwing` trace messages.

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use rustc_hash::FxHashMap;

lazy_static! {
    static ref ENTERING_REGEX: Regex = Regex::new(r"(?s)^Entering (\S+?)\((.*)\)\s*$").unwrap();

    // `name = ` plus the first value character, so no value is empty
    static ref ARGUMENT_REGEX: Regex = Regex::new(r"(?s)([a-zA-Z0-9_$?]+) = .").unwrap();
}

/// Column width argument names are padded to.
pub const ARGUMENT_NAME_WIDTH: usize = 10;

/// Thread name used when the layout has no `%t`.
pub const DEFAULT_THREAD: &str = "?";

/// Category used when the layout has neither `%c` nor `%C`.
pub const DEFAULT_CATEGORY: &str = "?";

/// What a trace message says about the call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceKind {
    Entering {
        method: String,
        arguments: Vec<(String, String)>,
    },
    Exiting {
        method: String,
        outcome: ExitOutcome,
    },
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    Returned(Option<String>),
    Threw(String),
}

impl TraceKind {
    /// Classify a message body.
    pub fn classify(message: &str) -> TraceKind {
        if message.starts_with("Entering ") {
            return match ENTERING_REGEX.captures(message) {
                Some(caps) => TraceKind::Entering {
                    method: caps[1].to_string(),
                    arguments: parse_arguments(&caps[2]),
                },
                None => {
                    log::debug!("not a method entry: {}", message);
                    TraceKind::Other
                }
            };
        }

        if let Some(rest) = message.strip_prefix("Exiting ") {
            let (method, tail) = split_method_name(rest);
            if method.is_empty() {
                return TraceKind::Other;
            }
            let returned = tail
                .trim_start()
                .trim_start_matches("()")
                .trim_start()
                .strip_prefix('=')
                .map(|value| value.trim().to_string());
            return TraceKind::Exiting {
                method: method.to_string(),
                outcome: ExitOutcome::Returned(returned),
            };
        }

        if let Some(rest) = message.strip_prefix("Throwing ") {
            let (method, tail) = split_method_name(rest);
            if method.is_empty() {
                return TraceKind::Other;
            }
            let thrown = match tail.split_once(" - ") {
                Some((_, thrown)) => thrown,
                None => tail,
            };
            return TraceKind::Exiting {
                method: method.to_string(),
                outcome: ExitOutcome::Threw(thrown.trim().to_string()),
            };
        }

        TraceKind::Other
    }

    pub fn method(&self) -> Option<&str> {
        match self {
            TraceKind::Entering { method, .. } | TraceKind::Exiting { method, .. } => {
                Some(method.as_str())
            }
            TraceKind::Other => None,
        }
    }

    pub fn is_entering(&self) -> bool {
        matches!(self, TraceKind::Entering { .. })
    }

    /// Exiting or Throwing.
    pub fn is_exiting(&self) -> bool {
        matches!(self, TraceKind::Exiting { .. })
    }

    pub fn is_throwing(&self) -> bool {
        matches!(
            self,
            TraceKind::Exiting {
                outcome: ExitOutcome::Threw(_),
                ..
            }
        )
    }
}

// method name runs up to the argument list, the return value or whitespace
fn split_method_name(rest: &str) -> (&str, &str) {
    let end = rest
        .find(|c: char| c == '(' || c == '=' || c.is_whitespace())
        .unwrap_or(rest.len());
    (&rest[..end], &rest[end..])
}

/// Split `a = 1, b = two` into name/value pairs.
///
/// Values run until the next `name = `, so a value that itself contains
/// `x = ` is split there.
pub fn parse_arguments(signature: &str) -> Vec<(String, String)> {
    let names: Vec<(usize, usize, &str)> = ARGUMENT_REGEX
        .captures_iter(signature)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            // value starts right after " = "
            let value_start = whole.end() - whole.as_str().chars().last()?.len_utf8();
            Some((name.start(), value_start, name.as_str()))
        })
        .collect();

    names
        .iter()
        .enumerate()
        .map(|(i, &(_, value_start, name))| {
            let value_end = names.get(i + 1).map_or(signature.len(), |next| next.0);
            let value = signature[value_start..value_end].trim_end();
            let value = value.strip_suffix(',').unwrap_or(value);
            (name.to_string(), value.to_string())
        })
        .collect()
}

/// Render arguments one per line as `\t<name padded> : <value>`.
pub fn format_arguments(arguments: &[(String, String)]) -> String {
    arguments
        .iter()
        .map(|(name, value)| format!("\t{:<width$} : {}", name, value, width = ARGUMENT_NAME_WIDTH))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `category:method`, the key frames are matched on.
pub fn signature(category: &str, method: &str) -> String {
    format!("{}:{}", category, method)
}

/// A method entry waiting for its exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub signature: String,
    pub arguments: String,
    pub entered: Option<NaiveDateTime>,
}

/// Result of an exit: the frames it popped, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unwind {
    pub popped: Vec<CallFrame>,
    pub matched: bool,
}

/// Open call frames per thread.
#[derive(Debug, Default)]
pub struct CallStackTracker {
    threads: FxHashMap<String, Vec<CallFrame>>,
    stray_exits: usize,
    mismatches: usize,
}

impl CallStackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, thread: &str, frame: CallFrame) {
        log::trace!("{} enters {}", thread, frame.signature);
        self.threads.entry(thread.to_string()).or_default().push(frame);
    }

    /// Pop frames until one with `signature` comes off or the stack is empty.
    pub fn exit(&mut self, thread: &str, signature: &str) -> Unwind {
        let stack = match self.threads.get_mut(thread) {
            Some(stack) if !stack.is_empty() => stack,
            _ => {
                self.stray_exits += 1;
                log::warn!("ignoring exit from {} on {}: nothing was entered", signature, thread);
                return Unwind::default();
            }
        };

        let mut unwind = Unwind::default();
        while let Some(frame) = stack.pop() {
            let matched = frame.signature == signature;
            if !matched {
                self.mismatches += 1;
                log::warn!(
                    "method mismatch on {}: exiting {} but {} is on top",
                    thread,
                    signature,
                    frame.signature
                );
            }
            unwind.popped.push(frame);
            if matched {
                unwind.matched = true;
                break;
            }
        }
        unwind
    }

    /// Copy of a thread's open frames, oldest first.
    pub fn snapshot(&self, thread: &str) -> Vec<CallFrame> {
        self.threads.get(thread).cloned().unwrap_or_default()
    }

    pub fn depth(&self, thread: &str) -> usize {
        self.threads.get(thread).map_or(0, Vec::len)
    }

    pub fn stray_exits(&self) -> usize {
        self.stray_exits
    }

    pub fn mismatches(&self) -> usize {
        self.mismatches
    }
}
